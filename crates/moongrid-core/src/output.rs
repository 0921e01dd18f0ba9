//! Mosaic output types
//!
//! Tiles come back from the synthesis model as `[1, 3, S, S]` float tensors
//! with values in `[-1, 1]`. They are composited into an RGBA8
//! [`MosaicFrame`] at pixel offset `(x·S, y·S)`.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Number of color channels in a tile tensor
pub const TILE_CHANNELS: usize = 3;

/// Shape of the output mosaic in tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileLayout {
    /// Tiles across
    pub cols: u32,
    /// Tiles down
    pub rows: u32,
}

impl TileLayout {
    /// Create a layout
    pub fn new(cols: u32, rows: u32) -> Self {
        Self { cols, rows }
    }

    /// Square layout
    pub fn square(side: u32) -> Self {
        Self::new(side, side)
    }

    /// Total number of tiles
    pub fn tile_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    /// Tile coordinates in row-major order
    pub fn tiles(&self) -> impl Iterator<Item = (u32, u32)> {
        let cols = self.cols;
        (0..self.rows).flat_map(move |y| (0..cols).map(move |x| (x, y)))
    }
}

/// One synthesized tile, NCHW `[1, 3, size, size]`
#[derive(Debug, Clone, PartialEq)]
pub struct TileTensor {
    size: u32,
    data: Vec<f32>,
}

impl TileTensor {
    /// Wrap tensor data, checking its length against `size`
    pub fn new(size: u32, data: Vec<f32>) -> Result<Self> {
        let expected = Self::len_for(size);
        if data.len() != expected {
            return Err(CoreError::TileData {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { size, data })
    }

    /// Tile filled with one color (channel values in `[-1, 1]`)
    pub fn solid(size: u32, rgb: [f32; 3]) -> Self {
        let plane = size as usize * size as usize;
        let mut data = Vec::with_capacity(plane * TILE_CHANNELS);
        for value in rgb {
            data.extend(std::iter::repeat_n(value, plane));
        }
        Self { size, data }
    }

    /// Number of values a tile of `size` carries
    pub fn len_for(size: u32) -> usize {
        TILE_CHANNELS * size as usize * size as usize
    }

    /// Side length in pixels
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Tensor shape
    pub fn shape(&self) -> [usize; 4] {
        [1, TILE_CHANNELS, self.size as usize, self.size as usize]
    }

    /// Element `(0, channel, row, col)`; the third axis runs vertically
    pub fn get(&self, channel: usize, row: u32, col: u32) -> f32 {
        let s = self.size as usize;
        self.data[channel * s * s + row as usize * s + col as usize]
    }

    /// Raw data
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// Map a model output value in `[-1, 1]` to a byte.
///
/// Stores like a clamped byte array: round half to even, clamp to
/// `[0, 255]`, NaN becomes 0.
pub fn channel_to_byte(value: f32) -> u8 {
    let scaled = (value as f64 + 1.0) / 2.0 * 255.0;
    if scaled.is_nan() {
        return 0;
    }
    scaled.round_ties_even().clamp(0.0, 255.0) as u8
}

/// RGBA8 mosaic image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MosaicFrame {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel data, row-major RGBA
    pub data: Vec<u8>,
}

impl MosaicFrame {
    /// Create a black, opaque frame
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::EmptyMosaic);
        }
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or(CoreError::SurfaceTooLarge {
                width: width as u64,
                height: height as u64,
            })?;

        let mut data = vec![0; len];
        for px in data.chunks_exact_mut(4) {
            px[3] = 255;
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Frame sized for `layout` tiles of `tile_size` pixels
    pub fn for_layout(layout: TileLayout, tile_size: u32) -> Result<Self> {
        let width = layout.cols as u64 * tile_size as u64;
        let height = layout.rows as u64 * tile_size as u64;
        if width > u32::MAX as u64 || height > u32::MAX as u64 {
            return Err(CoreError::SurfaceTooLarge { width, height });
        }
        Self::new(width as u32, height as u32)
    }

    /// Pixel at position
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ])
    }

    /// Set pixel at position; out of range writes are dropped
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        self.data[idx..idx + 4].copy_from_slice(&rgba);
    }

    /// Composite a tile at tile coordinate `(tile_x, tile_y)`
    pub fn write_tile(&mut self, tile: &TileTensor, tile_x: u32, tile_y: u32) -> Result<()> {
        let size = tile.size();
        let out_of_bounds = CoreError::TileOutOfBounds {
            x: tile_x,
            y: tile_y,
        };
        let ox = tile_x.checked_mul(size).ok_or(out_of_bounds.clone())?;
        let oy = tile_y.checked_mul(size).ok_or(out_of_bounds.clone())?;
        if ox as u64 + size as u64 > self.width as u64 || oy as u64 + size as u64 > self.height as u64
        {
            return Err(out_of_bounds);
        }

        for row in 0..size {
            for col in 0..size {
                let r = channel_to_byte(tile.get(0, row, col));
                let g = channel_to_byte(tile.get(1, row, col));
                let b = channel_to_byte(tile.get(2, row, col));
                self.set_pixel(ox + col, oy + row, [r, g, b, 255]);
            }
        }
        Ok(())
    }

    /// Copy with saturation scaled by `factor` (1.0 is identity), using the
    /// same color matrix as the CSS `saturate()` filter
    pub fn saturated(&self, factor: f32) -> MosaicFrame {
        let s = factor as f64;
        let m = [
            [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
            [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
            [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
        ];

        let mut out = self.clone();
        for px in out.data.chunks_exact_mut(4) {
            let rgb = [px[0] as f64, px[1] as f64, px[2] as f64];
            for (c, row) in m.iter().enumerate() {
                let v = row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2];
                px[c] = v.round().clamp(0.0, 255.0) as u8;
            }
        }
        out
    }

    /// Consume into raw RGBA bytes
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_to_byte() {
        assert_eq!(channel_to_byte(-1.0), 0);
        assert_eq!(channel_to_byte(1.0), 255);
        // 127.5 rounds to even
        assert_eq!(channel_to_byte(0.0), 128);
        assert_eq!(channel_to_byte(-3.0), 0);
        assert_eq!(channel_to_byte(4.0), 255);
        assert_eq!(channel_to_byte(f32::NAN), 0);
    }

    #[test]
    fn test_tile_tensor_layout() {
        let mut data = vec![0.0; TileTensor::len_for(2)];
        // channel 1, row 1, col 0
        data[4 + 2] = 0.5;
        let tile = TileTensor::new(2, data).unwrap();
        assert_eq!(tile.shape(), [1, 3, 2, 2]);
        assert_eq!(tile.get(1, 1, 0), 0.5);
        assert_eq!(tile.get(1, 0, 1), 0.0);

        assert!(TileTensor::new(2, vec![0.0; 5]).is_err());
    }

    #[test]
    fn test_write_tile_axes() {
        let mut data = vec![-1.0; TileTensor::len_for(2)];
        // red at tensor (0, 0, 1, 0) lands on pixel row 1, column 0
        data[2] = 1.0;
        let tile = TileTensor::new(2, data).unwrap();

        let mut frame = MosaicFrame::for_layout(TileLayout::square(2), 2).unwrap();
        frame.write_tile(&tile, 0, 0).unwrap();
        assert_eq!(frame.get_pixel(0, 1), Some([255, 0, 0, 255]));
        assert_eq!(frame.get_pixel(1, 0), Some([0, 0, 0, 255]));

        frame.write_tile(&tile, 1, 1).unwrap();
        assert_eq!(frame.get_pixel(2, 3), Some([255, 0, 0, 255]));
        assert_eq!(frame.get_pixel(3, 2), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_write_tile_bounds() {
        let mut frame = MosaicFrame::for_layout(TileLayout::square(2), 4).unwrap();
        let tile = TileTensor::solid(4, [0.0, 0.0, 0.0]);
        assert!(frame.write_tile(&tile, 2, 0).is_err());
        assert!(frame.write_tile(&TileTensor::solid(8, [0.0; 3]), 1, 1).is_err());
    }

    #[test]
    fn test_empty_mosaic() {
        assert_eq!(MosaicFrame::new(0, 4).unwrap_err(), CoreError::EmptyMosaic);
        assert_eq!(
            MosaicFrame::for_layout(TileLayout::square(0), 64).unwrap_err(),
            CoreError::EmptyMosaic
        );
    }

    #[test]
    fn test_saturation() {
        let mut frame = MosaicFrame::new(2, 1).unwrap();
        frame.set_pixel(0, 0, [200, 100, 50, 255]);
        frame.set_pixel(1, 0, [90, 90, 90, 255]);

        assert_eq!(frame.saturated(1.0), frame);

        let gray = frame.saturated(0.0);
        let [r, g, b, a] = gray.get_pixel(0, 0).unwrap();
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(a, 255);

        // neutral colors are unaffected by saturation
        let boosted = frame.saturated(1.25);
        assert_eq!(boosted.get_pixel(1, 0), Some([90, 90, 90, 255]));
        let [r, _, b, _] = boosted.get_pixel(0, 0).unwrap();
        assert!(r > 200 && b < 50);
    }

    #[test]
    fn test_layout_tiles() {
        let layout = TileLayout::new(3, 2);
        assert_eq!(layout.tile_count(), 6);
        let tiles: Vec<_> = layout.tiles().collect();
        assert_eq!(tiles[0], (0, 0));
        assert_eq!(tiles[3], (0, 1));
        assert_eq!(tiles[5], (2, 1));
    }
}
