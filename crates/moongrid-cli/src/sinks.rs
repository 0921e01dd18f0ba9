//! File sinks for stills and animations

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::codecs::gif::{GifEncoder, Repeat};
use image::imageops::{self, FilterType};
use image::{Delay, Frame, RgbaImage};
use moongrid_core::MosaicFrame;
use moongrid_pipeline::{FrameSink, MosaicSink, RenderError};
use tracing::{debug, info};

fn sink_error(e: impl std::fmt::Display) -> RenderError {
    RenderError::Sink(e.to_string())
}

/// Saturated RGBA image of a mosaic
fn to_image(frame: &MosaicFrame, saturation: f32) -> Result<RgbaImage, RenderError> {
    let adjusted = frame.saturated(saturation);
    let (width, height) = (adjusted.width, adjusted.height);
    RgbaImage::from_raw(width, height, adjusted.into_raw())
        .ok_or_else(|| sink_error(format!("pixel buffer does not fit {width}x{height}")))
}

/// Writes each presented mosaic to one PNG file
pub struct PngSink {
    path: PathBuf,
    saturation: f32,
    written: u64,
}

impl PngSink {
    pub fn new(path: impl AsRef<Path>, saturation: f32) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            saturation,
            written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of mosaics written so far
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl MosaicSink for PngSink {
    fn present(&mut self, frame: &MosaicFrame) -> Result<(), RenderError> {
        to_image(frame, self.saturation)?
            .save(&self.path)
            .map_err(sink_error)?;
        self.written += 1;
        info!(path = %self.path.display(), "Mosaic written");
        Ok(())
    }
}

/// Collects animation frames and writes them as a looping GIF on `finish`
pub struct GifSink {
    path: PathBuf,
    size: u32,
    saturation: f32,
    frames: Vec<Frame>,
}

impl GifSink {
    /// Create `path`; frames are scaled to `size × size`
    pub fn create(path: impl AsRef<Path>, size: u32, saturation: f32) -> Result<Self, RenderError> {
        let path = path.as_ref().to_path_buf();
        File::create(&path).map_err(sink_error)?;
        Ok(Self {
            path,
            size,
            saturation,
            frames: Vec::new(),
        })
    }

    /// Frames waiting to be written
    pub fn pending(&self) -> usize {
        self.frames.len()
    }

    fn encode(frames: Vec<Frame>) -> Result<Vec<u8>, RenderError> {
        let mut bytes = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut bytes);
            encoder.set_repeat(Repeat::Infinite).map_err(sink_error)?;
            encoder.encode_frames(frames).map_err(sink_error)?;
        }
        Ok(bytes)
    }
}

impl FrameSink for GifSink {
    fn push_frame(&mut self, frame: &MosaicFrame, delay: Duration) -> Result<(), RenderError> {
        let image = to_image(frame, self.saturation)?;
        let scaled = imageops::resize(&image, self.size, self.size, FilterType::Triangle);
        self.frames.push(Frame::from_parts(
            scaled,
            0,
            0,
            Delay::from_saturating_duration(delay),
        ));
        debug!(frame = self.frames.len(), "GIF frame queued");
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        let frames = std::mem::take(&mut self.frames);
        if frames.is_empty() {
            return Err(sink_error("no frames to encode"));
        }
        let count = frames.len();
        let bytes = Self::encode(frames)?;
        std::fs::write(&self.path, bytes).map_err(sink_error)?;
        info!(path = %self.path.display(), frames = count, "GIF written");
        Ok(())
    }
}
