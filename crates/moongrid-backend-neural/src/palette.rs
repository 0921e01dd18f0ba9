//! Procedural palette backend
//!
//! Turns a latent vector into a soft radial gradient without any model
//! weights. The gradient's inner and outer colors and its center come from
//! `tanh` of fixed latent components, so nearby latents give nearby tiles and
//! the mosaic still shows the grid's interpolation structure.

use async_trait::async_trait;
use moongrid_core::{LatentVector, TileTensor};
use moongrid_pipeline::{InferenceBackend, InferenceError};
use tracing::debug;

/// How far from the center the gradient reaches its outer color
const FALLOFF: f32 = 1.5;

/// Gradient parameters for one tile
#[derive(Debug, Clone, Copy, PartialEq)]
struct Gradient {
    inner: [f32; 3],
    outer: [f32; 3],
    center: (f32, f32),
}

impl Gradient {
    fn from_latent(latent: &LatentVector) -> Self {
        let values = latent.as_slice();
        let at = |i: usize| values[i % values.len()].tanh();

        Self {
            inner: [at(0), at(1), at(2)],
            outer: [at(3), at(4), at(5)],
            center: (0.5 + 0.25 * at(6), 0.5 + 0.25 * at(7)),
        }
    }

    fn sample(&self, channel: usize, u: f32, v: f32) -> f32 {
        let (cx, cy) = self.center;
        let t = (((u - cx).powi(2) + (v - cy).powi(2)).sqrt() * FALLOFF).min(1.0);
        let value = self.inner[channel] * (1.0 - t) + self.outer[channel] * t;
        value.clamp(-1.0, 1.0)
    }
}

/// Deterministic latent-to-gradient backend
#[derive(Debug, Clone)]
pub struct PaletteBackend {
    latent_dim: usize,
    tile_size: u32,
    ready: bool,
}

impl PaletteBackend {
    /// Create an unloaded backend
    pub fn new(latent_dim: usize, tile_size: u32) -> Self {
        Self {
            latent_dim,
            tile_size,
            ready: false,
        }
    }

    fn render(&self, latent: &LatentVector) -> Result<TileTensor, InferenceError> {
        let gradient = Gradient::from_latent(latent);
        let size = self.tile_size;
        let s = size as f32;

        let mut data = Vec::with_capacity(TileTensor::len_for(size));
        for channel in 0..3 {
            // NCHW: axis 2 is the row, axis 3 the column
            for row in 0..size {
                for col in 0..size {
                    let u = (col as f32 + 0.5) / s;
                    let v = (row as f32 + 0.5) / s;
                    data.push(gradient.sample(channel, u, v));
                }
            }
        }
        TileTensor::new(size, data).map_err(|e| InferenceError::InferenceFailed(e.to_string()))
    }
}

#[async_trait]
impl InferenceBackend for PaletteBackend {
    async fn load(&mut self) -> Result<(), InferenceError> {
        if self.latent_dim == 0 || self.tile_size == 0 {
            return Err(InferenceError::InvalidFormat(format!(
                "palette needs a non-empty latent and tile, got dim {} size {}",
                self.latent_dim, self.tile_size
            )));
        }
        self.ready = true;
        debug!(
            latent_dim = self.latent_dim,
            tile_size = self.tile_size,
            "Palette backend loaded"
        );
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    fn tile_size(&self) -> u32 {
        self.tile_size
    }

    async fn infer(&mut self, latent: &LatentVector) -> Result<TileTensor, InferenceError> {
        if !self.ready {
            return Err(InferenceError::ModelNotLoaded);
        }
        if latent.dim() != self.latent_dim {
            return Err(InferenceError::ShapeMismatch {
                expected: vec![1, self.latent_dim],
                actual: vec![1, latent.dim()],
            });
        }
        self.render(latent)
    }

    fn name(&self) -> &'static str {
        "palette"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moongrid_core::LatentRng;

    async fn loaded(dim: usize, size: u32) -> PaletteBackend {
        let mut backend = PaletteBackend::new(dim, size);
        backend.load().await.unwrap();
        backend
    }

    #[tokio::test]
    async fn test_requires_load() {
        let mut backend = PaletteBackend::new(8, 4);
        assert!(!backend.is_ready());
        assert!(matches!(
            backend.infer(&LatentVector::zeros(8)).await,
            Err(InferenceError::ModelNotLoaded)
        ));

        backend.load().await.unwrap();
        assert!(backend.infer(&LatentVector::zeros(8)).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_setup() {
        let mut backend = PaletteBackend::new(0, 4);
        assert!(matches!(
            backend.load().await,
            Err(InferenceError::InvalidFormat(_))
        ));
        assert!(!backend.is_ready());
    }

    #[tokio::test]
    async fn test_tile_shape_and_range() {
        let mut backend = loaded(16, 8).await;
        let latent = LatentVector::random(&mut LatentRng::seeded(5), 16);
        let tile = backend.infer(&latent).await.unwrap();

        assert_eq!(tile.shape(), [1, 3, 8, 8]);
        assert!(tile.as_slice().iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[tokio::test]
    async fn test_deterministic() {
        let mut backend = loaded(16, 8).await;
        let latent = LatentVector::random(&mut LatentRng::seeded(5), 16);
        let first = backend.infer(&latent).await.unwrap();
        let second = backend.infer(&latent).await.unwrap();
        assert_eq!(first, second);

        let other = LatentVector::random(&mut LatentRng::seeded(6), 16);
        assert_ne!(backend.infer(&other).await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_zero_latent_is_flat_gray() {
        let mut backend = loaded(4, 4).await;
        let tile = backend.infer(&LatentVector::zeros(4)).await.unwrap();
        assert!(tile.as_slice().iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn test_dimension_checked() {
        let mut backend = loaded(8, 4).await;
        assert!(matches!(
            backend.infer(&LatentVector::zeros(4)).await,
            Err(InferenceError::ShapeMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_center_shift_is_horizontal() {
        // component 6 moves the center right, component 7 leaves it mid-height
        let mut backend = loaded(8, 8).await;
        let latent = LatentVector::from_vec(vec![1.0, 1.0, 1.0, -1.0, -1.0, -1.0, 3.0, 0.0]);
        let tile = backend.infer(&latent).await.unwrap();

        // row 4, col 6 sits beside the center; row 6, col 4 is far below it
        assert!(tile.get(0, 4, 6) > tile.get(0, 6, 4));
    }

    #[tokio::test]
    async fn test_small_latents_wrap() {
        // fewer than eight components still yields a full gradient
        let mut backend = loaded(2, 4).await;
        let tile = backend
            .infer(&LatentVector::from_vec(vec![0.5, -0.5]))
            .await
            .unwrap();
        assert_eq!(tile.size(), 4);
    }
}
