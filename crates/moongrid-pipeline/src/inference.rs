//! Inference contract
//!
//! The synthesis model is a capability, not a global: anything that can turn
//! a latent vector into an `S×S` RGB tile implements [`InferenceBackend`] and
//! is injected into the tile driver.

use async_trait::async_trait;
use moongrid_core::{LatentVector, TileTensor};
use thiserror::Error;

/// Inference errors
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model is not loaded")]
    ModelNotLoaded,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Invalid model format: {0}")]
    InvalidFormat(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}

/// A latent-to-tile synthesis model.
///
/// Calls take `&mut self`: a backend is never asked for two tiles at once.
#[async_trait]
pub trait InferenceBackend: Send {
    /// Load weights and prepare for inference
    async fn load(&mut self) -> Result<(), InferenceError>;

    /// Whether [`load`](Self::load) has completed
    fn is_ready(&self) -> bool;

    /// Latent vector length the model consumes
    fn latent_dim(&self) -> usize;

    /// Side length of produced tiles in pixels
    fn tile_size(&self) -> u32;

    /// Synthesize one tile with values in `[-1, 1]`.
    ///
    /// Fails with [`InferenceError::ModelNotLoaded`] before `load`.
    async fn infer(&mut self, latent: &LatentVector) -> Result<TileTensor, InferenceError>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<B: InferenceBackend + ?Sized> InferenceBackend for Box<B> {
    async fn load(&mut self) -> Result<(), InferenceError> {
        (**self).load().await
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn latent_dim(&self) -> usize {
        (**self).latent_dim()
    }

    fn tile_size(&self) -> u32 {
        (**self).tile_size()
    }

    async fn infer(&mut self, latent: &LatentVector) -> Result<TileTensor, InferenceError> {
        (**self).infer(latent).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Check a tile returned by a backend against the size it advertises
pub fn check_tile(tile: &TileTensor, tile_size: u32) -> Result<(), InferenceError> {
    if tile.size() != tile_size {
        let s = tile_size as usize;
        return Err(InferenceError::ShapeMismatch {
            expected: vec![1, 3, s, s],
            actual: tile.shape().to_vec(),
        });
    }
    Ok(())
}
