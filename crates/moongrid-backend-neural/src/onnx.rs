//! ONNX model backend
//!
//! Two-stage synthesis with the tract runtime:
//!
//! ```text
//! latent [1, D] ─▶ moon-map.onnx ─▶ style ─▶ moon-synth.onnx ─▶ img [1, 3, S, S]
//! ```
//!
//! Both models are read from one directory. Loading happens on the blocking
//! pool; inference runs inline, one tile at a time.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use moongrid_core::{LatentVector, TileTensor};
use moongrid_pipeline::{InferenceBackend, InferenceError};
use tracing::{debug, info};
use tract_onnx::prelude::*;

/// Mapping network file name
pub const MAP_MODEL: &str = "moon-map.onnx";

/// Synthesis network file name
pub const SYNTH_MODEL: &str = "moon-synth.onnx";

type Plan = TypedRunnableModel<TypedModel>;

struct LoadedModels {
    map: Plan,
    synth: Plan,
}

/// Mapping + synthesis networks loaded with tract
pub struct OnnxBackend {
    model_dir: PathBuf,
    latent_dim: usize,
    tile_size: u32,
    models: Option<LoadedModels>,
}

impl OnnxBackend {
    /// Backend reading models from `model_dir`; nothing is loaded yet
    pub fn new(model_dir: impl AsRef<Path>, latent_dim: usize, tile_size: u32) -> Self {
        Self {
            model_dir: model_dir.as_ref().to_path_buf(),
            latent_dim,
            tile_size,
            models: None,
        }
    }

    /// Directory the models are read from
    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    fn model_path(&self, name: &str) -> Result<PathBuf, InferenceError> {
        let path = self.model_dir.join(name);
        if !path.exists() {
            return Err(InferenceError::ModelNotFound(path.display().to_string()));
        }
        Ok(path)
    }

    fn load_models(
        map_path: &Path,
        synth_path: &Path,
        latent_dim: usize,
    ) -> Result<LoadedModels, InferenceError> {
        let map = tract_onnx::onnx()
            .model_for_path(map_path)
            .and_then(|m| m.with_input_fact(0, f32::fact([1, latent_dim]).into()))
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| InferenceError::InvalidFormat(format!("{}: {e}", map_path.display())))?;

        let synth = tract_onnx::onnx()
            .model_for_path(synth_path)
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| {
                InferenceError::InvalidFormat(format!("{}: {e}", synth_path.display()))
            })?;

        Ok(LoadedModels { map, synth })
    }

    fn synthesize(
        models: &LoadedModels,
        latent: &LatentVector,
        tile_size: u32,
    ) -> Result<TileTensor, InferenceError> {
        let failed = |e: TractError| InferenceError::InferenceFailed(e.to_string());

        let input = Tensor::from_shape(&[1, latent.dim()], latent.as_slice()).map_err(failed)?;
        let mut style = models.map.run(tvec!(input.into())).map_err(failed)?;
        if style.is_empty() {
            return Err(InferenceError::InferenceFailed(
                "mapping network produced no output".into(),
            ));
        }
        let images = models
            .synth
            .run(tvec!(style.remove(0)))
            .map_err(failed)?;
        let image = images.first().ok_or_else(|| {
            InferenceError::InferenceFailed("synthesis network produced no output".into())
        })?;

        let view = image.to_array_view::<f32>().map_err(failed)?;
        let s = tile_size as usize;
        let expected = vec![1, 3, s, s];
        if view.shape() != expected.as_slice() {
            return Err(InferenceError::ShapeMismatch {
                expected,
                actual: view.shape().to_vec(),
            });
        }

        let data: Vec<f32> = view.iter().copied().collect();
        TileTensor::new(tile_size, data).map_err(|e| InferenceError::InferenceFailed(e.to_string()))
    }
}

#[async_trait]
impl InferenceBackend for OnnxBackend {
    async fn load(&mut self) -> Result<(), InferenceError> {
        let map_path = self.model_path(MAP_MODEL)?;
        let synth_path = self.model_path(SYNTH_MODEL)?;
        let latent_dim = self.latent_dim;

        info!(dir = %self.model_dir.display(), "Loading ONNX models");
        let models = tokio::task::spawn_blocking(move || {
            OnnxBackend::load_models(&map_path, &synth_path, latent_dim)
        })
        .await
        .map_err(|e| InferenceError::InferenceFailed(format!("model loader panicked: {e}")))??;

        self.models = Some(models);
        debug!("ONNX models ready");
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.models.is_some()
    }

    fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    fn tile_size(&self) -> u32 {
        self.tile_size
    }

    async fn infer(&mut self, latent: &LatentVector) -> Result<TileTensor, InferenceError> {
        let models = self.models.as_ref().ok_or(InferenceError::ModelNotLoaded)?;
        if latent.dim() != self.latent_dim {
            return Err(InferenceError::ShapeMismatch {
                expected: vec![1, self.latent_dim],
                actual: vec![1, latent.dim()],
            });
        }
        Self::synthesize(models, latent, self.tile_size)
    }

    fn name(&self) -> &'static str {
        "onnx"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_models() {
        let mut backend = OnnxBackend::new("/nonexistent/moongrid-models", 256, 64);
        match backend.load().await {
            Err(InferenceError::ModelNotFound(path)) => assert!(path.ends_with(MAP_MODEL)),
            other => panic!("expected ModelNotFound, got {other:?}"),
        }
        assert!(!backend.is_ready());
    }

    #[tokio::test]
    async fn test_infer_before_load() {
        let mut backend = OnnxBackend::new("models", 256, 64);
        assert!(matches!(
            backend.infer(&LatentVector::zeros(256)).await,
            Err(InferenceError::ModelNotLoaded)
        ));
    }
}
