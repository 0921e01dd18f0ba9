//! CLI commands

pub mod animate;
pub mod features;
pub mod render;
pub mod watch;

use moongrid_backend_neural::PaletteBackend;
use moongrid_core::{Features, LatentRng, SeededSource, Sfc32Source, UniformSource};
use moongrid_pipeline::{EngineConfig, InferenceBackend, Session};
use tracing::info;

use crate::{BackendKind, RunOptions};

/// Uniform source picked on the command line
pub type RunRng = LatentRng<Box<dyn UniformSource + Send>>;

/// Everything a command needs before touching the backend
pub struct RunSetup {
    pub config: EngineConfig,
    pub rng: RunRng,
    pub features: Features,
}

/// Uniform source from `--hash`, `--seed`, or a fresh random seed
fn run_rng(options: &RunOptions) -> Result<RunRng, Box<dyn std::error::Error>> {
    let source: Box<dyn UniformSource + Send> = match (&options.hash, options.seed) {
        (Some(hash), _) => {
            info!("Hash: {}", hash);
            Box::new(Sfc32Source::from_hash(hash)?)
        }
        (None, Some(seed)) => {
            info!("Seed: {}", seed);
            Box::new(SeededSource::new(seed))
        }
        (None, None) => {
            let seed = rand::random::<u64>();
            info!("Seed: {} (pass --seed {} to reproduce)", seed, seed);
            Box::new(SeededSource::new(seed))
        }
    };
    Ok(LatentRng::new(source))
}

/// Load configuration, pick the uniform source and draw the features.
///
/// The features are the first two draws of the run, taken before any grid.
pub fn prepare(options: &RunOptions) -> Result<RunSetup, Box<dyn std::error::Error>> {
    let config = match &options.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            EngineConfig::from_json_file(path)?
        }
        None => EngineConfig::default(),
    };

    let mut rng = run_rng(options)?;
    let features = Features::draw(&mut rng, config.min_grid, config.max_grid);
    info!("Features: {}", serde_json::to_string_pretty(&features)?);

    Ok(RunSetup {
        config,
        rng,
        features,
    })
}

/// Backend selected with `--backend`
pub fn backend(
    options: &RunOptions,
    config: &EngineConfig,
) -> Result<Box<dyn InferenceBackend>, Box<dyn std::error::Error>> {
    match options.backend {
        BackendKind::Palette => Ok(Box::new(PaletteBackend::new(
            config.latent_dim,
            config.tile_size,
        ))),
        #[cfg(feature = "onnx")]
        BackendKind::Onnx => Ok(Box::new(moongrid_backend_neural::OnnxBackend::new(
            &options.model_dir,
            config.latent_dim,
            config.tile_size,
        ))),
        #[cfg(not(feature = "onnx"))]
        BackendKind::Onnx => Err(format!(
            "the ONNX backend is not compiled in (model dir {}); rebuild with --features onnx",
            options.model_dir.display()
        )
        .into()),
    }
}

/// Prepared, loaded session ready to render
pub async fn loaded_session(
    options: &RunOptions,
) -> Result<Session<Box<dyn InferenceBackend>>, Box<dyn std::error::Error>> {
    let RunSetup {
        config,
        mut rng,
        features,
    } = prepare(options)?;

    let backend = backend(options, &config)?;
    let session = Session::new(backend, config, features)?;
    session.load(&mut rng).await?;
    Ok(session)
}
