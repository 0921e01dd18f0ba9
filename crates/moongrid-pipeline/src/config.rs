//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use moongrid_core::features::{MAX_NUM_GRID, MIN_NUM_GRID};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// What the tile driver does between two tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YieldPolicy {
    /// Run tiles back to back
    #[default]
    Never,
    /// Hand control back to the runtime after each tile, sleeping for the
    /// given duration (zero just yields)
    EveryTile(Duration),
}

impl YieldPolicy {
    /// Suspend according to the policy
    pub async fn pause(&self) {
        match self {
            Self::Never => {}
            Self::EveryTile(d) if d.is_zero() => tokio::task::yield_now().await,
            Self::EveryTile(d) => tokio::time::sleep(*d).await,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tile side length in pixels
    pub tile_size: u32,
    /// Latent dimension expected from the model
    pub latent_dim: usize,
    /// Smallest grid side the features may pick
    pub min_grid: u32,
    /// Largest grid side the features may pick
    pub max_grid: u32,
    /// Circular interpolation radius
    pub circular_radius: f32,
    /// Side length of exported animation frames
    pub gif_size: u32,
    /// Animation frames per second
    pub gif_framerate: u32,
    /// Animation length in seconds
    pub gif_duration_secs: u32,
    /// Seconds between periodic refreshes
    pub refresh_interval_secs: u64,
    /// Pause between tiles in milliseconds (`None` disables yielding)
    pub tile_yield_ms: Option<u64>,
    /// Display saturation factor (1.0 is identity)
    pub saturation: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tile_size: 64,
            latent_dim: 256,
            min_grid: MIN_NUM_GRID,
            max_grid: MAX_NUM_GRID,
            circular_radius: 200.0,
            gif_size: 512,
            gif_framerate: 25,
            gif_duration_secs: 2,
            refresh_interval_secs: 60 * 60,
            tile_yield_ms: Some(1),
            saturation: 1.25,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file; missing keys take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse from JSON text
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tile_size == 0 {
            return Err(ConfigError::Invalid("tile_size must be non-zero".into()));
        }
        if self.latent_dim == 0 {
            return Err(ConfigError::Invalid("latent_dim must be non-zero".into()));
        }
        if self.min_grid < 2 {
            return Err(ConfigError::Invalid(format!(
                "min_grid must be at least 2, got {}",
                self.min_grid
            )));
        }
        if self.min_grid > self.max_grid {
            return Err(ConfigError::Invalid(format!(
                "min_grid {} exceeds max_grid {}",
                self.min_grid, self.max_grid
            )));
        }
        if !self.circular_radius.is_finite() || self.circular_radius <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "circular_radius must be positive, got {}",
                self.circular_radius
            )));
        }
        if self.gif_framerate == 0 {
            return Err(ConfigError::Invalid("gif_framerate must be non-zero".into()));
        }
        if self.gif_size == 0 {
            return Err(ConfigError::Invalid("gif_size must be non-zero".into()));
        }
        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "refresh_interval_secs must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Set the tile size
    pub fn with_tile_size(mut self, size: u32) -> Self {
        self.tile_size = size;
        self
    }

    /// Set the latent dimension
    pub fn with_latent_dim(mut self, dim: usize) -> Self {
        self.latent_dim = dim;
        self
    }

    /// Set the circular interpolation radius
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.circular_radius = radius;
        self
    }

    /// Set animation framerate and duration
    pub fn with_animation(mut self, framerate: u32, duration_secs: u32) -> Self {
        self.gif_framerate = framerate;
        self.gif_duration_secs = duration_secs;
        self
    }

    /// Set the pause between tiles
    pub fn with_tile_yield(mut self, yield_ms: Option<u64>) -> Self {
        self.tile_yield_ms = yield_ms;
        self
    }

    /// Number of animation frames, saturating at `usize::MAX`
    pub fn num_frames(&self) -> usize {
        (self.gif_duration_secs as usize).saturating_mul(self.gif_framerate as usize)
    }

    /// Delay between exported frames (`1000 / framerate` ms)
    pub fn frame_delay(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.gif_framerate.max(1) as u64)
    }

    /// Interval between periodic refreshes
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Yield policy derived from `tile_yield_ms`
    pub fn yield_policy(&self) -> YieldPolicy {
        match self.tile_yield_ms {
            Some(ms) => YieldPolicy::EveryTile(Duration::from_millis(ms)),
            None => YieldPolicy::Never,
        }
    }
}
