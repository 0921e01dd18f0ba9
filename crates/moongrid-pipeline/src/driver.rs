//! Tiled render driver
//!
//! Walks the tile mosaic in row-major order. For each tile it interpolates a
//! latent vector from the current grid, awaits the backend, and composites
//! the returned tile. Tiles never overlap, so the finished mosaic does not
//! depend on how the walk is interleaved with other tasks.

use std::time::Instant;

use moongrid_core::interpolate::bilinear_into;
use moongrid_core::{CoreError, GridPosition, LatentGrid, LatentVector, MosaicFrame, TileLayout};
use thiserror::Error;
use tracing::{Instrument, Level, debug, span, trace};

use crate::config::{ConfigError, YieldPolicy};
use crate::inference::{InferenceBackend, InferenceError, check_tile};

/// Render errors
#[derive(Debug, Error)]
pub enum RenderError {
    /// The output surface could not be created
    #[error("Rendering surface unavailable: {0}")]
    ContextUnavailable(String),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A presentation or export sink failed
    #[error("Sink error: {0}")]
    Sink(String),
}

/// Drives one backend over a tile mosaic
pub struct TileDriver<B> {
    backend: B,
    yield_policy: YieldPolicy,
    tiles_rendered: u64,
}

impl<B: InferenceBackend> TileDriver<B> {
    /// Create a driver around `backend`
    pub fn new(backend: B, yield_policy: YieldPolicy) -> Self {
        Self {
            backend,
            yield_policy,
            tiles_rendered: 0,
        }
    }

    /// Borrow the backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutably borrow the backend
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Current yield policy
    pub fn yield_policy(&self) -> YieldPolicy {
        self.yield_policy
    }

    /// Total tiles rendered over the driver's lifetime
    pub fn tiles_rendered(&self) -> u64 {
        self.tiles_rendered
    }

    /// Render a full mosaic from `grid`.
    ///
    /// Any inference failure aborts the mosaic; partial mosaics are never
    /// returned.
    pub async fn render(
        &mut self,
        grid: &LatentGrid,
        layout: TileLayout,
    ) -> Result<MosaicFrame, RenderError> {
        let span = span!(
            Level::DEBUG,
            "render_mosaic",
            cols = layout.cols,
            rows = layout.rows,
            backend = self.backend.name()
        );
        self.render_tiles(grid, layout).instrument(span).await
    }

    async fn render_tiles(
        &mut self,
        grid: &LatentGrid,
        layout: TileLayout,
    ) -> Result<MosaicFrame, RenderError> {
        if !self.backend.is_ready() {
            return Err(InferenceError::ModelNotLoaded.into());
        }
        let dim = self.backend.latent_dim();
        if grid.dim() != dim {
            return Err(CoreError::DimensionMismatch {
                expected: dim,
                actual: grid.dim(),
            }
            .into());
        }

        let tile_size = self.backend.tile_size();
        let mut frame = MosaicFrame::for_layout(layout, tile_size)
            .map_err(|e| RenderError::ContextUnavailable(e.to_string()))?;

        let start = Instant::now();
        // One accumulator for the whole mosaic; bilinear_into overwrites it per tile.
        let mut latent = LatentVector::zeros(dim);

        for (tile_x, tile_y) in layout.tiles() {
            let pos = GridPosition::for_tile(grid, layout, tile_x, tile_y);
            bilinear_into(grid, pos, &mut latent)?;

            let tile = self.backend.infer(&latent).await?;
            check_tile(&tile, tile_size)?;
            frame.write_tile(&tile, tile_x, tile_y)?;
            self.tiles_rendered += 1;
            trace!(tile_x, tile_y, "Tile rendered");

            self.yield_policy.pause().await;
        }

        debug!(
            tiles = layout.tile_count(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Mosaic completed"
        );
        Ok(frame)
    }
}
