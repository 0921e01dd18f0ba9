//! Provenance features
//!
//! Two uniform draws, taken before any grid is sampled, decide the shape of
//! a run: how many tiles per mosaic side and how many control points per
//! grid side. They are published once at startup so a run can be classified
//! and reproduced.

use serde::{Deserialize, Serialize};

use crate::output::TileLayout;
use crate::rng::{LatentRng, UniformSource};

/// Default minimum grid side
pub const MIN_NUM_GRID: u32 = 2;

/// Default maximum grid side
pub const MAX_NUM_GRID: u32 = 7;

/// Features record for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Features {
    /// Mosaic tiles per side
    #[serde(rename = "Grid")]
    pub grid_resolution: u32,
    /// Latent control points per grid side
    #[serde(rename = "Phases")]
    pub num_phases: u32,
}

impl Features {
    /// Derive features from two draws
    pub fn from_draws(side_draw: f64, grid_draw: f64, min_grid: u32, max_grid: u32) -> Self {
        Self {
            grid_resolution: num_side(side_draw),
            num_phases: num_grid(grid_draw, min_grid, max_grid),
        }
    }

    /// Take the next two draws from `rng`
    pub fn draw<S: UniformSource>(rng: &mut LatentRng<S>, min_grid: u32, max_grid: u32) -> Self {
        let side_draw = rng.sample();
        let grid_draw = rng.sample();
        Self::from_draws(side_draw, grid_draw, min_grid, max_grid)
    }

    /// Square mosaic layout for this run
    pub fn tile_layout(&self) -> TileLayout {
        TileLayout::square(self.grid_resolution)
    }
}

/// Mosaic tiles per side: `> 0.5 → 20`, `> 0.2 → 24`, otherwise `32`
pub fn num_side(draw: f64) -> u32 {
    if draw > 0.5 {
        20
    } else if draw > 0.2 {
        24
    } else {
        32
    }
}

/// Grid side in `[min_grid, max_grid]`: `round(draw · (max - min)) + min`
pub fn num_grid(draw: f64, min_grid: u32, max_grid: u32) -> u32 {
    let span = max_grid.saturating_sub(min_grid) as f64;
    let offset = (draw.clamp(0.0, 1.0) * span).round() as u32;
    offset + min_grid
}
