//! Moongrid Core - latent grids and interpolation
//!
//! Moongrid renders deterministic generative mosaics by walking a seeded grid
//! of latent vectors and handing one interpolated vector per tile to an image
//! synthesis model.
//!
//! # Data flow
//!
//! ```text
//! seed ─▶ LatentRng ─▶ Features ─▶ grids A, B, C
//!                                     │
//!                    CircularInterpolator(l)
//!                                     │
//!                                     ▼
//!                      grid ─▶ bilinear per tile ─▶ model ─▶ MosaicFrame
//! ```
//!
//! This crate holds the pure, synchronous parts: random sources, latent
//! vectors and grids, both interpolation schemes, the features record, the
//! moon phase clock and the mosaic frame. Model execution and scheduling live
//! in `moongrid-pipeline`.

pub mod error;
pub mod features;
pub mod interpolate;
pub mod latent;
pub mod moon;
pub mod output;
pub mod rng;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use features::Features;
pub use interpolate::{BilinearWeights, CircularInterpolator, GridPosition, bilinear, bilinear_into};
pub use latent::{LatentGrid, LatentVector};
pub use moon::{MoonPhaseLabel, moon_phase};
pub use output::{MosaicFrame, TileLayout, TileTensor};
pub use rng::{LatentRng, RngSource, SeededSource, Sfc32Source, UniformSource};
