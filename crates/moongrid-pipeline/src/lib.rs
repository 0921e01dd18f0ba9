//! Moongrid Pipeline - Render Orchestration
//!
//! This crate drives an injected inference backend over the latent grids
//! from `moongrid-core`: one inference call per tile, composited into a
//! mosaic, for still refreshes and for looping animations.
//!
//! # Pipeline Architecture
//!
//! ```text
//!                  ┌── refresh(phase) ──▶ MosaicSink
//! Session ─▶ TileDriver ─▶ InferenceBackend
//!                  └── animate() ───────▶ FrameSink (frame order)
//! ```
//!
//! Tiles are awaited one at a time; the backend never sees two requests in
//! flight. A [`YieldPolicy`] decides whether the driver hands control back
//! to the runtime between tiles.

pub mod animation;
pub mod config;
pub mod driver;
pub mod inference;
pub mod scheduler;
pub mod session;

// Re-export commonly used types
pub use animation::{AnimationPlan, AnimationProgress, BaseGrids, FrameSink, render_animation};
pub use config::{ConfigError, EngineConfig, YieldPolicy};
pub use driver::{RenderError, TileDriver};
pub use inference::{InferenceBackend, InferenceError};
pub use scheduler::{RefreshScheduler, RefreshStats};
pub use session::{AnimationOutcome, MosaicSink, RefreshOutcome, Session, SessionState};
