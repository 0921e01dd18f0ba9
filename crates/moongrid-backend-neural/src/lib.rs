//! Moongrid Neural Backend
//!
//! Implementations of the `InferenceBackend` contract from
//! `moongrid-pipeline`.
//!
//! - [`PaletteBackend`]: procedural gradients, no model files. Used for
//!   demos, previews and tests.
//! - `OnnxBackend`: the two-stage mapping and synthesis networks, run with
//!   tract.
//!
//! # Features
//!
//! - `onnx`: Enable the tract-based ONNX backend

#[cfg(feature = "onnx")]
pub mod onnx;
pub mod palette;

// Re-export commonly used types
#[cfg(feature = "onnx")]
pub use onnx::OnnxBackend;
pub use palette::PaletteBackend;
