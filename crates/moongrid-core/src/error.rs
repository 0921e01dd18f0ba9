//! Error types for grid construction, interpolation and mosaics

use thiserror::Error;

/// Core errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// Two vectors that must share a dimension do not
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Latent vectors must have at least one component
    #[error("Latent dimension must be non-zero")]
    ZeroDimension,

    /// Interpolation needs at least a 2x2 grid of control points
    #[error("Grid too small: {cols}x{rows} (minimum is 2x2)")]
    GridTooSmall { cols: usize, rows: usize },

    /// Grids used together must have identical shapes
    #[error("Grid shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },

    /// Number of cells does not match the declared grid shape
    #[error("Grid expects {expected} cells, got {actual}")]
    CellCount { expected: usize, actual: usize },

    /// Circular interpolation radius must be finite and positive
    #[error("Invalid interpolation radius: {0}")]
    InvalidRadius(f32),

    /// Token hash could not be decoded into generator state
    #[error("Invalid token hash: {0}")]
    InvalidHash(String),

    /// A mosaic needs at least one tile of at least one pixel
    #[error("Mosaic has no pixels")]
    EmptyMosaic,

    /// Requested surface does not fit in memory addressing
    #[error("Surface too large: {width}x{height}")]
    SurfaceTooLarge { width: u64, height: u64 },

    /// Tile lands outside the mosaic
    #[error("Tile ({x}, {y}) is outside the mosaic")]
    TileOutOfBounds { x: u32, y: u32 },

    /// Tile tensor data length does not match its declared size
    #[error("Tile data has {actual} values, expected {expected}")]
    TileData { expected: usize, actual: usize },
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
