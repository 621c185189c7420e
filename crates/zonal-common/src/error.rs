//! Error types for grid and layer construction.

use thiserror::Error;

/// Result type alias using CommonError.
pub type CommonResult<T> = Result<T, CommonError>;

/// Errors raised while building grids, layers and extents.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommonError {
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Invalid layer '{layer}': {message}")]
    InvalidLayer { layer: String, message: String },

    #[error("Invalid extent format: {0}. Expected 'minx,miny,maxx,maxy'")]
    InvalidExtentFormat(String),

    #[error("Invalid number in extent: {0}")]
    InvalidExtentNumber(String),
}

impl CommonError {
    /// Create an InvalidGrid error.
    pub fn invalid_grid(msg: impl Into<String>) -> Self {
        Self::InvalidGrid(msg.into())
    }

    /// Create an InvalidLayer error.
    pub fn invalid_layer(layer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidLayer {
            layer: layer.into(),
            message: message.into(),
        }
    }
}
