//! Error types for zonal aggregation.

use thiserror::Error;
use zonal_common::CommonError;

/// Errors that can occur while loading inputs, aggregating, or writing.
#[derive(Error, Debug)]
pub enum ZonalError {
    /// Invalid setup detected before any feature is processed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Raster or vector input could not be read or parsed.
    #[error("source error: {0}")]
    Source(String),

    /// A single feature could not be aggregated.
    #[error("geometry error in feature {feature}: {message}")]
    Geometry { feature: usize, message: String },

    /// Output features could not be persisted.
    #[error("write error: {0}")]
    Write(String),

    /// The run was cancelled between features.
    #[error("aggregation cancelled")]
    Cancelled,
}

impl ZonalError {
    /// Create a Configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a Source error.
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Create a Geometry error for the feature at `feature`.
    pub fn geometry(feature: usize, message: impl Into<String>) -> Self {
        Self::Geometry {
            feature,
            message: message.into(),
        }
    }

    /// Create a Write error.
    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }

    /// Whether this error only affects a single feature.
    pub fn is_per_feature(&self) -> bool {
        matches!(self, Self::Geometry { .. })
    }
}

impl From<CommonError> for ZonalError {
    fn from(err: CommonError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<std::io::Error> for ZonalError {
    fn from(err: std::io::Error) -> Self {
        Self::Source(err.to_string())
    }
}

impl From<serde_json::Error> for ZonalError {
    fn from(err: serde_json::Error) -> Self {
        Self::Source(err.to_string())
    }
}

impl From<geojson::Error> for ZonalError {
    fn from(err: geojson::Error) -> Self {
        Self::Source(err.to_string())
    }
}

/// Result type for zonal aggregation operations.
pub type Result<T> = std::result::Result<T, ZonalError>;
