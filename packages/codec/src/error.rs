//! Error types for depth codec operations.

use thiserror::Error;

/// Errors that can occur while configuring or running a depth codec.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Integer depth bounds are empty or inverted.
    #[error("invalid depth range: min {min_value} must be below max {max_value}")]
    InvalidRange { min_value: u32, max_value: u32 },

    /// Real-world distances cannot be mapped onto the sensor's depth domain.
    #[error("invalid distance range: {0}")]
    InvalidDistance(String),

    /// Buffer or image sizes disagree.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// Invalid parameter passed to a codec constructor.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// Stream descriptor carries a version this build does not understand.
    #[error("unsupported stream descriptor version {0}")]
    UnsupportedVersion(u32),

    /// Stream descriptor could not be serialized or parsed.
    #[error("stream descriptor error: {0}")]
    Descriptor(String),
}

impl CodecError {
    /// Create an InvalidParam error with a message.
    pub fn invalid_param(msg: impl Into<String>) -> Self {
        Self::InvalidParam(msg.into())
    }

    /// Create an InvalidDistance error with a message.
    pub fn invalid_distance(msg: impl Into<String>) -> Self {
        Self::InvalidDistance(msg.into())
    }

    /// Shape mismatch between two `width x height` grids.
    pub fn dimensions(expected: (u32, u32), actual: (u32, u32)) -> Self {
        Self::ShapeMismatch {
            expected: format!("{}x{}", expected.0, expected.1),
            actual: format!("{}x{}", actual.0, actual.1),
        }
    }

    /// Shape mismatch on raw buffer length.
    pub fn buffer_len(expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            expected: format!("{expected} elements"),
            actual: format!("{actual} elements"),
        }
    }
}
