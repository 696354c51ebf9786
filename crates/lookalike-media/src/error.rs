//! Error types for media operations.

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while cropping images.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Invalid bounding polygon: expected 4 vertices, got {0}")]
    InvalidPolygon(usize),

    #[error("Degenerate crop region: {width}x{height} px")]
    DegenerateRegion { width: i64, height: i64 },

    #[error("Crop region ({left}, {top}, {width}x{height}) exceeds image bounds {image_width}x{image_height}")]
    OutOfBounds {
        left: i64,
        top: i64,
        width: i64,
        height: i64,
        image_width: u32,
        image_height: u32,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create a decode failure error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Create an encode failure error.
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
