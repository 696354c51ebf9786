//! Pipeline error types.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// A suspension point of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Object detection call
    Detect,
    /// Reading the original image back from storage
    Download,
    /// Decode, crop and encode
    Crop,
    /// Storage write
    Upload,
    /// Visual search call
    Search,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Detect => "detect",
            Stage::Download => "download",
            Stage::Crop => "crop",
            Stage::Upload => "upload",
            Stage::Search => "search",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Storage error: {0}")]
    Storage(#[from] lookalike_storage::StorageError),

    #[error("Vision service error: {0}")]
    Vision(#[from] lookalike_vision_client::VisionError),

    #[error("Media error: {0}")]
    Media(#[from] lookalike_media::MediaError),

    #[error("{stage} step timed out after {after:?}")]
    Timeout { stage: Stage, after: Duration },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error comes from missing or invalid configuration.
    pub fn is_config(&self) -> bool {
        match self {
            Self::Vision(e) => e.is_config(),
            Self::Storage(lookalike_storage::StorageError::ConfigError(_)) => true,
            _ => false,
        }
    }
}
