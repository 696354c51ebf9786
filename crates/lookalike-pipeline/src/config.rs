//! Pipeline configuration.

use std::time::Duration;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound for each network call and image operation
    pub call_timeout: Duration,
    /// Maximum detected objects processed at the same time
    pub max_parallel_objects: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            max_parallel_objects: 8,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            call_timeout: Duration::from_secs(
                std::env::var("PIPELINE_CALL_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            max_parallel_objects: std::env::var("PIPELINE_MAX_PARALLEL_OBJECTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(8),
        }
    }
}
