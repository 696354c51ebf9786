//! Structured request logging utilities.
//!
//! Provides consistent, structured logging for pipeline operations with
//! tracing spans and contextual information.

use tracing::{error, info, warn, Span};

/// Logger for one pipeline operation on one uploaded image.
///
/// Every line carries the image id and the operation name so that the
/// interleaved output of concurrent per-object tasks can be told apart.
#[derive(Debug, Clone)]
pub struct RequestLogger {
    image_id: String,
    operation: String,
}

impl RequestLogger {
    /// Create a new logger.
    ///
    /// # Arguments
    /// * `image_id` - Storage key of the uploaded image
    /// * `operation` - The operation (e.g., "initial_results", "detected_objects")
    pub fn new(image_id: &str, operation: &str) -> Self {
        Self {
            image_id: image_id.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Log the start of an operation.
    pub fn log_start(&self, message: &str) {
        info!(
            image_id = %self.image_id,
            operation = %self.operation,
            "Started: {}", message
        );
    }

    /// Log progress of an operation.
    pub fn log_progress(&self, message: &str) {
        info!(
            image_id = %self.image_id,
            operation = %self.operation,
            "Progress: {}", message
        );
    }

    /// Log a recovered failure.
    pub fn log_warning(&self, message: &str) {
        warn!(
            image_id = %self.image_id,
            operation = %self.operation,
            "Warning: {}", message
        );
    }

    /// Log a failure that ends the operation.
    pub fn log_error(&self, message: &str) {
        error!(
            image_id = %self.image_id,
            operation = %self.operation,
            "Failed: {}", message
        );
    }

    /// Log the completion of an operation.
    pub fn log_completion(&self, message: &str) {
        info!(
            image_id = %self.image_id,
            operation = %self.operation,
            "Completed: {}", message
        );
    }

    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Create a tracing span for this operation.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "pipeline",
            image_id = %self.image_id,
            operation = %self.operation
        )
    }
}
