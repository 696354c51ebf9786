//! Result aggregation pipeline.
//!
//! This crate provides:
//! - Image upload with tagged success/failure results
//! - Whole-image visual matches
//! - Per-object detection, cropping, upload and search with partial-failure tolerance
//! - Per-call timeouts and request cancellation
//! - Structured logging and metrics for every stage

pub mod cancel;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;


pub use cancel::{cancel_pair, never_cancelled, CancelHandle, CancelSignal};
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult, Stage};
pub use logging::RequestLogger;
pub use pipeline::{ImageUpload, ObjectOutcome, Pipeline, NO_FILE_UPLOADED, SAVE_FAILED};
