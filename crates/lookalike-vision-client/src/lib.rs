//! Clients for the remote vision services.
//!
//! This crate provides:
//! - [`ObjectDetector`]: clothing object localization over HTTP
//! - [`VisualSearch`]: product visual search (Google Lens engine)
//! - Shared configuration and error types

pub mod config;
pub mod detector;
pub mod error;
pub mod search;

pub use config::VisionConfig;
pub use detector::{DetectorClient, ObjectDetector};
pub use error::{VisionError, VisionResult};
pub use search::{SearchClient, VisualSearch};
