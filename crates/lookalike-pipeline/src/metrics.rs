//! Pipeline metrics.

use metrics::{counter, histogram};

use crate::error::Stage;

/// Metric names as constants for consistency.
pub mod names {
    pub const UPLOADS_TOTAL: &str = "lookalike_uploads_total";
    pub const OBJECTS_DETECTED_TOTAL: &str = "lookalike_objects_detected_total";
    pub const OBJECTS_DEDUPLICATED_TOTAL: &str = "lookalike_objects_deduplicated_total";
    pub const OBJECTS_FAILED_TOTAL: &str = "lookalike_objects_failed_total";
    pub const RESULT_GROUPS_TOTAL: &str = "lookalike_result_groups_total";
    pub const PRODUCTS_RETURNED_TOTAL: &str = "lookalike_products_returned_total";
    pub const STAGE_DURATION_SECONDS: &str = "lookalike_stage_duration_seconds";
}

/// Record an upload attempt.
pub fn record_upload(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::UPLOADS_TOTAL, &labels).increment(1);
}

/// Record detections before and after de-duplication.
pub fn record_detections(detected: usize, kept: usize) {
    counter!(names::OBJECTS_DETECTED_TOTAL).increment(detected as u64);
    counter!(names::OBJECTS_DEDUPLICATED_TOTAL).increment(detected.saturating_sub(kept) as u64);
}

/// Record an object dropped at `stage`.
pub fn record_object_failed(stage: Stage) {
    let labels = [("stage", stage.as_str().to_string())];
    counter!(names::OBJECTS_FAILED_TOTAL, &labels).increment(1);
}

/// Record the size of a finished result set.
pub fn record_results(operation: &str, groups: usize, products: usize) {
    let labels = [("operation", operation.to_string())];
    counter!(names::RESULT_GROUPS_TOTAL, &labels).increment(groups as u64);
    counter!(names::PRODUCTS_RETURNED_TOTAL, &labels).increment(products as u64);
}

/// Record how long a stage took, whether it succeeded or not.
pub fn record_stage_duration(stage: Stage, duration_secs: f64) {
    let labels = [("stage", stage.as_str().to_string())];
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(duration_secs);
}
