//! Shared data models for the Lookalike backend.
//!
//! This crate provides Serde-serializable types for:
//! - Detected objects and their normalized bounding polygons
//! - Products returned by visual search, tagged with their origin
//! - Result groups (one per detected object)
//! - Upload results and storage key naming

pub mod detection;
pub mod product;
pub mod result_group;
pub mod upload;

// Re-export common types
pub use detection::{dedup_by_left_edge, BoundingPoly, DetectedObject, NormalizedVertex};
pub use product::{
    sort_by_price, Price, PriceSort, Product, TaggedProduct, INITIAL_CATEGORY,
    PRICE_NOT_AVAILABLE,
};
pub use result_group::{ResultGroup, ResultGroups};
pub use upload::{crop_key, upload_key, UploadResult, UploadedImage};
