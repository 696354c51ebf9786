//! Uploaded image models and storage key naming.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An image stored in the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    /// Storage key, unique per upload
    pub image_id: String,
    /// Public URL of the stored object
    pub image_url: String,
}

/// Outcome of an upload request.
///
/// Serialized untagged, so clients can branch on the presence of `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum UploadResult {
    Uploaded(UploadedImage),
    Failed { error: String },
}

impl UploadResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Storage key for an uploaded original: `<millis>-<name>`.
pub fn upload_key(timestamp_millis: i64, original_name: &str) -> String {
    format!("{}-{}", timestamp_millis, key_segment(original_name))
}

/// Storage key for a crop: `cropped-<millis>-<label>-<image id>`.
pub fn crop_key(timestamp_millis: i64, label: &str, image_id: &str) -> String {
    format!("cropped-{}-{}-{}", timestamp_millis, key_segment(label), image_id)
}

/// Reduce a client-supplied name to one path segment without whitespace.
fn key_segment(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    base.split_whitespace().collect::<Vec<_>>().join("-")
}
