//! Vision client configuration.

use std::time::Duration;

use url::Url;

use crate::error::{VisionError, VisionResult};

/// Default detection service host.
pub const DEFAULT_DETECTOR_BASE_URL: &str = "https://dupe.com";

/// Default visual search host.
pub const DEFAULT_SEARCH_BASE_URL: &str = "https://serpapi.com";

/// Configuration shared by the detector and search clients.
///
/// Credentials are optional here: a missing credential only fails the
/// calls that need it.
#[derive(Clone)]
pub struct VisionConfig {
    /// Detection service base URL
    pub detector_base_url: String,
    /// Credential sent as `hash` in detection requests
    pub detector_hash: Option<String>,
    /// Visual search base URL
    pub search_base_url: String,
    /// Visual search API key
    pub search_api_key: Option<String>,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            detector_base_url: DEFAULT_DETECTOR_BASE_URL.to_string(),
            detector_hash: None,
            search_base_url: DEFAULT_SEARCH_BASE_URL.to_string(),
            search_api_key: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl std::fmt::Debug for VisionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionConfig")
            .field("detector_base_url", &self.detector_base_url)
            .field("detector_hash", &self.detector_hash.as_ref().map(|_| "<set>"))
            .field("search_base_url", &self.search_base_url)
            .field("search_api_key", &self.search_api_key.as_ref().map(|_| "<set>"))
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl VisionConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            detector_base_url: std::env::var("DETECTOR_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_DETECTOR_BASE_URL.to_string()),
            detector_hash: non_empty_var("DETECTOR_API_HASH"),
            search_base_url: std::env::var("SEARCH_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_SEARCH_BASE_URL.to_string()),
            search_api_key: non_empty_var("SERPAPI_KEY"),
            request_timeout: Duration::from_secs(
                std::env::var("PIPELINE_CALL_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Join a base URL and a path, validating the result.
pub(crate) fn endpoint(base: &str, path: &str) -> VisionResult<Url> {
    let raw = format!("{}/{}", base.trim_end_matches('/'), path);
    Url::parse(&raw).map_err(|e| VisionError::Config(format!("invalid endpoint {}: {}", raw, e)))
}
