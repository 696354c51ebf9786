//! Object detection client.

use async_trait::async_trait;
use lookalike_models::DetectedObject;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{endpoint, VisionConfig};
use crate::error::{VisionError, VisionResult};

const SERVICE: &str = "object detection";

/// Finds clothing objects in a publicly reachable image.
#[async_trait]
pub trait ObjectDetector: Send + Sync {
    /// Detect objects. An empty list means nothing was found.
    async fn detect(&self, image_url: &str) -> VisionResult<Vec<DetectedObject>>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectRequest<'a> {
    image_url: &'a str,
    hash: &'a str,
}

/// HTTP client for the `/api/vision` detection endpoint.
#[derive(Clone)]
pub struct DetectorClient {
    client: Client,
    endpoint: Url,
    hash: Option<String>,
}

impl DetectorClient {
    /// Create a new detector client.
    pub fn new(config: &VisionConfig) -> VisionResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| VisionError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint(&config.detector_base_url, "api/vision")?,
            hash: config.detector_hash.clone(),
        })
    }
}

#[async_trait]
impl ObjectDetector for DetectorClient {
    async fn detect(&self, image_url: &str) -> VisionResult<Vec<DetectedObject>> {
        let hash = self
            .hash
            .as_deref()
            .ok_or(VisionError::MissingCredential("DETECTOR_API_HASH"))?;

        debug!("Requesting object detection for {}", image_url);

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/json, text/plain, */*")
            .json(&DetectRequest { image_url, hash })
            .send()
            .await
            .map_err(|e| VisionError::from_reqwest(SERVICE, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::UpstreamStatus {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| VisionError::invalid_response(SERVICE, e.to_string()))?;

        let objects = parse_annotations(&body);

        info!("Detected {} objects in {}", objects.len(), image_url);
        Ok(objects)
    }
}

/// Objects from the first element's `localizedObjectAnnotations`.
///
/// A body that is not an array, a null first element or a missing field all
/// mean nothing was found. Annotations that do not parse are skipped.
fn parse_annotations(body: &Value) -> Vec<DetectedObject> {
    let annotations = match body
        .get(0)
        .and_then(|first| first.get("localizedObjectAnnotations"))
        .and_then(Value::as_array)
    {
        Some(annotations) => annotations,
        None => return Vec::new(),
    };

    annotations
        .iter()
        .filter_map(|annotation| {
            serde_json::from_value::<DetectedObject>(annotation.clone())
                .inspect_err(|e| warn!("Skipping malformed annotation: {}", e))
                .ok()
        })
        .collect()
}
