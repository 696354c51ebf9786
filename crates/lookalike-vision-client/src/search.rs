//! Visual product search client (Google Lens engine).

use async_trait::async_trait;
use lookalike_models::{BoundingPoly, Product};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::config::{endpoint, VisionConfig};
use crate::error::{VisionError, VisionResult};

const SERVICE: &str = "visual search";

/// Search engine requested from the search API.
pub const SEARCH_ENGINE: &str = "google_lens";

/// Finds purchasable products that look like an image.
#[async_trait]
pub trait VisualSearch: Send + Sync {
    /// Search with a public image URL, optionally restricted to a region of it.
    async fn search(&self, image_url: &str, crop: Option<&BoundingPoly>) -> VisionResult<Vec<Product>>;

    /// Fail fast when the search cannot run at all (e.g. no API key).
    fn ensure_configured(&self) -> VisionResult<()> {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    visual_matches: Option<Vec<Product>>,
}

/// HTTP client for the `search.json` endpoint.
#[derive(Clone)]
pub struct SearchClient {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl SearchClient {
    /// Create a new search client. A missing API key is reported per call.
    pub fn new(config: &VisionConfig) -> VisionResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| VisionError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint(&config.search_base_url, "search.json")?,
            api_key: config.search_api_key.clone(),
        })
    }

    fn api_key(&self) -> VisionResult<&str> {
        self.api_key
            .as_deref()
            .ok_or(VisionError::MissingCredential("SERPAPI_KEY"))
    }
}

#[async_trait]
impl VisualSearch for SearchClient {
    async fn search(&self, image_url: &str, crop: Option<&BoundingPoly>) -> VisionResult<Vec<Product>> {
        let api_key = self.api_key()?;

        let mut query: Vec<(&str, String)> = vec![
            ("engine", SEARCH_ENGINE.to_string()),
            ("api_key", api_key.to_string()),
            ("url", image_url.to_string()),
        ];
        if let Some(poly) = crop {
            query.push(("crop", poly.crop_param()));
        }

        debug!(cropped = crop.is_some(), "Requesting visual matches for {}", image_url);

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&query)
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

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| VisionError::invalid_response(SERVICE, e.without_url().to_string()))?;

        let products = parsed.visual_matches.unwrap_or_default();
        info!("Found {} visual matches for {}", products.len(), image_url);
        Ok(products)
    }

    fn ensure_configured(&self) -> VisionResult<()> {
        self.api_key().map(|_| ())
    }
}
