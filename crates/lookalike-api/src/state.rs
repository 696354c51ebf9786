//! Application state.

use std::sync::Arc;

use anyhow::Context;
use lookalike_pipeline::{cancel_pair, CancelHandle, Pipeline, PipelineConfig};
use lookalike_storage::{BlobStore, R2Client};
use lookalike_vision_client::{DetectorClient, SearchClient, VisionConfig};
use tracing::warn;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Pipeline,
    pub storage: Arc<dyn BlobStore>,
    /// Raised on shutdown; every in-flight pipeline call observes it.
    pub shutdown: CancelHandle,
}

impl AppState {
    /// Create application state from injected parts.
    pub fn new(config: ApiConfig, pipeline: Pipeline, storage: Arc<dyn BlobStore>) -> Self {
        let (shutdown, _) = cancel_pair();
        Self {
            config,
            pipeline,
            storage,
            shutdown,
        }
    }

    /// Build the storage and vision clients from the environment.
    pub fn from_env(config: ApiConfig) -> anyhow::Result<Self> {
        let storage: Arc<dyn BlobStore> =
            Arc::new(R2Client::from_env().context("Failed to configure R2 storage")?);

        let vision = VisionConfig::from_env();
        if vision.detector_hash.is_none() {
            warn!("DETECTOR_API_HASH is not set; object results will fail");
        }
        if vision.search_api_key.is_none() {
            warn!("SERPAPI_KEY is not set; visual search will fail");
        }

        let detector = DetectorClient::new(&vision).context("Failed to create detector client")?;
        let search = SearchClient::new(&vision).context("Failed to create search client")?;

        let pipeline = Pipeline::new(
            Arc::clone(&storage),
            Arc::new(detector),
            Arc::new(search),
            PipelineConfig::from_env(),
        );

        Ok(Self::new(config, pipeline, storage))
    }
}
