//! Upload, detection, cropping and search orchestration.

use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use lookalike_media::{crop_image_blocking_task, CROP_CONTENT_TYPE};
use lookalike_models::{
    crop_key, dedup_by_left_edge, upload_key, DetectedObject, ResultGroup, ResultGroups,
    TaggedProduct, UploadResult, UploadedImage, INITIAL_CATEGORY,
};
use lookalike_storage::BlobStore;
use lookalike_vision_client::{ObjectDetector, VisualSearch};
use tokio::sync::Semaphore;
use tracing::{debug, Instrument};

use crate::cancel::{cancelled, is_cancelled, CancelSignal};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult, Stage};
use crate::logging::RequestLogger;
use crate::metrics;

/// Error returned when the upload request carries no file.
pub const NO_FILE_UPLOADED: &str = "No file uploaded";

/// Error returned when the file could not be stored.
pub const SAVE_FAILED: &str = "Failed to save the file";

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A file received from the client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Client-side file name
    pub file_name: String,
    /// MIME type as declared by the client
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Result of one detected object's sub-pipeline.
#[derive(Debug)]
pub enum ObjectOutcome {
    /// Cropped, uploaded and searched
    Done(ResultGroup),
    /// Dropped at `stage`
    Failed {
        label: String,
        stage: Stage,
        error: PipelineError,
    },
}

/// The result aggregation pipeline.
///
/// Built once at startup from injected clients and shared by all requests.
#[derive(Clone)]
pub struct Pipeline {
    store: Arc<dyn BlobStore>,
    detector: Arc<dyn ObjectDetector>,
    search: Arc<dyn VisualSearch>,
    config: PipelineConfig,
    /// Last timestamp handed out for a crop key; shared by clones.
    last_crop_stamp: Arc<AtomicI64>,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn BlobStore>,
        detector: Arc<dyn ObjectDetector>,
        search: Arc<dyn VisualSearch>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            detector,
            search,
            config,
            last_crop_stamp: Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Store an uploaded image under `<millis>-<name>`.
    ///
    /// Never fails: problems are reported through [`UploadResult::Failed`].
    pub async fn upload(&self, file: Option<ImageUpload>) -> UploadResult {
        let file = match file {
            Some(file) if !file.bytes.is_empty() => file,
            _ => {
                metrics::record_upload("no_file");
                return UploadResult::failed(NO_FILE_UPLOADED);
            }
        };

        let image_id = upload_key(Utc::now().timestamp_millis(), &file.file_name);
        let content_type = file
            .content_type
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        let logger = RequestLogger::new(&image_id, "upload");
        logger.log_start(&format!("{} bytes ({})", file.bytes.len(), content_type));

        let started = Instant::now();
        let result = tokio::time::timeout(
            self.config.call_timeout,
            self.store.put(&image_id, file.bytes, &content_type),
        )
        .await;
        metrics::record_stage_duration(Stage::Upload, started.elapsed().as_secs_f64());

        match result {
            Ok(Ok(image_url)) => {
                metrics::record_upload("stored");
                logger.log_completion(&image_url);
                UploadResult::Uploaded(UploadedImage {
                    image_id,
                    image_url,
                })
            }
            Ok(Err(e)) => {
                metrics::record_upload("failed");
                logger.log_error(&format!("Error saving file to storage: {}", e));
                UploadResult::failed(SAVE_FAILED)
            }
            Err(_) => {
                metrics::record_upload("failed");
                logger.log_error(&format!("Storage write timed out after {:?}", self.config.call_timeout));
                UploadResult::failed(SAVE_FAILED)
            }
        }
    }

    /// Visual matches for the whole uploaded image.
    ///
    /// Every product is tagged `"Initial"` with the original image URL. Any
    /// failure is returned as is; there is no partial result.
    pub async fn get_initial_results(
        &self,
        image_id: &str,
        cancel: &CancelSignal,
    ) -> PipelineResult<Vec<TaggedProduct>> {
        let logger = RequestLogger::new(image_id, "initial_results");
        let span = logger.create_span();
        self.initial_results(image_id, cancel, &logger)
            .instrument(span)
            .await
    }

    async fn initial_results(
        &self,
        image_id: &str,
        cancel: &CancelSignal,
        logger: &RequestLogger,
    ) -> PipelineResult<Vec<TaggedProduct>> {
        logger.log_start("searching whole image");
        let image_url = self.store.public_url(image_id);

        let products = self
            .step(Stage::Search, cancel, self.search.search(&image_url, None))
            .await
            .inspect_err(|e| logger.log_error(&e.to_string()))?;

        let tagged: Vec<TaggedProduct> = products
            .into_iter()
            .map(|p| p.tagged(INITIAL_CATEGORY, &image_url))
            .collect();

        metrics::record_results("initial_results", 1, tagged.len());
        logger.log_completion(&format!("{} products", tagged.len()));
        Ok(tagged)
    }

    /// Visual matches for each distinct detected object, one group per object.
    ///
    /// Configuration, detection and download errors are fatal. A failure
    /// while cropping, uploading or searching one object only drops that
    /// object. Groups keep the order of the de-duplicated detections.
    pub async fn get_detected_object_results(
        &self,
        image_id: &str,
        cancel: &CancelSignal,
    ) -> PipelineResult<Vec<ResultGroup>> {
        let logger = RequestLogger::new(image_id, "detected_objects");
        let span = logger.create_span();
        self.detected_object_results(image_id, cancel, &logger)
            .instrument(span)
            .await
    }

    async fn detected_object_results(
        &self,
        image_id: &str,
        cancel: &CancelSignal,
        logger: &RequestLogger,
    ) -> PipelineResult<Vec<ResultGroup>> {
        self.search.ensure_configured()?;

        let image_url = self.store.public_url(image_id);
        logger.log_start(&format!("detecting objects in {}", image_url));

        let detected = self
            .step(Stage::Detect, cancel, self.detector.detect(&image_url))
            .await
            .inspect_err(|e| logger.log_error(&e.to_string()))?;

        let detected_count = detected.len();
        let objects = dedup_by_left_edge(detected);
        metrics::record_detections(detected_count, objects.len());
        logger.log_progress(&format!(
            "{} objects detected, {} after de-duplication",
            detected_count,
            objects.len()
        ));

        if objects.is_empty() {
            metrics::record_results("detected_objects", 0, 0);
            logger.log_completion("no objects to search");
            return Ok(Vec::new());
        }

        let source: Arc<[u8]> = self
            .step(Stage::Download, cancel, self.store.fetch(image_id))
            .await
            .inspect_err(|e| logger.log_error(&e.to_string()))?
            .into();

        let permits = Semaphore::new(self.config.max_parallel_objects.max(1));
        let tasks = objects.into_iter().map(|object| {
            self.process_object(image_id, object, Arc::clone(&source), &permits, cancel, logger)
        });
        let outcomes = join_all(tasks).await;

        if is_cancelled(cancel) {
            logger.log_error("cancelled while processing objects");
            return Err(PipelineError::Cancelled);
        }

        let groups = outcomes
            .into_iter()
            .fold(ResultGroups::new(), |mut groups, outcome| {
                match outcome {
                    ObjectOutcome::Done(group) => groups.insert_group(group),
                    ObjectOutcome::Failed { label, stage, error } => {
                        metrics::record_object_failed(stage);
                        logger.log_warning(&format!(
                            "dropping object {} after {} failure: {}",
                            label, stage, error
                        ));
                    }
                }
                groups
            })
            .into_vec();

        let product_count: usize = groups.iter().map(|g| g.products.len()).sum();
        metrics::record_results("detected_objects", groups.len(), product_count);
        logger.log_completion(&format!("{} groups, {} products", groups.len(), product_count));
        Ok(groups)
    }

    /// All per-object products in one list, in group order.
    pub async fn get_visual_matches(
        &self,
        image_id: &str,
        cancel: &CancelSignal,
    ) -> PipelineResult<Vec<TaggedProduct>> {
        let groups = self.get_detected_object_results(image_id, cancel).await?;
        Ok(ResultGroup::flatten(groups))
    }

    /// Crop, upload and search one object.
    async fn process_object(
        &self,
        image_id: &str,
        object: DetectedObject,
        source: Arc<[u8]>,
        permits: &Semaphore,
        cancel: &CancelSignal,
        logger: &RequestLogger,
    ) -> ObjectOutcome {
        let label = object.label.clone();
        match self.run_object(image_id, object, source, permits, cancel, logger).await {
            Ok(group) => ObjectOutcome::Done(group),
            Err((stage, error)) => ObjectOutcome::Failed { label, stage, error },
        }
    }

    async fn run_object(
        &self,
        image_id: &str,
        object: DetectedObject,
        source: Arc<[u8]>,
        permits: &Semaphore,
        cancel: &CancelSignal,
        logger: &RequestLogger,
    ) -> Result<ResultGroup, (Stage, PipelineError)> {
        let _permit = permits
            .acquire()
            .await
            .map_err(|_| (Stage::Crop, PipelineError::internal("object permits closed")))?;

        let label = object.label;

        let crop = self
            .step(Stage::Crop, cancel, crop_image_blocking_task(source, object.bounding_poly))
            .await
            .map_err(|e| (Stage::Crop, e))?;
        debug!(label = %label, width = crop.width, height = crop.height, "Object cropped");

        let key = crop_key(self.next_crop_stamp(), &label, image_id);
        let crop_url = self
            .step(Stage::Upload, cancel, self.store.put(&key, crop.bytes, CROP_CONTENT_TYPE))
            .await
            .map_err(|e| (Stage::Upload, e))?;
        debug!(label = %label, url = %crop_url, "Crop uploaded");

        let products = self
            .step(Stage::Search, cancel, self.search.search(&crop_url, None))
            .await
            .map_err(|e| (Stage::Search, e))?;

        logger.log_progress(&format!("{}: {} products", label, products.len()));

        let mut group = ResultGroup::new(&label, &crop_url);
        group.products = products
            .into_iter()
            .map(|p| p.tagged(&label, &crop_url))
            .collect();
        Ok(group)
    }

    /// Current time in millis, bumped past the last value handed out, so
    /// concurrent crops of the same label never share a key.
    pub(crate) fn next_crop_stamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let prev = self
            .last_crop_stamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(prev + 1)
    }

    /// Run one suspension point under the call timeout, racing cancellation.
    async fn step<T, E, F>(&self, stage: Stage, cancel: &CancelSignal, fut: F) -> PipelineResult<T>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<PipelineError>,
    {
        if is_cancelled(cancel) {
            return Err(PipelineError::Cancelled);
        }

        let mut cancel = cancel.clone();
        let after = self.config.call_timeout;
        let started = Instant::now();

        let result = tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => Err(PipelineError::Cancelled),
            res = tokio::time::timeout(after, fut) => match res {
                Ok(r) => r.map_err(Into::into),
                Err(_) => Err(PipelineError::Timeout { stage, after }),
            },
        };

        metrics::record_stage_duration(stage, started.elapsed().as_secs_f64());
        result
    }
}
