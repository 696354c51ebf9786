//! API integration tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{Body, HttpBody};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use lookalike_api::{create_router, ApiConfig, AppState};
use lookalike_models::{BoundingPoly, DetectedObject, Price, Product};
use lookalike_pipeline::{Pipeline, PipelineConfig};
use lookalike_storage::{join_public_url, BlobStore, StorageError, StorageResult};
use lookalike_vision_client::{ObjectDetector, VisionError, VisionResult, VisualSearch};
use serde_json::Value;
use tower::ServiceExt;

const PUBLIC_BASE: &str = "https://cdn.test";
const BOUNDARY: &str = "lookalike-test-boundary";

#[derive(Default)]
struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fail_puts: bool,
    unreachable: bool,
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn put(&self, key: &str, data: Vec<u8>, _content_type: &str) -> StorageResult<String> {
        if self.fail_puts {
            return Err(StorageError::upload_failed("bucket unavailable"));
        }
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(self.public_url(key))
    }

    async fn fetch(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(key))
    }

    fn public_url(&self, key: &str) -> String {
        join_public_url(PUBLIC_BASE, key)
    }

    async fn check_connectivity(&self) -> StorageResult<()> {
        if self.unreachable {
            return Err(StorageError::AwsSdk("connection refused".to_string()));
        }
        Ok(())
    }
}

/// `None` fails every call with an upstream error.
struct StaticDetector(Option<Vec<DetectedObject>>);

#[async_trait]
impl ObjectDetector for StaticDetector {
    async fn detect(&self, _image_url: &str) -> VisionResult<Vec<DetectedObject>> {
        self.0.clone().ok_or(VisionError::UpstreamStatus {
            service: "object detection",
            status: 500,
            body: "boom".to_string(),
        })
    }
}

struct StaticSearch {
    configured: bool,
}

#[async_trait]
impl VisualSearch for StaticSearch {
    async fn search(&self, _image_url: &str, _crop: Option<&BoundingPoly>) -> VisionResult<Vec<Product>> {
        self.ensure_configured()?;
        Ok(vec![
            product("Mid", Some(30.0)),
            product("Unpriced", None),
            product("Cheap", Some(10.0)),
        ])
    }

    fn ensure_configured(&self) -> VisionResult<()> {
        if !self.configured {
            return Err(VisionError::MissingCredential("SERPAPI_KEY"));
        }
        Ok(())
    }
}

fn product(title: &str, price: Option<f64>) -> Product {
    Product {
        title: title.to_string(),
        link: format!("https://shop.test/{}", title),
        thumbnail: String::new(),
        source: "Shop".to_string(),
        price: price.map(|p| Price {
            display_value: Some(format!("${}", p)),
            numeric_value: Some(p),
            currency: Some("$".to_string()),
        }),
    }
}

fn state_with(store: MemoryStore, detector: StaticDetector, search: StaticSearch) -> AppState {
    let store: Arc<dyn BlobStore> = Arc::new(store);
    let pipeline = Pipeline::new(
        Arc::clone(&store),
        Arc::new(detector),
        Arc::new(search),
        PipelineConfig::default(),
    );
    AppState::new(ApiConfig::default(), pipeline, store)
}

fn default_state() -> AppState {
    state_with(
        MemoryStore::default(),
        StaticDetector(Some(vec![])),
        StaticSearch { configured: true },
    )
}

fn router(state: AppState) -> Router {
    create_router(state, None)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn multipart_request(field: &str, file_name: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"{n}\"\r\nContent-Type: image/jpeg\r\n\r\n",
            b = BOUNDARY,
            f = field,
            n = file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn titles(products: &Value) -> Vec<&str> {
    products
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_health_endpoint() {
    let response = router(default_state()).oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(json_body(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let request = Request::builder()
        .uri("/healthz")
        .header("X-Request-ID", "abc-123")
        .body(Body::empty())
        .unwrap();
    let response = router(default_state()).oneshot(request).await.unwrap();

    assert_eq!(response.headers()["x-request-id"], "abc-123");
}

#[tokio::test]
async fn test_metrics_route_absent_when_disabled() {
    let response = router(default_state()).oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ready_reports_storage() {
    let response = router(default_state()).oneshot(get("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ready");

    let state = state_with(
        MemoryStore {
            unreachable: true,
            ..Default::default()
        },
        StaticDetector(Some(vec![])),
        StaticSearch { configured: true },
    );
    let response = router(state).oneshot(get("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["storage"]["status"], "error");
}

#[tokio::test]
async fn test_upload_returns_id_and_url() {
    let response = router(default_state())
        .oneshot(multipart_request("image", "shirt.jpg", b"\xff\xd8\xff fake jpeg"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let image_id = body["imageId"].as_str().unwrap();
    assert!(image_id.ends_with("-shirt.jpg"), "{}", image_id);
    assert_eq!(body["imageUrl"], format!("{}/{}", PUBLIC_BASE, image_id));
}

#[tokio::test]
async fn test_upload_without_image_field() {
    let response = router(default_state())
        .oneshot(multipart_request("avatar", "shirt.jpg", b"bytes"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No file uploaded");
}

#[tokio::test]
async fn test_upload_storage_failure() {
    let state = state_with(
        MemoryStore {
            fail_puts: true,
            ..Default::default()
        },
        StaticDetector(Some(vec![])),
        StaticSearch { configured: true },
    );
    let response = router(state)
        .oneshot(multipart_request("image", "shirt.jpg", b"bytes"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"], "Failed to save the file");
}

#[tokio::test]
async fn test_initial_results_are_tagged() {
    let response = router(default_state())
        .oneshot(get("/api/images/1700000000000-shirt.jpg/initial"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(titles(&body), vec!["Mid", "Unpriced", "Cheap"]);
    for product in body.as_array().unwrap() {
        assert_eq!(product["category"], "Initial");
        assert_eq!(
            product["croppedImageUrl"],
            "https://cdn.test/1700000000000-shirt.jpg"
        );
    }
}

#[tokio::test]
async fn test_initial_results_sorted_by_price() {
    let app = router(default_state());

    let response = app
        .clone()
        .oneshot(get("/api/images/1-a.jpg/initial?sort=price_asc"))
        .await
        .unwrap();
    assert_eq!(titles(&json_body(response).await), vec!["Cheap", "Mid", "Unpriced"]);

    let response = app
        .oneshot(get("/api/images/1-a.jpg/initial?sort=price_desc"))
        .await
        .unwrap();
    assert_eq!(titles(&json_body(response).await), vec!["Mid", "Cheap", "Unpriced"]);
}

#[tokio::test]
async fn test_unknown_sort_is_rejected() {
    let response = router(default_state())
        .oneshot(get("/api/images/1-a.jpg/initial?sort=newest"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_objects_without_detections_is_empty() {
    let response = router(default_state())
        .oneshot(get("/api/images/1-a.jpg/objects"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn test_detector_failure_is_bad_gateway() {
    let state = state_with(
        MemoryStore::default(),
        StaticDetector(None),
        StaticSearch { configured: true },
    );
    let response = router(state)
        .oneshot(get("/api/images/1-a.jpg/objects"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(json_body(response).await["detail"].is_string());
}

#[tokio::test]
async fn test_missing_search_key_is_server_error() {
    let state = state_with(
        MemoryStore::default(),
        StaticDetector(Some(vec![])),
        StaticSearch { configured: false },
    );
    let app = router(state);

    for uri in [
        "/api/images/1-a.jpg/initial",
        "/api/images/1-a.jpg/objects",
        "/api/images/1-a.jpg/matches",
    ] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{}", uri);
    }
}

#[tokio::test]
async fn test_missing_original_is_not_found() {
    let detections = vec![DetectedObject::new(
        "/m/01n4qj",
        "Shirt",
        0.9,
        BoundingPoly::from_corners(0.1, 0.1, 0.5, 0.6),
    )];
    let state = state_with(
        MemoryStore::default(),
        StaticDetector(Some(detections)),
        StaticSearch { configured: true },
    );
    let response = router(state)
        .oneshot(get("/api/images/1-missing.jpg/matches"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_shutdown_cancels_requests() {
    let state = default_state();
    state.shutdown.cancel();
    let app = router(state);

    let response = app
        .clone()
        .oneshot(get("/api/images/1-a.jpg/initial"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app.oneshot(get("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_cors_allows_any_origin_by_default() {
    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://shop.example")
        .body(Body::empty())
        .unwrap();
    let response = router(default_state()).oneshot(request).await.unwrap();

    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let mut state = default_state();
    state.config.max_body_size = 64;
    let mut request = multipart_request("image", "shirt.jpg", &[0u8; 1024]);
    let length = request.body().size_hint().exact().unwrap();
    request
        .headers_mut()
        .insert(header::CONTENT_LENGTH, length.into());
    let response = router(state).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
