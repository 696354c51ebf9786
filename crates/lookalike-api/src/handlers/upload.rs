//! Image upload handler.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lookalike_models::UploadResult;
use lookalike_pipeline::{ImageUpload, NO_FILE_UPLOADED};
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Multipart field carrying the image.
pub const IMAGE_FIELD: &str = "image";

/// Name used when the client sends no file name.
const FALLBACK_FILE_NAME: &str = "upload";

/// Upload an image and return its id and public URL.
///
/// The body is `{imageId, imageUrl}` on success or `{error}` otherwise.
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(FALLBACK_FILE_NAME)
            .to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| {
            warn!("Failed to read upload body: {}", e);
            ApiError::bad_request(e.body_text())
        })?;

        file = Some(ImageUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let result = state.pipeline.upload(file).await;
    let status = match &result {
        UploadResult::Uploaded(_) => StatusCode::OK,
        UploadResult::Failed { error } if error == NO_FILE_UPLOADED => StatusCode::BAD_REQUEST,
        UploadResult::Failed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    Ok((status, Json(result)).into_response())
}
