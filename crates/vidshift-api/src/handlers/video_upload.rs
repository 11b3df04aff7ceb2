use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use vidshift_core::models::UploadVideoResponse;
use vidshift_core::AppError;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Multipart field carrying the video.
const FILE_FIELD: &str = "file";

#[utoipa::path(
    post,
    path = "/upload-video",
    tag = "videos",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Video stored and moderated", body = UploadVideoResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 502, description = "Storage or moderation provider failed", body = ErrorResponse),
        (status = 504, description = "Moderation did not finish in time", body = ErrorResponse)
    )
)]
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadVideoResponse>, HttpAppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .ok_or_else(|| AppError::Validation("Uploaded file has no filename".to_string()))?;
        let data = field.bytes().await?;

        tracing::debug!(filename = %filename, size_bytes = data.len(), "Video upload received");

        let outcome = state.pipeline.moderate_upload(&filename, data).await?;
        return Ok(Json(outcome.into()));
    }

    Err(AppError::Validation(format!("Missing '{}' field", FILE_FIELD)).into())
}
