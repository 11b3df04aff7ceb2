use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use vidshift_core::models::{GenerateVideoRequest, GenerateVideoResponse, PipelineOutcome};
use vidshift_core::AppError;

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

const OUTPUT_SERVICE: &str = "generation output";

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GenerateQuery {
    /// Return the generated video bytes instead of JSON
    #[serde(default)]
    pub stream: bool,
}

#[utoipa::path(
    post,
    path = "/generate-video",
    tag = "generation",
    params(GenerateQuery),
    request_body = GenerateVideoRequest,
    responses(
        (status = 200, description = "Generation succeeded, or the video was rejected by moderation", body = GenerateVideoResponse),
        (status = 400, description = "Invalid parameters or unusable source URL", body = ErrorResponse),
        (status = 404, description = "Referenced stored video does not exist", body = ErrorResponse),
        (status = 413, description = "Source video too large", body = ErrorResponse),
        (status = 502, description = "A provider failed or returned no output", body = ErrorResponse),
        (status = 504, description = "A provider job did not finish in time", body = ErrorResponse)
    )
)]
pub async fn generate_video(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GenerateQuery>,
    ValidatedJson(request): ValidatedJson<GenerateVideoRequest>,
) -> Result<Response, HttpAppError> {
    let outcome = state.pipeline.run(request).await?;

    match outcome {
        PipelineOutcome::Succeeded {
            ref task_id,
            ref output_url,
            ..
        } if query.stream => stream_output(&state.http_client, task_id, output_url).await,
        outcome => Ok(Json(GenerateVideoResponse::from(outcome)).into_response()),
    }
}

/// Fetch the generated artifact and pass its bytes through unbuffered.
async fn stream_output(
    client: &reqwest::Client,
    task_id: &str,
    output_url: &str,
) -> Result<Response, HttpAppError> {
    let upstream = client
        .get(output_url)
        .send()
        .await
        .map_err(|e| AppError::UpstreamUnavailable {
            service: OUTPUT_SERVICE,
            message: e.to_string(),
        })?;

    let status = upstream.status();
    if !status.is_success() {
        return Err(AppError::UpstreamUnavailable {
            service: OUTPUT_SERVICE,
            message: format!("{} returned {}", output_url, status),
        }
        .into());
    }

    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("video/mp4"));
    let content_length = upstream.headers().get(header::CONTENT_LENGTH).cloned();

    tracing::info!(task_id = %task_id, output_url = %output_url, "Streaming generation output");

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header("x-task-id", task_id);
    if let Some(length) = content_length {
        builder = builder.header(header::CONTENT_LENGTH, length);
    }

    builder
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|e| AppError::Internal(format!("Failed to build stream response: {}", e)).into())
}
