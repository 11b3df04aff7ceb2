//! OpenAPI documentation, served at `/api-docs/openapi.json` and browsable at `/docs`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use vidshift_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vidshift API",
        version = "0.1.0",
        description = "Upload videos, screen them with automated content moderation, and transform approved videos with a video-to-video generation model."
    ),
    paths(
        handlers::health::root,
        handlers::health::healthz,
        handlers::health::health_check,
        handlers::video_upload::upload_video,
        handlers::generate_video::generate_video,
    ),
    components(
        schemas(
            error::ErrorResponse,
            handlers::health::RootResponse,
            handlers::health::HealthzResponse,
            handlers::health::HealthCheckResponse,
            models::UploadVideoResponse,
            models::ModerationStatus,
            models::GenerateVideoRequest,
            models::GenerateVideoResponse,
            models::PublicFigureThreshold,
        )
    ),
    tags(
        (name = "health", description = "Liveness and dependency checks"),
        (name = "videos", description = "Video upload with content moderation"),
        (name = "generation", description = "Moderated video-to-video generation"),
    )
)]
pub struct ApiDoc;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_lists_every_route() {
        let spec = get_openapi_spec();
        for path in ["/", "/healthz", "/health", "/upload-video", "/generate-video"] {
            assert!(spec.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
