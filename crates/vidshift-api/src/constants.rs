//! Application-wide constants.

use std::time::Duration;

pub const UPLOAD_VIDEO_PATH: &str = "/upload-video";
pub const GENERATE_VIDEO_PATH: &str = "/generate-video";
pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";
pub const DOCS_PATH: &str = "/docs";

/// Room on top of the video size limit for multipart boundaries and headers.
pub const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Per-dependency timeout for `/health`.
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Key probed by the storage health check; it never exists.
pub const HEALTH_CHECK_KEY: &str = "health-check-non-existent-key";

pub const ROOT_MESSAGE: &str = "Video generation API is running";
