use std::sync::Arc;

use vidshift_core::Config;
use vidshift_storage::Storage;

use crate::services::VideoPipeline;

/// Shared application state, built once at startup.
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub pipeline: Arc<VideoPipeline>,
    /// Client used to re-stream generation outputs
    pub http_client: reqwest::Client,
}
