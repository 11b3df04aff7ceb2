//! Provider clients, storage and pipeline construction.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use vidshift_core::{Clock, Config, TokioClock};
use vidshift_providers::{
    GenerationClient, GenerationProvider, ModerationGate, ModerationProvider, RekognitionModerator,
    RunwayClient, RunwayConfig,
};
use vidshift_storage::{create_storage, Storage, StorageBackend};

use crate::services::{PipelineSettings, StorageGateway, VideoPipeline};
use crate::state::AppState;
use crate::utils::{PublicOnlyResolver, SourceUrlPolicy};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const MAX_REDIRECTS: usize = 5;

/// External collaborators of the pipeline.
///
/// Production wires the real providers; tests pass scripted ones.
pub struct Collaborators {
    pub storage: Arc<dyn Storage>,
    pub moderation: Arc<dyn ModerationProvider>,
    pub generation: Arc<dyn GenerationProvider>,
    pub clock: Arc<dyn Clock>,
}

/// Build the real storage backend and provider clients.
pub async fn setup_collaborators(config: &Config) -> Result<Collaborators> {
    tracing::info!("Initializing storage...");
    let storage = create_storage(config)
        .await
        .context("Failed to initialize storage")?;
    let backend = storage.backend_type();
    tracing::info!(backend = ?backend, "Storage initialized");
    if backend != StorageBackend::S3 {
        tracing::warn!(
            backend = ?backend,
            bucket = %config.s3_bucket(),
            "Moderation reads from the S3 bucket; videos on this backend are not visible to it"
        );
    }

    let moderation = RekognitionModerator::new(
        config.aws_region(),
        config.s3_bucket().to_string(),
        config.moderation_min_confidence(),
    )
    .await;
    tracing::info!(
        region = %config.aws_region(),
        min_confidence = config.moderation_min_confidence(),
        "Moderation provider initialized"
    );

    let generation = RunwayClient::new(RunwayConfig {
        api_key: config.runway_api_key().to_string(),
        api_base: config.runway_api_base().to_string(),
        api_version: config.runway_api_version().to_string(),
    })
    .context("Failed to initialize generation provider")?;
    tracing::info!(
        api_base = %config.runway_api_base(),
        model = %config.default_model(),
        "Generation provider initialized"
    );

    Ok(Collaborators {
        storage,
        moderation: Arc::new(moderation),
        generation: Arc::new(generation),
        clock: Arc::new(TokioClock::new()),
    })
}

/// Client for source downloads and output streaming. Per-request timeouts
/// are set by the caller; downloads can legitimately take minutes.
///
/// Redirect hops and DNS answers are held to `source_policy`, so a fetch
/// cannot be steered into a private network after the initial check.
pub fn build_http_client(source_policy: &SourceUrlPolicy) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .redirect(source_policy.redirect_policy(MAX_REDIRECTS));
    if !source_policy.allow_private_ips {
        builder = builder.dns_resolver(Arc::new(PublicOnlyResolver));
    }
    builder.build().context("Failed to create HTTP client")
}

/// Assemble the shared state from configuration and collaborators.
pub fn initialize_services(config: &Config, collaborators: Collaborators) -> Result<Arc<AppState>> {
    let source_policy = SourceUrlPolicy::new(
        config.allow_private_source_urls(),
        config.source_url_allowlist().map(<[String]>::to_vec),
    );
    let http_client = build_http_client(&source_policy)?;

    let gateway = StorageGateway::new(
        collaborators.storage.clone(),
        http_client.clone(),
        config.video_validator(),
        source_policy,
        config.source_fetch_timeout(),
    );

    let pipeline = VideoPipeline::new(
        gateway,
        ModerationGate::new(collaborators.moderation, collaborators.clock.clone()),
        GenerationClient::new(
            collaborators.generation,
            collaborators.clock,
            config.generation_max_wait(),
        ),
        PipelineSettings::from_config(config),
    );

    Ok(Arc::new(AppState {
        config: config.clone(),
        storage: collaborators.storage,
        pipeline: Arc::new(pipeline),
        http_client,
    }))
}
