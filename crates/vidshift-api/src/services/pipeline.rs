//! Upload → moderate → generate orchestration
//!
//! ```text
//! RECEIVED -> STORED -> MODERATING -> (REJECTED | MODERATED) -> GENERATING -> (FAILED | SUCCEEDED)
//! ```
//!
//! A failure at any stage ends the run; nothing is retried or resumed.

use std::time::Duration;

use bytes::Bytes;
use uuid::Uuid;
use vidshift_core::models::{
    ApprovedAsset, GenerateVideoRequest, GenerationRequest, PipelineOutcome, PipelineStage,
    PublicFigureThreshold, ReferenceImage, UploadOutcome, VideoAsset,
};
use vidshift_core::{AppError, Config};
use vidshift_providers::{GenerationClient, ModerationGate};

use super::ingest::StorageGateway;

/// Pipeline knobs taken from [`Config`] at startup.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub moderation_max_wait: Duration,
    pub moderation_poll_interval: Duration,
    pub generation_poll_interval: Duration,
    pub delete_rejected: bool,
    pub presign_ttl: Option<Duration>,
    pub default_model: String,
    pub default_ratio: String,
    pub public_figure_threshold: Option<PublicFigureThreshold>,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            moderation_max_wait: config.moderation_max_wait(),
            moderation_poll_interval: config.moderation_poll_interval(),
            generation_poll_interval: config.generation_poll_interval(),
            delete_rejected: config.delete_rejected_videos(),
            presign_ttl: config.generation_input_presign_ttl(),
            default_model: config.default_model().to_string(),
            default_ratio: config.default_ratio().to_string(),
            public_figure_threshold: config.public_figure_threshold(),
        }
    }
}

/// Current stage of one run; every change is logged.
struct StageTracker {
    run_id: Uuid,
    stage: PipelineStage,
}

impl StageTracker {
    fn start() -> Self {
        let tracker = Self {
            run_id: Uuid::new_v4(),
            stage: PipelineStage::Received,
        };
        tracing::info!(run_id = %tracker.run_id, stage = %tracker.stage, "Pipeline started");
        tracker
    }

    fn advance(&mut self, next: PipelineStage) {
        if !self.stage.can_transition_to(next) {
            tracing::error!(
                run_id = %self.run_id,
                from = %self.stage,
                to = %next,
                "Illegal pipeline stage transition"
            );
        }
        tracing::info!(
            run_id = %self.run_id,
            from = %self.stage,
            stage = %next,
            "Pipeline stage changed"
        );
        self.stage = next;
    }

    /// Record a failure and hand the error back.
    fn fail(&mut self, error: AppError) -> AppError {
        tracing::warn!(
            run_id = %self.run_id,
            from = %self.stage,
            stage = %PipelineStage::Failed,
            error = %error,
            "Pipeline failed"
        );
        self.stage = PipelineStage::Failed;
        error
    }
}

pub struct VideoPipeline {
    gateway: StorageGateway,
    moderation: ModerationGate,
    generation: GenerationClient,
    settings: PipelineSettings,
}

impl VideoPipeline {
    pub fn new(
        gateway: StorageGateway,
        moderation: ModerationGate,
        generation: GenerationClient,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            gateway,
            moderation,
            generation,
            settings,
        }
    }

    pub fn gateway(&self) -> &StorageGateway {
        &self.gateway
    }

    /// Store an uploaded file and moderate it. Generation is not started.
    pub async fn moderate_upload(
        &self,
        filename: &str,
        data: Bytes,
    ) -> Result<UploadOutcome, AppError> {
        let mut tracker = StageTracker::start();

        let asset = self
            .gateway
            .store_upload(filename, data)
            .await
            .map_err(|e| tracker.fail(e))?;
        tracker.advance(PipelineStage::Stored);

        match self.moderate(&mut tracker, asset).await? {
            Ok(approved) => Ok(UploadOutcome::Approved {
                asset: approved.into_asset(),
            }),
            Err((asset, labels)) => Ok(UploadOutcome::Rejected { asset, labels }),
        }
    }

    /// Run the full pipeline for a source video URL.
    pub async fn run(&self, request: GenerateVideoRequest) -> Result<PipelineOutcome, AppError> {
        let generation_request = self.generation_request(&request)?;
        let mut tracker = StageTracker::start();

        let asset = self
            .gateway
            .ingest(&request.video)
            .await
            .map_err(|e| tracker.fail(e))?;
        tracker.advance(PipelineStage::Stored);

        let approved = match self.moderate(&mut tracker, asset).await? {
            Ok(approved) => approved,
            Err((asset, labels)) => return Ok(PipelineOutcome::Rejected { asset, labels }),
        };

        tracker.advance(PipelineStage::Generating);
        let (task_id, output_url) = self
            .generate(&approved, &generation_request)
            .await
            .map_err(|e| tracker.fail(e))?;
        tracker.advance(PipelineStage::Succeeded);

        Ok(PipelineOutcome::Succeeded {
            asset: approved.into_asset(),
            task_id,
            output_url,
        })
    }

    /// MODERATING through REJECTED or MODERATED.
    ///
    /// The inner `Err` is a rejection (not a failure) carrying the labels.
    async fn moderate(
        &self,
        tracker: &mut StageTracker,
        asset: VideoAsset,
    ) -> Result<Result<ApprovedAsset, (VideoAsset, Vec<String>)>, AppError> {
        tracker.advance(PipelineStage::Moderating);

        let job_id = self
            .moderation
            .submit(&asset)
            .await
            .map_err(|e| tracker.fail(e.into()))?;
        let verdict = self
            .moderation
            .await_verdict(
                &job_id,
                self.settings.moderation_max_wait,
                self.settings.moderation_poll_interval,
            )
            .await
            .map_err(|e| tracker.fail(e.into()))?;

        match verdict.approve(asset.clone()) {
            Ok(approved) => {
                tracker.advance(PipelineStage::Moderated);
                Ok(Ok(approved))
            }
            Err(labels) => {
                tracker.advance(PipelineStage::Rejected);
                tracing::info!(key = %asset.key, labels = ?labels, "Video rejected by moderation");
                if self.settings.delete_rejected && asset.is_fresh_copy() {
                    self.gateway.discard(&asset).await;
                }
                Ok(Err((asset, labels)))
            }
        }
    }

    async fn generate(
        &self,
        approved: &ApprovedAsset,
        request: &GenerationRequest,
    ) -> Result<(String, String), AppError> {
        let input_url = self
            .gateway
            .input_url(approved.asset(), self.settings.presign_ttl)
            .await?;
        let task_id = self
            .generation
            .submit(approved, &input_url, request)
            .await?;
        let output_url = self
            .generation
            .await_result(&task_id, self.settings.generation_poll_interval)
            .await?;
        Ok((task_id, output_url))
    }

    /// Validate the caller's parameters and fill in configured defaults.
    fn generation_request(
        &self,
        request: &GenerateVideoRequest,
    ) -> Result<GenerationRequest, AppError> {
        if request.video.trim().is_empty() {
            return Err(AppError::Validation("'video' must not be empty".to_string()));
        }

        let prompt_text = request.prompt_text.trim();
        if prompt_text.is_empty() {
            return Err(AppError::Validation("'prompt_text' must not be empty".to_string()));
        }

        let model = non_blank(request.model.as_deref())
            .unwrap_or(&self.settings.default_model)
            .to_string();
        let ratio = non_blank(request.ratio.as_deref())
            .unwrap_or(&self.settings.default_ratio)
            .to_string();
        if !is_valid_ratio(&ratio) {
            return Err(AppError::Validation(format!(
                "Invalid ratio '{}': expected WIDTH:HEIGHT",
                ratio
            )));
        }

        if request.duration == Some(0) {
            return Err(AppError::Validation("'duration' must be positive".to_string()));
        }

        let references = match non_blank(request.reference_image.as_deref()) {
            Some(uri) if uri.starts_with("https://") || uri.starts_with("http://") => {
                vec![ReferenceImage {
                    uri: uri.to_string(),
                }]
            }
            Some(uri) => {
                return Err(AppError::Validation(format!(
                    "Invalid reference image URL: {}",
                    uri
                )))
            }
            None => Vec::new(),
        };

        Ok(GenerationRequest {
            prompt_text: prompt_text.to_string(),
            model,
            ratio,
            duration: request.duration,
            seed: request.seed,
            references,
            public_figure_threshold: request
                .public_figure_threshold
                .or(self.settings.public_figure_threshold),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn is_valid_ratio(ratio: &str) -> bool {
    match ratio.split_once(':') {
        Some((w, h)) => {
            matches!(w.parse::<u32>(), Ok(w) if w > 0) && matches!(h.parse::<u32>(), Ok(h) if h > 0)
        }
        None => false,
    }
}
