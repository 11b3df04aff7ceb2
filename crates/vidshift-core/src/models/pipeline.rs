use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;

use super::{PublicFigureThreshold, VideoAsset};

/// Stages of one upload → moderate → generate run.
///
/// ```text
/// RECEIVED -> STORED -> MODERATING -> (REJECTED | MODERATED) -> GENERATING -> (FAILED | SUCCEEDED)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStage {
    Received,
    Stored,
    Moderating,
    Rejected,
    Moderated,
    Generating,
    Failed,
    Succeeded,
}

impl PipelineStage {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: PipelineStage) -> bool {
        use PipelineStage::*;
        matches!(
            (self, next),
            (Received, Stored)
                | (Received, Failed)
                | (Stored, Moderating)
                | (Moderating, Rejected)
                | (Moderating, Moderated)
                | (Moderating, Failed)
                | (Moderated, Generating)
                | (Generating, Succeeded)
                | (Generating, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineStage::Rejected | PipelineStage::Failed | PipelineStage::Succeeded
        )
    }
}

impl Display for PipelineStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            PipelineStage::Received => "RECEIVED",
            PipelineStage::Stored => "STORED",
            PipelineStage::Moderating => "MODERATING",
            PipelineStage::Rejected => "REJECTED",
            PipelineStage::Moderated => "MODERATED",
            PipelineStage::Generating => "GENERATING",
            PipelineStage::Failed => "FAILED",
            PipelineStage::Succeeded => "SUCCEEDED",
        };
        write!(f, "{}", name)
    }
}

/// Result of a full generation run.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    Rejected {
        asset: VideoAsset,
        labels: Vec<String>,
    },
    Succeeded {
        asset: VideoAsset,
        task_id: String,
        output_url: String,
    },
}

/// Result of storing and moderating an uploaded file.
#[derive(Debug, Clone)]
pub enum UploadOutcome {
    Approved { asset: VideoAsset },
    Rejected { asset: VideoAsset, labels: Vec<String> },
}

/// Moderation status reported to upload clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModerationStatus {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadVideoResponse {
    /// Stored location of the video
    pub url: String,
    /// Storage key of the video
    pub key: String,
    pub status: ModerationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

impl From<UploadOutcome> for UploadVideoResponse {
    fn from(outcome: UploadOutcome) -> Self {
        match outcome {
            UploadOutcome::Approved { asset } => Self {
                url: asset.url,
                key: asset.key,
                status: ModerationStatus::Approved,
                labels: None,
            },
            UploadOutcome::Rejected { asset, labels } => Self {
                url: asset.url,
                key: asset.key,
                status: ModerationStatus::Rejected,
                labels: Some(labels),
            },
        }
    }
}

/// Body of `POST /generate-video`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerateVideoRequest {
    /// Source video: an external URL or one of our storage URLs
    #[serde(alias = "prompt_video")]
    pub video: String,
    pub prompt_text: String,
    /// Generation model (defaults to the configured model)
    #[serde(default)]
    pub model: Option<String>,
    /// Output ratio such as "1280:720" (defaults to the configured ratio)
    #[serde(default)]
    pub ratio: Option<String>,
    /// Output duration in seconds
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub seed: Option<u32>,
    /// Style reference image URL
    #[serde(default)]
    pub reference_image: Option<String>,
    #[serde(default)]
    pub public_figure_threshold: Option<PublicFigureThreshold>,
}

/// JSON response of `POST /generate-video`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerateVideoResponse {
    Succeeded {
        output_url: String,
        task_id: String,
        input_url: String,
    },
    Rejected {
        reason: String,
        labels: Vec<String>,
    },
}

impl From<PipelineOutcome> for GenerateVideoResponse {
    fn from(outcome: PipelineOutcome) -> Self {
        match outcome {
            PipelineOutcome::Succeeded {
                asset,
                task_id,
                output_url,
            } => GenerateVideoResponse::Succeeded {
                output_url,
                task_id,
                input_url: asset.url,
            },
            PipelineOutcome::Rejected { labels, .. } => GenerateVideoResponse::Rejected {
                reason: "Video failed content moderation".to_string(),
                labels,
            },
        }
    }
}
