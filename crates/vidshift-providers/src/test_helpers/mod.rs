//! Test helpers for provider consumers
//!
//! Scripted in-memory providers that replay a fixed sequence of job states and
//! record every call, so pipelines can be tested without network access.

mod scripted;

pub use scripted::{ScriptedGeneration, ScriptedModeration};

use vidshift_core::models::{
    ApprovedAsset, GenerationRequest, ModerationVerdict, VideoAsset, VideoSource,
};

/// A stored upload as the storage layer would produce it.
pub fn sample_asset() -> VideoAsset {
    VideoAsset::new(
        "videos/0b4e2f6e-clip.mp4".to_string(),
        "https://clips.s3.us-east-1.amazonaws.com/videos/0b4e2f6e-clip.mp4".to_string(),
        VideoSource::Upload {
            filename: "clip.mp4".to_string(),
        },
        "video/mp4".to_string(),
        Some(1024),
    )
}

/// [`sample_asset`] after a clean moderation verdict.
pub fn approved_asset() -> ApprovedAsset {
    ModerationVerdict::from_labels(Vec::new())
        .approve(sample_asset())
        .expect("empty verdict approves")
}

pub fn sample_request() -> GenerationRequest {
    GenerationRequest {
        prompt_text: "cinematic color grade".to_string(),
        model: "gen4_aleph".to_string(),
        ratio: "1280:720".to_string(),
        duration: None,
        seed: None,
        references: Vec::new(),
        public_figure_threshold: None,
    }
}
