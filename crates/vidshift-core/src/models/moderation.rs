use serde::{Deserialize, Serialize};

use super::{JobStatus, VideoAsset};

/// Snapshot of a content-moderation job as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationJob {
    pub job_id: String,
    pub status: JobStatus,
    /// Flagged categories, de-duplicated in first-seen order.
    pub labels: Vec<String>,
    pub failure_reason: Option<String>,
}

impl ModerationJob {
    pub fn pending(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Pending,
            labels: Vec::new(),
            failure_reason: None,
        }
    }

    pub fn succeeded(job_id: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Succeeded,
            labels,
            failure_reason: None,
        }
    }

    pub fn failed(job_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Failed,
            labels: Vec::new(),
            failure_reason: Some(reason.into()),
        }
    }
}

/// Terminal moderation result for a succeeded job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationVerdict {
    pub safe: bool,
    pub labels: Vec<String>,
}

impl ModerationVerdict {
    /// Any label at all makes the content unsafe.
    pub fn from_labels(labels: Vec<String>) -> Self {
        Self {
            safe: labels.is_empty(),
            labels,
        }
    }

    /// Bind the verdict to the asset it was issued for.
    ///
    /// Returns the flagged labels when the verdict is unsafe.
    pub fn approve(self, asset: VideoAsset) -> Result<ApprovedAsset, Vec<String>> {
        if self.safe {
            Ok(ApprovedAsset { asset })
        } else {
            Err(self.labels)
        }
    }
}

/// A video whose latest moderation job succeeded with no labels.
///
/// Only [`ModerationVerdict::approve`] constructs this, so anything that takes
/// an `ApprovedAsset` cannot run on unmoderated or rejected content.
#[derive(Debug, Clone)]
pub struct ApprovedAsset {
    asset: VideoAsset,
}

impl ApprovedAsset {
    pub fn asset(&self) -> &VideoAsset {
        &self.asset
    }

    pub fn into_asset(self) -> VideoAsset {
        self.asset
    }
}

/// Keep the first occurrence of each label.
pub fn dedup_labels<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for label in labels {
        let label = label.into();
        if !label.is_empty() && !out.contains(&label) {
            out.push(label);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VideoSource;

    fn asset() -> VideoAsset {
        VideoAsset::new(
            "videos/abc.mp4".to_string(),
            "https://bucket.s3.us-east-1.amazonaws.com/videos/abc.mp4".to_string(),
            VideoSource::Upload {
                filename: "clip.mp4".to_string(),
            },
            "video/mp4".to_string(),
            Some(42),
        )
    }

    #[test]
    fn test_verdict_without_labels_is_safe() {
        let verdict = ModerationVerdict::from_labels(vec![]);
        assert!(verdict.safe);
        let approved = verdict.approve(asset()).expect("safe verdict approves");
        assert_eq!(approved.asset().key, "videos/abc.mp4");
    }

    #[test]
    fn test_verdict_with_labels_rejects() {
        let verdict = ModerationVerdict::from_labels(vec!["violence".to_string()]);
        assert!(!verdict.safe);
        let labels = verdict.approve(asset()).unwrap_err();
        assert_eq!(labels, vec!["violence".to_string()]);
    }

    #[test]
    fn test_dedup_labels_keeps_order_and_drops_empty() {
        let labels = dedup_labels(["Violence", "", "Weapons", "Violence"]);
        assert_eq!(labels, vec!["Violence".to_string(), "Weapons".to_string()]);
    }
}
