use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

use super::JobStatus;

/// How strictly the generation provider screens recognisable public figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PublicFigureThreshold {
    Auto,
    Low,
}

impl FromStr for PublicFigureThreshold {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(PublicFigureThreshold::Auto),
            "low" => Ok(PublicFigureThreshold::Low),
            _ => Err(anyhow::anyhow!("Invalid public figure threshold: {}", s)),
        }
    }
}

/// Style reference attached to a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReferenceImage {
    pub uri: String,
}

/// Parameters for a video-to-video generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt_text: String,
    pub model: String,
    pub ratio: String,
    pub duration: Option<u32>,
    pub seed: Option<u32>,
    pub references: Vec<ReferenceImage>,
    pub public_figure_threshold: Option<PublicFigureThreshold>,
}

/// Snapshot of a generation task as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationTask {
    pub task_id: String,
    pub status: JobStatus,
    /// Output artifact URLs in provider order; the first is canonical.
    pub output: Vec<String>,
    pub failure_reason: Option<String>,
}

impl GenerationTask {
    pub fn pending(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: JobStatus::Pending,
            output: Vec::new(),
            failure_reason: None,
        }
    }

    pub fn succeeded(task_id: impl Into<String>, output: Vec<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: JobStatus::Succeeded,
            output,
            failure_reason: None,
        }
    }

    pub fn failed(task_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: JobStatus::Failed,
            output: Vec::new(),
            failure_reason: Some(reason.into()),
        }
    }

    pub fn primary_output(&self) -> Option<&str> {
        self.output
            .iter()
            .map(String::as_str)
            .find(|url| !url.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_output_is_first_non_empty_entry() {
        let task = GenerationTask::succeeded(
            "task-1",
            vec![
                "https://cdn.example.com/a.mp4".to_string(),
                "https://cdn.example.com/b.mp4".to_string(),
            ],
        );
        assert_eq!(task.primary_output(), Some("https://cdn.example.com/a.mp4"));

        let empty = GenerationTask::succeeded("task-2", vec![String::new()]);
        assert_eq!(empty.primary_output(), None);
    }

    #[test]
    fn test_public_figure_threshold_parse() {
        assert_eq!(
            "AUTO".parse::<PublicFigureThreshold>().unwrap(),
            PublicFigureThreshold::Auto
        );
        assert!("strict".parse::<PublicFigureThreshold>().is_err());
    }
}
