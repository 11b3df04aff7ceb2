//! Runway video-to-video generation
//!
//! API: `POST {base}/video_to_video` creates a task, `GET {base}/tasks/{id}`
//! reports its state. Every request carries the bearer key and the pinned
//! `X-Runway-Version` header.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vidshift_core::models::{GenerationRequest, GenerationTask, PublicFigureThreshold};

use super::GenerationProvider;
use crate::error::{ProviderError, ProviderResult};

const SERVICE: &str = "runway";
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Clone)]
pub struct RunwayConfig {
    pub api_key: String,
    pub api_base: String,
    pub api_version: String,
}

impl Debug for RunwayConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RunwayConfig")
            .field("api_base", &self.api_base)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

pub struct RunwayClient {
    http_client: reqwest::Client,
    config: RunwayConfig,
}

impl Debug for RunwayClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RunwayClient")
            .field("config", &self.config)
            .finish()
    }
}

// Runway API structures
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoToVideoBody<'a> {
    model: &'a str,
    video_uri: &'a str,
    prompt_text: &'a str,
    ratio: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    references: Vec<ReferenceBody<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_moderation: Option<ContentModerationBody>,
}

#[derive(Debug, Serialize)]
struct ReferenceBody<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    uri: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentModerationBody {
    public_figure_threshold: PublicFigureThreshold,
}

#[derive(Debug, Deserialize)]
struct CreateTaskResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskResponse {
    id: String,
    status: String,
    #[serde(default)]
    output: Option<Vec<String>>,
    #[serde(default)]
    failure: Option<String>,
    #[serde(default)]
    failure_code: Option<String>,
}

impl TaskResponse {
    fn into_task(self) -> GenerationTask {
        match self.status.as_str() {
            "PENDING" | "THROTTLED" | "RUNNING" => GenerationTask::pending(self.id),
            "SUCCEEDED" => GenerationTask::succeeded(self.id, self.output.unwrap_or_default()),
            "FAILED" => {
                let reason = match (self.failure, self.failure_code) {
                    (Some(failure), Some(code)) => format!("{} ({})", failure, code),
                    (Some(failure), None) => failure,
                    (None, Some(code)) => code,
                    (None, None) => "Unknown error".to_string(),
                };
                GenerationTask::failed(self.id, reason)
            }
            "CANCELLED" => GenerationTask::failed(self.id, "Task was cancelled"),
            other => {
                tracing::warn!(
                    task_id = %self.id,
                    status = %other,
                    "Unknown generation task status"
                );
                GenerationTask::pending(self.id)
            }
        }
    }
}

impl RunwayClient {
    pub fn new(config: RunwayConfig) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                ProviderError::Config(format!("Failed to create HTTP client for Runway: {}", e))
            })?;

        Ok(Self {
            http_client,
            config,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), path)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(&self.config.api_key)
            .header("X-Runway-Version", &self.config.api_version)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> ProviderResult<T> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Request {
                service: SERVICE,
                message: format!("{} - {}", status, error_text),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse {
                service: SERVICE,
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl GenerationProvider for RunwayClient {
    fn name(&self) -> &str {
        "runway"
    }

    async fn submit(&self, input_url: &str, request: &GenerationRequest) -> ProviderResult<String> {
        let body = VideoToVideoBody {
            model: &request.model,
            video_uri: input_url,
            prompt_text: &request.prompt_text,
            ratio: &request.ratio,
            seed: request.seed,
            duration: request.duration,
            references: request
                .references
                .iter()
                .map(|r| ReferenceBody {
                    kind: "image",
                    uri: &r.uri,
                })
                .collect(),
            content_moderation: request
                .public_figure_threshold
                .map(|public_figure_threshold| ContentModerationBody {
                    public_figure_threshold,
                }),
        };

        let response = self
            .authorized(self.http_client.post(self.endpoint("video_to_video")))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Request {
                service: SERVICE,
                message: format!("Failed to send request to Runway API: {}", e),
            })?;

        let created: CreateTaskResponse = Self::read_json(response).await?;
        Ok(created.id)
    }

    async fn fetch(&self, task_id: &str) -> ProviderResult<GenerationTask> {
        let response = self
            .authorized(
                self.http_client
                    .get(self.endpoint(&format!("tasks/{}", task_id))),
            )
            .send()
            .await
            .map_err(|e| ProviderError::Request {
                service: SERVICE,
                message: format!("Failed to get task status from Runway API: {}", e),
            })?;

        let task: TaskResponse = Self::read_json(response).await?;
        Ok(task.into_task())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;
    use vidshift_core::models::{JobStatus, ReferenceImage};

    fn client(base: String) -> RunwayClient {
        RunwayClient::new(RunwayConfig {
            api_key: "key_test".to_string(),
            api_base: base,
            api_version: "2024-11-06".to_string(),
        })
        .unwrap()
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            prompt_text: "cinematic color grade".to_string(),
            model: "gen4_aleph".to_string(),
            ratio: "1280:720".to_string(),
            duration: None,
            seed: Some(7),
            references: vec![ReferenceImage {
                uri: "https://example.com/style.png".to_string(),
            }],
            public_figure_threshold: Some(PublicFigureThreshold::Low),
        }
    }

    // =========================================================================
    // Task creation
    // =========================================================================

    #[tokio::test]
    async fn test_submit_sends_headers_and_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/video_to_video")
            .match_header("authorization", "Bearer key_test")
            .match_header("x-runway-version", "2024-11-06")
            .match_body(Matcher::Json(json!({
                "model": "gen4_aleph",
                "videoUri": "https://clips.s3.us-east-1.amazonaws.com/videos/a.mp4",
                "promptText": "cinematic color grade",
                "ratio": "1280:720",
                "seed": 7,
                "references": [{"type": "image", "uri": "https://example.com/style.png"}],
                "contentModeration": {"publicFigureThreshold": "low"}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"task-42"}"#)
            .create_async()
            .await;

        let task_id = client(server.url())
            .submit(
                "https://clips.s3.us-east-1.amazonaws.com/videos/a.mp4",
                &request(),
            )
            .await
            .unwrap();

        assert_eq!(task_id, "task-42");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_submit_error_status_is_request_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/video_to_video")
            .with_status(400)
            .with_body(r#"{"error":"Invalid ratio"}"#)
            .create_async()
            .await;

        let err = client(server.url())
            .submit("https://example.com/a.mp4", &request())
            .await
            .unwrap_err();

        match err {
            ProviderError::Request { service, message } => {
                assert_eq!(service, "runway");
                assert!(message.contains("400"));
                assert!(message.contains("Invalid ratio"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    // =========================================================================
    // Task status
    // =========================================================================

    #[tokio::test]
    async fn test_fetch_maps_statuses() {
        let mut server = mockito::Server::new_async().await;
        let cases = [
            ("t-pending", json!({"id": "t-pending", "status": "PENDING"})),
            ("t-throttled", json!({"id": "t-throttled", "status": "THROTTLED"})),
            ("t-running", json!({"id": "t-running", "status": "RUNNING", "progress": 0.4})),
            (
                "t-ok",
                json!({"id": "t-ok", "status": "SUCCEEDED", "output": ["https://cdn.example.com/out.mp4"]}),
            ),
            (
                "t-failed",
                json!({"id": "t-failed", "status": "FAILED", "failure": "Input rejected", "failureCode": "SAFETY.INPUT"}),
            ),
            ("t-cancelled", json!({"id": "t-cancelled", "status": "CANCELLED"})),
            ("t-new", json!({"id": "t-new", "status": "QUEUED_SOMEWHERE"})),
        ];
        let mut mocks = Vec::new();
        for (id, body) in &cases {
            mocks.push(
                server
                    .mock("GET", format!("/tasks/{}", id).as_str())
                    .match_header("x-runway-version", "2024-11-06")
                    .with_header("content-type", "application/json")
                    .with_body(body.to_string())
                    .create_async()
                    .await,
            );
        }

        let client = client(server.url());
        for id in ["t-pending", "t-throttled", "t-running", "t-new"] {
            assert_eq!(client.fetch(id).await.unwrap().status, JobStatus::Pending, "{}", id);
        }

        let ok = client.fetch("t-ok").await.unwrap();
        assert_eq!(ok.status, JobStatus::Succeeded);
        assert_eq!(ok.primary_output(), Some("https://cdn.example.com/out.mp4"));

        let failed = client.fetch("t-failed").await.unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(
            failed.failure_reason.as_deref(),
            Some("Input rejected (SAFETY.INPUT)")
        );

        let cancelled = client.fetch("t-cancelled").await.unwrap();
        assert_eq!(cancelled.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_fetch_malformed_body_is_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/tasks/t-1")
            .with_header("content-type", "application/json")
            .with_body("not json")
            .create_async()
            .await;

        let err = client(server.url()).fetch("t-1").await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse { .. }));
    }
}
