//! AWS Rekognition video content moderation
//!
//! Videos are moderated in place: Rekognition reads `s3://{bucket}/{key}`
//! directly, so the stored asset must live in the configured bucket.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_rekognition::error::DisplayErrorContext;
use aws_sdk_rekognition::operation::get_content_moderation::GetContentModerationOutput;
use aws_sdk_rekognition::types::{S3Object, Video, VideoJobStatus};
use aws_sdk_rekognition::Client as RekognitionClient;
use vidshift_core::models::{dedup_labels, ModerationJob, VideoAsset};

use super::ModerationProvider;
use crate::error::{ProviderError, ProviderResult};

const SERVICE: &str = "rekognition";
// Result pages are small; this only guards against a provider loop.
const MAX_RESULT_PAGES: usize = 100;

pub struct RekognitionModerator {
    client: RekognitionClient,
    bucket: String,
    min_confidence: f32,
}

impl Debug for RekognitionModerator {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RekognitionModerator")
            .field("bucket", &self.bucket)
            .field("min_confidence", &self.min_confidence)
            .finish()
    }
}

impl RekognitionModerator {
    /// Build a client for `region` using the default AWS credential chain.
    pub async fn new(region: &str, bucket: String, min_confidence: f32) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        Self::from_client(RekognitionClient::new(&config), bucket, min_confidence)
    }

    pub fn from_client(client: RekognitionClient, bucket: String, min_confidence: f32) -> Self {
        Self {
            client,
            bucket,
            min_confidence,
        }
    }

    /// Follow `NextToken` so labels from every result page are collected.
    async fn collect_labels(
        &self,
        job_id: &str,
        first_page: &GetContentModerationOutput,
    ) -> ProviderResult<Vec<String>> {
        let mut names = label_names(first_page);
        let mut next_token = first_page.next_token().map(String::from);
        let mut pages = 1;

        while let Some(token) = next_token {
            if pages >= MAX_RESULT_PAGES {
                tracing::warn!(
                    job_id = %job_id,
                    pages = pages,
                    "Stopped paging moderation results"
                );
                break;
            }

            let page = self
                .client
                .get_content_moderation()
                .job_id(job_id)
                .next_token(&token)
                .send()
                .await
                .map_err(|e| ProviderError::Request {
                    service: SERVICE,
                    message: DisplayErrorContext(&e).to_string(),
                })?;

            names.extend(label_names(&page));
            next_token = page.next_token().map(String::from);
            pages += 1;
        }

        Ok(dedup_labels(names))
    }
}

fn label_names(output: &GetContentModerationOutput) -> Vec<String> {
    output
        .moderation_labels()
        .iter()
        .filter_map(|detection| detection.moderation_label().and_then(|l| l.name()))
        .map(String::from)
        .collect()
}

#[async_trait]
impl ModerationProvider for RekognitionModerator {
    fn name(&self) -> &str {
        "aws_rekognition"
    }

    async fn submit(&self, asset: &VideoAsset) -> ProviderResult<String> {
        let s3_object = S3Object::builder()
            .bucket(&self.bucket)
            .name(&asset.key)
            .build();

        let video = Video::builder().s3_object(s3_object).build();

        let response = self
            .client
            .start_content_moderation()
            .video(video)
            .min_confidence(self.min_confidence)
            .send()
            .await
            .map_err(|e| ProviderError::Request {
                service: SERVICE,
                message: DisplayErrorContext(&e).to_string(),
            })?;

        response
            .job_id()
            .map(String::from)
            .ok_or_else(|| ProviderError::InvalidResponse {
                service: SERVICE,
                message: "No job ID returned".to_string(),
            })
    }

    async fn fetch(&self, job_id: &str) -> ProviderResult<ModerationJob> {
        let response = self
            .client
            .get_content_moderation()
            .job_id(job_id)
            .send()
            .await
            .map_err(|e| ProviderError::Request {
                service: SERVICE,
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let status = response
            .job_status()
            .ok_or_else(|| ProviderError::InvalidResponse {
                service: SERVICE,
                message: "No job status returned".to_string(),
            })?;

        match status {
            VideoJobStatus::InProgress => Ok(ModerationJob::pending(job_id)),
            VideoJobStatus::Failed => Ok(ModerationJob::failed(
                job_id,
                response
                    .status_message()
                    .unwrap_or("Moderation job failed"),
            )),
            VideoJobStatus::Succeeded => {
                let labels = self.collect_labels(job_id, &response).await?;
                Ok(ModerationJob::succeeded(job_id, labels))
            }
            other => {
                tracing::warn!(
                    job_id = %job_id,
                    status = ?other,
                    "Unknown moderation job status"
                );
                Ok(ModerationJob::pending(job_id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_rekognition::config::Credentials;
    use mockito::Matcher;
    use serde_json::json;
    use vidshift_core::models::{JobStatus, VideoSource};

    const AMZ_JSON: &str = "application/x-amz-json-1.1";

    fn moderator(endpoint: String) -> RekognitionModerator {
        let config = aws_sdk_rekognition::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(aws_config::Region::new("us-east-1"))
            .endpoint_url(endpoint)
            .credentials_provider(Credentials::new("AKIDTEST", "secret", None, None, "test"))
            .build();
        RekognitionModerator::from_client(
            RekognitionClient::from_conf(config),
            "clips".to_string(),
            50.0,
        )
    }

    fn asset() -> VideoAsset {
        VideoAsset::new(
            "videos/a.mp4".to_string(),
            "https://clips.s3.us-east-1.amazonaws.com/videos/a.mp4".to_string(),
            VideoSource::Upload {
                filename: "a.mp4".to_string(),
            },
            "video/mp4".to_string(),
            Some(3),
        )
    }

    #[tokio::test]
    async fn test_submit_targets_stored_object() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("x-amz-target", "RekognitionService.StartContentModeration")
            .match_body(Matcher::PartialJson(json!({
                "Video": {"S3Object": {"Bucket": "clips", "Name": "videos/a.mp4"}}
            })))
            .with_header("content-type", AMZ_JSON)
            .with_body(r#"{"JobId":"job-123"}"#)
            .create_async()
            .await;

        let job_id = moderator(server.url()).submit(&asset()).await.unwrap();

        assert_eq!(job_id, "job-123");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_in_progress_and_failed() {
        let mut server = mockito::Server::new_async().await;
        let _pending = server
            .mock("POST", "/")
            .match_header("x-amz-target", "RekognitionService.GetContentModeration")
            .match_body(Matcher::PartialJson(json!({"JobId": "job-pending"})))
            .with_header("content-type", AMZ_JSON)
            .with_body(r#"{"JobStatus":"IN_PROGRESS"}"#)
            .create_async()
            .await;
        let _failed = server
            .mock("POST", "/")
            .match_header("x-amz-target", "RekognitionService.GetContentModeration")
            .match_body(Matcher::PartialJson(json!({"JobId": "job-failed"})))
            .with_header("content-type", AMZ_JSON)
            .with_body(r#"{"JobStatus":"FAILED","StatusMessage":"Unsupported codec"}"#)
            .create_async()
            .await;

        let moderator = moderator(server.url());

        let pending = moderator.fetch("job-pending").await.unwrap();
        assert_eq!(pending.status, JobStatus::Pending);

        let failed = moderator.fetch("job-failed").await.unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.failure_reason.as_deref(), Some("Unsupported codec"));
    }

    #[tokio::test]
    async fn test_fetch_collects_labels_across_pages() {
        let mut server = mockito::Server::new_async().await;
        let second_page = server
            .mock("POST", "/")
            .match_header("x-amz-target", "RekognitionService.GetContentModeration")
            .match_body(Matcher::PartialJson(json!({"NextToken": "page-2"})))
            .with_header("content-type", AMZ_JSON)
            .with_body(
                json!({
                    "JobStatus": "SUCCEEDED",
                    "ModerationLabels": [
                        {"Timestamp": 4000, "ModerationLabel": {"Name": "Weapons", "Confidence": 81.0}},
                        {"Timestamp": 5000, "ModerationLabel": {"Name": "Violence", "Confidence": 77.5}}
                    ]
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;
        let first_page = server
            .mock("POST", "/")
            .match_header("x-amz-target", "RekognitionService.GetContentModeration")
            .with_header("content-type", AMZ_JSON)
            .with_body(
                json!({
                    "JobStatus": "SUCCEEDED",
                    "ModerationLabels": [
                        {"Timestamp": 1000, "ModerationLabel": {"Name": "Violence", "Confidence": 92.1}}
                    ],
                    "NextToken": "page-2"
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let job = moderator(server.url()).fetch("job-1").await.unwrap();

        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.labels, vec!["Violence".to_string(), "Weapons".to_string()]);
        first_page.assert_async().await;
        second_page.assert_async().await;
    }
}
