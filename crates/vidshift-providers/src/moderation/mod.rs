//! Content moderation
//!
//! [`ModerationProvider`] is the thin seam over a moderation service's job
//! API; [`ModerationGate`] owns the polling policy and turns a terminal job
//! into a verdict.

#[cfg(feature = "provider-aws-rekognition")]
pub mod rekognition;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use vidshift_core::models::{JobKind, JobStatus, ModerationJob, ModerationVerdict, VideoAsset};
use vidshift_core::Clock;

use crate::error::{ProviderError, ProviderResult};
use crate::polling::{poll_until, PollPolicy, PollStep, Polled};

#[async_trait]
pub trait ModerationProvider: Send + Sync {
    /// Provider name used in logs
    fn name(&self) -> &str;

    /// Start a moderation job for a stored video and return its id.
    async fn submit(&self, asset: &VideoAsset) -> ProviderResult<String>;

    /// Current state of a job.
    async fn fetch(&self, job_id: &str) -> ProviderResult<ModerationJob>;
}

pub struct ModerationGate {
    provider: Arc<dyn ModerationProvider>,
    clock: Arc<dyn Clock>,
}

impl ModerationGate {
    pub fn new(provider: Arc<dyn ModerationProvider>, clock: Arc<dyn Clock>) -> Self {
        Self { provider, clock }
    }

    /// Submit `asset` for moderation. Failures are returned as-is, never retried.
    pub async fn submit(&self, asset: &VideoAsset) -> ProviderResult<String> {
        let job_id = self.provider.submit(asset).await?;
        tracing::info!(
            provider = %self.provider.name(),
            key = %asset.key,
            job_id = %job_id,
            "Moderation job submitted"
        );
        Ok(job_id)
    }

    /// Poll `job_id` until a verdict is available.
    ///
    /// A job still pending after `max_wait` is a [`ProviderError::Timeout`];
    /// it is never treated as safe.
    pub async fn await_verdict(
        &self,
        job_id: &str,
        max_wait: Duration,
        poll_interval: Duration,
    ) -> ProviderResult<ModerationVerdict> {
        let policy = PollPolicy::new(poll_interval, max_wait);
        let provider = self.provider.as_ref();

        let polled = poll_until::<_, ProviderError, _, _>(
            self.clock.as_ref(),
            policy,
            |attempt| async move {
                let job = provider.fetch(job_id).await?;
                match job.status {
                    JobStatus::Pending => {
                        tracing::debug!(
                            job_id = %job_id,
                            attempt = attempt,
                            "Waiting for moderation job to complete"
                        );
                        Ok(PollStep::Pending)
                    }
                    JobStatus::Succeeded | JobStatus::Failed => Ok(PollStep::Done(job)),
                }
            },
        )
        .await?;

        let (job, attempts) = match polled {
            Polled::Done { value, attempts } => (value, attempts),
            Polled::TimedOut { attempts, waited } => {
                tracing::warn!(
                    job_id = %job_id,
                    attempts = attempts,
                    waited_secs = waited.as_secs(),
                    "Moderation job timed out"
                );
                return Err(ProviderError::Timeout {
                    kind: JobKind::Moderation,
                    job_id: job_id.to_string(),
                    waited,
                });
            }
        };

        if job.status == JobStatus::Failed {
            let reason = job
                .failure_reason
                .unwrap_or_else(|| "Unknown error".to_string());
            tracing::warn!(job_id = %job_id, reason = %reason, "Moderation job failed");
            return Err(ProviderError::JobFailed {
                kind: JobKind::Moderation,
                job_id: job_id.to_string(),
                reason,
            });
        }

        let verdict = ModerationVerdict::from_labels(job.labels);
        tracing::info!(
            job_id = %job_id,
            attempts = attempts,
            safe = verdict.safe,
            labels = ?verdict.labels,
            "Moderation job completed"
        );
        Ok(verdict)
    }
}
