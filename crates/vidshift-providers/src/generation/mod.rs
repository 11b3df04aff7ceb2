//! Video-to-video generation
//!
//! [`GenerationClient`] is the only way to start a generation, and it only
//! accepts an [`ApprovedAsset`], so unmoderated content never reaches the
//! provider.

#[cfg(feature = "provider-runway")]
pub mod runway;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use vidshift_core::models::{ApprovedAsset, GenerationRequest, GenerationTask, JobKind, JobStatus};
use vidshift_core::Clock;

use crate::error::{ProviderError, ProviderResult};
use crate::polling::{poll_until, PollPolicy, PollStep, Polled};

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Provider name used in logs
    fn name(&self) -> &str;

    /// Create a task transforming the video at `input_url` and return its id.
    async fn submit(&self, input_url: &str, request: &GenerationRequest) -> ProviderResult<String>;

    /// Current state of a task.
    async fn fetch(&self, task_id: &str) -> ProviderResult<GenerationTask>;
}

pub struct GenerationClient {
    provider: Arc<dyn GenerationProvider>,
    clock: Arc<dyn Clock>,
    max_wait: Duration,
}

impl GenerationClient {
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        clock: Arc<dyn Clock>,
        max_wait: Duration,
    ) -> Self {
        Self {
            provider,
            clock,
            max_wait,
        }
    }

    /// Start a generation for `approved`.
    ///
    /// `input_url` is where the provider reads the approved video from (its
    /// public URL or a presigned one).
    pub async fn submit(
        &self,
        approved: &ApprovedAsset,
        input_url: &str,
        request: &GenerationRequest,
    ) -> ProviderResult<String> {
        let task_id = self.provider.submit(input_url, request).await?;
        tracing::info!(
            provider = %self.provider.name(),
            key = %approved.asset().key,
            task_id = %task_id,
            model = %request.model,
            ratio = %request.ratio,
            "Generation task submitted"
        );
        Ok(task_id)
    }

    /// Poll `task_id` until it finishes and return its canonical output URL.
    pub async fn await_result(
        &self,
        task_id: &str,
        poll_interval: Duration,
    ) -> ProviderResult<String> {
        let policy = PollPolicy::new(poll_interval, self.max_wait);
        let provider = self.provider.as_ref();

        let polled = poll_until::<_, ProviderError, _, _>(
            self.clock.as_ref(),
            policy,
            |attempt| async move {
                let task = provider.fetch(task_id).await?;
                if task.status.is_terminal() {
                    return Ok(PollStep::Done(task));
                }
                tracing::debug!(
                    task_id = %task_id,
                    attempt = attempt,
                    "Waiting for generation task to complete"
                );
                Ok(PollStep::Pending)
            },
        )
        .await?;

        let (task, attempts) = match polled {
            Polled::Done { value, attempts } => (value, attempts),
            Polled::TimedOut { attempts, waited } => {
                tracing::warn!(
                    task_id = %task_id,
                    attempts = attempts,
                    waited_secs = waited.as_secs(),
                    "Generation task timed out"
                );
                return Err(ProviderError::Timeout {
                    kind: JobKind::Generation,
                    job_id: task_id.to_string(),
                    waited,
                });
            }
        };

        if task.status == JobStatus::Failed {
            let reason = task
                .failure_reason
                .unwrap_or_else(|| "Unknown error".to_string());
            tracing::warn!(task_id = %task_id, reason = %reason, "Generation task failed");
            return Err(ProviderError::JobFailed {
                kind: JobKind::Generation,
                job_id: task_id.to_string(),
                reason,
            });
        }

        let output_url = task
            .primary_output()
            .map(String::from)
            .ok_or_else(|| ProviderError::OutputMissing {
                task_id: task_id.to_string(),
            })?;

        tracing::info!(
            task_id = %task_id,
            attempts = attempts,
            output_url = %output_url,
            "Generation task completed successfully"
        );
        Ok(output_url)
    }
}
