use std::time::Duration;

use thiserror::Error;
use vidshift_core::models::JobKind;
use vidshift_core::AppError;

/// Errors raised while talking to an external provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport failure or non-success HTTP status.
    #[error("{service} request failed: {message}")]
    Request {
        service: &'static str,
        message: String,
    },

    /// The provider answered with something we could not interpret.
    #[error("{service} returned an invalid response: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },

    #[error("{kind} job {job_id} failed: {reason}")]
    JobFailed {
        kind: JobKind,
        job_id: String,
        reason: String,
    },

    #[error("{kind} job {job_id} still pending after {waited:?}")]
    Timeout {
        kind: JobKind,
        job_id: String,
        waited: Duration,
    },

    #[error("Generation task {task_id} succeeded without an output")]
    OutputMissing { task_id: String },

    #[error("Provider configuration error: {0}")]
    Config(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Request { service, message }
            | ProviderError::InvalidResponse { service, message } => {
                AppError::UpstreamUnavailable { service, message }
            }
            ProviderError::JobFailed {
                kind,
                job_id,
                reason,
            } => AppError::ProviderJobFailed {
                kind,
                job_id,
                reason,
            },
            ProviderError::Timeout {
                kind,
                job_id,
                waited,
            } => AppError::ProviderTimeout {
                kind,
                job_id,
                waited_secs: waited.as_secs(),
            },
            ProviderError::OutputMissing { task_id } => AppError::OutputMissing { task_id },
            ProviderError::Config(msg) => AppError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidshift_core::ErrorMetadata;

    #[test]
    fn test_timeout_maps_to_gateway_timeout() {
        let err: AppError = ProviderError::Timeout {
            kind: JobKind::Moderation,
            job_id: "job-1".to_string(),
            waited: Duration::from_secs(300),
        }
        .into();
        assert_eq!(err.http_status_code(), 504);
        assert!(matches!(
            err,
            AppError::ProviderTimeout {
                waited_secs: 300,
                ..
            }
        ));
    }

    #[test]
    fn test_request_failure_is_upstream_unavailable() {
        let err: AppError = ProviderError::Request {
            service: "runway",
            message: "503 Service Unavailable".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "UPSTREAM_UNAVAILABLE");
    }
}
