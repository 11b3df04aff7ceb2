//! Error types module
//!
//! This module provides the error taxonomy shared by every vidshift component.
//! All failures that reach the HTTP boundary are unified under [`AppError`],
//! and each variant describes its own HTTP presentation through
//! [`ErrorMetadata`].
//!
//! Content rejected by moderation is deliberately absent here: it is a business
//! outcome (`PipelineOutcome::Rejected`), not an error.

use std::io;

use crate::models::JobKind;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for upstream failures outside our control
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "PROVIDER_TIMEOUT")
    fn error_code(&self) -> &'static str;

    /// Whether the caller may restart the request and expect a different result
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from clients
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{service} unavailable: {message}")]
    UpstreamUnavailable {
        service: &'static str,
        message: String,
    },

    #[error("{kind} job {job_id} failed: {reason}")]
    ProviderJobFailed {
        kind: JobKind,
        job_id: String,
        reason: String,
    },

    #[error("{kind} job {job_id} did not reach a terminal state within {waited_secs}s")]
    ProviderTimeout {
        kind: JobKind,
        job_id: String,
        waited_secs: u64,
    },

    #[error("Generation task {task_id} succeeded without an output")]
    OutputMissing { task_id: String },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant:
/// (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Validation(_) => (
            400,
            "VALIDATION_ERROR",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce the video size and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the video URL points to an existing object"),
            false,
            LogLevel::Debug,
        ),
        AppError::UpstreamUnavailable { .. } => (
            502,
            "UPSTREAM_UNAVAILABLE",
            true,
            Some("Retry the request after a short delay"),
            true,
            LogLevel::Warn,
        ),
        AppError::ProviderJobFailed { .. } => (
            502,
            "PROVIDER_JOB_FAILED",
            true,
            Some("Restart the request; contact support if the job keeps failing"),
            false,
            LogLevel::Warn,
        ),
        AppError::ProviderTimeout { .. } => (
            504,
            "PROVIDER_TIMEOUT",
            true,
            Some("Restart the request later"),
            false,
            LogLevel::Warn,
        ),
        AppError::OutputMissing { .. } => (
            502,
            "OUTPUT_MISSING",
            true,
            Some("Restart the request"),
            false,
            LogLevel::Warn,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get error type name for logging and metrics
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "Validation",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::NotFound(_) => "NotFound",
            AppError::UpstreamUnavailable { .. } => "UpstreamUnavailable",
            AppError::ProviderJobFailed { .. } => "ProviderJobFailed",
            AppError::ProviderTimeout { .. } => "ProviderTimeout",
            AppError::OutputMissing { .. } => "OutputMissing",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "InternalWithSource",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Validation(ref msg) => msg.clone(),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::UpstreamUnavailable { service, .. } => {
                format!("{} is currently unavailable", service)
            }
            AppError::ProviderJobFailed { kind, reason, .. } => {
                format!("{} job failed: {}", kind, reason)
            }
            AppError::ProviderTimeout {
                kind, waited_secs, ..
            } => {
                format!("{} did not finish within {} seconds", kind, waited_secs)
            }
            AppError::OutputMissing { .. } => {
                "Generation finished without producing an output".to_string()
            }
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_validation() {
        let err = AppError::Validation("Unsupported extension 'exe'".to_string());
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "Unsupported extension 'exe'");
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_upstream_hides_message() {
        let err = AppError::UpstreamUnavailable {
            service: "runway",
            message: "connection reset by peer".to_string(),
        };
        assert_eq!(err.http_status_code(), 502);
        assert_eq!(err.error_code(), "UPSTREAM_UNAVAILABLE");
        assert!(err.is_recoverable());
        assert!(err.is_sensitive());
        assert!(!err.client_message().contains("connection reset"));
    }

    #[test]
    fn test_error_metadata_provider_failures() {
        let failed = AppError::ProviderJobFailed {
            kind: JobKind::Moderation,
            job_id: "job-1".to_string(),
            reason: "video codec not supported".to_string(),
        };
        assert_eq!(failed.http_status_code(), 502);
        assert_eq!(failed.error_code(), "PROVIDER_JOB_FAILED");
        assert!(failed.client_message().contains("moderation"));

        let timeout = AppError::ProviderTimeout {
            kind: JobKind::Generation,
            job_id: "task-1".to_string(),
            waited_secs: 900,
        };
        assert_eq!(timeout.http_status_code(), 504);
        assert!(timeout.client_message().contains("900"));

        let missing = AppError::OutputMissing {
            task_id: "task-2".to_string(),
        };
        assert_eq!(missing.error_code(), "OUTPUT_MISSING");
        assert_eq!(missing.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let err = AppError::from(anyhow::anyhow!("root cause").context("outer"));
        let details = err.detailed_message();
        assert!(details.contains("Internal error with source"));
        assert!(details.contains("outer"));
    }
}
