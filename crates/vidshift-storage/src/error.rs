use vidshift_core::AppError;

use crate::traits::StorageError;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("Stored video {}", key)),
            StorageError::InvalidKey(msg) => AppError::Validation(msg),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
            other => AppError::UpstreamUnavailable {
                service: "storage",
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidshift_core::ErrorMetadata;

    #[test]
    fn test_storage_error_mapping() {
        let err: AppError = StorageError::NotFound("videos/a.mp4".to_string()).into();
        assert_eq!(err.http_status_code(), 404);

        let err: AppError = StorageError::UploadFailed("timeout".to_string()).into();
        assert_eq!(err.error_code(), "UPSTREAM_UNAVAILABLE");

        let err: AppError = StorageError::InvalidKey("..".to_string()).into();
        assert_eq!(err.http_status_code(), 400);
    }
}
