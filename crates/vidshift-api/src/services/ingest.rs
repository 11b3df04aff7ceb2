//! Storage gateway: puts caller-supplied video bytes into object storage.
//!
//! Every stored video gets a fresh key, so two requests for the same source
//! never share (or overwrite) an object.

use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use vidshift_core::models::{VideoAsset, VideoSource};
use vidshift_core::validation::{
    content_type_for_extension, extension_for_content_type, extension_of, VideoValidator,
};
use vidshift_core::AppError;
use vidshift_storage::Storage;

use crate::utils::SourceUrlPolicy;

/// Extension used when a source URL names no usable one and the response is
/// a generic binary stream.
const FALLBACK_EXTENSION: &str = "mp4";

pub struct StorageGateway {
    storage: Arc<dyn Storage>,
    http_client: reqwest::Client,
    validator: VideoValidator,
    source_policy: SourceUrlPolicy,
    fetch_timeout: Duration,
}

impl StorageGateway {
    pub fn new(
        storage: Arc<dyn Storage>,
        http_client: reqwest::Client,
        validator: VideoValidator,
        source_policy: SourceUrlPolicy,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            storage,
            http_client,
            validator,
            source_policy,
            fetch_timeout,
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Store an uploaded file under a fresh key.
    pub async fn store_upload(&self, filename: &str, data: Bytes) -> Result<VideoAsset, AppError> {
        let extension = self.validator.validate_extension(filename)?;
        self.validator.validate_file_size(data.len())?;

        let content_type = content_type_for_extension(&extension);
        let stored = self.storage.upload(&extension, content_type, data).await?;

        tracing::info!(
            key = %stored.key,
            filename = %filename,
            size_bytes = stored.size_bytes,
            "Uploaded video stored"
        );

        Ok(VideoAsset::new(
            stored.key,
            stored.url,
            VideoSource::Upload {
                filename: filename.to_string(),
            },
            content_type.to_string(),
            Some(stored.size_bytes),
        ))
    }

    /// Resolve a source URL to a stored asset.
    ///
    /// URLs pointing into our own storage are reused when the object exists.
    /// Anything else is checked against the source policy, downloaded with a
    /// size cap and copied under a fresh key.
    pub async fn ingest(&self, source_url: &str) -> Result<VideoAsset, AppError> {
        let source_url = source_url.trim();
        if source_url.is_empty() {
            return Err(AppError::Validation("Video URL must not be empty".to_string()));
        }

        if let Some(key) = self.storage.key_for_url(source_url) {
            return self.reuse_internal(source_url, key).await;
        }

        self.copy_external(source_url).await
    }

    async fn reuse_internal(&self, source_url: &str, key: String) -> Result<VideoAsset, AppError> {
        if !self.storage.exists(&key).await? {
            return Err(AppError::NotFound(format!(
                "No stored video at {}",
                source_url
            )));
        }

        let size_bytes = self.storage.content_length(&key).await.ok();
        let extension = extension_of(&key).unwrap_or_else(|| FALLBACK_EXTENSION.to_string());

        tracing::info!(key = %key, "Reusing video already in storage");

        Ok(VideoAsset::new(
            key.clone(),
            self.storage.public_url(&key),
            VideoSource::Internal {
                url: source_url.to_string(),
            },
            content_type_for_extension(&extension).to_string(),
            size_bytes,
        ))
    }

    async fn copy_external(&self, source_url: &str) -> Result<VideoAsset, AppError> {
        let url = self
            .source_policy
            .check(source_url)
            .await
            .map_err(|e| AppError::Validation(format!("Invalid video URL: {}", e)))?;

        let response = self
            .http_client
            .get(url.clone())
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|e| AppError::Validation(format!("Could not fetch source video: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Validation(format!(
                "Source video URL returned {}",
                status
            )));
        }

        let declared_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let extension = self.source_extension(&url, declared_type.as_deref())?;

        let max = self.validator.max_file_size();
        if let Some(len) = response.content_length() {
            if len > max as u64 {
                return Err(AppError::PayloadTooLarge(format!(
                    "{} bytes exceeds max {} bytes",
                    len, max
                )));
            }
        }

        let data = read_capped(response, max).await?;
        self.validator.validate_file_size(data.len())?;

        let content_type = content_type_for_extension(&extension);
        let stored = self.storage.upload(&extension, content_type, data).await?;

        tracing::info!(
            key = %stored.key,
            source_url = %source_url,
            size_bytes = stored.size_bytes,
            "External video copied into storage"
        );

        Ok(VideoAsset::new(
            stored.key,
            stored.url,
            VideoSource::External {
                url: source_url.to_string(),
            },
            content_type.to_string(),
            Some(stored.size_bytes),
        ))
    }

    /// Pick the stored extension: the URL path first, then the response type.
    fn source_extension(
        &self,
        url: &reqwest::Url,
        declared_type: Option<&str>,
    ) -> Result<String, AppError> {
        if let Some(ext) = extension_of(url.path()) {
            if self.validator.accepts_extension(&ext) {
                return Ok(ext);
            }
        }

        match declared_type {
            Some(ct) => {
                if let Some(ext) = extension_for_content_type(ct) {
                    if self.validator.accepts_extension(ext) {
                        return Ok(ext.to_string());
                    }
                }
                let mime = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
                if mime.starts_with("video/") || mime == "application/octet-stream" {
                    Ok(FALLBACK_EXTENSION.to_string())
                } else {
                    Err(AppError::Validation(format!(
                        "Source URL did not return a video (content type '{}')",
                        ct
                    )))
                }
            }
            None => Ok(FALLBACK_EXTENSION.to_string()),
        }
    }

    /// URL the generation provider reads the approved video from.
    pub async fn input_url(
        &self,
        asset: &VideoAsset,
        presign_ttl: Option<Duration>,
    ) -> Result<String, AppError> {
        match presign_ttl {
            Some(ttl) => Ok(self.storage.get_presigned_url(&asset.key, ttl).await?),
            None => Ok(asset.url.clone()),
        }
    }

    /// Best-effort delete; failures are logged and swallowed.
    pub async fn discard(&self, asset: &VideoAsset) {
        match self.storage.delete(&asset.key).await {
            Ok(()) => tracing::info!(key = %asset.key, "Deleted rejected video"),
            Err(e) => tracing::warn!(
                key = %asset.key,
                error = %e,
                "Failed to delete rejected video"
            ),
        }
    }
}

/// Read the response body, aborting once it grows past `max` bytes.
async fn read_capped(response: reqwest::Response, max: usize) -> Result<Bytes, AppError> {
    let mut buffer = BytesMut::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            AppError::Validation(format!("Failed to read source video: {}", e))
        })?;
        if buffer.len() + chunk.len() > max {
            return Err(AppError::PayloadTooLarge(format!(
                "Source video exceeds max {} bytes",
                max
            )));
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok(buffer.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidshift_storage::LocalStorage;

    use crate::setup::services::build_http_client;

    const BASE_URL: &str = "http://localhost:8000/media";

    async fn gateway(dir: &std::path::Path, max: usize) -> StorageGateway {
        gateway_with_policy(dir, max, SourceUrlPolicy::new(true, None)).await
    }

    async fn gateway_with_policy(
        dir: &std::path::Path,
        max: usize,
        policy: SourceUrlPolicy,
    ) -> StorageGateway {
        let storage = LocalStorage::new(dir, BASE_URL.to_string()).await.unwrap();
        StorageGateway::new(
            Arc::new(storage),
            build_http_client(&policy).unwrap(),
            VideoValidator::new(
                max,
                ["mp4", "mov", "webm"].iter().map(|s| s.to_string()).collect(),
            ),
            policy,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_store_upload_assigns_fresh_keys() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = gateway(dir.path(), 1024).await;

        let first = gateway
            .store_upload("clip.MOV", Bytes::from_static(b"video"))
            .await
            .unwrap();
        let second = gateway
            .store_upload("clip.MOV", Bytes::from_static(b"video"))
            .await
            .unwrap();

        assert_ne!(first.key, second.key);
        assert!(first.key.ends_with(".mov"));
        assert_eq!(first.content_type, "video/quicktime");
        assert_eq!(first.url, format!("{}/{}", BASE_URL, first.key));
    }

    #[tokio::test]
    async fn test_store_upload_rejects_extension_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = gateway(dir.path(), 4).await;

        let err = gateway
            .store_upload("notes.txt", Bytes::from_static(b"abc"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = gateway
            .store_upload("clip.mp4", Bytes::from_static(b"too large"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));

        let err = gateway
            .store_upload("clip.mp4", Bytes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_ingest_copies_external_source() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = gateway(dir.path(), 1024).await;
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/clip.mp4")
            .with_header("content-type", "video/mp4")
            .with_body("source-bytes")
            .expect(2)
            .create_async()
            .await;

        let url = format!("{}/clip.mp4", server.url());
        let first = gateway.ingest(&url).await.unwrap();
        let second = gateway.ingest(&url).await.unwrap();

        mock.assert_async().await;
        assert_ne!(first.key, second.key);
        assert_eq!(first.source, VideoSource::External { url: url.clone() });
        let stored = gateway.storage().download(&first.key).await.unwrap();
        assert_eq!(stored.as_ref(), b"source-bytes");
    }

    #[tokio::test]
    async fn test_ingest_reuses_internal_url() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = gateway(dir.path(), 1024).await;
        let stored = gateway
            .store_upload("clip.mp4", Bytes::from_static(b"video"))
            .await
            .unwrap();

        let reused = gateway.ingest(&stored.url).await.unwrap();

        assert_eq!(reused.key, stored.key);
        assert!(!reused.is_fresh_copy());
        assert_eq!(reused.size_bytes, Some(5));
    }

    #[tokio::test]
    async fn test_ingest_missing_internal_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = gateway(dir.path(), 1024).await;

        let err = gateway
            .ingest(&format!("{}/videos/missing.mp4", BASE_URL))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_ingest_bad_sources_are_validation_errors() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = gateway(dir.path(), 1024).await;
        let mut server = mockito::Server::new_async().await;
        let _missing = server
            .mock("GET", "/gone.mp4")
            .with_status(404)
            .create_async()
            .await;
        let _html = server
            .mock("GET", "/page")
            .with_header("content-type", "text/html")
            .with_body("<html></html>")
            .create_async()
            .await;

        for url in [
            "ftp://example.com/clip.mp4".to_string(),
            "not a url".to_string(),
            format!("{}/gone.mp4", server.url()),
            format!("{}/page", server.url()),
        ] {
            let err = gateway.ingest(&url).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{}: {:?}", url, err);
        }
    }

    #[tokio::test]
    async fn test_ingest_enforces_size_cap() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = gateway(dir.path(), 8).await;
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/big.mp4")
            .with_header("content-type", "video/mp4")
            .with_body("0123456789abcdef")
            .create_async()
            .await;

        let err = gateway
            .ingest(&format!("{}/big.mp4", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));
    }

    #[tokio::test]
    async fn test_redirect_to_loopback_is_not_followed() {
        let mut server = mockito::Server::new_async().await;
        let secret_url = format!("{}/internal-secret", server.url());
        let _redirect = server
            .mock("GET", "/clip.mp4")
            .with_status(302)
            .with_header("location", &secret_url)
            .create_async()
            .await;
        let secret = server
            .mock("GET", "/internal-secret")
            .with_body("metadata-credentials")
            .expect(0)
            .create_async()
            .await;

        let client = build_http_client(&SourceUrlPolicy::default()).unwrap();
        let err = client
            .get(format!("{}/clip.mp4", server.url()))
            .send()
            .await
            .unwrap_err();

        assert!(err.is_redirect(), "{:?}", err);
        secret.assert_async().await;
    }

    #[tokio::test]
    async fn test_ingest_refuses_redirect_off_allowlist() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = gateway_with_policy(
            dir.path(),
            1024,
            SourceUrlPolicy::new(true, Some(vec!["127.0.0.1".to_string()])),
        )
        .await;
        let mut server = mockito::Server::new_async().await;
        let port = server.socket_address().port();
        let _redirect = server
            .mock("GET", "/clip.mp4")
            .with_status(302)
            .with_header("location", &format!("http://localhost:{}/other.mp4", port))
            .create_async()
            .await;
        let other = server
            .mock("GET", "/other.mp4")
            .with_header("content-type", "video/mp4")
            .with_body("not-allowed")
            .expect(0)
            .create_async()
            .await;

        let err = gateway
            .ingest(&format!("{}/clip.mp4", server.url()))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)), "{:?}", err);
        other.assert_async().await;
    }

    #[tokio::test]
    async fn test_ingest_follows_allowed_redirect() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = gateway(dir.path(), 1024).await;
        let mut server = mockito::Server::new_async().await;
        let _redirect = server
            .mock("GET", "/clip.mp4")
            .with_status(302)
            .with_header("location", "/cdn/clip.mp4")
            .create_async()
            .await;
        let _target = server
            .mock("GET", "/cdn/clip.mp4")
            .with_header("content-type", "video/mp4")
            .with_body("redirected-bytes")
            .create_async()
            .await;

        let asset = gateway
            .ingest(&format!("{}/clip.mp4", server.url()))
            .await
            .unwrap();

        let stored = gateway.storage().download(&asset.key).await.unwrap();
        assert_eq!(stored.as_ref(), b"redirected-bytes");
    }

    #[tokio::test]
    async fn test_discard_missing_object_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = gateway(dir.path(), 1024).await;
        let asset = gateway
            .store_upload("clip.mp4", Bytes::from_static(b"video"))
            .await
            .unwrap();

        gateway.discard(&asset).await;
        gateway.discard(&asset).await;
        assert!(!gateway.storage().exists(&asset.key).await.unwrap());
    }
}
