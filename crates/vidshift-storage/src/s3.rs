use crate::keys::{generate_video_key, is_safe_key};
use crate::traits::{Storage, StorageError, StorageResult, StoredObject};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
    Result as ObjectResult,
};
use std::time::Duration;

/// Static credentials; when absent the builder falls back to the environment.
#[derive(Clone)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    /// * `credentials` - Optional static credentials
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        credentials: Option<S3Credentials>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(creds) = credentials {
            builder = builder
                .with_access_key_id(creds.access_key_id)
                .with_secret_access_key(creds.secret_access_key);
        }

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store,
            bucket,
            region,
            endpoint_url,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn put_location(&self, key: &str) -> StorageResult<Path> {
        if !is_safe_key(key) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(Path::from(key.to_string()))
    }

    async fn put(&self, key: &str, content_type: &str, data: Bytes) -> StorageResult<String> {
        let size = data.len() as u64;
        let location = self.put_location(key)?;
        let start = std::time::Instant::now();

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };

        let result: ObjectResult<_> = self
            .store
            .put_opts(&location, PutPayload::from(data), opts)
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(self.public_url(key))
    }
}

/// Public URL of an S3 object.
///
/// AWS uses `https://{bucket}.s3.{region}.amazonaws.com/{key}`; S3-compatible
/// providers use path style `{endpoint}/{bucket}/{key}`.
fn object_url(bucket: &str, region: &str, endpoint: Option<&str>, key: &str) -> String {
    match endpoint {
        Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key),
        None => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key),
    }
}

/// Key named by `url` when it is the public URL or `s3://` URI of an object
/// in `bucket`. Query strings (presigned URLs) are ignored.
fn parse_object_key(
    bucket: &str,
    region: &str,
    endpoint: Option<&str>,
    url: &str,
) -> Option<String> {
    let url = url.split(['?', '#']).next().unwrap_or(url);
    let s3_prefix = format!("s3://{}/", bucket);
    let public_prefix = object_url(bucket, region, endpoint, "");

    let key = url
        .strip_prefix(&s3_prefix)
        .or_else(|| url.strip_prefix(&public_prefix))?;

    is_safe_key(key).then(|| key.to_string())
}

#[async_trait]
impl Storage for S3Storage {
    async fn upload(
        &self,
        extension: &str,
        content_type: &str,
        data: Bytes,
    ) -> StorageResult<StoredObject> {
        let key = generate_video_key(extension);
        let size_bytes = data.len() as u64;
        let url = self.put(&key, content_type, data).await?;
        Ok(StoredObject {
            key,
            url,
            size_bytes,
        })
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Bytes> {
        let start = std::time::Instant::now();
        let location = Path::from(storage_key.to_string());

        let result: ObjectResult<_> = self.store.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(storage_key.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %storage_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 download failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::debug!(
            bucket = %self.bucket,
            key = %storage_key,
            size_bytes = bytes.len() as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(bytes)
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let location = Path::from(storage_key.to_string());

        let result: ObjectResult<_> = self.store.delete(&location).await;

        match result {
            Ok(_) | Err(ObjectStoreError::NotFound { .. }) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                return Err(StorageError::DeleteFailed(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let location = Path::from(storage_key.to_string());
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn content_length(&self, storage_key: &str) -> StorageResult<u64> {
        let location = Path::from(storage_key.to_string());
        match self.store.head(&location).await {
            Ok(meta) => Ok(meta.size as u64),
            Err(ObjectStoreError::NotFound { .. }) => {
                Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn get_presigned_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let location = Path::from(storage_key.to_string());
        let url_result: ObjectResult<_> = self
            .store
            .signed_url(Method::GET, &location, expires_in)
            .await;

        let url = url_result
            .map_err(|e| StorageError::BackendError(e.to_string()))?
            .to_string();

        Ok(url)
    }

    fn public_url(&self, storage_key: &str) -> String {
        object_url(
            &self.bucket,
            &self.region,
            self.endpoint_url.as_deref(),
            storage_key,
        )
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        parse_object_key(&self.bucket, &self.region, self.endpoint_url.as_deref(), url)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_url_formats() {
        assert_eq!(
            object_url("clips", "us-east-1", None, "videos/a.mp4"),
            "https://clips.s3.us-east-1.amazonaws.com/videos/a.mp4"
        );
        assert_eq!(
            object_url("clips", "us-east-1", Some("http://localhost:9000/"), "videos/a.mp4"),
            "http://localhost:9000/clips/videos/a.mp4"
        );
    }

    #[test]
    fn test_parse_object_key_recognises_own_urls() {
        assert_eq!(
            parse_object_key(
                "clips",
                "us-east-1",
                None,
                "https://clips.s3.us-east-1.amazonaws.com/videos/a.mp4?X-Amz-Signature=abc"
            ),
            Some("videos/a.mp4".to_string())
        );
        assert_eq!(
            parse_object_key("clips", "us-east-1", None, "s3://clips/videos/b.mov"),
            Some("videos/b.mov".to_string())
        );
        assert_eq!(
            parse_object_key(
                "clips",
                "us-east-1",
                Some("http://localhost:9000"),
                "http://localhost:9000/clips/videos/c.webm"
            ),
            Some("videos/c.webm".to_string())
        );
    }

    #[test]
    fn test_parse_object_key_ignores_foreign_urls() {
        assert_eq!(
            parse_object_key("clips", "us-east-1", None, "https://example.com/clip.mp4"),
            None
        );
        assert_eq!(
            parse_object_key("clips", "us-east-1", None, "s3://other/videos/a.mp4"),
            None
        );
        assert_eq!(
            parse_object_key("clips", "us-east-1", None, "s3://clips/../secret"),
            None
        );
    }
}
