use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where the bytes of a stored video came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VideoSource {
    /// Multipart upload; `filename` is the client-supplied name.
    Upload { filename: String },
    /// Copied from a URL outside our storage.
    External { url: String },
    /// Already in our storage and reused as-is.
    Internal { url: String },
}

/// A video held in object storage.
///
/// Assets are never mutated after creation. The only lifecycle event after
/// storing is deletion when moderation rejects the content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoAsset {
    pub key: String,
    pub url: String,
    pub source: VideoSource,
    pub content_type: String,
    pub size_bytes: Option<u64>,
    pub created_at: DateTime<Utc>,
}

impl VideoAsset {
    pub fn new(
        key: String,
        url: String,
        source: VideoSource,
        content_type: String,
        size_bytes: Option<u64>,
    ) -> Self {
        Self {
            key,
            url,
            source,
            content_type,
            size_bytes,
            created_at: Utc::now(),
        }
    }

    /// Whether this asset was written by the current request (and may be
    /// cleaned up by it).
    pub fn is_fresh_copy(&self) -> bool {
        !matches!(self.source, VideoSource::Internal { .. })
    }
}
