//! Configuration module
//!
//! All settings come from the environment (a `.env` file is loaded first when
//! present). Provider credentials, the bucket and the region are required:
//! their absence is a startup error, never a per-request one.

use std::env;
use std::time::Duration;

use anyhow::{anyhow, Context};

use crate::models::PublicFigureThreshold;
use crate::storage_types::StorageBackend;
use crate::validation::{VideoValidator, DEFAULT_VIDEO_EXTENSIONS};

// Common constants
const SERVER_PORT: u16 = 8000;
const RUNWAY_API_BASE: &str = "https://api.dev.runwayml.com/v1";
const RUNWAY_API_VERSION: &str = "2024-11-06";
const DEFAULT_MODEL: &str = "gen4_aleph";
const DEFAULT_RATIO: &str = "1280:720";
const MODERATION_MIN_CONFIDENCE: f32 = 50.0;
const MODERATION_MAX_WAIT_SECS: u64 = 300;
const MODERATION_POLL_INTERVAL_SECS: u64 = 5;
const GENERATION_MAX_WAIT_SECS: u64 = 900;
const GENERATION_POLL_INTERVAL_SECS: u64 = 5;
const MAX_VIDEO_SIZE_MB: usize = 500;
const SOURCE_FETCH_TIMEOUT_SECS: u64 = 120;
const PRESIGN_TTL_SECS: u64 = 3600;
const HTTP_CONCURRENCY_LIMIT: usize = 256;

/// Server-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub http_concurrency_limit: usize,
}

/// Full service configuration
#[derive(Clone)]
pub struct PipelineConfig {
    pub base: BaseConfig,
    // Generation provider
    pub runway_api_key: String,
    pub runway_api_base: String,
    pub runway_api_version: String,
    pub default_model: String,
    pub default_ratio: String,
    pub public_figure_threshold: Option<PublicFigureThreshold>,
    // Storage
    pub storage_backend: StorageBackend,
    pub s3_bucket: String,
    pub aws_region: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub s3_endpoint: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Moderation
    pub moderation_min_confidence: f32,
    pub moderation_max_wait_secs: u64,
    pub moderation_poll_interval_secs: u64,
    pub delete_rejected_videos: bool,
    // Generation polling
    pub generation_max_wait_secs: u64,
    pub generation_poll_interval_secs: u64,
    pub presign_generation_input: bool,
    pub presign_ttl_secs: u64,
    // Uploads and source URLs
    pub max_video_size_bytes: usize,
    pub video_allowed_extensions: Vec<String>,
    pub source_url_allowlist: Option<Vec<String>>,
    pub allow_private_source_urls: bool,
    pub source_fetch_timeout_secs: u64,
}

// Secrets stay out of logs.
impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("base", &self.base)
            .field("runway_api_base", &self.runway_api_base)
            .field("default_model", &self.default_model)
            .field("storage_backend", &self.storage_backend)
            .field("s3_bucket", &self.s3_bucket)
            .field("aws_region", &self.aws_region)
            .field("s3_endpoint", &self.s3_endpoint)
            .field("moderation_max_wait_secs", &self.moderation_max_wait_secs)
            .field("generation_max_wait_secs", &self.generation_max_wait_secs)
            .finish_non_exhaustive()
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<PipelineConfig>);

impl Config {
    fn inner(&self) -> &PipelineConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = PipelineConfig::from_lookup(&lookup)?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_name(&self.inner().base.environment)
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn http_concurrency_limit(&self) -> usize {
        self.inner().base.http_concurrency_limit
    }

    pub fn runway_api_key(&self) -> &str {
        &self.inner().runway_api_key
    }

    pub fn runway_api_base(&self) -> &str {
        &self.inner().runway_api_base
    }

    pub fn runway_api_version(&self) -> &str {
        &self.inner().runway_api_version
    }

    pub fn default_model(&self) -> &str {
        &self.inner().default_model
    }

    pub fn default_ratio(&self) -> &str {
        &self.inner().default_ratio
    }

    pub fn public_figure_threshold(&self) -> Option<PublicFigureThreshold> {
        self.inner().public_figure_threshold
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn s3_bucket(&self) -> &str {
        &self.inner().s3_bucket
    }

    pub fn aws_region(&self) -> &str {
        &self.inner().aws_region
    }

    pub fn aws_access_key_id(&self) -> &str {
        &self.inner().aws_access_key_id
    }

    pub fn aws_secret_access_key(&self) -> &str {
        &self.inner().aws_secret_access_key
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.inner().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.inner().local_storage_base_url.as_deref()
    }

    pub fn moderation_min_confidence(&self) -> f32 {
        self.inner().moderation_min_confidence
    }

    pub fn moderation_max_wait(&self) -> Duration {
        Duration::from_secs(self.inner().moderation_max_wait_secs)
    }

    pub fn moderation_poll_interval(&self) -> Duration {
        Duration::from_secs(self.inner().moderation_poll_interval_secs)
    }

    pub fn delete_rejected_videos(&self) -> bool {
        self.inner().delete_rejected_videos
    }

    pub fn generation_max_wait(&self) -> Duration {
        Duration::from_secs(self.inner().generation_max_wait_secs)
    }

    pub fn generation_poll_interval(&self) -> Duration {
        Duration::from_secs(self.inner().generation_poll_interval_secs)
    }

    /// TTL of presigned generation inputs, `None` when public URLs are used.
    pub fn generation_input_presign_ttl(&self) -> Option<Duration> {
        self.inner()
            .presign_generation_input
            .then(|| Duration::from_secs(self.inner().presign_ttl_secs))
    }

    pub fn max_video_size_bytes(&self) -> usize {
        self.inner().max_video_size_bytes
    }

    pub fn video_allowed_extensions(&self) -> &[String] {
        &self.inner().video_allowed_extensions
    }

    pub fn video_validator(&self) -> VideoValidator {
        VideoValidator::new(
            self.max_video_size_bytes(),
            self.video_allowed_extensions().to_vec(),
        )
    }

    pub fn source_url_allowlist(&self) -> Option<&[String]> {
        self.inner().source_url_allowlist.as_deref()
    }

    pub fn allow_private_source_urls(&self) -> bool {
        self.inner().allow_private_source_urls
    }

    pub fn source_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.inner().source_fetch_timeout_secs)
    }
}

fn is_production_name(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

fn required<F>(lookup: &F, key: &str) -> Result<String, anyhow::Error>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow!("{} environment variable is required", key))
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, anyhow::Error>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match optional(lookup, key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow!("{} has an invalid value '{}': {}", key, raw, e)),
        None => Ok(default),
    }
}

fn list<F>(lookup: &F, key: &str) -> Option<Vec<String>>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, key).map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

impl PipelineConfig {
    fn from_lookup<F>(lookup: &F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = optional(lookup, "ENVIRONMENT")
            .or_else(|| optional(lookup, "APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins_str = optional(lookup, "CORS_ORIGINS").unwrap_or_else(|| "*".to_string());
        if is_production_name(&environment) && cors_origins_str == "*" {
            return Err(anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let base = BaseConfig {
            server_port: parsed_or(lookup, "PORT", SERVER_PORT)?,
            cors_origins,
            environment,
            http_concurrency_limit: parsed_or(
                lookup,
                "HTTP_CONCURRENCY_LIMIT",
                HTTP_CONCURRENCY_LIMIT,
            )?
            .max(1),
        };

        let aws_region = optional(lookup, "AWS_REGION")
            .or_else(|| optional(lookup, "S3_REGION"))
            .ok_or_else(|| anyhow!("AWS_REGION or S3_REGION environment variable is required"))?;

        let storage_backend = match optional(lookup, "STORAGE_BACKEND") {
            Some(raw) => raw.parse::<StorageBackend>()?,
            None => StorageBackend::S3,
        };

        let public_figure_threshold = optional(lookup, "PUBLIC_FIGURE_THRESHOLD")
            .map(|raw| raw.parse::<PublicFigureThreshold>())
            .transpose()?;

        let max_video_size_mb: usize = parsed_or(lookup, "MAX_VIDEO_SIZE_MB", MAX_VIDEO_SIZE_MB)?;

        let video_allowed_extensions = list(lookup, "VIDEO_ALLOWED_EXTENSIONS").unwrap_or_else(|| {
            DEFAULT_VIDEO_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect()
        });

        Ok(PipelineConfig {
            base,
            runway_api_key: required(lookup, "RUNWAYML_API_SECRET")
                .or_else(|_| required(lookup, "RUNWAY_API_KEY"))
                .context("RUNWAYML_API_SECRET (or RUNWAY_API_KEY) is required")?,
            runway_api_base: optional(lookup, "RUNWAY_API_BASE")
                .unwrap_or_else(|| RUNWAY_API_BASE.to_string()),
            runway_api_version: optional(lookup, "RUNWAY_API_VERSION")
                .unwrap_or_else(|| RUNWAY_API_VERSION.to_string()),
            default_model: optional(lookup, "DEFAULT_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            default_ratio: optional(lookup, "DEFAULT_RATIO")
                .unwrap_or_else(|| DEFAULT_RATIO.to_string()),
            public_figure_threshold,
            storage_backend,
            s3_bucket: required(lookup, "S3_BUCKET")?,
            aws_region,
            aws_access_key_id: required(lookup, "AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: required(lookup, "AWS_SECRET_ACCESS_KEY")?,
            s3_endpoint: optional(lookup, "S3_ENDPOINT"),
            local_storage_path: optional(lookup, "LOCAL_STORAGE_PATH"),
            local_storage_base_url: optional(lookup, "LOCAL_STORAGE_BASE_URL"),
            moderation_min_confidence: parsed_or(
                lookup,
                "MODERATION_MIN_CONFIDENCE",
                MODERATION_MIN_CONFIDENCE,
            )?,
            moderation_max_wait_secs: parsed_or(
                lookup,
                "MODERATION_MAX_WAIT_SECS",
                MODERATION_MAX_WAIT_SECS,
            )?,
            moderation_poll_interval_secs: parsed_or(
                lookup,
                "MODERATION_POLL_INTERVAL_SECS",
                MODERATION_POLL_INTERVAL_SECS,
            )?,
            delete_rejected_videos: parsed_or(lookup, "DELETE_REJECTED_VIDEOS", true)?,
            generation_max_wait_secs: parsed_or(
                lookup,
                "GENERATION_MAX_WAIT_SECS",
                GENERATION_MAX_WAIT_SECS,
            )?,
            generation_poll_interval_secs: parsed_or(
                lookup,
                "GENERATION_POLL_INTERVAL_SECS",
                GENERATION_POLL_INTERVAL_SECS,
            )?,
            presign_generation_input: parsed_or(lookup, "PRESIGN_GENERATION_INPUT", false)?,
            presign_ttl_secs: parsed_or(lookup, "PRESIGN_TTL_SECS", PRESIGN_TTL_SECS)?,
            max_video_size_bytes: max_video_size_mb * 1024 * 1024,
            video_allowed_extensions,
            source_url_allowlist: list(lookup, "SOURCE_URL_ALLOWLIST"),
            allow_private_source_urls: parsed_or(lookup, "ALLOW_PRIVATE_SOURCE_URLS", false)?,
            source_fetch_timeout_secs: parsed_or(
                lookup,
                "SOURCE_FETCH_TIMEOUT_SECS",
                SOURCE_FETCH_TIMEOUT_SECS,
            )?,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.moderation_poll_interval_secs == 0 || self.generation_poll_interval_secs == 0 {
            return Err(anyhow!("Poll intervals must be at least one second"));
        }

        if self.moderation_max_wait_secs < self.moderation_poll_interval_secs {
            return Err(anyhow!(
                "MODERATION_MAX_WAIT_SECS must be at least MODERATION_POLL_INTERVAL_SECS"
            ));
        }

        if self.generation_max_wait_secs < self.generation_poll_interval_secs {
            return Err(anyhow!(
                "GENERATION_MAX_WAIT_SECS must be at least GENERATION_POLL_INTERVAL_SECS"
            ));
        }

        if !(0.0..=100.0).contains(&self.moderation_min_confidence) {
            return Err(anyhow!("MODERATION_MIN_CONFIDENCE must be between 0 and 100"));
        }

        if self.video_allowed_extensions.is_empty() {
            return Err(anyhow!("VIDEO_ALLOWED_EXTENSIONS cannot be empty"));
        }

        if self.max_video_size_bytes == 0 {
            return Err(anyhow!("MAX_VIDEO_SIZE_MB must be greater than zero"));
        }

        if self.storage_backend == StorageBackend::Local
            && (self.local_storage_path.is_none() || self.local_storage_base_url.is_none())
        {
            return Err(anyhow!(
                "STORAGE_BACKEND=local requires LOCAL_STORAGE_PATH and LOCAL_STORAGE_BASE_URL"
            ));
        }

        if let Some(endpoint) = &self.s3_endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(anyhow!("S3_ENDPOINT must be an http(s) URL"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("RUNWAYML_API_SECRET", "key_1234567890"),
            ("S3_BUCKET", "videos-bucket"),
            ("AWS_REGION", "us-east-1"),
            ("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<Config, anyhow::Error> {
        Config::from_lookup(|key| env.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults() {
        let config = load(&base_env()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.server_port(), 8000);
        assert_eq!(config.default_model(), "gen4_aleph");
        assert_eq!(config.default_ratio(), "1280:720");
        assert_eq!(config.storage_backend(), StorageBackend::S3);
        assert_eq!(config.moderation_max_wait(), Duration::from_secs(300));
        assert_eq!(config.generation_max_wait(), Duration::from_secs(900));
        assert!(config.delete_rejected_videos());
        assert!(config.generation_input_presign_ttl().is_none());
        assert_eq!(config.video_allowed_extensions().len(), 6);
        assert_eq!(config.max_video_size_bytes(), 500 * 1024 * 1024);
    }

    #[test]
    fn test_missing_required_variables_fail() {
        for key in [
            "RUNWAYML_API_SECRET",
            "S3_BUCKET",
            "AWS_REGION",
            "AWS_ACCESS_KEY_ID",
            "AWS_SECRET_ACCESS_KEY",
        ] {
            let mut env = base_env();
            env.remove(key);
            assert!(load(&env).is_err(), "{} should be required", key);
        }
    }

    #[test]
    fn test_region_falls_back_to_s3_region() {
        let mut env = base_env();
        env.remove("AWS_REGION");
        env.insert("S3_REGION", "eu-west-3");
        assert_eq!(load(&env).unwrap().aws_region(), "eu-west-3");
    }

    #[test]
    fn test_wildcard_cors_refused_in_production() {
        let mut env = base_env();
        env.insert("ENVIRONMENT", "production");
        assert!(load(&env).is_err());

        env.insert("CORS_ORIGINS", "https://app.example.com");
        let config = load(&env).unwrap();
        assert!(config.is_production());
        assert_eq!(config.cors_origins(), ["https://app.example.com"]);
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let mut env = base_env();
        env.insert("MODERATION_MAX_WAIT_SECS", "soon");
        let err = load(&env).unwrap_err().to_string();
        assert!(err.contains("MODERATION_MAX_WAIT_SECS"));
    }

    #[test]
    fn test_validate_rejects_local_without_paths() {
        let mut env = base_env();
        env.insert("STORAGE_BACKEND", "local");
        let config = load(&env).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_presign_and_allowlist() {
        let mut env = base_env();
        env.insert("PRESIGN_GENERATION_INPUT", "true");
        env.insert("PRESIGN_TTL_SECS", "600");
        env.insert("SOURCE_URL_ALLOWLIST", "Example.com, cdn.example.org");
        let config = load(&env).unwrap();
        assert_eq!(
            config.generation_input_presign_ttl(),
            Some(Duration::from_secs(600))
        );
        assert_eq!(
            config.source_url_allowlist().unwrap(),
            ["example.com", "cdn.example.org"]
        );
    }
}
