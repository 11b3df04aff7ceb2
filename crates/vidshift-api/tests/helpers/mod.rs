//! Test helpers: build the router with local storage and scripted providers.
//!
//! Run from workspace root: `cargo test -p vidshift-api`. No network access or
//! cloud credentials are needed; source and output URLs point at mockito.

pub mod fixtures;

use std::collections::HashMap;
use std::sync::Arc;

use axum_test::TestServer;
use tempfile::TempDir;
use vidshift_api::setup::{self, services::Collaborators};
use vidshift_core::{Config, ManualClock};
use vidshift_providers::test_helpers::{ScriptedGeneration, ScriptedModeration};
use vidshift_storage::{LocalStorage, Storage};

pub const MEDIA_BASE_URL: &str = "http://localhost:8000/media";

/// Test application: server plus the fakes behind it.
pub struct TestApp {
    pub server: TestServer,
    pub storage: Arc<LocalStorage>,
    pub moderation: Arc<ScriptedModeration>,
    pub generation: Arc<ScriptedGeneration>,
    pub clock: Arc<ManualClock>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Whether `key` is currently stored.
    pub async fn stored(&self, key: &str) -> bool {
        self.storage.exists(key).await.expect("exists check")
    }
}

/// App with a clean moderation verdict and a generation task producing `output_url`.
pub async fn setup_test_app(output_url: &str) -> TestApp {
    setup_test_app_with(
        ScriptedModeration::safe(),
        ScriptedGeneration::succeeding(output_url),
        &[],
    )
    .await
}

/// App with explicit providers and extra environment overrides.
pub async fn setup_test_app_with(
    moderation: ScriptedModeration,
    generation: ScriptedGeneration,
    overrides: &[(&str, &str)],
) -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let storage_path = temp_dir.path().to_string_lossy().to_string();

    let config = create_test_config(&storage_path, overrides);
    config.validate().expect("test config is valid");

    let storage = Arc::new(
        LocalStorage::new(temp_dir.path(), MEDIA_BASE_URL.to_string())
            .await
            .expect("Failed to create local storage"),
    );
    let moderation = Arc::new(moderation);
    let generation = Arc::new(generation);
    let clock = Arc::new(ManualClock::new());

    let collaborators = Collaborators {
        storage: storage.clone() as Arc<dyn Storage>,
        moderation: moderation.clone(),
        generation: generation.clone(),
        clock: clock.clone(),
    };

    let (_state, app) = setup::build_app(config, collaborators).expect("Failed to build app");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        storage,
        moderation,
        generation,
        clock,
        _temp_dir: temp_dir,
    }
}

fn create_test_config(storage_path: &str, overrides: &[(&str, &str)]) -> Config {
    let mut env: HashMap<String, String> = [
        ("RUNWAYML_API_SECRET", "test-runway-secret"),
        ("S3_BUCKET", "vidshift-test"),
        ("AWS_REGION", "us-east-1"),
        ("AWS_ACCESS_KEY_ID", "test-access-key"),
        ("AWS_SECRET_ACCESS_KEY", "test-secret-key"),
        ("STORAGE_BACKEND", "local"),
        ("LOCAL_STORAGE_BASE_URL", MEDIA_BASE_URL),
        ("ALLOW_PRIVATE_SOURCE_URLS", "true"),
        ("CORS_ORIGINS", "*"),
        ("MAX_VIDEO_SIZE_MB", "1"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    env.insert("LOCAL_STORAGE_PATH".to_string(), storage_path.to_string());

    for (key, value) in overrides {
        env.insert(key.to_string(), value.to_string());
    }

    Config::from_lookup(|key| env.get(key).cloned()).expect("Failed to build test config")
}
