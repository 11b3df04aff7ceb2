//! Application setup and initialization

pub mod routes;
pub mod server;
pub mod services;

use std::sync::Arc;

use anyhow::{Context, Result};
use vidshift_core::Config;

use crate::state::AppState;
use services::Collaborators;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(config.environment())?;

    // Fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;
    tracing::info!(config = ?config, "Configuration loaded and validated successfully");

    let collaborators = services::setup_collaborators(&config).await?;
    build_app(config, collaborators)
}

/// Build state and router around already-constructed collaborators.
pub fn build_app(
    config: Config,
    collaborators: Collaborators,
) -> Result<(Arc<AppState>, axum::Router)> {
    let state = services::initialize_services(&config, collaborators)?;
    let router = routes::setup_routes(&config, state.clone())?;
    Ok((state, router))
}
