//! Vidshift API Library
//!
//! HTTP handlers, the ingest and pipeline services, and application setup.

mod api_doc;
pub mod constants;
mod handlers;
pub mod services;
pub mod setup;
mod telemetry;
pub mod utils;

pub mod error;
pub mod state;

pub use error::ErrorResponse;
