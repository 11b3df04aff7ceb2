//! Vidshift Core Library
//!
//! This crate provides the configuration, error taxonomy, domain models, clock
//! abstraction and upload validation shared by every vidshift component.

pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, TokioClock};
pub use config::{BaseConfig, Config, PipelineConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
