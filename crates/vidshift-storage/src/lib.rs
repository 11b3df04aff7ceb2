//! Vidshift Storage Library
//!
//! This crate provides the storage abstraction used to hold source videos
//! before moderation and generation. It includes the Storage trait and
//! implementations for S3 and the local filesystem.
//!
//! # Storage key format
//!
//! Every stored video gets a fresh key `videos/{uuid}.{extension}`, so two
//! requests never write to the same object. Keys must not contain `..` or a
//! leading `/`.

mod error;
pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::{S3Credentials, S3Storage};
pub use traits::{Storage, StorageError, StorageResult, StoredObject};
pub use vidshift_core::StorageBackend;
