//! Vidshift Providers
//!
//! Clients for the two external services the pipeline depends on: a
//! content-moderation provider (AWS Rekognition) and a video-to-video
//! generation provider (Runway). Both are asynchronous job APIs, so each side
//! pairs a provider trait with a gate/client that owns the polling policy.

pub mod error;
pub mod generation;
pub mod moderation;
pub mod polling;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use error::{ProviderError, ProviderResult};
pub use generation::{GenerationClient, GenerationProvider};
pub use moderation::{ModerationGate, ModerationProvider};
pub use polling::{PollPolicy, PollStep, Polled};

#[cfg(feature = "provider-runway")]
pub use generation::runway::{RunwayClient, RunwayConfig};
#[cfg(feature = "provider-aws-rekognition")]
pub use moderation::rekognition::RekognitionModerator;
