pub mod ingest;
pub mod pipeline;

pub use ingest::StorageGateway;
pub use pipeline::{PipelineSettings, VideoPipeline};
