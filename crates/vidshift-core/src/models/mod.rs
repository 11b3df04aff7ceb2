pub mod generation;
pub mod job;
pub mod moderation;
pub mod pipeline;
pub mod video;

pub use generation::*;
pub use job::*;
pub use moderation::*;
pub use pipeline::*;
pub use video::*;
