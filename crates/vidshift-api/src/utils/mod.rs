pub mod ssrf_validation;

pub use ssrf_validation::{PublicOnlyResolver, SourceUrlError, SourceUrlPolicy};
