//! Mapping use cases: merging tables and validating namespaces

mod merge;
pub mod namespace_resolver;

pub use merge::merge;
pub use namespace_resolver::{validate, validate_pair};
