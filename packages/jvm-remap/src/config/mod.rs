//! Remap configuration
//!
//! Loaded from versioned YAML and validated up front; a configuration that
//! passes `validate()` has every setting the engine needs.

pub mod error;
pub mod parallel;
pub mod remap_config;

pub use error::{ConfigError, ConfigResult};
pub use parallel::ParallelConfig;
pub use remap_config::RemapConfig;
