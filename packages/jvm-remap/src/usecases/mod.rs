//! Usecase Layer - the remap invocation contract
//!
//! Build-tool glue calls [`remap`] (or a configured [`RemapService`]) after
//! it has located mapping files and chosen namespaces.

pub mod remap_service;

// Re-export main API
pub use remap_service::{load_mappings, remap, RemapService};
