//! Mapping file formats

pub mod tiny;

pub use tiny::{read_mapping_file, read_mappings, write_tiny_v2};
