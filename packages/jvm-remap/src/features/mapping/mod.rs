//! Mapping feature: model, merger, namespace resolver and file formats
//!
//! ```text
//! tiny files ──▶ MappingTable ──merge(anchor)──▶ MappingModel ──validate──▶ NamespaceId
//! ```

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::{merge, validate, validate_pair};
pub use domain::{
    ClassEntry, ClassMapping, MappingModel, MappingTable, MemberEntry, MemberKind, MemberMapping,
    Namespace, NamespaceError, NamespaceId,
};
pub use error::{MappingFormatError, MergeError};
pub use infrastructure::{read_mapping_file, read_mappings, write_tiny_v2};
