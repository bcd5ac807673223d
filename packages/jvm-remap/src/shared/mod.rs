//! Shared module - JVM naming grammar used across features
//!
//! Descriptor and signature rewriting plus the modified UTF-8 codec. No
//! dependency on the mapping model or the class-file structure.

pub mod descriptor;
pub mod mutf8;
pub mod signature;

pub use descriptor::{map_class_name, map_descriptor, DescriptorError};
pub use signature::{map_signature, SignatureError};
