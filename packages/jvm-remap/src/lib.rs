/*
 * JVM Remap - mapping merge and class archive remapping engine
 *
 * Feature-First Architecture:
 * - shared/      : Descriptor/signature grammar, modified UTF-8
 * - features/    : Vertical slices (mapping → classfile → classpath → rewrite → archive)
 * - config/      : Versioned YAML configuration
 * - usecases/    : remap() invocation contract and RemapService
 *
 * Concurrency:
 * - MappingModel and ClasspathIndex are shared read-only across workers
 * - Per-entry rewriting on a dedicated Rayon pool, output in input order
 */

#![allow(clippy::too_many_arguments)] // remap contract mirrors the glue's call
#![allow(clippy::new_without_default)] // Default impl not always needed

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Shared naming grammar
pub mod shared;

/// Feature modules (vertical slices)
pub mod features;

/// Configuration (YAML schema v1)
pub mod config;

/// Usecase layer (invocation contract)
pub mod usecases;

/// Error types
pub mod errors;

pub use config::{ConfigError, ParallelConfig, RemapConfig};
pub use errors::{RemapError, Result};
pub use features::archive::{ArchiveTransformer, CancellationToken, TransformReport};
pub use features::classpath::{ClassInfo, ClasspathIndex, ReferenceArtifact};
pub use features::mapping::{
    merge, validate, validate_pair, MappingModel, MappingTable, Namespace, NamespaceError,
};
pub use features::rewrite::{rewrite, ClassRewriter, RewriteStats};
pub use usecases::{load_mappings, remap, RemapService};
