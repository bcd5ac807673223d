//! Error types for jvm-remap
//!
//! `RemapError` is what the invocation contract returns. Every variant is
//! fatal: a transform that fails leaves no output artifact behind.
//! References that cannot be resolved are not errors; they are counted in
//! the transform report and left unchanged.

use crate::config::ConfigError;
use crate::features::classfile::ClassFileError;
use crate::features::classpath::ClasspathError;
use crate::features::mapping::{MappingFormatError, MergeError, NamespaceError};
use crate::features::rewrite::RewriteError;
use thiserror::Error;

/// Main error type for remap operations
#[derive(Debug, Error)]
pub enum RemapError {
    /// Required configuration absent or out of range
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Requested namespace not in the merged model
    #[error(transparent)]
    Namespace(#[from] NamespaceError),

    /// Mapping sources disagree or collide
    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    #[error(transparent)]
    MappingFormat(#[from] MappingFormatError),

    /// An entry named like a class is not a valid class file
    #[error("Malformed class entry '{entry}': {source}")]
    MalformedInput {
        entry: String,
        #[source]
        source: ClassFileError,
    },

    #[error(transparent)]
    Classpath(#[from] ClasspathError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Cannot start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Cancelled through a `CancellationToken`
    #[error("Transform cancelled")]
    Cancelled,
}

impl RemapError {
    /// Attach the archive entry name to a rewrite failure.
    pub(crate) fn from_rewrite(entry: &str, error: RewriteError) -> Self {
        match error {
            RewriteError::Malformed(source) => Self::MalformedInput {
                entry: entry.to_string(),
                source,
            },
            RewriteError::Classpath(error) => Self::Classpath(error),
        }
    }
}

/// Result type alias for remap operations
pub type Result<T> = std::result::Result<T, RemapError>;
