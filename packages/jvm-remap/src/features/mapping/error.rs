//! Error types for mapping merge and mapping file parsing

use super::domain::Namespace;
use crate::shared::DescriptorError;
use thiserror::Error;

/// Fatal consistency errors raised while merging mapping tables.
///
/// All of these abort before any class bytes are touched.
#[derive(Debug, Error)]
pub enum MergeError {
    /// A table does not carry the anchor namespace used as the join key
    #[error("Mapping source '{source_name}' does not define anchor namespace '{anchor}' (it defines: {})", namespaces.iter().map(|n| n.as_str()).collect::<Vec<_>>().join(", "))]
    AnchorMissing {
        source_name: String,
        anchor: Namespace,
        namespaces: Vec<Namespace>,
    },

    /// Two tables name the same entity differently in one namespace
    #[error("Mapping conflict for {entity} in namespace '{namespace}': '{first_source}' maps it to '{first_name}' but '{second_source}' maps it to '{second_name}'")]
    Conflict {
        entity: String,
        namespace: Namespace,
        first_source: String,
        first_name: String,
        second_source: String,
        second_name: String,
    },

    /// Two distinct anchor entities end up with the same name in one namespace
    #[error("Name collision in namespace '{namespace}': '{name}' is used by both {first} and {second}")]
    Collision {
        namespace: Namespace,
        name: String,
        first: String,
        second: String,
    },

    /// A member descriptor in a table could not be parsed
    #[error("Malformed descriptor in mapping source '{source_name}': {error}")]
    MalformedDescriptor {
        source_name: String,
        #[source]
        error: DescriptorError,
    },
}

/// Errors raised while reading a mapping file.
#[derive(Debug, Error)]
pub enum MappingFormatError {
    /// The header line does not identify a supported format
    #[error("Unrecognised mapping header in '{source_name}': '{header}'. Supported formats: tiny v1, tiny v2")]
    UnknownFormat { source_name: String, header: String },

    /// A row does not follow the format grammar
    #[error("{source_name}:{line}: {message}")]
    Syntax {
        source_name: String,
        line: usize,
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MappingFormatError {
    pub(crate) fn syntax(source_name: &str, line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            source_name: source_name.to_string(),
            line,
            message: message.into(),
        }
    }
}
