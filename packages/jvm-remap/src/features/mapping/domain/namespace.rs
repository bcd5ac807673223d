//! Namespace identifiers

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Name of a symbol-naming scheme ("official", "intermediary", ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Namespace {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Namespace {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Namespace {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Dense index of a namespace inside one `MappingModel`.
///
/// Only meaningful for the model that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespaceId(pub(crate) usize);

impl NamespaceId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Requested namespace is absent from the merged model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamespaceError {
    #[error("Namespace '{requested}' is not available in mappings! Available namespaces are: [{}]", available.iter().map(Namespace::as_str).collect::<Vec<_>>().join(", "))]
    NotFound {
        requested: String,
        available: BTreeSet<Namespace>,
    },
}

impl NamespaceError {
    /// Full set of namespaces the model does provide.
    pub fn available(&self) -> &BTreeSet<Namespace> {
        match self {
            Self::NotFound { available, .. } => available,
        }
    }
}
