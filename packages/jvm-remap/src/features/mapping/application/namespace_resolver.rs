//! Namespace Resolver
//!
//! Fail-fast validation of requested namespaces. Runs once per remap
//! invocation, for both source and target, before any bytes are touched.

use crate::features::mapping::domain::{MappingModel, NamespaceError, NamespaceId};

/// Check that `namespace` exists in `model`.
pub fn validate(model: &MappingModel, namespace: &str) -> Result<NamespaceId, NamespaceError> {
    model
        .namespace_id(namespace)
        .ok_or_else(|| NamespaceError::NotFound {
            requested: namespace.to_string(),
            available: model.namespace_set(),
        })
}

/// Validate a (source, target) pair, source first.
pub fn validate_pair(
    model: &MappingModel,
    source: &str,
    target: &str,
) -> Result<(NamespaceId, NamespaceId), NamespaceError> {
    Ok((validate(model, source)?, validate(model, target)?))
}
