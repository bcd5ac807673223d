//! Remap Service - Usecase Layer for the remap invocation contract
//!
//! # Architecture
//!
//! ```text
//!  RemapConfig (YAML / CLI flags)
//!        │ validate()
//!        ▼
//!  mapping files ──read──▶ MappingTable* ──merge(anchor)──▶ MappingModel
//!                                                              │ validate_pair()
//!                                                              ▼
//!  input.jar ──▶ ArchiveTransformer (+ classpath jars) ──▶ output.jar
//! ```
//!
//! Configuration and both namespaces are checked before any archive bytes
//! are read.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use jvm_remap::config::RemapConfig;
//! use jvm_remap::usecases::RemapService;
//!
//! let config = RemapConfig::from_yaml("remap.yaml")?;
//! let service = RemapService::new(config)?;
//! let report = service.run("mod-named.jar".as_ref(), "mod-intermediary.jar".as_ref())?;
//! println!("{} classes rewritten", report.classes_rewritten);
//! ```

use crate::config::{ParallelConfig, RemapConfig};
use crate::errors::Result;
use crate::features::archive::{ArchiveTransformer, CancellationToken, TransformReport};
use crate::features::classpath::ReferenceArtifact;
use crate::features::mapping::{
    merge, read_mapping_file, validate_pair, MappingModel, MappingTable, NamespaceId,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Read mapping files in order and merge them on `anchor`.
pub fn load_mappings(paths: &[PathBuf], anchor: &str) -> Result<MappingModel> {
    let tables = paths
        .iter()
        .map(read_mapping_file)
        .collect::<std::result::Result<Vec<MappingTable>, _>>()?;
    let model = merge(&tables, anchor)?;
    info!(
        files = tables.len(),
        classes = model.class_count(),
        namespaces = model.namespaces().len(),
        "Merged mappings"
    );
    Ok(model)
}

/// Remap `input` into `output` from `source` to `target` names.
///
/// Auxiliary artifacts are read in the source namespace and only consulted
/// for hierarchy lookups. On error nothing is written to `output`.
pub fn remap(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    model: Arc<MappingModel>,
    source: &str,
    target: &str,
    auxiliary: &[PathBuf],
) -> Result<()> {
    let (source_id, target_id) = validate_pair(&model, source, target)?;
    let auxiliary = auxiliary
        .iter()
        .map(|path| ReferenceArtifact::jar(path, source))
        .collect();
    ArchiveTransformer::new(model, source_id, target_id)
        .with_auxiliary(auxiliary)
        .transform_file(input.as_ref(), output.as_ref())?;
    Ok(())
}

/// Configured remap engine: mappings merged and namespaces validated once,
/// then any number of archives transformed.
pub struct RemapService {
    model: Arc<MappingModel>,
    source: NamespaceId,
    target: NamespaceId,
    classpath: Vec<PathBuf>,
    parallel: ParallelConfig,
}

impl RemapService {
    /// Validate `config`, load and merge its mapping files, validate both
    /// namespaces.
    pub fn new(config: RemapConfig) -> Result<Self> {
        config.validate()?;
        let model = load_mappings(&config.mappings, &config.anchor_namespace)?;
        Self::with_model(Arc::new(model), &config)
    }

    /// Use an already merged model; mapping paths in `config` are ignored.
    pub fn with_model(model: Arc<MappingModel>, config: &RemapConfig) -> Result<Self> {
        config.parallel.validate()?;
        let (source, target) =
            validate_pair(&model, &config.source_namespace, &config.target_namespace)?;
        Ok(Self {
            model,
            source,
            target,
            classpath: config.classpath.clone(),
            parallel: config.parallel.clone(),
        })
    }

    pub fn model(&self) -> &Arc<MappingModel> {
        &self.model
    }

    pub fn transformer(&self) -> ArchiveTransformer {
        let namespace = self.model.namespace(self.source).clone();
        let auxiliary = self
            .classpath
            .iter()
            .map(|path| ReferenceArtifact::jar(path, namespace.clone()))
            .collect();
        ArchiveTransformer::new(Arc::clone(&self.model), self.source, self.target)
            .with_auxiliary(auxiliary)
            .with_parallel(self.parallel.clone())
    }

    pub fn run(&self, input: &Path, output: &Path) -> Result<TransformReport> {
        self.transformer().transform_file(input, output)
    }

    pub fn run_with_cancellation(
        &self,
        input: &Path,
        output: &Path,
        token: CancellationToken,
    ) -> Result<TransformReport> {
        self.transformer()
            .with_cancellation(token)
            .transform_file(input, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RemapError;
    use crate::features::mapping::NamespaceError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn tiny(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_service_rejects_unknown_namespace_before_reading_input() {
        let mappings = tiny("tiny\t2\t0\tofficial\tintermediary\nc\ta\tclass_1\n");
        let config = RemapConfig::new(
            vec![mappings.path().to_path_buf()],
            "official",
            "official",
            "named",
        );
        match RemapService::new(config) {
            Err(RemapError::Namespace(NamespaceError::NotFound { requested, .. })) => {
                assert_eq!(requested, "named")
            }
            other => panic!("expected NamespaceNotFound, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_load_mappings_merges_on_anchor() {
        let runtime = tiny("tiny\t2\t0\tofficial\tintermediary\nc\ta\tclass_1\n");
        let named = tiny("tiny\t2\t0\tintermediary\tnamed\nc\tclass_1\tnet/runtime/Entity\n");
        let model = load_mappings(
            &[runtime.path().to_path_buf(), named.path().to_path_buf()],
            "intermediary",
        )
        .unwrap();

        let official = model.namespace_id("official").unwrap();
        let named = model.namespace_id("named").unwrap();
        assert_eq!(model.map_class("a", official, named), Some("net/runtime/Entity"));
    }
}
