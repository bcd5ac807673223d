//! Archive Transformer
//!
//! ```text
//! read entries ──▶ summarise classes (pool) ──▶ index ──▶ rewrite classes (pool) ──▶ write in input order
//! ```
//!
//! Class entries are rewritten on a dedicated rayon pool; every other entry
//! is copied byte for byte. Results are collected in input order, so the
//! output does not depend on the worker count. Any failure discards all work.

use super::entry::{read_entries, write_entries, ArchiveEntry};
use crate::config::ParallelConfig;
use crate::errors::{RemapError, Result};
use crate::features::classfile::ClassFile;
use crate::features::classpath::{ClassInfo, ClasspathIndex, ReferenceArtifact};
use crate::features::mapping::{MappingModel, NamespaceId};
use crate::features::rewrite::{ClassRewriter, RewriteStats, RewrittenClass};
use rayon::prelude::*;
use serde::Serialize;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Cooperative cancellation flag, checked once per entry.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(RemapError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Counters for one transform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransformReport {
    pub entries: usize,
    pub classes_rewritten: usize,
    pub classes_renamed: usize,
    pub members_renamed: usize,
    pub passthrough: usize,
    pub unresolved: usize,
}

impl TransformReport {
    fn record(&mut self, stats: RewriteStats) {
        self.classes_rewritten += 1;
        self.classes_renamed += stats.classes_renamed;
        self.members_renamed += stats.members_renamed;
        self.unresolved += stats.unresolved;
    }
}

pub struct ArchiveTransformer {
    model: Arc<MappingModel>,
    source: NamespaceId,
    target: NamespaceId,
    auxiliary: Vec<ReferenceArtifact>,
    parallel: ParallelConfig,
    cancel: CancellationToken,
}

impl ArchiveTransformer {
    /// Namespaces must come from `validate`/`validate_pair` on `model`.
    pub fn new(model: Arc<MappingModel>, source: NamespaceId, target: NamespaceId) -> Self {
        Self {
            model,
            source,
            target,
            auxiliary: Vec::new(),
            parallel: ParallelConfig::default(),
            cancel: CancellationToken::default(),
        }
    }

    /// Reference artifacts consulted for hierarchy lookups; never written.
    pub fn with_auxiliary(mut self, auxiliary: Vec<ReferenceArtifact>) -> Self {
        self.auxiliary = auxiliary;
        self
    }

    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Transform an in-memory archive.
    pub fn transform(&self, input: &[u8]) -> Result<(Vec<u8>, TransformReport)> {
        self.parallel.validate()?;
        let entries = read_entries(Cursor::new(input))?;
        info!(
            entries = entries.len(),
            source = %self.model.namespace(self.source),
            target = %self.model.namespace(self.target),
            "Remapping archive"
        );

        let pool = self.parallel.build_pool()?;
        let rewritten = pool.install(|| self.rewrite_all(&entries))?;
        self.cancel.check()?;

        let mut report = TransformReport {
            entries: entries.len(),
            ..TransformReport::default()
        };
        let mut pairs = Vec::with_capacity(entries.len());
        for (entry, class) in entries.iter().zip(&rewritten) {
            match class {
                Some((name, class)) => {
                    report.record(class.stats);
                    pairs.push((entry, Some((name.as_str(), class.bytes.as_slice()))));
                }
                None => {
                    if !entry.is_dir {
                        report.passthrough += 1;
                    }
                    pairs.push((entry, None));
                }
            }
        }
        let output = write_entries(pairs)?;

        info!(
            classes = report.classes_rewritten,
            renamed = report.classes_renamed,
            members = report.members_renamed,
            passthrough = report.passthrough,
            unresolved = report.unresolved,
            "Archive remapped"
        );
        Ok((output, report))
    }

    /// Transform `input` into `output`. The output file appears only when the
    /// whole transform succeeded.
    pub fn transform_file(&self, input: &Path, output: &Path) -> Result<TransformReport> {
        let bytes = std::fs::read(input)?;
        let (remapped, report) = self.transform(&bytes)?;

        let dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(&remapped)?;
        temp.as_file().sync_all()?;
        temp.persist(output).map_err(|e| RemapError::Io(e.error))?;
        Ok(report)
    }

    /// Rewritten form of every class entry (output entry name + class),
    /// `None` for entries copied unchanged. Runs inside the worker pool.
    fn rewrite_all(&self, entries: &[ArchiveEntry]) -> Result<Vec<Option<(String, RewrittenClass)>>> {
        let classes = entries
            .par_iter()
            .filter(|entry| entry.is_class())
            .map(|entry| {
                self.cancel.check()?;
                ClassFile::parse(&entry.data)
                    .and_then(|class| ClassInfo::from_class(&class))
                    .map_err(|source| RemapError::MalformedInput {
                        entry: entry.name.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut artifacts = Vec::with_capacity(self.auxiliary.len() + 1);
        artifacts.push(ReferenceArtifact::classes(
            "<input>",
            self.model.namespace(self.source).clone(),
            classes,
        ));
        artifacts.extend(self.auxiliary.iter().cloned());
        let index = ClasspathIndex::new(Arc::clone(&self.model), artifacts)?;
        let rewriter = ClassRewriter::new(&self.model, &index, self.source, self.target);

        entries
            .par_iter()
            .map(|entry| {
                self.cancel.check()?;
                if !entry.is_class() {
                    return Ok(None);
                }
                let class = rewriter
                    .rewrite(&entry.data)
                    .map_err(|error| RemapError::from_rewrite(&entry.name, error))?;
                let name = renamed_entry(&entry.name, &class.original_name, &class.name);
                Ok(Some((name, class)))
            })
            .collect()
    }
}

/// Entry path for a class renamed from `from` to `to`. Paths that do not end
/// in the class's own name (e.g. under `META-INF/versions/`) keep their prefix.
fn renamed_entry(path: &str, from: &str, to: &str) -> String {
    if from == to {
        return path.to_string();
    }
    match path.strip_suffix(".class").and_then(|p| p.strip_suffix(from)) {
        Some(prefix) if prefix.is_empty() || prefix.ends_with('/') => format!("{prefix}{to}.class"),
        _ => path.to_string(),
    }
}
