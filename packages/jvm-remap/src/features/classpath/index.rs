//! Reference Classpath Index
//!
//! Answers hierarchy and member-ownership questions for classes the
//! rewriter sees only by reference. Artifacts are read lazily, once per
//! (artifact, namespace) pair, and the cache lives as long as the index
//! (one remap run).
//!
//! Views in a namespace other than the artifact's own are derived from the
//! native view by translating names through the mapping model.

use super::class_info::{is_overridable, ClassInfo};
use super::error::{ClasspathError, ClasspathResult};
use crate::features::classfile::ClassFile;
use crate::features::mapping::{validate, MappingModel, MemberKind, Namespace, NamespaceId};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::io::{Cursor, Read, Seek};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// A member declaration found by the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDeclaration {
    pub owner: String,
    pub access: u16,
}

impl MemberDeclaration {
    pub fn is_overridable(&self, kind: MemberKind) -> bool {
        is_overridable(kind, self.access)
    }
}

/// Where an artifact's classes come from.
#[derive(Debug, Clone)]
pub enum ArtifactSource {
    /// A jar on disk
    Path(PathBuf),
    /// Jar bytes already in memory
    Bytes(Arc<[u8]>),
    /// Classes summarised by the caller (e.g. the artifact being remapped)
    Classes(Vec<ClassInfo>),
}

/// One artifact on the reference classpath, with the namespace its names
/// are written in.
#[derive(Debug, Clone)]
pub struct ReferenceArtifact {
    pub label: String,
    pub namespace: Namespace,
    pub source: ArtifactSource,
}

impl ReferenceArtifact {
    pub fn jar(path: impl Into<PathBuf>, namespace: impl Into<Namespace>) -> Self {
        let path = path.into();
        Self {
            label: path.display().to_string(),
            namespace: namespace.into(),
            source: ArtifactSource::Path(path),
        }
    }

    pub fn classes(
        label: impl Into<String>,
        namespace: impl Into<Namespace>,
        classes: Vec<ClassInfo>,
    ) -> Self {
        Self {
            label: label.into(),
            namespace: namespace.into(),
            source: ArtifactSource::Classes(classes),
        }
    }
}

#[derive(Debug, Default)]
struct ArtifactView {
    classes: FxHashMap<String, ClassInfo>,
}

type ViewCell = Arc<OnceCell<Arc<ArtifactView>>>;

pub struct ClasspathIndex {
    model: Arc<MappingModel>,
    artifacts: Vec<(ReferenceArtifact, NamespaceId)>,
    views: DashMap<(usize, NamespaceId), ViewCell>,
}

impl ClasspathIndex {
    /// Register artifacts; nothing is read until the first query.
    ///
    /// Lookups consult artifacts in the given order, first match wins.
    pub fn new(model: Arc<MappingModel>, artifacts: Vec<ReferenceArtifact>) -> ClasspathResult<Self> {
        let artifacts = artifacts
            .into_iter()
            .map(|artifact| {
                let id = validate(&model, artifact.namespace.as_str()).map_err(|source| {
                    ClasspathError::Namespace {
                        label: artifact.label.clone(),
                        source,
                    }
                })?;
                Ok((artifact, id))
            })
            .collect::<ClasspathResult<Vec<_>>>()?;

        Ok(Self {
            model,
            artifacts,
            views: DashMap::new(),
        })
    }

    pub fn artifact_count(&self) -> usize {
        self.artifacts.len()
    }

    /// Supertypes of `class_name`, nearest first: breadth-first, superclass
    /// before interfaces, no duplicates. Ancestors the index cannot see are
    /// listed but not expanded.
    pub fn resolve_super_hierarchy(
        &self,
        class_name: &str,
        namespace: NamespaceId,
    ) -> ClasspathResult<Vec<String>> {
        let mut ancestors = Vec::new();
        let mut seen: FxHashSet<String> = FxHashSet::default();
        seen.insert(class_name.to_string());
        let mut queue = VecDeque::from([class_name.to_string()]);

        while let Some(current) = queue.pop_front() {
            let parents = self.with_class(&current, namespace, |info| {
                info.super_name
                    .iter()
                    .chain(&info.interfaces)
                    .cloned()
                    .collect::<Vec<_>>()
            })?;
            for parent in parents.into_iter().flatten() {
                if seen.insert(parent.clone()) {
                    ancestors.push(parent.clone());
                    queue.push_back(parent);
                }
            }
        }
        Ok(ancestors)
    }

    /// The class that declares `member_name` + `descriptor`, searching
    /// `class_name` and then its ancestors. `None` when nobody visible does.
    pub fn resolve_owner_of_member(
        &self,
        class_name: &str,
        kind: MemberKind,
        member_name: &str,
        descriptor: &str,
        namespace: NamespaceId,
    ) -> ClasspathResult<Option<String>> {
        Ok(self
            .resolve_declaration(class_name, kind, member_name, descriptor, namespace)?
            .map(|declaration| declaration.owner))
    }

    /// Like [`ClasspathIndex::resolve_owner_of_member`], with the access
    /// flags of the declaration that was found.
    pub fn resolve_declaration(
        &self,
        class_name: &str,
        kind: MemberKind,
        member_name: &str,
        descriptor: &str,
        namespace: NamespaceId,
    ) -> ClasspathResult<Option<MemberDeclaration>> {
        let found = |owner: &str| -> ClasspathResult<Option<MemberDeclaration>> {
            Ok(self
                .member_access(owner, kind, member_name, descriptor, namespace)?
                .map(|access| MemberDeclaration {
                    owner: owner.to_string(),
                    access,
                }))
        };
        if let Some(declaration) = found(class_name)? {
            return Ok(Some(declaration));
        }
        for ancestor in self.resolve_super_hierarchy(class_name, namespace)? {
            if let Some(declaration) = found(&ancestor)? {
                return Ok(Some(declaration));
            }
        }
        Ok(None)
    }

    pub fn contains(&self, class_name: &str, namespace: NamespaceId) -> ClasspathResult<bool> {
        Ok(self.with_class(class_name, namespace, |_| ())?.is_some())
    }

    /// Access flags of the member when `class_name` itself declares it.
    pub fn member_access(
        &self,
        class_name: &str,
        kind: MemberKind,
        member_name: &str,
        descriptor: &str,
        namespace: NamespaceId,
    ) -> ClasspathResult<Option<u16>> {
        Ok(self
            .with_class(class_name, namespace, |info| {
                info.access(kind, member_name, descriptor)
            })?
            .flatten())
    }

    /// Run `f` on the first visible definition of `class_name`.
    fn with_class<R>(
        &self,
        class_name: &str,
        namespace: NamespaceId,
        f: impl FnOnce(&ClassInfo) -> R,
    ) -> ClasspathResult<Option<R>> {
        for idx in 0..self.artifacts.len() {
            let view = self.view(idx, namespace)?;
            if let Some(info) = view.classes.get(class_name) {
                return Ok(Some(f(info)));
            }
        }
        Ok(None)
    }

    fn view(&self, idx: usize, namespace: NamespaceId) -> ClasspathResult<Arc<ArtifactView>> {
        // clone the cell out so the shard lock is not held while loading
        let cell = self.views.entry((idx, namespace)).or_default().clone();
        cell.get_or_try_init(|| self.build_view(idx, namespace))
            .map(Arc::clone)
    }

    fn build_view(&self, idx: usize, namespace: NamespaceId) -> ClasspathResult<Arc<ArtifactView>> {
        let (artifact, native) = &self.artifacts[idx];
        if *native != namespace {
            let base = self.view(idx, *native)?;
            let classes = base
                .classes
                .values()
                .map(|info| info.translate(&self.model, *native, namespace))
                .map(|info| (info.name.clone(), info))
                .collect();
            debug!(
                artifact = %artifact.label,
                from = %self.model.namespace(*native),
                to = %self.model.namespace(namespace),
                "Translated classpath view"
            );
            return Ok(Arc::new(ArtifactView { classes }));
        }

        let classes = match &artifact.source {
            ArtifactSource::Classes(classes) => classes.clone(),
            ArtifactSource::Bytes(bytes) => read_jar(&artifact.label, Cursor::new(bytes.as_ref()))?,
            ArtifactSource::Path(path) => {
                let file = std::fs::File::open(path).map_err(|source| ClasspathError::Io {
                    label: artifact.label.clone(),
                    source,
                })?;
                read_jar(&artifact.label, std::io::BufReader::new(file))?
            }
        };
        debug!(
            artifact = %artifact.label,
            namespace = %artifact.namespace,
            classes = classes.len(),
            "Indexed reference artifact"
        );
        Ok(Arc::new(ArtifactView {
            classes: classes
                .into_iter()
                .map(|info| (info.name.clone(), info))
                .collect(),
        }))
    }
}

fn read_jar<R: Read + Seek>(label: &str, reader: R) -> ClasspathResult<Vec<ClassInfo>> {
    let archive_error = |source| ClasspathError::Archive {
        label: label.to_string(),
        source,
    };
    let mut archive = zip::ZipArchive::new(reader).map_err(archive_error)?;
    let mut classes = Vec::new();
    let mut buf = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(archive_error)?;
        if entry.is_dir() || !entry.name().ends_with(".class") {
            continue;
        }
        buf.clear();
        entry
            .read_to_end(&mut buf)
            .map_err(|source| ClasspathError::Io {
                label: label.to_string(),
                source,
            })?;
        match ClassFile::parse(&buf).and_then(|class| ClassInfo::from_class(&class)) {
            Ok(info) => classes.push(info),
            Err(err) => warn!(
                artifact = %label,
                entry = %entry.name(),
                error = %err,
                "Skipping unreadable class in reference artifact"
            ),
        }
    }
    Ok(classes)
}
