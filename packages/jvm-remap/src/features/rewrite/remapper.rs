//! Name resolution for one class rewrite
//!
//! Classes map through the model only. Members map through the model keyed
//! by their declaring class; when a reference names a subclass (the usual
//! case for inherited calls) the declaring class is found through the
//! classpath index before the member is given up as unmapped. Fields and
//! private or static methods resolve only through their declaring class;
//! only overridable instance methods take a mapping from an ancestor.

use crate::features::classpath::{is_overridable, ClasspathIndex, ClasspathResult};
use crate::features::mapping::{MappingModel, MemberKind, NamespaceId};
use crate::shared::{map_descriptor, map_signature, DescriptorError, SignatureError};
use rustc_hash::FxHashMap;
use std::borrow::Cow;
use tracing::trace;

/// Per-class counters, summed by the archive transformer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct RewriteStats {
    pub classes_renamed: usize,
    pub members_renamed: usize,
    pub unresolved: usize,
}

impl std::ops::AddAssign for RewriteStats {
    fn add_assign(&mut self, other: Self) {
        self.classes_renamed += other.classes_renamed;
        self.members_renamed += other.members_renamed;
        self.unresolved += other.unresolved;
    }
}

type MemberKey = (MemberKind, String, String, String);

pub struct Remapper<'a> {
    model: &'a MappingModel,
    index: &'a ClasspathIndex,
    source: NamespaceId,
    target: NamespaceId,
    members: FxHashMap<MemberKey, Option<&'a str>>,
    pub(crate) stats: RewriteStats,
}

impl<'a> Remapper<'a> {
    pub fn new(
        model: &'a MappingModel,
        index: &'a ClasspathIndex,
        source: NamespaceId,
        target: NamespaceId,
    ) -> Self {
        Self {
            model,
            index,
            source,
            target,
            members: FxHashMap::default(),
            stats: RewriteStats::default(),
        }
    }

    pub fn stats(&self) -> RewriteStats {
        self.stats
    }

    /// Target name of an internal class name; `None` leaves it unchanged.
    pub fn map_class(&self, name: &str) -> Option<&'a str> {
        self.model.map_class(name, self.source, self.target)
    }

    pub fn map_descriptor<'d>(&self, desc: &'d str) -> Result<Cow<'d, str>, DescriptorError> {
        map_descriptor(desc, |class| self.map_class(class).map(str::to_string))
    }

    pub fn map_signature<'d>(&self, signature: &'d str) -> Result<Cow<'d, str>, SignatureError> {
        map_signature(signature, |class| self.map_class(class).map(str::to_string))
    }

    /// Target name of a member referenced through `owner`.
    ///
    /// Tries `owner` itself, then the declaring class reported by the index,
    /// then every ancestor nearest first. Constructors and static
    /// initialisers are never renamed.
    pub fn map_member(
        &mut self,
        kind: MemberKind,
        owner: &str,
        name: &str,
        desc: &str,
    ) -> ClasspathResult<Option<&'a str>> {
        if name == "<init>" || name == "<clinit>" || owner.starts_with('[') {
            return Ok(None);
        }
        let key = (kind, owner.to_string(), name.to_string(), desc.to_string());
        if let Some(&cached) = self.members.get(&key) {
            return Ok(cached);
        }

        let resolved = self.resolve_member(kind, owner, name, desc)?;
        self.members.insert(key, resolved);
        Ok(resolved)
    }

    /// Like `map_member`, but for a declaration: private and static members
    /// do not override anything, so only the declaring class is consulted.
    pub fn map_declaration(
        &mut self,
        kind: MemberKind,
        owner: &str,
        name: &str,
        desc: &str,
        inherits: bool,
    ) -> ClasspathResult<Option<&'a str>> {
        if inherits {
            self.map_member(kind, owner, name, desc)
        } else if name == "<init>" || name == "<clinit>" {
            Ok(None)
        } else {
            Ok(self.direct(kind, owner, name, desc))
        }
    }

    fn direct(&self, kind: MemberKind, owner: &str, name: &str, desc: &str) -> Option<&'a str> {
        self.model
            .map_member(kind, owner, name, desc, self.source, self.target)
    }

    fn resolve_member(
        &mut self,
        kind: MemberKind,
        owner: &str,
        name: &str,
        desc: &str,
    ) -> ClasspathResult<Option<&'a str>> {
        if let Some(mapped) = self.direct(kind, owner, name, desc) {
            return Ok(Some(mapped));
        }

        let declaration = self
            .index
            .resolve_declaration(owner, kind, name, desc, self.source)?;
        if let Some(declaration) = &declaration {
            if declaration.owner != owner {
                if let Some(mapped) = self.direct(kind, &declaration.owner, name, desc) {
                    return Ok(Some(mapped));
                }
            }
            // fields, private and static methods belong to their declaring class
            if !declaration.is_overridable(kind) {
                return Ok(None);
            }
        }

        for ancestor in self.index.resolve_super_hierarchy(owner, self.source)? {
            let overridable = self
                .index
                .member_access(&ancestor, kind, name, desc, self.source)?
                .map_or(true, |access| is_overridable(kind, access));
            if !overridable {
                continue;
            }
            if let Some(mapped) = self.direct(kind, &ancestor, name, desc) {
                return Ok(Some(mapped));
            }
        }

        if declaration.is_none() && self.model.class(owner, self.source).is_none() {
            self.stats.unresolved += 1;
            trace!(
                kind = kind.as_str(),
                owner,
                name,
                desc,
                "Unresolved member reference left unchanged"
            );
        }
        Ok(None)
    }
}
