//! Mapping Model - merged multi-namespace symbol graph
//!
//! Classes are stored in anchor-name order. Every namespace gets its own
//! name -> class index, and every class keeps a per-namespace
//! name -> members index, so all lookups are O(1) average. Member
//! descriptors are stored in anchor form; a descriptor given in another
//! namespace is translated to anchor form before the member lookup.
//!
//! A model is immutable once built and is shared between workers as
//! `Arc<MappingModel>`.

use super::namespace::{Namespace, NamespaceId};
use crate::features::mapping::error::MergeError;
use crate::shared::descriptor::{map_descriptor, DescriptorError};
use rustc_hash::FxHashMap;
use std::borrow::Cow;
use std::collections::BTreeSet;

/// Field or method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Field,
    Method,
}

impl MemberKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Field => "field",
            Self::Method => "method",
        }
    }
}

/// One field or method across namespaces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberMapping {
    names: Vec<Option<String>>,
    descriptor: String,
}

impl MemberMapping {
    pub(crate) fn new(names: Vec<Option<String>>, descriptor: String) -> Self {
        Self { names, descriptor }
    }

    /// Name in `namespace`, if the member is known there.
    pub fn name(&self, namespace: NamespaceId) -> Option<&str> {
        self.names.get(namespace.0).and_then(|n| n.as_deref())
    }

    /// Descriptor in anchor-namespace class names.
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }
}

/// One class across namespaces, with its members
#[derive(Debug, Clone)]
pub struct ClassMapping {
    names: Vec<Option<String>>,
    fields: Vec<MemberMapping>,
    methods: Vec<MemberMapping>,
    /// namespace -> member name -> indices into `fields`
    field_lookup: Vec<FxHashMap<String, Vec<usize>>>,
    method_lookup: Vec<FxHashMap<String, Vec<usize>>>,
}

impl ClassMapping {
    pub(crate) fn new(
        names: Vec<Option<String>>,
        fields: Vec<MemberMapping>,
        methods: Vec<MemberMapping>,
    ) -> Self {
        Self {
            names,
            fields,
            methods,
            field_lookup: Vec::new(),
            method_lookup: Vec::new(),
        }
    }

    /// Name in `namespace`, if the class is known there.
    pub fn name(&self, namespace: NamespaceId) -> Option<&str> {
        self.names.get(namespace.0).and_then(|n| n.as_deref())
    }

    pub fn fields(&self) -> &[MemberMapping] {
        &self.fields
    }

    pub fn methods(&self) -> &[MemberMapping] {
        &self.methods
    }

    pub fn members(&self, kind: MemberKind) -> &[MemberMapping] {
        match kind {
            MemberKind::Field => &self.fields,
            MemberKind::Method => &self.methods,
        }
    }

    /// Member named `name` in `namespace` whose anchor descriptor is `anchor_desc`.
    pub fn member(
        &self,
        kind: MemberKind,
        namespace: NamespaceId,
        name: &str,
        anchor_desc: &str,
    ) -> Option<&MemberMapping> {
        let (lookup, members) = match kind {
            MemberKind::Field => (&self.field_lookup, &self.fields),
            MemberKind::Method => (&self.method_lookup, &self.methods),
        };
        lookup
            .get(namespace.0)?
            .get(name)?
            .iter()
            .map(|&idx| &members[idx])
            .find(|member| member.descriptor == anchor_desc)
    }

    fn build_lookups(&mut self, namespaces: &[Namespace], anchor: NamespaceId) -> Result<(), MergeError> {
        let owner = self.name(anchor).unwrap_or_default().to_string();
        self.field_lookup = index_members(&self.fields, namespaces, anchor, &owner)?;
        self.method_lookup = index_members(&self.methods, namespaces, anchor, &owner)?;
        Ok(())
    }
}

fn index_members(
    members: &[MemberMapping],
    namespaces: &[Namespace],
    anchor: NamespaceId,
    owner: &str,
) -> Result<Vec<FxHashMap<String, Vec<usize>>>, MergeError> {
    let mut lookups = vec![FxHashMap::default(); namespaces.len()];
    for (ns, lookup) in lookups.iter_mut().enumerate() {
        for (idx, member) in members.iter().enumerate() {
            let Some(name) = member.names.get(ns).and_then(|n| n.as_deref()) else {
                continue;
            };
            let slot: &mut Vec<usize> = lookup.entry(name.to_string()).or_default();
            if let Some(&other) = slot
                .iter()
                .find(|&&other| members[other].descriptor == member.descriptor)
            {
                let label = |m: &MemberMapping| {
                    format!(
                        "{}.{}{}",
                        owner,
                        m.name(anchor).unwrap_or_default(),
                        m.descriptor
                    )
                };
                return Err(MergeError::Collision {
                    namespace: namespaces[ns].clone(),
                    name: name.to_string(),
                    first: label(&members[other]),
                    second: label(member),
                });
            }
            slot.push(idx);
        }
    }
    Ok(lookups)
}

/// Merged, queryable multi-namespace mapping graph
#[derive(Debug, Clone)]
pub struct MappingModel {
    anchor: NamespaceId,
    namespaces: Vec<Namespace>,
    classes: Vec<ClassMapping>,
    /// namespace -> class name -> index into `classes`
    class_lookup: Vec<FxHashMap<String, usize>>,
}

impl MappingModel {
    /// Finalise a model: build every index and reject name collisions.
    pub(crate) fn build(
        namespaces: Vec<Namespace>,
        anchor: NamespaceId,
        mut classes: Vec<ClassMapping>,
    ) -> Result<Self, MergeError> {
        for class in classes.iter_mut() {
            class.build_lookups(&namespaces, anchor)?;
        }

        let mut class_lookup: Vec<FxHashMap<String, usize>> =
            vec![FxHashMap::default(); namespaces.len()];
        for (idx, class) in classes.iter().enumerate() {
            for (ns, lookup) in class_lookup.iter_mut().enumerate() {
                let Some(name) = class.names.get(ns).and_then(|n| n.as_deref()) else {
                    continue;
                };
                if let Some(previous) = lookup.insert(name.to_string(), idx) {
                    return Err(MergeError::Collision {
                        namespace: namespaces[ns].clone(),
                        name: name.to_string(),
                        first: format!("class {}", classes[previous].name(anchor).unwrap_or_default()),
                        second: format!("class {}", class.name(anchor).unwrap_or_default()),
                    });
                }
            }
        }

        Ok(Self {
            anchor,
            namespaces,
            classes,
            class_lookup,
        })
    }

    pub fn anchor(&self) -> &Namespace {
        &self.namespaces[self.anchor.0]
    }

    pub fn anchor_id(&self) -> NamespaceId {
        self.anchor
    }

    /// Namespaces in model order (anchor first).
    pub fn namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }

    pub fn namespace_set(&self) -> BTreeSet<Namespace> {
        self.namespaces.iter().cloned().collect()
    }

    pub fn namespace_id(&self, name: &str) -> Option<NamespaceId> {
        self.namespaces
            .iter()
            .position(|ns| ns.as_str() == name)
            .map(NamespaceId)
    }

    pub fn namespace(&self, id: NamespaceId) -> &Namespace {
        &self.namespaces[id.0]
    }

    /// Classes in anchor-name order.
    pub fn classes(&self) -> &[ClassMapping] {
        &self.classes
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Class known as `name` in `namespace`.
    pub fn class(&self, name: &str, namespace: NamespaceId) -> Option<&ClassMapping> {
        self.class_lookup
            .get(namespace.0)?
            .get(name)
            .map(|&idx| &self.classes[idx])
    }

    /// Translate a class name. `None` when the class has no entry in either namespace.
    pub fn map_class(&self, name: &str, from: NamespaceId, to: NamespaceId) -> Option<&str> {
        self.class(name, from)?.name(to)
    }

    /// Translate every class name inside a descriptor; unknown classes stay unchanged.
    pub fn map_descriptor<'a>(
        &self,
        desc: &'a str,
        from: NamespaceId,
        to: NamespaceId,
    ) -> Result<Cow<'a, str>, DescriptorError> {
        if from == to {
            return Ok(Cow::Borrowed(desc));
        }
        map_descriptor(desc, |class| self.map_class(class, from, to).map(str::to_string))
    }

    /// Translate a member name, keyed by owner, name and descriptor in `from`.
    pub fn map_member(
        &self,
        kind: MemberKind,
        owner: &str,
        name: &str,
        desc: &str,
        from: NamespaceId,
        to: NamespaceId,
    ) -> Option<&str> {
        let class = self.class(owner, from)?;
        let anchor_desc = self.map_descriptor(desc, from, self.anchor).ok()?;
        class.member(kind, from, name, &anchor_desc)?.name(to)
    }

    pub fn map_field(
        &self,
        owner: &str,
        name: &str,
        desc: &str,
        from: NamespaceId,
        to: NamespaceId,
    ) -> Option<&str> {
        self.map_member(MemberKind::Field, owner, name, desc, from, to)
    }

    pub fn map_method(
        &self,
        owner: &str,
        name: &str,
        desc: &str,
        from: NamespaceId,
        to: NamespaceId,
    ) -> Option<&str> {
        self.map_member(MemberKind::Method, owner, name, desc, from, to)
    }
}
