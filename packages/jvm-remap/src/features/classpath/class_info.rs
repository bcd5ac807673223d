//! Hierarchy and member summary of one class

use crate::features::classfile::{ClassFile, ClassFileResult, MemberInfo, ACC_PRIVATE, ACC_STATIC};
use crate::features::mapping::{MappingModel, MemberKind, NamespaceId};
use rustc_hash::FxHashMap;
use std::borrow::Cow;

/// Declared members of one kind: name -> descriptor -> access flags.
pub type MemberTable = FxHashMap<String, FxHashMap<String, u16>>;

/// What the index needs to know about a class: its supertypes and the
/// members it declares (name + descriptor + access flags).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: MemberTable,
    pub methods: MemberTable,
}

/// Whether a member with `access` can be overridden by a subclass.
pub fn is_overridable(kind: MemberKind, access: u16) -> bool {
    kind == MemberKind::Method && access & (ACC_PRIVATE | ACC_STATIC) == 0
}

impl ClassInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            super_name: None,
            interfaces: Vec::new(),
            fields: MemberTable::default(),
            methods: MemberTable::default(),
        }
    }

    pub fn with_super(mut self, super_name: impl Into<String>) -> Self {
        self.super_name = Some(super_name.into());
        self
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Public instance field.
    pub fn with_field(self, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        self.with_member(MemberKind::Field, name, descriptor, 0x0001)
    }

    /// Public instance method.
    pub fn with_method(self, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        self.with_member(MemberKind::Method, name, descriptor, 0x0001)
    }

    pub fn with_member(
        mut self,
        kind: MemberKind,
        name: impl Into<String>,
        descriptor: impl Into<String>,
        access: u16,
    ) -> Self {
        insert(self.members_mut(kind), name.into(), descriptor.into(), access);
        self
    }

    /// Summarise a parsed class.
    pub fn from_class(class: &ClassFile) -> ClassFileResult<Self> {
        let pool = &class.pool;
        let member_table = |members: &[MemberInfo]| -> ClassFileResult<MemberTable> {
            let mut table = MemberTable::default();
            for member in members {
                insert(
                    &mut table,
                    pool.utf8(member.name)?.to_string(),
                    pool.utf8(member.descriptor)?.to_string(),
                    member.access,
                );
            }
            Ok(table)
        };

        Ok(Self {
            name: class.name()?.to_string(),
            super_name: class.super_name()?.map(str::to_string),
            interfaces: class
                .interface_names()?
                .into_iter()
                .map(str::to_string)
                .collect(),
            fields: member_table(&class.fields)?,
            methods: member_table(&class.methods)?,
        })
    }

    pub fn members(&self, kind: MemberKind) -> &MemberTable {
        match kind {
            MemberKind::Field => &self.fields,
            MemberKind::Method => &self.methods,
        }
    }

    fn members_mut(&mut self, kind: MemberKind) -> &mut MemberTable {
        match kind {
            MemberKind::Field => &mut self.fields,
            MemberKind::Method => &mut self.methods,
        }
    }

    /// Access flags of the member when this class itself declares it.
    pub fn access(&self, kind: MemberKind, name: &str, descriptor: &str) -> Option<u16> {
        self.members(kind).get(name)?.get(descriptor).copied()
    }

    pub fn declares(&self, kind: MemberKind, name: &str, descriptor: &str) -> bool {
        self.access(kind, name, descriptor).is_some()
    }

    /// The same class as seen from namespace `to`. Names without a mapping
    /// stay unchanged.
    ///
    /// Members translate through a direct model lookup on this class only:
    /// an override of a mapped inherited method keeps its `from` name in the
    /// translated view. Rewriting queries views in the source namespace, so
    /// this only limits member lookups in other namespaces.
    pub(crate) fn translate(&self, model: &MappingModel, from: NamespaceId, to: NamespaceId) -> Self {
        let class = |name: &str| model.map_class(name, from, to).unwrap_or(name).to_string();
        let descriptor = |desc: &str| {
            model
                .map_descriptor(desc, from, to)
                .map(Cow::into_owned)
                .unwrap_or_else(|_| desc.to_string())
        };
        let members = |kind: MemberKind| {
            let mut table = MemberTable::default();
            for (name, descriptors) in self.members(kind) {
                for (desc, &access) in descriptors {
                    let mapped = model
                        .map_member(kind, &self.name, name, desc, from, to)
                        .unwrap_or(name);
                    insert(&mut table, mapped.to_string(), descriptor(desc), access);
                }
            }
            table
        };

        Self {
            name: class(&self.name),
            super_name: self.super_name.as_deref().map(class),
            interfaces: self.interfaces.iter().map(|i| class(i)).collect(),
            fields: members(MemberKind::Field),
            methods: members(MemberKind::Method),
        }
    }
}

fn insert(table: &mut MemberTable, name: String, descriptor: String, access: u16) {
    table.entry(name).or_default().insert(descriptor, access);
}
