//! Mapping tables - one independently sourced input to the merger
//!
//! A table names a subset of namespaces. Each row carries one name cell per
//! table namespace (`None` when the entity is absent there). Member
//! descriptors are written in the table's first namespace, the way mapping
//! files store them.

use super::namespace::Namespace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTable {
    /// Label used in error messages (usually the file path)
    pub source: String,
    pub namespaces: Vec<Namespace>,
    pub classes: Vec<ClassEntry>,
}

impl MappingTable {
    pub fn new<I, S>(source: impl Into<String>, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Namespace>,
    {
        Self {
            source: source.into(),
            namespaces: namespaces.into_iter().map(Into::into).collect(),
            classes: Vec::new(),
        }
    }

    /// Column of `namespace` in this table.
    pub fn column(&self, namespace: &str) -> Option<usize> {
        self.namespaces.iter().position(|ns| ns.as_str() == namespace)
    }

    pub fn push(&mut self, class: ClassEntry) -> &mut ClassEntry {
        self.classes.push(class);
        let last = self.classes.len() - 1;
        &mut self.classes[last]
    }

    /// Builder form of [`MappingTable::push`].
    pub fn with_class(mut self, class: ClassEntry) -> Self {
        self.classes.push(class);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassEntry {
    pub names: Vec<Option<String>>,
    pub fields: Vec<MemberEntry>,
    pub methods: Vec<MemberEntry>,
}

impl ClassEntry {
    /// Row from one name per table column; empty strings mean "absent".
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: name_cells(names),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn with_field<I, S>(mut self, descriptor: &str, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.fields.push(MemberEntry::new(descriptor, names));
        self
    }

    pub fn with_method<I, S>(mut self, descriptor: &str, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.methods.push(MemberEntry::new(descriptor, names));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberEntry {
    /// Descriptor in the table's first namespace
    pub descriptor: String,
    pub names: Vec<Option<String>>,
}

impl MemberEntry {
    pub fn new<I, S>(descriptor: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            descriptor: descriptor.into(),
            names: name_cells(names),
        }
    }
}

pub(crate) fn name_cells<I, S>(names: I) -> Vec<Option<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| {
            let name = name.as_ref();
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}
