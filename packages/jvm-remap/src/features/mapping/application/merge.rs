//! Mapping Merger
//!
//! Joins tables on a shared anchor namespace. Tables are walked in caller
//! order; for every anchor class the per-namespace names contributed by each
//! table are unioned. Members are joined on (anchor name, anchor descriptor)
//! because their other names vary per namespace while overloads differ only
//! by descriptor. Two tables disagreeing about a name in one namespace is a
//! fatal conflict that names both sources.

use crate::features::mapping::domain::{
    ClassMapping, MappingModel, MappingTable, MemberKind, MemberMapping, Namespace, NamespaceId,
};
use crate::features::mapping::error::MergeError;
use crate::shared::descriptor::map_descriptor;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A name plus the index of the table that contributed it
#[derive(Debug, Clone)]
struct Sourced {
    name: String,
    table: usize,
}

#[derive(Debug)]
struct MemberDraft {
    names: Vec<Option<Sourced>>,
}

#[derive(Debug)]
struct ClassDraft {
    names: Vec<Option<Sourced>>,
    fields: BTreeMap<(String, String), MemberDraft>,
    methods: BTreeMap<(String, String), MemberDraft>,
}

impl ClassDraft {
    fn new(namespace_count: usize) -> Self {
        Self {
            names: vec![None; namespace_count],
            fields: BTreeMap::new(),
            methods: BTreeMap::new(),
        }
    }

    fn members(&mut self, kind: MemberKind) -> &mut BTreeMap<(String, String), MemberDraft> {
        match kind {
            MemberKind::Field => &mut self.fields,
            MemberKind::Method => &mut self.methods,
        }
    }
}

/// Merge `tables` into one model joined on `anchor`.
pub fn merge(tables: &[MappingTable], anchor: &str) -> Result<MappingModel, MergeError> {
    let anchor_ns = Namespace::from(anchor);

    let mut namespaces = vec![anchor_ns.clone()];
    for table in tables {
        if table.column(anchor).is_none() {
            return Err(MergeError::AnchorMissing {
                source_name: table.source.clone(),
                anchor: anchor_ns,
                namespaces: table.namespaces.clone(),
            });
        }
        for ns in &table.namespaces {
            if !namespaces.contains(ns) {
                namespaces.push(ns.clone());
            }
        }
    }

    let mut drafts: BTreeMap<String, ClassDraft> = BTreeMap::new();
    let mut skipped = 0usize;

    for (table_idx, table) in tables.iter().enumerate() {
        let anchor_col = table.column(anchor).unwrap_or_default();
        let columns: Vec<usize> = table
            .namespaces
            .iter()
            .map(|ns| namespaces.iter().position(|n| n == ns).unwrap_or_default())
            .collect();

        // Descriptors are written in the table's first namespace
        let to_anchor: Option<FxHashMap<&str, &str>> = (anchor_col != 0).then(|| {
            table
                .classes
                .iter()
                .filter_map(|class| {
                    let first = class.names.first()?.as_deref()?;
                    let anchor_name = class.names.get(anchor_col)?.as_deref()?;
                    Some((first, anchor_name))
                })
                .collect()
        });

        for class in &table.classes {
            let Some(anchor_name) = class.names.get(anchor_col).and_then(|n| n.clone()) else {
                warn!(
                    "{}: skipping class row without a '{}' name: {:?}",
                    table.source, anchor, class.names
                );
                skipped += 1;
                continue;
            };

            let draft = drafts
                .entry(anchor_name.clone())
                .or_insert_with(|| ClassDraft::new(namespaces.len()));
            absorb(&mut draft.names, &class.names, &columns, table_idx, tables, &namespaces, || {
                format!("class {}", anchor_name)
            })?;

            for (kind, members) in [
                (MemberKind::Field, &class.fields),
                (MemberKind::Method, &class.methods),
            ] {
                for member in members {
                    let Some(member_anchor) = member.names.get(anchor_col).and_then(|n| n.clone())
                    else {
                        warn!(
                            "{}: skipping {} row of {} without a '{}' name",
                            table.source,
                            kind.as_str(),
                            anchor_name,
                            anchor
                        );
                        skipped += 1;
                        continue;
                    };

                    let anchor_desc = match &to_anchor {
                        Some(classes) => map_descriptor(&member.descriptor, |c| {
                            classes.get(c).map(|n| n.to_string())
                        }),
                        None => map_descriptor(&member.descriptor, |_| None),
                    }
                    .map_err(|error| MergeError::MalformedDescriptor {
                        source_name: table.source.clone(),
                        error,
                    })?
                    .into_owned();

                    let label = || {
                        format!(
                            "{} {}.{}{}",
                            kind.as_str(),
                            anchor_name,
                            member_anchor,
                            anchor_desc
                        )
                    };
                    let slot = draft
                        .members(kind)
                        .entry((member_anchor.clone(), anchor_desc.clone()))
                        .or_insert_with(|| MemberDraft {
                            names: vec![None; namespaces.len()],
                        });
                    absorb(&mut slot.names, &member.names, &columns, table_idx, tables, &namespaces, label)?;
                }
            }
        }
    }

    let classes: Vec<ClassMapping> = drafts
        .into_values()
        .map(|draft| {
            let finish = |members: BTreeMap<(String, String), MemberDraft>| {
                members
                    .into_iter()
                    .map(|((_, desc), member)| MemberMapping::new(strip(member.names), desc))
                    .collect::<Vec<_>>()
            };
            ClassMapping::new(strip(draft.names), finish(draft.fields), finish(draft.methods))
        })
        .collect();

    debug!(
        "merged {} mapping tables on '{}': {} classes, namespaces [{}], {} rows skipped",
        tables.len(),
        anchor,
        classes.len(),
        namespaces.iter().map(Namespace::as_str).collect::<Vec<_>>().join(", "),
        skipped
    );

    MappingModel::build(namespaces, NamespaceId(0), classes)
}

impl MappingModel {
    /// Model of a single table, joined on `anchor`.
    pub fn from_table(table: &MappingTable, anchor: &str) -> Result<Self, MergeError> {
        merge(std::slice::from_ref(table), anchor)
    }
}

fn absorb<L>(
    slots: &mut [Option<Sourced>],
    names: &[Option<String>],
    columns: &[usize],
    table_idx: usize,
    tables: &[MappingTable],
    namespaces: &[Namespace],
    label: L,
) -> Result<(), MergeError>
where
    L: Fn() -> String,
{
    for (col, name) in names.iter().enumerate() {
        let (Some(name), Some(&ns)) = (name, columns.get(col)) else {
            continue;
        };
        match &slots[ns] {
            None => {
                slots[ns] = Some(Sourced {
                    name: name.clone(),
                    table: table_idx,
                });
            }
            Some(existing) if existing.name == *name => {}
            Some(existing) => {
                return Err(MergeError::Conflict {
                    entity: label(),
                    namespace: namespaces[ns].clone(),
                    first_source: tables[existing.table].source.clone(),
                    first_name: existing.name.clone(),
                    second_source: tables[table_idx].source.clone(),
                    second_name: name.clone(),
                });
            }
        }
    }
    Ok(())
}

fn strip(names: Vec<Option<Sourced>>) -> Vec<Option<String>> {
    names.into_iter().map(|n| n.map(|s| s.name)).collect()
}
