//! Tiny mapping files (v1 and v2)
//!
//! Tiny is the tab-separated format the mapping toolchain ships:
//!
//! ```text
//! tiny	2	0	official	intermediary
//! c	a	net/minecraft/class_1
//! 	f	I	b	field_1
//! 	m	(La;)V	c	method_1
//! 		p	1		param_0
//! ```
//!
//! Parameter, local variable and comment rows are accepted and ignored.
//! Empty name cells mean "absent in that namespace".

use crate::features::mapping::domain::{
    name_cells, ClassEntry, MappingModel, MappingTable, MemberEntry, MemberMapping, NamespaceId,
};
use crate::features::mapping::error::MappingFormatError;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Read a mapping file from disk; the path becomes the table's source label.
pub fn read_mapping_file(path: impl AsRef<Path>) -> Result<MappingTable, MappingFormatError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    read_mappings(BufReader::new(file), &path.display().to_string())
}

/// Read a Tiny v1 or v2 table, detected from the header line.
pub fn read_mappings<R: BufRead>(reader: R, source: &str) -> Result<MappingTable, MappingFormatError> {
    let mut lines = reader.lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => {
            return Err(MappingFormatError::UnknownFormat {
                source_name: source.to_string(),
                header: String::new(),
            })
        }
    };
    let header = header.trim_end_matches('\r');
    let fields: Vec<&str> = header.split('\t').collect();

    match fields.as_slice() {
        ["tiny", "2", _minor, namespaces @ ..] if namespaces.len() >= 2 => {
            parse_v2(lines, source, namespaces)
        }
        ["v1", namespaces @ ..] if namespaces.len() >= 2 => parse_v1(lines, source, namespaces),
        _ => Err(MappingFormatError::UnknownFormat {
            source_name: source.to_string(),
            header: header.to_string(),
        }),
    }
}

fn parse_v2<I>(lines: I, source: &str, namespaces: &[&str]) -> Result<MappingTable, MappingFormatError>
where
    I: Iterator<Item = std::io::Result<String>>,
{
    let mut table = MappingTable::new(source, namespaces.iter().copied());
    let width = namespaces.len();
    let mut escaped = false;
    let mut in_header = true;
    let mut current: Option<usize> = None;

    for (idx, line) in lines.enumerate() {
        let line_no = idx + 2;
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }

        let depth = line.bytes().take_while(|&b| b == b'\t').count();
        let cells: Vec<&str> = line[depth..].split('\t').collect();

        if in_header && depth == 1 {
            if cells[0] == "escaped-names" {
                escaped = true;
            }
            continue;
        }
        in_header = false;

        let names = |cells: &[&str]| -> Result<Vec<Option<String>>, MappingFormatError> {
            if cells.len() != width {
                return Err(MappingFormatError::syntax(
                    source,
                    line_no,
                    format!("expected {} names, found {}", width, cells.len()),
                ));
            }
            Ok(name_cells(cells.iter().map(|c| {
                if escaped {
                    unescape(c)
                } else {
                    (*c).to_string()
                }
            })))
        };

        match (depth, cells[0]) {
            (0, "c") => {
                table.push(ClassEntry {
                    names: names(&cells[1..])?,
                    ..ClassEntry::default()
                });
                current = Some(table.classes.len() - 1);
            }
            (1, kind @ ("f" | "m")) => {
                let class_idx = current.ok_or_else(|| {
                    MappingFormatError::syntax(source, line_no, "member row outside of a class")
                })?;
                let descriptor = cells.get(1).ok_or_else(|| {
                    MappingFormatError::syntax(source, line_no, "member row without descriptor")
                })?;
                let member = MemberEntry {
                    descriptor: (*descriptor).to_string(),
                    names: names(&cells[2..])?,
                };
                let class = &mut table.classes[class_idx];
                if kind == "f" {
                    class.fields.push(member);
                } else {
                    class.methods.push(member);
                }
            }
            (1, "c") => {}
            (d, _) if d >= 2 => {}
            (_, other) => {
                return Err(MappingFormatError::syntax(
                    source,
                    line_no,
                    format!("unexpected row kind '{}' at depth {}", other, depth),
                ))
            }
        }
    }

    Ok(table)
}

fn parse_v1<I>(lines: I, source: &str, namespaces: &[&str]) -> Result<MappingTable, MappingFormatError>
where
    I: Iterator<Item = std::io::Result<String>>,
{
    let mut table = MappingTable::new(source, namespaces.iter().copied());
    let width = namespaces.len();
    let mut by_owner: FxHashMap<String, usize> = FxHashMap::default();

    for (idx, line) in lines.enumerate() {
        let line_no = idx + 2;
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let cells: Vec<&str> = line.split('\t').collect();
        let arity = |expected: usize| {
            if cells.len() == expected {
                Ok(())
            } else {
                Err(MappingFormatError::syntax(
                    source,
                    line_no,
                    format!("expected {} cells, found {}", expected, cells.len()),
                ))
            }
        };

        match cells[0] {
            "CLASS" => {
                arity(1 + width)?;
                let names = name_cells(cells[1..].iter());
                match by_owner.get(cells[1]) {
                    // an earlier member row created a placeholder for this class
                    Some(&existing) => table.classes[existing].names = names,
                    None => {
                        table.push(ClassEntry {
                            names,
                            ..ClassEntry::default()
                        });
                        by_owner.insert(cells[1].to_string(), table.classes.len() - 1);
                    }
                }
            }
            kind @ ("FIELD" | "METHOD") => {
                arity(3 + width)?;
                let owner = cells[1];
                let class_idx = match by_owner.get(owner) {
                    Some(&existing) => existing,
                    None => {
                        let mut placeholder = vec![""; width];
                        placeholder[0] = owner;
                        table.push(ClassEntry::new(placeholder));
                        by_owner.insert(owner.to_string(), table.classes.len() - 1);
                        table.classes.len() - 1
                    }
                };
                let member = MemberEntry::new(cells[2], cells[3..].iter());
                let class = &mut table.classes[class_idx];
                if kind == "FIELD" {
                    class.fields.push(member);
                } else {
                    class.methods.push(member);
                }
            }
            other => {
                return Err(MappingFormatError::syntax(
                    source,
                    line_no,
                    format!("unexpected row kind '{}'", other),
                ))
            }
        }
    }

    Ok(table)
}

/// Write a merged model as Tiny v2, anchor namespace first.
pub fn write_tiny_v2<W: Write>(model: &MappingModel, mut out: W) -> std::io::Result<()> {
    let escaped = model.classes().iter().any(|class| {
        model.namespaces().iter().enumerate().any(|(ns, _)| {
            let id = NamespaceId(ns);
            class.name(id).is_some_and(needs_escape)
                || class
                    .fields()
                    .iter()
                    .chain(class.methods())
                    .any(|m| m.name(id).is_some_and(needs_escape))
        })
    });

    write!(out, "tiny\t2\t0")?;
    for ns in model.namespaces() {
        write!(out, "\t{}", ns)?;
    }
    writeln!(out)?;
    if escaped {
        writeln!(out, "\tescaped-names")?;
    }

    let ids: Vec<_> = (0..model.namespaces().len())
        .map(NamespaceId)
        .collect();
    let cell = |name: Option<&str>| -> String {
        match name {
            Some(name) if escaped => escape(name),
            Some(name) => name.to_string(),
            None => String::new(),
        }
    };
    let row = |names: Vec<String>| names.join("\t");

    for class in model.classes() {
        writeln!(out, "c\t{}", row(ids.iter().map(|&id| cell(class.name(id))).collect()))?;
        let mut member_rows = |tag: &str, members: &[MemberMapping]| -> std::io::Result<()> {
            for member in members {
                writeln!(
                    out,
                    "\t{}\t{}\t{}",
                    tag,
                    member.descriptor(),
                    row(ids.iter().map(|&id| cell(member.name(id))).collect())
                )?;
            }
            Ok(())
        };
        member_rows("f", class.fields())?;
        member_rows("m", class.methods())?;
    }
    Ok(())
}

fn needs_escape(name: &str) -> bool {
    name.contains(['\\', '\n', '\r', '\t', '\0'])
}

fn escape(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(cell: &str) -> String {
    if !cell.contains('\\') {
        return cell.to_string();
    }
    let mut out = String::with_capacity(cell.len());
    let mut chars = cell.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
