//! Attribute layouts
//!
//! Attribute bodies are kept as raw bytes. This module knows where inside
//! each body a constant pool reference to a Utf8 or NameAndType entry sits
//! ("slots") and what that reference means, so callers can rewrite the
//! `u16` in place without re-encoding the attribute.

use super::bytes::{read_u16_at, ByteReader};
use super::class_file::{Attribute, ClassFile};
use super::constant_pool::ConstantPool;
use super::error::{ClassFileError, ClassFileResult};
use byteorder::{BigEndian, WriteBytesExt};
use std::io::{self, Write};

/// Attributes with no Utf8/NameAndType references in their body.
const OPAQUE_ATTRIBUTES: &[&str] = &[
    "ConstantValue",
    "Exceptions",
    "LineNumberTable",
    "StackMapTable",
    "NestHost",
    "NestMembers",
    "PermittedSubclasses",
    "BootstrapMethods",
    "Deprecated",
    "Synthetic",
    "SourceDebugExtension",
];

/// What a slot's constant means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRole {
    /// Utf8 copied as-is (nested attribute names, string values, parameter names)
    Plain,
    /// Generic class, field or method signature
    Signature,
    FieldDescriptor,
    /// Annotation class literal: a return descriptor (`V` or a field type)
    ReturnDescriptor,
    /// Enum constant name; the enum's type descriptor sits at `type_offset`
    EnumConstant { type_offset: usize },
    /// InnerClasses simple name; `inner_class_info_index` sits at `entry_offset`
    /// and `outer_class_info_index` right after it
    InnerName { entry_offset: usize },
    /// Record component name; its descriptor sits at `descriptor_offset`
    RecordComponentName { descriptor_offset: usize },
    /// EnclosingMethod method reference; the class index sits at `class_offset`
    NameAndType { class_offset: usize },
}

/// A `u16` constant pool reference at `offset` inside an attribute body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub offset: usize,
    pub role: SlotRole,
}

/// All slots of one top-level attribute, offsets relative to its body.
#[derive(Debug, Clone, Default)]
pub struct SlotScan {
    pub slots: Vec<Slot>,
    /// False when the attribute (or a nested one) has an unknown layout
    pub complete: bool,
}

/// Enumerate the slots of a top-level attribute called `name`.
pub fn scan_attribute(pool: &ConstantPool, name: &str, info: &[u8]) -> ClassFileResult<SlotScan> {
    let mut scanner = Scanner {
        pool,
        data: info,
        slots: Vec::new(),
        complete: true,
    };
    scanner.attribute(name, 0, info.len())?;
    Ok(SlotScan {
        slots: scanner.slots,
        complete: scanner.complete,
    })
}

struct Scanner<'a> {
    pool: &'a ConstantPool,
    data: &'a [u8],
    slots: Vec<Slot>,
    complete: bool,
}

impl<'a> Scanner<'a> {
    fn push(&mut self, offset: usize, role: SlotRole) {
        self.slots.push(Slot { offset, role });
    }

    /// Push a slot unless the index there is 0 (optional reference).
    fn push_optional(&mut self, reader: &mut ByteReader<'a>, role: SlotRole) -> ClassFileResult<()> {
        let offset = reader.position();
        if reader.u16()? != 0 {
            self.push(offset, role);
        }
        Ok(())
    }

    fn attribute(&mut self, name: &str, start: usize, end: usize) -> ClassFileResult<()> {
        let data = self.data;
        let mut r = ByteReader::at(&data[..end], start);
        match name {
            "Code" => {
                r.skip(4)?;
                let code_len = r.u32()? as usize;
                r.skip(code_len)?;
                let handlers = r.u16()? as usize;
                r.skip(handlers * 8)?;
                self.attribute_table(&mut r)?;
            }
            "Signature" => {
                self.push(r.position(), SlotRole::Signature);
                r.skip(2)?;
            }
            "SourceFile" => {
                self.push(r.position(), SlotRole::Plain);
                r.skip(2)?;
            }
            "LocalVariableTable" | "LocalVariableTypeTable" => {
                let role = if name == "LocalVariableTable" {
                    SlotRole::FieldDescriptor
                } else {
                    SlotRole::Signature
                };
                let count = r.u16()?;
                for _ in 0..count {
                    r.skip(4)?;
                    self.push(r.position(), SlotRole::Plain);
                    self.push(r.position() + 2, role);
                    r.skip(6)?;
                }
            }
            "MethodParameters" => {
                let count = r.u8()?;
                for _ in 0..count {
                    self.push_optional(&mut r, SlotRole::Plain)?;
                    r.skip(2)?;
                }
            }
            "InnerClasses" => {
                let count = r.u16()?;
                for _ in 0..count {
                    let entry_offset = r.position();
                    r.skip(4)?;
                    self.push_optional(&mut r, SlotRole::InnerName { entry_offset })?;
                    r.skip(2)?;
                }
            }
            "EnclosingMethod" => {
                let class_offset = r.position();
                r.skip(2)?;
                self.push_optional(&mut r, SlotRole::NameAndType { class_offset })?;
            }
            "Record" => {
                let count = r.u16()?;
                for _ in 0..count {
                    let offset = r.position();
                    self.push(
                        offset,
                        SlotRole::RecordComponentName {
                            descriptor_offset: offset + 2,
                        },
                    );
                    self.push(offset + 2, SlotRole::FieldDescriptor);
                    r.skip(4)?;
                    self.attribute_table(&mut r)?;
                }
            }
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                let count = r.u16()?;
                for _ in 0..count {
                    self.annotation(&mut r)?;
                }
            }
            "RuntimeVisibleParameterAnnotations" | "RuntimeInvisibleParameterAnnotations" => {
                let params = r.u8()?;
                for _ in 0..params {
                    let count = r.u16()?;
                    for _ in 0..count {
                        self.annotation(&mut r)?;
                    }
                }
            }
            "RuntimeVisibleTypeAnnotations" | "RuntimeInvisibleTypeAnnotations" => {
                let count = r.u16()?;
                for _ in 0..count {
                    skip_type_annotation_target(&mut r, name)?;
                    self.annotation(&mut r)?;
                }
            }
            "AnnotationDefault" => self.element_value(&mut r, name)?,
            _ if OPAQUE_ATTRIBUTES.contains(&name) => return Ok(()),
            _ => {
                self.complete = false;
                return Ok(());
            }
        }

        if r.position() != end {
            return Err(ClassFileError::attribute(
                name,
                format!("body is {} bytes but layout ends at {}", end - start, r.position() - start),
            ));
        }
        Ok(())
    }

    fn attribute_table(&mut self, r: &mut ByteReader<'a>) -> ClassFileResult<()> {
        let count = r.u16()?;
        for _ in 0..count {
            let name_offset = r.position();
            let name_index = r.u16()?;
            let len = r.u32()? as usize;
            let start = r.position();
            r.skip(len)?;
            self.push(name_offset, SlotRole::Plain);
            let pool = self.pool;
            let name = pool.utf8(name_index)?;
            self.attribute(name, start, start + len)?;
        }
        Ok(())
    }

    fn annotation(&mut self, r: &mut ByteReader<'a>) -> ClassFileResult<()> {
        self.push(r.position(), SlotRole::FieldDescriptor);
        r.skip(2)?;
        let pairs = r.u16()?;
        for _ in 0..pairs {
            // element names are method names of the annotation interface
            self.push(r.position(), SlotRole::Plain);
            r.skip(2)?;
            self.element_value(r, "annotation")?;
        }
        Ok(())
    }

    fn element_value(&mut self, r: &mut ByteReader<'a>, attribute: &str) -> ClassFileResult<()> {
        let tag = r.u8()?;
        match tag {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => r.skip(2)?,
            b's' => {
                self.push(r.position(), SlotRole::Plain);
                r.skip(2)?;
            }
            b'e' => {
                let type_offset = r.position();
                self.push(type_offset, SlotRole::FieldDescriptor);
                self.push(type_offset + 2, SlotRole::EnumConstant { type_offset });
                r.skip(4)?;
            }
            b'c' => {
                self.push(r.position(), SlotRole::ReturnDescriptor);
                r.skip(2)?;
            }
            b'@' => self.annotation(r)?,
            b'[' => {
                let count = r.u16()?;
                for _ in 0..count {
                    self.element_value(r, attribute)?;
                }
            }
            other => {
                return Err(ClassFileError::attribute(
                    attribute,
                    format!("unknown element_value tag 0x{other:02X}"),
                ))
            }
        }
        Ok(())
    }
}

fn skip_type_annotation_target(r: &mut ByteReader<'_>, attribute: &str) -> ClassFileResult<()> {
    let target_type = r.u8()?;
    match target_type {
        0x00 | 0x01 | 0x16 => r.skip(1)?,
        0x10 | 0x17 | 0x42 | 0x43..=0x46 => r.skip(2)?,
        0x11 | 0x12 => r.skip(2)?,
        0x13..=0x15 => {}
        0x40 | 0x41 => {
            let len = r.u16()? as usize;
            r.skip(len * 6)?;
        }
        0x47..=0x4B => r.skip(3)?,
        other => {
            return Err(ClassFileError::attribute(
                attribute,
                format!("unknown type annotation target 0x{other:02X}"),
            ))
        }
    }
    let path_len = r.u8()? as usize;
    r.skip(path_len * 2)
}

/// Reference count of every constant pool slot, as seen from outside the
/// pool and from other entries. `None` when some attribute layout is unknown
/// and the counts cannot be trusted.
pub fn reference_counts(class: &ClassFile) -> ClassFileResult<Option<Vec<u32>>> {
    let mut counts = vec![0u32; class.pool.len()];
    let mut bump = |index: u16| {
        if let Some(slot) = counts.get_mut(index as usize) {
            *slot += 1;
        }
    };

    bump(class.this_class);
    bump(class.super_class);
    class.interfaces.iter().for_each(|&idx| bump(idx));
    for member in class.fields.iter().chain(&class.methods) {
        bump(member.name);
        bump(member.descriptor);
    }
    for attribute in class.all_attributes() {
        bump(attribute.name);
        let name = class.attribute_name(attribute)?;
        let scan = scan_attribute(&class.pool, name, &attribute.info)?;
        if !scan.complete {
            return Ok(None);
        }
        for slot in &scan.slots {
            bump(read_u16_at(&attribute.info, slot.offset)?);
        }
    }
    class.pool.count_internal_references(&mut counts);
    Ok(Some(counts))
}

/// Exception handler entry of a `Code` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionHandler {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

/// Decoded `Code` attribute body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionHandler>,
    pub attributes: Vec<Attribute>,
}

impl CodeAttribute {
    pub fn parse(info: &[u8]) -> ClassFileResult<Self> {
        let mut r = ByteReader::new(info);
        let max_stack = r.u16()?;
        let max_locals = r.u16()?;
        let code_len = r.u32()? as usize;
        let code = r.bytes(code_len)?.to_vec();
        let handlers = r.u16()?;
        let mut exception_table = Vec::with_capacity(handlers as usize);
        for _ in 0..handlers {
            exception_table.push(ExceptionHandler {
                start_pc: r.u16()?,
                end_pc: r.u16()?,
                handler_pc: r.u16()?,
                catch_type: r.u16()?,
            });
        }
        let attributes = Attribute::parse_table(&mut r)?;
        if r.remaining() > 0 {
            return Err(ClassFileError::attribute("Code", "trailing bytes"));
        }
        Ok(Self {
            max_stack,
            max_locals,
            code,
            exception_table,
            attributes,
        })
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_u16::<BigEndian>(self.max_stack)?;
        out.write_u16::<BigEndian>(self.max_locals)?;
        out.write_u32::<BigEndian>(self.code.len() as u32)?;
        out.write_all(&self.code)?;
        out.write_u16::<BigEndian>(self.exception_table.len() as u16)?;
        for handler in &self.exception_table {
            out.write_u16::<BigEndian>(handler.start_pc)?;
            out.write_u16::<BigEndian>(handler.end_pc)?;
            out.write_u16::<BigEndian>(handler.handler_pc)?;
            out.write_u16::<BigEndian>(handler.catch_type)?;
        }
        Attribute::write_table(&self.attributes, out)
    }

    pub fn to_bytes(&self) -> ClassFileResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.code.len() + 16);
        self.write_to(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_attribute_nested_slots() {
        let mut pool = ConstantPool::new();
        let lvt = pool.intern_utf8("LocalVariableTable").unwrap();
        let this = pool.intern_utf8("this").unwrap();
        let desc = pool.intern_utf8("Lcom/example/Mod;").unwrap();

        let mut table = Vec::new();
        table.write_u16::<BigEndian>(1).unwrap();
        table.extend_from_slice(&[0, 0, 0, 1]);
        table.write_u16::<BigEndian>(this).unwrap();
        table.write_u16::<BigEndian>(desc).unwrap();
        table.write_u16::<BigEndian>(0).unwrap();

        let code = CodeAttribute {
            max_stack: 1,
            max_locals: 1,
            code: vec![0xB1],
            exception_table: Vec::new(),
            attributes: vec![Attribute::new(lvt, table)],
        };
        let info = code.to_bytes().unwrap();
        assert_eq!(CodeAttribute::parse(&info).unwrap(), code);

        let scan = scan_attribute(&pool, "Code", &info).unwrap();
        assert!(scan.complete);
        let roles: Vec<_> = scan.slots.iter().map(|s| s.role).collect();
        assert_eq!(
            roles,
            vec![SlotRole::Plain, SlotRole::Plain, SlotRole::FieldDescriptor]
        );
        assert_eq!(read_u16_at(&info, scan.slots[2].offset).unwrap(), desc);
    }

    #[test]
    fn test_annotation_enum_and_class_values() {
        let mut pool = ConstantPool::new();
        let ty = pool.intern_utf8("Lcom/example/Marker;").unwrap();
        let key = pool.intern_utf8("value").unwrap();
        let enum_ty = pool.intern_utf8("Lcom/example/Mode;").unwrap();
        let constant = pool.intern_utf8("FAST").unwrap();

        let mut info = Vec::new();
        info.write_u16::<BigEndian>(1).unwrap();
        info.write_u16::<BigEndian>(ty).unwrap();
        info.write_u16::<BigEndian>(1).unwrap();
        info.write_u16::<BigEndian>(key).unwrap();
        info.push(b'e');
        info.write_u16::<BigEndian>(enum_ty).unwrap();
        info.write_u16::<BigEndian>(constant).unwrap();

        let scan = scan_attribute(&pool, "RuntimeVisibleAnnotations", &info).unwrap();
        assert_eq!(scan.slots.len(), 4);
        assert_eq!(
            scan.slots[3].role,
            SlotRole::EnumConstant {
                type_offset: scan.slots[2].offset
            }
        );
    }

    #[test]
    fn test_unknown_attribute_marks_scan_incomplete() {
        let pool = ConstantPool::new();
        let scan = scan_attribute(&pool, "com.vendor.Custom", &[1, 2, 3]).unwrap();
        assert!(!scan.complete);
        let scan = scan_attribute(&pool, "LineNumberTable", &[0, 0]).unwrap();
        assert!(scan.complete && scan.slots.is_empty());
    }

    #[test]
    fn test_layout_length_mismatch_is_malformed() {
        let pool = ConstantPool::new();
        let err = scan_attribute(&pool, "SourceFile", &[0, 1, 0]).unwrap_err();
        assert!(matches!(err, ClassFileError::MalformedAttribute { .. }));
    }
}
