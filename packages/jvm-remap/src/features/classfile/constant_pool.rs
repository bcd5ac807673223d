//! Constant pool
//!
//! Entries keep their original indices for the whole life of a class, so
//! instruction operands (including one-byte `ldc` indices) never move.
//! Rewriting appends: `intern_*` returns the earliest existing entry with the
//! requested value or pushes a new one. `trim_unreferenced_tail` drops
//! trailing Utf8/NameAndType entries nothing points at anymore.

use super::bytes::ByteReader;
use super::error::{ClassFileError, ClassFileResult};
use crate::shared::mutf8;
use byteorder::{BigEndian, WriteBytesExt};
use rustc_hash::FxHashMap;
use std::io::{self, Write};

pub const TAG_UTF8: u8 = 1;
pub const TAG_INTEGER: u8 = 3;
pub const TAG_FLOAT: u8 = 4;
pub const TAG_LONG: u8 = 5;
pub const TAG_DOUBLE: u8 = 6;
pub const TAG_CLASS: u8 = 7;
pub const TAG_STRING: u8 = 8;
pub const TAG_FIELDREF: u8 = 9;
pub const TAG_METHODREF: u8 = 10;
pub const TAG_INTERFACE_METHODREF: u8 = 11;
pub const TAG_NAME_AND_TYPE: u8 = 12;
pub const TAG_METHOD_HANDLE: u8 = 15;
pub const TAG_METHOD_TYPE: u8 = 16;
pub const TAG_DYNAMIC: u8 = 17;
pub const TAG_INVOKE_DYNAMIC: u8 = 18;
pub const TAG_MODULE: u8 = 19;
pub const TAG_PACKAGE: u8 = 20;

/// Kind of a field/method reference constant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Field,
    Method,
    InterfaceMethod,
}

impl RefKind {
    fn tag(self) -> u8 {
        match self {
            Self::Field => TAG_FIELDREF,
            Self::Method => TAG_METHODREF,
            Self::InterfaceMethod => TAG_INTERFACE_METHODREF,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    /// Slot 0 and the upper half of Long/Double
    Unusable,
    Utf8(String),
    Integer(u32),
    Float(u32),
    Long(u64),
    Double(u64),
    Class { name: u16 },
    String { value: u16 },
    MemberRef { kind: RefKind, class: u16, name_and_type: u16 },
    NameAndType { name: u16, descriptor: u16 },
    MethodHandle { kind: u8, reference: u16 },
    MethodType { descriptor: u16 },
    Dynamic { bootstrap: u16, name_and_type: u16 },
    InvokeDynamic { bootstrap: u16, name_and_type: u16 },
    Module { name: u16 },
    Package { name: u16 },
}

impl Constant {
    fn is_wide(&self) -> bool {
        matches!(self, Self::Long(_) | Self::Double(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    entries: Vec<Constant>,
    utf8_lookup: FxHashMap<String, u16>,
    nat_lookup: FxHashMap<(u16, u16), u16>,
}

impl ConstantPool {
    /// Empty pool holding only the reserved slot 0.
    pub fn new() -> Self {
        Self {
            entries: vec![Constant::Unusable],
            utf8_lookup: FxHashMap::default(),
            nat_lookup: FxHashMap::default(),
        }
    }

    pub(crate) fn parse(reader: &mut ByteReader<'_>) -> ClassFileResult<Self> {
        let count = reader.u16()?;
        let mut pool = Self::new();
        pool.entries.reserve(count as usize);

        let mut index: u16 = 1;
        while index < count {
            let tag = reader.u8()?;
            let constant = match tag {
                TAG_UTF8 => {
                    let len = reader.u16()? as usize;
                    let raw = reader.bytes(len)?;
                    let value =
                        mutf8::decode(raw).map_err(|_| ClassFileError::InvalidUtf8 { index })?;
                    Constant::Utf8(value)
                }
                TAG_INTEGER => Constant::Integer(reader.u32()?),
                TAG_FLOAT => Constant::Float(reader.u32()?),
                TAG_LONG => Constant::Long(reader.u64()?),
                TAG_DOUBLE => Constant::Double(reader.u64()?),
                TAG_CLASS => Constant::Class { name: reader.u16()? },
                TAG_STRING => Constant::String { value: reader.u16()? },
                TAG_FIELDREF | TAG_METHODREF | TAG_INTERFACE_METHODREF => Constant::MemberRef {
                    kind: match tag {
                        TAG_FIELDREF => RefKind::Field,
                        TAG_METHODREF => RefKind::Method,
                        _ => RefKind::InterfaceMethod,
                    },
                    class: reader.u16()?,
                    name_and_type: reader.u16()?,
                },
                TAG_NAME_AND_TYPE => Constant::NameAndType {
                    name: reader.u16()?,
                    descriptor: reader.u16()?,
                },
                TAG_METHOD_HANDLE => Constant::MethodHandle {
                    kind: reader.u8()?,
                    reference: reader.u16()?,
                },
                TAG_METHOD_TYPE => Constant::MethodType { descriptor: reader.u16()? },
                TAG_DYNAMIC => Constant::Dynamic {
                    bootstrap: reader.u16()?,
                    name_and_type: reader.u16()?,
                },
                TAG_INVOKE_DYNAMIC => Constant::InvokeDynamic {
                    bootstrap: reader.u16()?,
                    name_and_type: reader.u16()?,
                },
                TAG_MODULE => Constant::Module { name: reader.u16()? },
                TAG_PACKAGE => Constant::Package { name: reader.u16()? },
                _ => return Err(ClassFileError::UnknownConstantTag { index, tag }),
            };
            let wide = constant.is_wide();
            pool.record(index, &constant);
            pool.entries.push(constant);
            if wide {
                pool.entries.push(Constant::Unusable);
                index = index.saturating_add(1);
            }
            index = index.saturating_add(1);
        }

        if pool.entries.len() != count as usize {
            return Err(ClassFileError::BadConstantIndex {
                index: count,
                expected: "pool to end on a slot boundary",
            });
        }
        pool.validate_references()?;
        Ok(pool)
    }

    fn validate_references(&self) -> ClassFileResult<()> {
        for constant in &self.entries {
            match *constant {
                Constant::Class { name } | Constant::Module { name } | Constant::Package { name } => {
                    self.utf8(name)?;
                }
                Constant::String { value } => {
                    self.utf8(value)?;
                }
                Constant::NameAndType { name, descriptor } => {
                    self.utf8(name)?;
                    self.utf8(descriptor)?;
                }
                Constant::MethodType { descriptor } => {
                    self.utf8(descriptor)?;
                }
                Constant::MemberRef {
                    class,
                    name_and_type,
                    ..
                } => {
                    self.class_name(class)?;
                    self.name_and_type(name_and_type)?;
                }
                Constant::Dynamic { name_and_type, .. }
                | Constant::InvokeDynamic { name_and_type, .. } => {
                    self.name_and_type(name_and_type)?;
                }
                Constant::MethodHandle { reference, .. } => {
                    self.member_ref(reference)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn record(&mut self, index: u16, constant: &Constant) {
        match constant {
            Constant::Utf8(value) => {
                self.utf8_lookup.entry(value.clone()).or_insert(index);
            }
            Constant::NameAndType { name, descriptor } => {
                self.nat_lookup.entry((*name, *descriptor)).or_insert(index);
            }
            _ => {}
        }
    }

    pub(crate) fn write<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_u16::<BigEndian>(self.entries.len() as u16)?;
        for constant in &self.entries {
            match constant {
                Constant::Unusable => {}
                Constant::Utf8(value) => {
                    let raw = mutf8::encode(value);
                    out.write_u8(TAG_UTF8)?;
                    out.write_u16::<BigEndian>(raw.len() as u16)?;
                    out.write_all(&raw)?;
                }
                Constant::Integer(v) => {
                    out.write_u8(TAG_INTEGER)?;
                    out.write_u32::<BigEndian>(*v)?;
                }
                Constant::Float(v) => {
                    out.write_u8(TAG_FLOAT)?;
                    out.write_u32::<BigEndian>(*v)?;
                }
                Constant::Long(v) => {
                    out.write_u8(TAG_LONG)?;
                    out.write_u64::<BigEndian>(*v)?;
                }
                Constant::Double(v) => {
                    out.write_u8(TAG_DOUBLE)?;
                    out.write_u64::<BigEndian>(*v)?;
                }
                Constant::Class { name } => {
                    out.write_u8(TAG_CLASS)?;
                    out.write_u16::<BigEndian>(*name)?;
                }
                Constant::String { value } => {
                    out.write_u8(TAG_STRING)?;
                    out.write_u16::<BigEndian>(*value)?;
                }
                Constant::MemberRef {
                    kind,
                    class,
                    name_and_type,
                } => {
                    out.write_u8(kind.tag())?;
                    out.write_u16::<BigEndian>(*class)?;
                    out.write_u16::<BigEndian>(*name_and_type)?;
                }
                Constant::NameAndType { name, descriptor } => {
                    out.write_u8(TAG_NAME_AND_TYPE)?;
                    out.write_u16::<BigEndian>(*name)?;
                    out.write_u16::<BigEndian>(*descriptor)?;
                }
                Constant::MethodHandle { kind, reference } => {
                    out.write_u8(TAG_METHOD_HANDLE)?;
                    out.write_u8(*kind)?;
                    out.write_u16::<BigEndian>(*reference)?;
                }
                Constant::MethodType { descriptor } => {
                    out.write_u8(TAG_METHOD_TYPE)?;
                    out.write_u16::<BigEndian>(*descriptor)?;
                }
                Constant::Dynamic {
                    bootstrap,
                    name_and_type,
                } => {
                    out.write_u8(TAG_DYNAMIC)?;
                    out.write_u16::<BigEndian>(*bootstrap)?;
                    out.write_u16::<BigEndian>(*name_and_type)?;
                }
                Constant::InvokeDynamic {
                    bootstrap,
                    name_and_type,
                } => {
                    out.write_u8(TAG_INVOKE_DYNAMIC)?;
                    out.write_u16::<BigEndian>(*bootstrap)?;
                    out.write_u16::<BigEndian>(*name_and_type)?;
                }
                Constant::Module { name } => {
                    out.write_u8(TAG_MODULE)?;
                    out.write_u16::<BigEndian>(*name)?;
                }
                Constant::Package { name } => {
                    out.write_u8(TAG_PACKAGE)?;
                    out.write_u16::<BigEndian>(*name)?;
                }
            }
        }
        Ok(())
    }

    /// `constant_pool_count` (number of slots including slot 0).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    pub fn entries(&self) -> impl Iterator<Item = (u16, &Constant)> {
        self.entries
            .iter()
            .enumerate()
            .skip(1)
            .map(|(idx, c)| (idx as u16, c))
    }

    pub fn get(&self, index: u16) -> Option<&Constant> {
        self.entries.get(index as usize)
    }

    pub(crate) fn get_mut(&mut self, index: u16) -> Option<&mut Constant> {
        self.entries.get_mut(index as usize)
    }

    pub fn utf8(&self, index: u16) -> ClassFileResult<&str> {
        match self.get(index) {
            Some(Constant::Utf8(value)) => Ok(value),
            _ => Err(ClassFileError::BadConstantIndex {
                index,
                expected: "Utf8",
            }),
        }
    }

    pub fn class_name(&self, index: u16) -> ClassFileResult<&str> {
        match self.get(index) {
            Some(Constant::Class { name }) => self.utf8(*name),
            _ => Err(ClassFileError::BadConstantIndex {
                index,
                expected: "Class",
            }),
        }
    }

    /// (name, descriptor) of a NameAndType constant.
    pub fn name_and_type(&self, index: u16) -> ClassFileResult<(&str, &str)> {
        match self.get(index) {
            Some(Constant::NameAndType { name, descriptor }) => {
                Ok((self.utf8(*name)?, self.utf8(*descriptor)?))
            }
            _ => Err(ClassFileError::BadConstantIndex {
                index,
                expected: "NameAndType",
            }),
        }
    }

    /// (kind, owner, name, descriptor) of a Fieldref/Methodref/InterfaceMethodref.
    pub fn member_ref(&self, index: u16) -> ClassFileResult<(RefKind, &str, &str, &str)> {
        match self.get(index) {
            Some(Constant::MemberRef {
                kind,
                class,
                name_and_type,
            }) => {
                let owner = self.class_name(*class)?;
                let (name, desc) = self.name_and_type(*name_and_type)?;
                Ok((*kind, owner, name, desc))
            }
            _ => Err(ClassFileError::BadConstantIndex {
                index,
                expected: "Fieldref/Methodref/InterfaceMethodref",
            }),
        }
    }

    /// Append `constant` without interning; wide constants take two slots.
    pub fn push(&mut self, constant: Constant) -> ClassFileResult<u16> {
        let index = self.entries.len();
        if index + usize::from(constant.is_wide()) >= u16::MAX as usize {
            return Err(ClassFileError::PoolOverflow);
        }
        let index = index as u16;
        self.record(index, &constant);
        let wide = constant.is_wide();
        self.entries.push(constant);
        if wide {
            self.entries.push(Constant::Unusable);
        }
        Ok(index)
    }

    /// Earliest Utf8 entry holding `value`, appended when missing.
    pub fn intern_utf8(&mut self, value: &str) -> ClassFileResult<u16> {
        if let Some(&index) = self.utf8_lookup.get(value) {
            return Ok(index);
        }
        self.push(Constant::Utf8(value.to_string()))
    }

    pub fn intern_name_and_type(&mut self, name: u16, descriptor: u16) -> ClassFileResult<u16> {
        if let Some(&index) = self.nat_lookup.get(&(name, descriptor)) {
            return Ok(index);
        }
        self.push(Constant::NameAndType { name, descriptor })
    }

    pub fn intern_class(&mut self, name: &str) -> ClassFileResult<u16> {
        let name = self.intern_utf8(name)?;
        let existing = self
            .entries()
            .find(|(_, c)| matches!(c, Constant::Class { name: n } if *n == name))
            .map(|(idx, _)| idx);
        match existing {
            Some(index) => Ok(index),
            None => self.push(Constant::Class { name }),
        }
    }

    pub fn intern_string(&mut self, value: &str) -> ClassFileResult<u16> {
        let value = self.intern_utf8(value)?;
        let existing = self
            .entries()
            .find(|(_, c)| matches!(c, Constant::String { value: v } if *v == value))
            .map(|(idx, _)| idx);
        match existing {
            Some(index) => Ok(index),
            None => self.push(Constant::String { value }),
        }
    }

    pub fn intern_member_ref(
        &mut self,
        kind: RefKind,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> ClassFileResult<u16> {
        let class = self.intern_class(owner)?;
        let name = self.intern_utf8(name)?;
        let descriptor = self.intern_utf8(descriptor)?;
        let name_and_type = self.intern_name_and_type(name, descriptor)?;
        let wanted = Constant::MemberRef {
            kind,
            class,
            name_and_type,
        };
        let existing = self.entries().find(|(_, c)| **c == wanted).map(|(idx, _)| idx);
        match existing {
            Some(index) => Ok(index),
            None => self.push(wanted),
        }
    }

    /// Count references from inside the pool into each slot.
    pub(crate) fn count_internal_references(&self, counts: &mut [u32]) {
        let mut bump = |index: u16| {
            if let Some(slot) = counts.get_mut(index as usize) {
                *slot += 1;
            }
        };
        for constant in &self.entries {
            match *constant {
                Constant::Class { name } | Constant::Module { name } | Constant::Package { name } => {
                    bump(name)
                }
                Constant::String { value } => bump(value),
                Constant::MethodType { descriptor } => bump(descriptor),
                Constant::NameAndType { name, descriptor } => {
                    bump(name);
                    bump(descriptor);
                }
                Constant::MemberRef {
                    class,
                    name_and_type,
                    ..
                } => {
                    bump(class);
                    bump(name_and_type);
                }
                Constant::Dynamic { name_and_type, .. }
                | Constant::InvokeDynamic { name_and_type, .. } => bump(name_and_type),
                Constant::MethodHandle { reference, .. } => bump(reference),
                _ => {}
            }
        }
    }

    /// Drop trailing Utf8/NameAndType entries whose reference count is zero.
    ///
    /// `counts` must cover every slot; it is updated as entries are removed.
    pub(crate) fn trim_unreferenced_tail(&mut self, counts: &mut [u32]) -> usize {
        let mut removed = 0;
        while self.entries.len() > 1 {
            let last = self.entries.len() - 1;
            if counts.get(last).copied().unwrap_or(1) != 0 {
                break;
            }
            match self.entries[last] {
                Constant::Utf8(_) => {}
                Constant::NameAndType { name, descriptor } => {
                    for idx in [name, descriptor] {
                        if let Some(slot) = counts.get_mut(idx as usize) {
                            *slot = slot.saturating_sub(1);
                        }
                    }
                }
                _ => break,
            }
            if let Some(Constant::Utf8(value)) = self.entries.pop() {
                if self.utf8_lookup.get(&value) == Some(&(last as u16)) {
                    self.utf8_lookup.remove(&value);
                }
            }
            self.nat_lookup.retain(|_, idx| (*idx as usize) < last);
            removed += 1;
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_prefers_earliest_entry() {
        let mut pool = ConstantPool::new();
        let first = pool.intern_utf8("tick").unwrap();
        let again = pool.intern_utf8("tick").unwrap();
        assert_eq!(first, again);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_wide_constants_take_two_slots() {
        let mut pool = ConstantPool::new();
        let long = pool.push(Constant::Long(7)).unwrap();
        let next = pool.intern_utf8("x").unwrap();
        assert_eq!(long, 1);
        assert_eq!(next, 3);
        assert_eq!(pool.get(2), Some(&Constant::Unusable));
    }

    #[test]
    fn test_parse_write_round_trip() {
        let mut pool = ConstantPool::new();
        pool.intern_member_ref(RefKind::Method, "net/runtime/Entity", "tick", "()V")
            .unwrap();
        pool.push(Constant::Double(42)).unwrap();
        pool.intern_string("h\u{e9}llo\0").unwrap();

        let mut bytes = Vec::new();
        pool.write(&mut bytes).unwrap();
        let parsed = ConstantPool::parse(&mut ByteReader::new(&bytes)).unwrap();
        assert_eq!(parsed.entries, pool.entries);
        let (kind, owner, name, desc) = parsed.member_ref(6).unwrap();
        assert_eq!((kind, owner, name, desc), (RefKind::Method, "net/runtime/Entity", "tick", "()V"));
    }

    #[test]
    fn test_trim_removes_only_unreferenced_tail() {
        let mut pool = ConstantPool::new();
        let kept = pool.intern_utf8("kept").unwrap();
        let name = pool.intern_utf8("a").unwrap();
        let desc = pool.intern_utf8("()V").unwrap();
        pool.intern_name_and_type(name, desc).unwrap();

        let mut counts = vec![0u32; pool.len()];
        counts[kept as usize] = 1;
        pool.count_internal_references(&mut counts);
        // `()V` is still wanted elsewhere
        counts[desc as usize] += 1;

        let removed = pool.trim_unreferenced_tail(&mut counts);
        assert_eq!(removed, 1);
        assert_eq!(pool.len(), 4);
        assert!(pool.utf8(desc).is_ok());
    }

    #[test]
    fn test_bad_references_are_rejected() {
        // count=2, one Class entry pointing at itself
        let bytes = [0x00, 0x02, TAG_CLASS, 0x00, 0x01];
        let err = ConstantPool::parse(&mut ByteReader::new(&bytes)).unwrap_err();
        assert!(matches!(err, ClassFileError::BadConstantIndex { index: 1, .. }));
    }
}
