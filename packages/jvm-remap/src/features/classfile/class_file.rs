//! Structural class-file model (JVMS §4.1)
//!
//! Only the parts the rewriter touches are decoded: the constant pool,
//! header, member tables and attribute envelopes. Attribute bodies stay raw
//! bytes; `attributes` knows their layouts.

use super::bytes::ByteReader;
use super::constant_pool::ConstantPool;
use super::error::{ClassFileError, ClassFileResult};
use byteorder::{BigEndian, WriteBytesExt};
use std::io::{self, Write};

pub const MAGIC: u32 = 0xCAFE_BABE;

pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_STATIC: u16 = 0x0008;

/// Raw attribute: name index plus undecoded body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: u16,
    pub info: Vec<u8>,
}

impl Attribute {
    pub fn new(name: u16, info: Vec<u8>) -> Self {
        Self { name, info }
    }

    pub(crate) fn parse_table(reader: &mut ByteReader<'_>) -> ClassFileResult<Vec<Self>> {
        let count = reader.u16()?;
        let mut attributes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name = reader.u16()?;
            let len = reader.u32()? as usize;
            let info = reader.bytes(len)?.to_vec();
            attributes.push(Self { name, info });
        }
        Ok(attributes)
    }

    pub(crate) fn write_table<W: Write>(attributes: &[Self], out: &mut W) -> io::Result<()> {
        out.write_u16::<BigEndian>(attributes.len() as u16)?;
        for attribute in attributes {
            out.write_u16::<BigEndian>(attribute.name)?;
            out.write_u32::<BigEndian>(attribute.info.len() as u32)?;
            out.write_all(&attribute.info)?;
        }
        Ok(())
    }
}

/// Field or method declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub access: u16,
    pub name: u16,
    pub descriptor: u16,
    pub attributes: Vec<Attribute>,
}

impl MemberInfo {
    fn parse_table(reader: &mut ByteReader<'_>) -> ClassFileResult<Vec<Self>> {
        let count = reader.u16()?;
        let mut members = Vec::with_capacity(count as usize);
        for _ in 0..count {
            members.push(Self {
                access: reader.u16()?,
                name: reader.u16()?,
                descriptor: reader.u16()?,
                attributes: Attribute::parse_table(reader)?,
            });
        }
        Ok(members)
    }

    fn write_table<W: Write>(members: &[Self], out: &mut W) -> io::Result<()> {
        out.write_u16::<BigEndian>(members.len() as u16)?;
        for member in members {
            out.write_u16::<BigEndian>(member.access)?;
            out.write_u16::<BigEndian>(member.name)?;
            out.write_u16::<BigEndian>(member.descriptor)?;
            Attribute::write_table(&member.attributes, out)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub pool: ConstantPool,
    pub access: u16,
    pub this_class: u16,
    /// 0 for `java/lang/Object` and module-info
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<MemberInfo>,
    pub methods: Vec<MemberInfo>,
    pub attributes: Vec<Attribute>,
}

impl ClassFile {
    /// Parse a complete class file; trailing bytes are an error.
    pub fn parse(data: &[u8]) -> ClassFileResult<Self> {
        let mut reader = ByteReader::new(data);
        let magic = reader.u32()?;
        if magic != MAGIC {
            return Err(ClassFileError::BadMagic(magic));
        }
        let minor_version = reader.u16()?;
        let major_version = reader.u16()?;
        let pool = ConstantPool::parse(&mut reader)?;
        let access = reader.u16()?;
        let this_class = reader.u16()?;
        let super_class = reader.u16()?;
        let interface_count = reader.u16()?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(reader.u16()?);
        }
        let fields = MemberInfo::parse_table(&mut reader)?;
        let methods = MemberInfo::parse_table(&mut reader)?;
        let attributes = Attribute::parse_table(&mut reader)?;
        if reader.remaining() > 0 {
            return Err(ClassFileError::TrailingBytes(reader.remaining()));
        }

        let class = Self {
            minor_version,
            major_version,
            pool,
            access,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        };
        class.check_header()?;
        Ok(class)
    }

    fn check_header(&self) -> ClassFileResult<()> {
        self.name()?;
        self.super_name()?;
        self.interface_names()?;
        for member in self.fields.iter().chain(&self.methods) {
            self.pool.utf8(member.name)?;
            self.pool.utf8(member.descriptor)?;
        }
        for attribute in self.all_attributes() {
            self.pool.utf8(attribute.name)?;
        }
        Ok(())
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_u32::<BigEndian>(MAGIC)?;
        out.write_u16::<BigEndian>(self.minor_version)?;
        out.write_u16::<BigEndian>(self.major_version)?;
        self.pool.write(out)?;
        out.write_u16::<BigEndian>(self.access)?;
        out.write_u16::<BigEndian>(self.this_class)?;
        out.write_u16::<BigEndian>(self.super_class)?;
        out.write_u16::<BigEndian>(self.interfaces.len() as u16)?;
        for &interface in &self.interfaces {
            out.write_u16::<BigEndian>(interface)?;
        }
        MemberInfo::write_table(&self.fields, out)?;
        MemberInfo::write_table(&self.methods, out)?;
        Attribute::write_table(&self.attributes, out)
    }

    pub fn to_bytes(&self) -> ClassFileResult<Vec<u8>> {
        let mut out = Vec::with_capacity(1024);
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Internal name of this class.
    pub fn name(&self) -> ClassFileResult<&str> {
        self.pool.class_name(self.this_class)
    }

    pub fn super_name(&self) -> ClassFileResult<Option<&str>> {
        if self.super_class == 0 {
            return Ok(None);
        }
        self.pool.class_name(self.super_class).map(Some)
    }

    pub fn interface_names(&self) -> ClassFileResult<Vec<&str>> {
        self.interfaces
            .iter()
            .map(|&idx| self.pool.class_name(idx))
            .collect()
    }

    /// Name of an attribute, as stored in the pool.
    pub fn attribute_name(&self, attribute: &Attribute) -> ClassFileResult<&str> {
        self.pool.utf8(attribute.name)
    }

    /// Class-level and member-level attribute envelopes (not nested ones).
    pub fn all_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().chain(
            self.fields
                .iter()
                .chain(&self.methods)
                .flat_map(|member| member.attributes.iter()),
        )
    }
}
