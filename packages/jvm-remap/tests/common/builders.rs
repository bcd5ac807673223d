//! Test data builders
//!
//! `ClassBuilder` emits real class files through the crate's own constant
//! pool; `JarBuilder` packs entries with fixed timestamps.

use byteorder::{BigEndian, WriteBytesExt};
use jvm_remap::features::classfile::{
    Attribute, ClassFile, CodeAttribute, Constant, ConstantPool, MemberInfo, RefKind,
};
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Instructions understood by `ClassBuilder::method`
#[derive(Debug, Clone)]
pub enum Insn {
    ALoad0,
    Pop,
    Return,
    InvokeVirtual(&'static str, &'static str, &'static str),
    InvokeSpecial(&'static str, &'static str, &'static str),
    InvokeStatic(&'static str, &'static str, &'static str),
    GetField(&'static str, &'static str, &'static str),
    GetStatic(&'static str, &'static str, &'static str),
    New(&'static str),
    CheckCast(&'static str),
    Ldc(&'static str),
    /// `invokedynamic` through `LambdaMetafactory`
    Lambda {
        interface: &'static str,
        method: &'static str,
        descriptor: &'static str,
        /// Implementation method (owner, name, descriptor), invoked statically
        implementation: (&'static str, &'static str, &'static str),
    },
}

/// Annotation element values understood by `ClassBuilder::annotation`
#[derive(Debug, Clone)]
pub enum Element {
    /// Enum constant: type descriptor and constant name
    Enum(&'static str, &'static str),
    /// Class literal descriptor
    Class(&'static str),
}

/// Local variable of a method built by `ClassBuilder::method_with_locals`
#[derive(Debug, Clone)]
pub struct Local {
    pub name: &'static str,
    pub descriptor: &'static str,
    pub signature: Option<&'static str>,
}

const METAFACTORY_DESC: &str = "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;\
Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodHandle;\
Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/CallSite;";

/// Builder for a class file
pub struct ClassBuilder {
    pool: ConstantPool,
    access: u16,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<MemberInfo>,
    methods: Vec<MemberInfo>,
    attributes: Vec<Attribute>,
    bootstrap: Vec<(u16, Vec<u16>)>,
    inner_classes: Vec<[u16; 4]>,
    record: Option<Vec<(u16, u16)>>,
}

impl ClassBuilder {
    /// Public class `name` extending `super_name`
    pub fn new(name: &str, super_name: &str) -> Self {
        let mut pool = ConstantPool::new();
        let this_class = pool.intern_class(name).unwrap();
        let super_class = pool.intern_class(super_name).unwrap();
        Self {
            pool,
            access: 0x0021,
            this_class,
            super_class,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
            bootstrap: Vec::new(),
            inner_classes: Vec::new(),
            record: None,
        }
    }

    pub fn interface(mut self, name: &str) -> Self {
        let idx = self.pool.intern_class(name).unwrap();
        self.interfaces.push(idx);
        self
    }

    /// Add a field declaration
    pub fn field(mut self, name: &str, descriptor: &str) -> Self {
        let member = self.member(0x0001, name, descriptor, Vec::new());
        self.fields.push(member);
        self
    }

    /// Add a public method with a `Code` attribute built from `code`
    pub fn method(self, name: &str, descriptor: &str, code: &[Insn]) -> Self {
        self.method_with_access(0x0001, name, descriptor, code)
    }

    pub fn method_with_access(
        mut self,
        access: u16,
        name: &str,
        descriptor: &str,
        code: &[Insn],
    ) -> Self {
        let member = self.code_method(access, name, descriptor, code, &[]);
        self.methods.push(member);
        self
    }

    /// Public method whose `Code` carries LocalVariableTable and, for locals
    /// with a signature, LocalVariableTypeTable
    pub fn method_with_locals(
        mut self,
        name: &str,
        descriptor: &str,
        code: &[Insn],
        locals: &[Local],
    ) -> Self {
        let member = self.code_method(0x0001, name, descriptor, code, locals);
        self.methods.push(member);
        self
    }

    /// Add an abstract method (no code)
    pub fn abstract_method(mut self, name: &str, descriptor: &str) -> Self {
        let member = self.member(0x0401, name, descriptor, Vec::new());
        self.methods.push(member);
        self
    }

    /// Class-level `Signature` attribute
    pub fn signature(mut self, signature: &str) -> Self {
        let attr = self.pool.intern_utf8("Signature").unwrap();
        let value = self.pool.intern_utf8(signature).unwrap();
        let mut info = Vec::new();
        info.write_u16::<BigEndian>(value).unwrap();
        self.attributes.push(Attribute::new(attr, info));
        self
    }

    /// Class-level `SourceFile` attribute
    pub fn source_file(mut self, file: &str) -> Self {
        let attr = self.pool.intern_utf8("SourceFile").unwrap();
        let value = self.pool.intern_utf8(file).unwrap();
        let mut info = Vec::new();
        info.write_u16::<BigEndian>(value).unwrap();
        self.attributes.push(Attribute::new(attr, info));
        self
    }

    /// InnerClasses entry; `outer` and `simple_name` are optional as in
    /// local and anonymous classes
    pub fn inner_class(mut self, inner: &str, outer: Option<&str>, simple_name: Option<&str>) -> Self {
        let inner = self.pool.intern_class(inner).unwrap();
        let outer = outer.map_or(0, |o| self.pool.intern_class(o).unwrap());
        let simple = simple_name.map_or(0, |n| self.pool.intern_utf8(n).unwrap());
        self.inner_classes.push([inner, outer, simple, 0x0001]);
        self
    }

    /// EnclosingMethod attribute; `method` is `None` outside any method
    pub fn enclosing_method(mut self, class: &str, method: Option<(&str, &str)>) -> Self {
        let attr = self.pool.intern_utf8("EnclosingMethod").unwrap();
        let class = self.pool.intern_class(class).unwrap();
        let method = match method {
            Some((name, desc)) => {
                let name = self.pool.intern_utf8(name).unwrap();
                let desc = self.pool.intern_utf8(desc).unwrap();
                self.pool.intern_name_and_type(name, desc).unwrap()
            }
            None => 0,
        };
        let mut info = Vec::new();
        info.write_u16::<BigEndian>(class).unwrap();
        info.write_u16::<BigEndian>(method).unwrap();
        self.attributes.push(Attribute::new(attr, info));
        self
    }

    /// Record component (also declares the backing private field)
    pub fn record_component(mut self, name: &str, descriptor: &str) -> Self {
        let field = self.member(0x0012, name, descriptor, Vec::new());
        self.record
            .get_or_insert_with(Vec::new)
            .push((field.name, field.descriptor));
        self.fields.push(field);
        self
    }

    /// Class-level RuntimeVisibleAnnotations with one annotation
    pub fn annotation(mut self, type_descriptor: &str, elements: &[(&str, Element)]) -> Self {
        let attr = self.pool.intern_utf8("RuntimeVisibleAnnotations").unwrap();
        let mut info = Vec::new();
        info.write_u16::<BigEndian>(1).unwrap();
        let ty = self.pool.intern_utf8(type_descriptor).unwrap();
        info.write_u16::<BigEndian>(ty).unwrap();
        info.write_u16::<BigEndian>(elements.len() as u16).unwrap();
        for (name, element) in elements {
            let name = self.pool.intern_utf8(name).unwrap();
            info.write_u16::<BigEndian>(name).unwrap();
            match *element {
                Element::Enum(ty, constant) => {
                    info.write_u8(b'e').unwrap();
                    let ty = self.pool.intern_utf8(ty).unwrap();
                    let constant = self.pool.intern_utf8(constant).unwrap();
                    info.write_u16::<BigEndian>(ty).unwrap();
                    info.write_u16::<BigEndian>(constant).unwrap();
                }
                Element::Class(desc) => {
                    info.write_u8(b'c').unwrap();
                    let desc = self.pool.intern_utf8(desc).unwrap();
                    info.write_u16::<BigEndian>(desc).unwrap();
                }
            }
        }
        self.attributes.push(Attribute::new(attr, info));
        self
    }

    /// Build the class bytes
    pub fn build(mut self) -> Vec<u8> {
        if !self.inner_classes.is_empty() {
            let attr = self.pool.intern_utf8("InnerClasses").unwrap();
            let mut info = Vec::new();
            info.write_u16::<BigEndian>(self.inner_classes.len() as u16).unwrap();
            for entry in &self.inner_classes {
                for &value in entry {
                    info.write_u16::<BigEndian>(value).unwrap();
                }
            }
            self.attributes.push(Attribute::new(attr, info));
        }
        if let Some(components) = self.record.take() {
            let attr = self.pool.intern_utf8("Record").unwrap();
            let mut info = Vec::new();
            info.write_u16::<BigEndian>(components.len() as u16).unwrap();
            for (name, desc) in components {
                info.write_u16::<BigEndian>(name).unwrap();
                info.write_u16::<BigEndian>(desc).unwrap();
                info.write_u16::<BigEndian>(0).unwrap();
            }
            self.attributes.push(Attribute::new(attr, info));
        }
        if !self.bootstrap.is_empty() {
            let attr = self.pool.intern_utf8("BootstrapMethods").unwrap();
            let mut info = Vec::new();
            info.write_u16::<BigEndian>(self.bootstrap.len() as u16).unwrap();
            for (handle, arguments) in &self.bootstrap {
                info.write_u16::<BigEndian>(*handle).unwrap();
                info.write_u16::<BigEndian>(arguments.len() as u16).unwrap();
                for &argument in arguments {
                    info.write_u16::<BigEndian>(argument).unwrap();
                }
            }
            self.attributes.push(Attribute::new(attr, info));
        }

        ClassFile {
            minor_version: 0,
            major_version: 52,
            pool: self.pool,
            access: self.access,
            this_class: self.this_class,
            super_class: self.super_class,
            interfaces: self.interfaces,
            fields: self.fields,
            methods: self.methods,
            attributes: self.attributes,
        }
        .to_bytes()
        .unwrap()
    }

    fn code_method(
        &mut self,
        access: u16,
        name: &str,
        descriptor: &str,
        code: &[Insn],
        locals: &[Local],
    ) -> MemberInfo {
        let bytes = self.assemble(code);
        let code_name = self.pool.intern_utf8("Code").unwrap();
        let mut nested = Vec::new();
        if !locals.is_empty() {
            let code_len = bytes.len() as u16;
            let lvt = self.local_table("LocalVariableTable", code_len, locals, |l| Some(l.descriptor));
            nested.push(lvt);
            if locals.iter().any(|l| l.signature.is_some()) {
                let lvtt = self.local_table("LocalVariableTypeTable", code_len, locals, |l| l.signature);
                nested.push(lvtt);
            }
        }
        let body = CodeAttribute {
            max_stack: 4,
            max_locals: 4.max(locals.len() as u16),
            code: bytes,
            exception_table: Vec::new(),
            attributes: nested,
        };
        let attributes = vec![Attribute::new(code_name, body.to_bytes().unwrap())];
        self.member(access, name, descriptor, attributes)
    }

    /// Locals whose `value` is `None` are left out; slot = position in `locals`
    fn local_table(
        &mut self,
        attribute: &str,
        code_len: u16,
        locals: &[Local],
        value: impl Fn(&Local) -> Option<&'static str>,
    ) -> Attribute {
        let attr = self.pool.intern_utf8(attribute).unwrap();
        let entries: Vec<(u16, &Local)> = locals
            .iter()
            .enumerate()
            .filter(|(_, local)| value(local).is_some())
            .map(|(slot, local)| (slot as u16, local))
            .collect();
        let mut info = Vec::new();
        info.write_u16::<BigEndian>(entries.len() as u16).unwrap();
        for (slot, local) in entries {
            let name = self.pool.intern_utf8(local.name).unwrap();
            let desc = self.pool.intern_utf8(value(local).unwrap()).unwrap();
            info.write_u16::<BigEndian>(0).unwrap();
            info.write_u16::<BigEndian>(code_len).unwrap();
            info.write_u16::<BigEndian>(name).unwrap();
            info.write_u16::<BigEndian>(desc).unwrap();
            info.write_u16::<BigEndian>(slot).unwrap();
        }
        Attribute::new(attr, info)
    }

    fn member(
        &mut self,
        access: u16,
        name: &str,
        descriptor: &str,
        attributes: Vec<Attribute>,
    ) -> MemberInfo {
        MemberInfo {
            access,
            name: self.pool.intern_utf8(name).unwrap(),
            descriptor: self.pool.intern_utf8(descriptor).unwrap(),
            attributes,
        }
    }

    fn assemble(&mut self, code: &[Insn]) -> Vec<u8> {
        let mut out = Vec::new();
        for insn in code {
            if let Insn::Lambda {
                interface,
                method,
                descriptor,
                implementation,
            } = *insn
            {
                let site = self.lambda(interface, method, descriptor, implementation);
                out.push(0xBA);
                out.write_u16::<BigEndian>(site).unwrap();
                out.extend_from_slice(&[0, 0]);
                continue;
            }
            let (opcode, operand) = match *insn {
                Insn::ALoad0 => (0x2A, None),
                Insn::Pop => (0x57, None),
                Insn::Return => (0xB1, None),
                Insn::InvokeVirtual(o, n, d) => (0xB6, Some(self.member_ref(RefKind::Method, o, n, d))),
                Insn::InvokeSpecial(o, n, d) => (0xB7, Some(self.member_ref(RefKind::Method, o, n, d))),
                Insn::InvokeStatic(o, n, d) => (0xB8, Some(self.member_ref(RefKind::Method, o, n, d))),
                Insn::GetField(o, n, d) => (0xB4, Some(self.member_ref(RefKind::Field, o, n, d))),
                Insn::GetStatic(o, n, d) => (0xB2, Some(self.member_ref(RefKind::Field, o, n, d))),
                Insn::New(c) => (0xBB, Some(self.pool.intern_class(c).unwrap())),
                Insn::CheckCast(c) => (0xC0, Some(self.pool.intern_class(c).unwrap())),
                Insn::Ldc(s) => (0x13, Some(self.pool.intern_string(s).unwrap())),
                Insn::Lambda { .. } => unreachable!("handled above"),
            };
            out.push(opcode);
            if let Some(idx) = operand {
                out.write_u16::<BigEndian>(idx).unwrap();
            }
        }
        out
    }

    fn member_ref(&mut self, kind: RefKind, owner: &str, name: &str, desc: &str) -> u16 {
        self.pool.intern_member_ref(kind, owner, name, desc).unwrap()
    }

    /// InvokeDynamic entry plus its BootstrapMethods row
    fn lambda(
        &mut self,
        interface: &str,
        method: &str,
        descriptor: &str,
        (owner, name, desc): (&str, &str, &str),
    ) -> u16 {
        let factory = self.member_ref(
            RefKind::Method,
            "java/lang/invoke/LambdaMetafactory",
            "metafactory",
            METAFACTORY_DESC,
        );
        let handle = self
            .pool
            .push(Constant::MethodHandle { kind: 6, reference: factory })
            .unwrap();
        let sam_desc = self.pool.intern_utf8(descriptor).unwrap();
        let sam = self
            .pool
            .push(Constant::MethodType { descriptor: sam_desc })
            .unwrap();
        let target = self.member_ref(RefKind::Method, owner, name, desc);
        let implementation = self
            .pool
            .push(Constant::MethodHandle { kind: 6, reference: target })
            .unwrap();
        let bootstrap = self.bootstrap.len() as u16;
        self.bootstrap.push((handle, vec![sam, implementation, sam]));

        let site_name = self.pool.intern_utf8(method).unwrap();
        let site_desc = self.pool.intern_utf8(&format!("()L{interface};")).unwrap();
        let name_and_type = self.pool.intern_name_and_type(site_name, site_desc).unwrap();
        self.pool
            .push(Constant::InvokeDynamic { bootstrap, name_and_type })
            .unwrap()
    }
}

/// Builder for a jar (zip) archive
#[derive(Default)]
pub struct JarBuilder {
    entries: Vec<(String, Option<Vec<u8>>, CompressionMethod)>,
}

impl JarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a compressed file entry
    pub fn file(mut self, name: &str, data: impl Into<Vec<u8>>) -> Self {
        self.entries
            .push((name.to_string(), Some(data.into()), CompressionMethod::Deflated));
        self
    }

    /// Add an uncompressed file entry
    pub fn stored(mut self, name: &str, data: impl Into<Vec<u8>>) -> Self {
        self.entries
            .push((name.to_string(), Some(data.into()), CompressionMethod::Stored));
        self
    }

    /// Add a directory entry
    pub fn dir(mut self, name: &str) -> Self {
        self.entries
            .push((name.to_string(), None, CompressionMethod::Stored));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data, method) in self.entries {
            let options = FileOptions::default()
                .compression_method(method)
                .last_modified_time(fixed_time())
                .unix_permissions(0o644);
            match data {
                Some(data) => {
                    writer.start_file(name, options).unwrap();
                    writer.write_all(&data).unwrap();
                }
                None => writer.add_directory(name, options).unwrap(),
            }
        }
        writer.finish().unwrap().into_inner()
    }
}

fn fixed_time() -> DateTime {
    DateTime::from_date_and_time(2020, 1, 1, 0, 0, 0).unwrap()
}
