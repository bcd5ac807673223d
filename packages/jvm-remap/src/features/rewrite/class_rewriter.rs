//! Class Rewriter
//!
//! Rewrites every symbolic name in one compiled class from the source
//! namespace to the target namespace.
//!
//! Pool discipline:
//! - Utf8 entries are never edited; a rewritten slot points at the earliest
//!   entry holding the new value, appending one only when none exists.
//! - Class and member-reference entries are updated in place so instruction
//!   operands stay valid.
//! - Trailing Utf8/NameAndType entries left unreferenced are trimmed.
//!
//! Remapping A to B and back to A therefore lands on the original indices
//! and the original bytes.

use super::error::RewriteResult;
use super::remapper::{Remapper, RewriteStats};
use crate::features::classfile::{
    read_u16_at, reference_counts, scan_attribute, write_u16_at, Attribute, ClassFile,
    ClassFileError, Constant, ConstantPool, MemberInfo, RefKind, SlotRole,
};
use crate::features::classpath::{is_overridable, ClasspathIndex};
use crate::features::mapping::{MappingModel, MemberKind, NamespaceId};
use crate::shared::descriptor::{map_class_name, object_type_name, return_type};
use crate::shared::signature::simple_inner_name;
use std::borrow::Cow;

const LAMBDA_METAFACTORY: &str = "java/lang/invoke/LambdaMetafactory";

/// Result of rewriting one class.
#[derive(Debug, Clone)]
pub struct RewrittenClass {
    pub bytes: Vec<u8>,
    /// Internal name before the rewrite
    pub original_name: String,
    /// Internal name after the rewrite
    pub name: String,
    pub stats: RewriteStats,
}

/// Shared, read-only rewrite context; one per transform, used from many
/// worker threads.
pub struct ClassRewriter<'a> {
    model: &'a MappingModel,
    index: &'a ClasspathIndex,
    source: NamespaceId,
    target: NamespaceId,
}

impl<'a> ClassRewriter<'a> {
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
        }
    }

    /// Rewrite `class_bytes`; fails with `RewriteError::Malformed` when the
    /// bytes are not a valid class.
    pub fn rewrite(&self, class_bytes: &[u8]) -> RewriteResult<RewrittenClass> {
        let mut class = ClassFile::parse(class_bytes)?;
        let original_name = class.name()?.to_string();

        if self.source == self.target {
            return Ok(RewrittenClass {
                bytes: class_bytes.to_vec(),
                name: original_name.clone(),
                original_name,
                stats: RewriteStats::default(),
            });
        }

        let original = class.pool.clone();
        let bootstrap = bootstrap_methods(&class)?;
        let mut remapper = Remapper::new(self.model, self.index, self.source, self.target);

        rewrite_pool(&mut remapper, &original, &mut class.pool, &bootstrap)?;

        let ClassFile {
            pool,
            fields,
            methods,
            attributes,
            ..
        } = &mut class;
        let mut ctx = Context {
            remapper: &mut remapper,
            original: &original,
            pool,
            this_name: &original_name,
        };
        for field in fields.iter_mut() {
            ctx.declaration(MemberKind::Field, field)?;
        }
        for method in methods.iter_mut() {
            ctx.declaration(MemberKind::Method, method)?;
        }
        let member_attributes = fields
            .iter_mut()
            .chain(methods.iter_mut())
            .flat_map(|member| member.attributes.iter_mut());
        for attribute in attributes.iter_mut().chain(member_attributes) {
            ctx.attribute(attribute)?;
        }

        if let Some(mut counts) = reference_counts(&class)? {
            class.pool.trim_unreferenced_tail(&mut counts);
        }

        let name = class.name()?.to_string();
        let mut stats = remapper.stats();
        if name != original_name {
            stats.classes_renamed = 1;
        }
        Ok(RewrittenClass {
            bytes: class.to_bytes()?,
            original_name,
            name,
            stats,
        })
    }
}

/// Rewrite `class_bytes` with a one-off context.
pub fn rewrite(
    class_bytes: &[u8],
    model: &MappingModel,
    source: NamespaceId,
    target: NamespaceId,
    index: &ClasspathIndex,
) -> RewriteResult<RewrittenClass> {
    ClassRewriter::new(model, index, source, target).rewrite(class_bytes)
}

struct BootstrapMethod {
    handle: u16,
    arguments: Vec<u16>,
}

fn bootstrap_methods(class: &ClassFile) -> Result<Vec<BootstrapMethod>, ClassFileError> {
    let Some(attribute) = class
        .attributes
        .iter()
        .find(|a| class.pool.utf8(a.name).ok() == Some("BootstrapMethods"))
    else {
        return Ok(Vec::new());
    };

    let info = &attribute.info;
    let count = read_u16_at(info, 0)?;
    let mut offset = 2;
    let mut methods = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let handle = read_u16_at(info, offset)?;
        let argc = read_u16_at(info, offset + 2)? as usize;
        let arguments = (0..argc)
            .map(|i| read_u16_at(info, offset + 4 + i * 2))
            .collect::<Result<Vec<_>, _>>()?;
        offset += 4 + argc * 2;
        methods.push(BootstrapMethod { handle, arguments });
    }
    Ok(methods)
}

fn member_kind(kind: RefKind) -> MemberKind {
    match kind {
        RefKind::Field => MemberKind::Field,
        RefKind::Method | RefKind::InterfaceMethod => MemberKind::Method,
    }
}

/// Intern `value` unless it equals what `current` already holds.
fn redirect(pool: &mut ConstantPool, current: u16, old: &str, value: &str) -> Result<u16, ClassFileError> {
    if old == value {
        Ok(current)
    } else {
        pool.intern_utf8(value)
    }
}

fn rewrite_pool(
    remapper: &mut Remapper<'_>,
    original: &ConstantPool,
    pool: &mut ConstantPool,
    bootstrap: &[BootstrapMethod],
) -> RewriteResult<()> {
    for (index, constant) in original.entries() {
        match *constant {
            Constant::Class { name } => {
                let old = original.utf8(name)?;
                let new = map_class_name(old, |c| remapper.map_class(c).map(str::to_string))
                    .map_err(ClassFileError::from)?;
                if new != old {
                    let interned = pool.intern_utf8(&new)?;
                    set(pool, index, Constant::Class { name: interned })?;
                }
            }
            Constant::MemberRef {
                kind,
                class,
                name_and_type,
            } => {
                let owner = original.class_name(class)?;
                let (name, desc) = original.name_and_type(name_and_type)?;
                let mapped = remapper.map_member(member_kind(kind), owner, name, desc)?;
                if mapped.is_some_and(|m| m != name) {
                    remapper.stats.members_renamed += 1;
                }
                let nat = rename_nat(remapper, original, pool, name_and_type, mapped)?;
                if nat != name_and_type {
                    set(
                        pool,
                        index,
                        Constant::MemberRef {
                            kind,
                            class,
                            name_and_type: nat,
                        },
                    )?;
                }
            }
            Constant::MethodType { descriptor } => {
                let old = original.utf8(descriptor)?;
                let new = remapper.map_descriptor(old).map_err(ClassFileError::from)?;
                let interned = redirect(pool, descriptor, old, &new)?;
                if interned != descriptor {
                    set(pool, index, Constant::MethodType { descriptor: interned })?;
                }
            }
            Constant::InvokeDynamic {
                bootstrap: bsm,
                name_and_type,
            } => {
                let mapped = lambda_name(remapper, original, bootstrap, bsm, name_and_type)?;
                let nat = rename_nat(remapper, original, pool, name_and_type, mapped)?;
                if nat != name_and_type {
                    set(
                        pool,
                        index,
                        Constant::InvokeDynamic {
                            bootstrap: bsm,
                            name_and_type: nat,
                        },
                    )?;
                }
            }
            Constant::Dynamic {
                bootstrap: bsm,
                name_and_type,
            } => {
                let nat = rename_nat(remapper, original, pool, name_and_type, None)?;
                if nat != name_and_type {
                    set(
                        pool,
                        index,
                        Constant::Dynamic {
                            bootstrap: bsm,
                            name_and_type: nat,
                        },
                    )?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn set(pool: &mut ConstantPool, index: u16, constant: Constant) -> Result<(), ClassFileError> {
    let slot = pool.get_mut(index).ok_or(ClassFileError::BadConstantIndex {
        index,
        expected: "existing entry",
    })?;
    *slot = constant;
    Ok(())
}

/// NameAndType for `(new_name or old name, mapped descriptor)`.
fn rename_nat(
    remapper: &Remapper<'_>,
    original: &ConstantPool,
    pool: &mut ConstantPool,
    nat: u16,
    new_name: Option<&str>,
) -> RewriteResult<u16> {
    let Some(Constant::NameAndType { name, descriptor }) = original.get(nat).cloned() else {
        return Err(ClassFileError::BadConstantIndex {
            index: nat,
            expected: "NameAndType",
        }
        .into());
    };
    let old_name = original.utf8(name)?;
    let old_desc = original.utf8(descriptor)?;
    let new_desc = remapper.map_descriptor(old_desc).map_err(ClassFileError::from)?;
    let new_name = new_name.unwrap_or(old_name);
    if new_name == old_name && new_desc == old_desc {
        return Ok(nat);
    }

    let name = redirect(pool, name, old_name, new_name)?;
    let descriptor = redirect(pool, descriptor, old_desc, &new_desc)?;
    Ok(pool.intern_name_and_type(name, descriptor)?)
}

/// Mapped SAM method name for a `LambdaMetafactory` call site.
fn lambda_name<'a>(
    remapper: &mut Remapper<'a>,
    original: &ConstantPool,
    bootstrap: &[BootstrapMethod],
    bsm: u16,
    nat: u16,
) -> RewriteResult<Option<&'a str>> {
    let Some(method) = bootstrap.get(bsm as usize) else {
        return Err(ClassFileError::attribute(
            "BootstrapMethods",
            format!("invokedynamic refers to missing bootstrap method {bsm}"),
        )
        .into());
    };
    let Some(Constant::MethodHandle { reference, .. }) = original.get(method.handle) else {
        return Ok(None);
    };
    let (_, bsm_owner, _, _) = original.member_ref(*reference)?;
    if bsm_owner != LAMBDA_METAFACTORY {
        return Ok(None);
    }

    let (name, desc) = original.name_and_type(nat)?;
    let interface = return_type(desc).and_then(object_type_name);
    let sam = match method.arguments.first().and_then(|&a| original.get(a)) {
        Some(Constant::MethodType { descriptor }) => Some(original.utf8(*descriptor)?),
        _ => None,
    };
    match (interface, sam) {
        (Some(interface), Some(sam)) => Ok(remapper.map_member(MemberKind::Method, interface, name, sam)?),
        _ => Ok(None),
    }
}

struct Context<'r, 'a> {
    remapper: &'r mut Remapper<'a>,
    original: &'r ConstantPool,
    pool: &'r mut ConstantPool,
    this_name: &'r str,
}

impl<'r, 'a> Context<'r, 'a> {
    fn declaration(
        &mut self,
        kind: MemberKind,
        member: &mut MemberInfo,
    ) -> RewriteResult<()> {
        let name = self.original.utf8(member.name)?;
        let desc = self.original.utf8(member.descriptor)?;
        // fields, private and static methods hide rather than override
        let inherits = is_overridable(kind, member.access);

        if let Some(mapped) =
            self.remapper
                .map_declaration(kind, self.this_name, name, desc, inherits)?
        {
            if mapped != name {
                self.remapper.stats.members_renamed += 1;
                member.name = self.pool.intern_utf8(mapped)?;
            }
        }
        let new_desc = self.remapper.map_descriptor(desc).map_err(ClassFileError::from)?;
        member.descriptor = redirect(self.pool, member.descriptor, desc, &new_desc)?;
        Ok(())
    }

    fn attribute(&mut self, attribute: &mut Attribute) -> RewriteResult<()> {
        let name = self.original.utf8(attribute.name)?;
        let scan = scan_attribute(self.original, name, &attribute.info)?;
        if scan.slots.is_empty() {
            return Ok(());
        }

        let info = attribute.info.clone();
        let read = |offset: usize| read_u16_at(&info, offset);
        for slot in scan.slots {
            let index = read(slot.offset)?;
            let replacement = match slot.role {
                SlotRole::Plain => None,
                SlotRole::NameAndType { class_offset } => {
                    let owner = self.original.class_name(read(class_offset)?)?;
                    let (method, desc) = self.original.name_and_type(index)?;
                    let mapped = self.remapper.map_member(MemberKind::Method, owner, method, desc)?;
                    let nat = rename_nat(self.remapper, self.original, self.pool, index, mapped)?;
                    write_u16_at(&mut attribute.info, slot.offset, nat);
                    None
                }
                role => self.utf8_slot(role, index, &read)?,
            };
            if let Some((old, new)) = replacement {
                let interned = redirect(self.pool, index, &old, &new)?;
                write_u16_at(&mut attribute.info, slot.offset, interned);
            }
        }
        Ok(())
    }

    /// (old, new) value of a Utf8 slot, `None` when it stays.
    fn utf8_slot(
        &mut self,
        role: SlotRole,
        index: u16,
        read: &dyn Fn(usize) -> Result<u16, ClassFileError>,
    ) -> RewriteResult<Option<(String, String)>> {
        let original = self.original;
        let value = original.utf8(index)?;
        let new: Cow<'_, str> = match role {
            SlotRole::Signature => self.remapper.map_signature(value).map_err(ClassFileError::from)?,
            SlotRole::FieldDescriptor => {
                self.remapper.map_descriptor(value).map_err(ClassFileError::from)?
            }
            SlotRole::ReturnDescriptor if value == "V" => Cow::Borrowed(value),
            SlotRole::ReturnDescriptor => {
                self.remapper.map_descriptor(value).map_err(ClassFileError::from)?
            }
            SlotRole::EnumConstant { type_offset } => {
                let ty = original.utf8(read(type_offset)?)?;
                match object_type_name(ty) {
                    Some(owner) => self
                        .remapper
                        .map_member(MemberKind::Field, owner, value, ty)?
                        .map_or(Cow::Borrowed(value), Cow::Borrowed),
                    None => Cow::Borrowed(value),
                }
            }
            SlotRole::RecordComponentName { descriptor_offset } => {
                let desc = original.utf8(read(descriptor_offset)?)?;
                self.remapper
                    .map_declaration(MemberKind::Field, self.this_name, value, desc, false)?
                    .map_or(Cow::Borrowed(value), Cow::Borrowed)
            }
            SlotRole::InnerName { entry_offset } => {
                let inner = original.class_name(read(entry_offset)?)?;
                match self.remapper.map_class(inner) {
                    Some(mapped_inner) => {
                        let outer_index = read(entry_offset + 2)?;
                        let mapped_outer = if outer_index == 0 {
                            mapped_inner.rsplit_once('$').map_or("", |(outer, _)| outer)
                        } else {
                            let outer = original.class_name(outer_index)?;
                            self.remapper.map_class(outer).unwrap_or(outer)
                        };
                        Cow::Borrowed(simple_inner_name(mapped_inner, mapped_outer))
                    }
                    None => Cow::Borrowed(value),
                }
            }
            SlotRole::Plain | SlotRole::NameAndType { .. } => Cow::Borrowed(value),
        };

        Ok(if new == value {
            None
        } else {
            Some((value.to_string(), new.into_owned()))
        })
    }
}
