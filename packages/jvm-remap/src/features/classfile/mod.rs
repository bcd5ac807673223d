//! Class-file codec
//!
//! Parses compiled JVM classes into a structure that can be rewritten and
//! re-emitted without disturbing anything the rewriter does not touch.

pub mod attributes;
mod bytes;
pub mod class_file;
pub mod constant_pool;
pub mod error;

pub use attributes::{reference_counts, scan_attribute, CodeAttribute, Slot, SlotRole, SlotScan};
pub use class_file::{Attribute, ClassFile, MemberInfo, ACC_PRIVATE, ACC_STATIC};
pub use constant_pool::{Constant, ConstantPool, RefKind};
pub use error::{ClassFileError, ClassFileResult};

pub(crate) use bytes::{read_u16_at, write_u16_at};
