//! Error types for class-file parsing and rewriting

use crate::shared::{DescriptorError, SignatureError};
use thiserror::Error;

/// Structural problems in class-file bytes (the MalformedInput family).
#[derive(Debug, Error)]
pub enum ClassFileError {
    #[error("unexpected end of class data at offset {offset}")]
    UnexpectedEof { offset: usize },

    #[error("bad magic 0x{0:08X}, not a class file")]
    BadMagic(u32),

    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownConstantTag { index: u16, tag: u8 },

    #[error("constant pool index {index} is invalid (expected {expected})")]
    BadConstantIndex { index: u16, expected: &'static str },

    #[error("invalid modified UTF-8 in constant {index}")]
    InvalidUtf8 { index: u16 },

    #[error("malformed {attribute} attribute: {reason}")]
    MalformedAttribute { attribute: String, reason: String },

    #[error("constant pool overflow: more than 65535 slots")]
    PoolOverflow,

    #[error("{0} trailing bytes after class data")]
    TrailingBytes(usize),

    #[error("failed to write class data: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Signature(#[from] SignatureError),
}

impl ClassFileError {
    pub(crate) fn attribute(attribute: &str, reason: impl Into<String>) -> Self {
        Self::MalformedAttribute {
            attribute: attribute.to_string(),
            reason: reason.into(),
        }
    }
}

pub type ClassFileResult<T> = Result<T, ClassFileError>;
