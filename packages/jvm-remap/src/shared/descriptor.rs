//! Field and method descriptor grammar (JVMS §4.3).
//!
//! Descriptors embed internal class names as `L<name>;`. Remapping a
//! descriptor means rewriting every embedded class name while copying the
//! rest verbatim; unchanged descriptors come back borrowed.

use std::borrow::Cow;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed descriptor '{descriptor}' at offset {offset}")]
pub struct DescriptorError {
    pub descriptor: String,
    pub offset: usize,
}

impl DescriptorError {
    fn at(descriptor: &str, offset: usize) -> Self {
        Self {
            descriptor: descriptor.to_string(),
            offset,
        }
    }
}

/// Rewrite every class name embedded in a field or method descriptor.
///
/// `map` returns `Some(new_name)` for classes that change and `None` for
/// classes that stay as they are.
pub fn map_descriptor<'a, F>(desc: &'a str, mut map: F) -> Result<Cow<'a, str>, DescriptorError>
where
    F: FnMut(&str) -> Option<String>,
{
    let bytes = desc.as_bytes();
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut i = 0;

    if bytes.is_empty() {
        return Err(DescriptorError::at(desc, 0));
    }

    while i < bytes.len() {
        match bytes[i] {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b'V' | b'[' | b'(' | b')' => {
                i += 1;
            }
            b'L' => {
                let start = i + 1;
                let end = desc[start..]
                    .find(';')
                    .map(|rel| start + rel)
                    .ok_or_else(|| DescriptorError::at(desc, i))?;
                if end == start {
                    return Err(DescriptorError::at(desc, i));
                }
                if let Some(mapped) = map(&desc[start..end]) {
                    let buf = out.get_or_insert_with(|| String::with_capacity(desc.len() + 16));
                    buf.push_str(&desc[copied..start]);
                    buf.push_str(&mapped);
                    copied = end;
                }
                i = end + 1;
            }
            _ => return Err(DescriptorError::at(desc, i)),
        }
    }

    Ok(match out {
        Some(mut buf) => {
            buf.push_str(&desc[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(desc),
    })
}

/// Rewrite a `CONSTANT_Class` name, which is either an internal name or an
/// array descriptor.
pub fn map_class_name<'a, F>(name: &'a str, mut map: F) -> Result<Cow<'a, str>, DescriptorError>
where
    F: FnMut(&str) -> Option<String>,
{
    if name.starts_with('[') {
        return map_descriptor(name, map);
    }
    Ok(match map(name) {
        Some(mapped) => Cow::Owned(mapped),
        None => Cow::Borrowed(name),
    })
}

/// Return type part of a method descriptor (`(I)Lfoo/Bar;` -> `Lfoo/Bar;`).
pub fn return_type(method_desc: &str) -> Option<&str> {
    method_desc.rfind(')').map(|idx| &method_desc[idx + 1..])
}

/// Internal name of an object type descriptor (`Lfoo/Bar;` -> `foo/Bar`).
pub fn object_type_name(field_desc: &str) -> Option<&str> {
    field_desc.strip_prefix('L')?.strip_suffix(';')
}
