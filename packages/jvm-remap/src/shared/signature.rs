//! Generic signature grammar (JVMS §4.7.9.1).
//!
//! Handles class, method and field signatures with one recursive-descent
//! parser. Type variable and type parameter identifiers are copied as-is;
//! only class type signatures are remapped. Inner class suffixes
//! (`Lpkg/Outer<TT;>.Inner;`) are resolved against `Outer$Inner` and written
//! back as the simple name of the mapped inner class.

use std::borrow::Cow;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed signature '{signature}' at offset {offset}")]
pub struct SignatureError {
    pub signature: String,
    pub offset: usize,
}

/// Rewrite every class name referenced by a generic signature.
pub fn map_signature<'a, F>(signature: &'a str, map: F) -> Result<Cow<'a, str>, SignatureError>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut parser = SignatureParser {
        src: signature,
        pos: 0,
        out: String::with_capacity(signature.len() + 16),
        changed: false,
        map,
    };
    parser.parse_top()?;

    Ok(if parser.changed {
        Cow::Owned(parser.out)
    } else {
        Cow::Borrowed(signature)
    })
}

struct SignatureParser<'a, F> {
    src: &'a str,
    pos: usize,
    out: String,
    changed: bool,
    map: F,
}

impl<'a, F> SignatureParser<'a, F>
where
    F: FnMut(&str) -> Option<String>,
{
    fn error(&self) -> SignatureError {
        SignatureError {
            signature: self.src.to_string(),
            offset: self.pos,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8) -> Result<(), SignatureError> {
        if self.peek() != Some(byte) {
            return Err(self.error());
        }
        self.out.push(byte as char);
        self.pos += 1;
        Ok(())
    }

    /// Consume up to (not including) the first byte in `stops`.
    fn take_until(&mut self, stops: &[u8]) -> Result<&'a str, SignatureError> {
        let start = self.pos;
        let rest = &self.src.as_bytes()[start..];
        let len = rest
            .iter()
            .position(|b| stops.contains(b))
            .ok_or_else(|| self.error())?;
        if len == 0 {
            return Err(self.error());
        }
        self.pos += len;
        Ok(&self.src[start..start + len])
    }

    fn parse_top(&mut self) -> Result<(), SignatureError> {
        if self.src.is_empty() {
            return Err(self.error());
        }
        if self.peek() == Some(b'<') {
            self.type_parameters()?;
        }
        if self.peek() == Some(b'(') {
            self.expect(b'(')?;
            while self.peek() != Some(b')') {
                self.java_type()?;
            }
            self.expect(b')')?;
            if self.peek() == Some(b'V') {
                self.expect(b'V')?;
            } else {
                self.java_type()?;
            }
            while self.peek() == Some(b'^') {
                self.expect(b'^')?;
                self.reference_type()?;
            }
        } else {
            // field signature, or superclass followed by interfaces
            while self.peek().is_some() {
                self.reference_type()?;
            }
        }
        if self.peek().is_some() {
            return Err(self.error());
        }
        Ok(())
    }

    fn type_parameters(&mut self) -> Result<(), SignatureError> {
        self.expect(b'<')?;
        while self.peek() != Some(b'>') {
            let ident = self.take_until(b":")?;
            self.out.push_str(ident);
            self.expect(b':')?;
            if matches!(self.peek(), Some(b'L' | b'T' | b'[')) {
                self.reference_type()?;
            }
            while self.peek() == Some(b':') {
                self.expect(b':')?;
                self.reference_type()?;
            }
        }
        self.expect(b'>')
    }

    fn java_type(&mut self) -> Result<(), SignatureError> {
        match self.peek() {
            Some(b @ (b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z')) => self.expect(b),
            _ => self.reference_type(),
        }
    }

    fn reference_type(&mut self) -> Result<(), SignatureError> {
        match self.peek() {
            Some(b'L') => self.class_type(),
            Some(b'T') => {
                self.expect(b'T')?;
                let ident = self.take_until(b";")?;
                self.out.push_str(ident);
                self.expect(b';')
            }
            Some(b'[') => {
                self.expect(b'[')?;
                self.java_type()
            }
            _ => Err(self.error()),
        }
    }

    fn class_type(&mut self) -> Result<(), SignatureError> {
        self.expect(b'L')?;
        let name = self.take_until(b"<.;")?;
        let mut source_name = name.to_string();
        let mut target_name = match (self.map)(name) {
            Some(mapped) => {
                self.changed |= mapped != name;
                mapped
            }
            None => name.to_string(),
        };
        self.out.push_str(&target_name);
        if self.peek() == Some(b'<') {
            self.type_arguments()?;
        }

        while self.peek() == Some(b'.') {
            self.expect(b'.')?;
            let simple = self.take_until(b"<.;")?;
            source_name = format!("{}${}", source_name, simple);
            let mapped_inner = (self.map)(&source_name);
            let emitted = match &mapped_inner {
                Some(mapped) => simple_inner_name(mapped, &target_name).to_string(),
                None => simple.to_string(),
            };
            self.changed |= emitted != simple;
            self.out.push_str(&emitted);
            target_name = mapped_inner.unwrap_or_else(|| format!("{}${}", target_name, simple));
            if self.peek() == Some(b'<') {
                self.type_arguments()?;
            }
        }

        self.expect(b';')
    }

    fn type_arguments(&mut self) -> Result<(), SignatureError> {
        self.expect(b'<')?;
        while self.peek() != Some(b'>') {
            match self.peek() {
                Some(b'*') => self.expect(b'*')?,
                Some(b @ (b'+' | b'-')) => {
                    self.expect(b)?;
                    self.reference_type()?;
                }
                _ => self.reference_type()?,
            }
        }
        self.expect(b'>')
    }
}

/// Simple name of `inner` relative to its (mapped) outer class name.
pub(crate) fn simple_inner_name<'n>(inner: &'n str, outer: &str) -> &'n str {
    inner
        .strip_prefix(outer)
        .and_then(|rest| rest.strip_prefix('$'))
        .unwrap_or_else(|| match inner.rfind('$') {
            Some(idx) => &inner[idx + 1..],
            None => inner.rsplit('/').next().unwrap_or(inner),
        })
}
