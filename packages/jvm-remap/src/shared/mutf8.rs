//! Modified UTF-8 codec for class-file `Utf8` constants.
//!
//! The JVM stores strings as modified UTF-8: `U+0000` is written as the two
//! byte form `C0 80` and supplementary characters are written as a surrogate
//! pair, each half encoded as a three byte sequence. Decoding rejects every
//! non-shortest form except `C0 80`, so `encode(decode(b)) == b` for any
//! input that decodes.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid modified UTF-8 at byte {offset}")]
pub struct Mutf8Error {
    pub offset: usize,
}

/// Decode modified UTF-8 bytes into a Rust string.
pub fn decode(bytes: &[u8]) -> Result<String, Mutf8Error> {
    if bytes.iter().all(|b| (0x01..0x80).contains(b)) {
        // ASCII fast path; class names and descriptors almost always hit it
        return Ok(bytes.iter().map(|&b| b as char).collect());
    }

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let err = Mutf8Error { offset: i };
        let b0 = bytes[i];
        match b0 {
            0x01..=0x7F => {
                units.push(u16::from(b0));
                i += 1;
            }
            0xC0..=0xDF => {
                let b1 = *bytes.get(i + 1).ok_or(err.clone())?;
                if b1 & 0xC0 != 0x80 {
                    return Err(err);
                }
                let unit = (u16::from(b0 & 0x1F) << 6) | u16::from(b1 & 0x3F);
                if unit != 0 && unit < 0x80 {
                    return Err(err);
                }
                units.push(unit);
                i += 2;
            }
            0xE0..=0xEF => {
                let b1 = *bytes.get(i + 1).ok_or(err.clone())?;
                let b2 = *bytes.get(i + 2).ok_or(err.clone())?;
                if b1 & 0xC0 != 0x80 || b2 & 0xC0 != 0x80 {
                    return Err(err);
                }
                let unit = (u16::from(b0 & 0x0F) << 12)
                    | (u16::from(b1 & 0x3F) << 6)
                    | u16::from(b2 & 0x3F);
                if unit < 0x800 {
                    return Err(err);
                }
                units.push(unit);
                i += 3;
            }
            _ => return Err(err),
        }
    }

    char::decode_utf16(units.iter().copied())
        .collect::<Result<String, _>>()
        .map_err(|_| Mutf8Error { offset: 0 })
}

/// Encode a Rust string as modified UTF-8.
pub fn encode(value: &str) -> Vec<u8> {
    if value.bytes().all(|b| (0x01..0x80).contains(&b)) {
        return value.as_bytes().to_vec();
    }

    let mut out = Vec::with_capacity(value.len() + 8);
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passthrough() {
        assert_eq!(decode(b"net/minecraft/Foo").unwrap(), "net/minecraft/Foo");
        assert_eq!(encode("net/minecraft/Foo"), b"net/minecraft/Foo");
    }

    #[test]
    fn test_nul_uses_two_byte_form() {
        assert_eq!(encode("a\0b"), vec![b'a', 0xC0, 0x80, b'b']);
        assert_eq!(decode(&[b'a', 0xC0, 0x80, b'b']).unwrap(), "a\0b");
    }

    #[test]
    fn test_supplementary_character_uses_surrogate_pair() {
        let encoded = encode("\u{1F600}");
        assert_eq!(encoded.len(), 6);
        assert_eq!(decode(&encoded).unwrap(), "\u{1F600}");
    }

    #[test]
    fn test_rejects_raw_nul_and_overlong() {
        assert!(decode(&[0x00]).is_err());
        assert!(decode(&[0xC1, 0x81]).is_err());
        assert!(decode(&[0xE0, 0x81, 0x81]).is_err());
        assert_eq!(decode(&[b'x', 0xC3]).unwrap_err().offset, 1);
    }
}
