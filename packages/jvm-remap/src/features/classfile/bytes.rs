//! Big-endian framing over class-file bytes

use super::error::{ClassFileError, ClassFileResult};
use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use std::io::{self, Cursor};

/// Cursor over class data; running out of bytes is `UnexpectedEof` at the
/// offset where the read started.
pub(crate) struct ByteReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self::at(data, 0)
    }

    pub(crate) fn at(data: &'a [u8], pos: usize) -> Self {
        let mut cursor = Cursor::new(data);
        cursor.set_position(pos as u64);
        Self { cursor }
    }

    pub(crate) fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub(crate) fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }

    pub(crate) fn bytes(&mut self, len: usize) -> ClassFileResult<&'a [u8]> {
        let data: &'a [u8] = *self.cursor.get_ref();
        let start = self.position();
        let end = start
            .checked_add(len)
            .filter(|&end| end <= data.len())
            .ok_or(ClassFileError::UnexpectedEof { offset: start })?;
        self.cursor.set_position(end as u64);
        Ok(&data[start..end])
    }

    pub(crate) fn skip(&mut self, len: usize) -> ClassFileResult<()> {
        self.bytes(len).map(|_| ())
    }

    pub(crate) fn u8(&mut self) -> ClassFileResult<u8> {
        self.read(|c| c.read_u8())
    }

    pub(crate) fn u16(&mut self) -> ClassFileResult<u16> {
        self.read(|c| c.read_u16::<BigEndian>())
    }

    pub(crate) fn u32(&mut self) -> ClassFileResult<u32> {
        self.read(|c| c.read_u32::<BigEndian>())
    }

    pub(crate) fn u64(&mut self) -> ClassFileResult<u64> {
        self.read(|c| c.read_u64::<BigEndian>())
    }

    fn read<T>(
        &mut self,
        read: impl FnOnce(&mut Cursor<&'a [u8]>) -> io::Result<T>,
    ) -> ClassFileResult<T> {
        let offset = self.position();
        read(&mut self.cursor).map_err(|_| ClassFileError::UnexpectedEof { offset })
    }
}

pub(crate) fn read_u16_at(data: &[u8], offset: usize) -> ClassFileResult<u16> {
    ByteReader::at(data, offset).u16()
}

/// Patch a u16 slot found by an attribute scan.
pub(crate) fn write_u16_at(data: &mut [u8], offset: usize, value: u16) {
    BigEndian::write_u16(&mut data[offset..offset + 2], value);
}
