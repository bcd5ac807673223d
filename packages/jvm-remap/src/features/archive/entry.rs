//! Archive entries as read from and written to zip containers

use crate::errors::Result;
use std::io::{Cursor, Read, Seek, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// One archive entry with the metadata needed to write it back unchanged.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub data: Vec<u8>,
    pub compression: CompressionMethod,
    pub last_modified: DateTime,
    pub unix_mode: Option<u32>,
    pub is_dir: bool,
}

impl ArchiveEntry {
    /// Entries rewritten by the class rewriter.
    pub fn is_class(&self) -> bool {
        !self.is_dir && self.name.ends_with(".class")
    }

    fn options(&self) -> FileOptions {
        let compression = match self.compression {
            CompressionMethod::Stored => CompressionMethod::Stored,
            _ => CompressionMethod::Deflated,
        };
        let options = FileOptions::default()
            .compression_method(compression)
            .last_modified_time(self.last_modified);
        match self.unix_mode {
            Some(mode) => options.unix_permissions(mode & 0o7777),
            None => options,
        }
    }
}

/// Read every entry, in archive order.
pub fn read_entries<R: Read + Seek>(reader: R) -> Result<Vec<ArchiveEntry>> {
    let mut archive = ZipArchive::new(reader)?;
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        entries.push(ArchiveEntry {
            name: file.name().to_string(),
            data,
            compression: file.compression(),
            last_modified: file.last_modified(),
            unix_mode: file.unix_mode(),
            is_dir: file.is_dir(),
        });
    }
    Ok(entries)
}

/// Write `entries` in order; `data` overrides an entry's bytes and name.
pub fn write_entries<'e, I>(entries: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (&'e ArchiveEntry, Option<(&'e str, &'e [u8])>)>,
{
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (entry, replacement) in entries {
        if entry.is_dir {
            writer.add_directory(entry.name.as_str(), entry.options())?;
            continue;
        }
        let (name, data) = replacement.unwrap_or((entry.name.as_str(), entry.data.as_slice()));
        writer.start_file(name, entry.options())?;
        writer.write_all(data)?;
    }
    Ok(writer.finish()?.into_inner())
}
