//! Zip packaging of file entries.
//!
//! Members are written in first-seen order; a repeated path replaces the
//! earlier content in place (last write wins).

use indexmap::IndexMap;
use std::io::{Cursor, Read, Write};
use zip::write::{FileOptions, ZipWriter};
use zip::{CompressionMethod, ZipArchive};

use super::types::FileEntry;
use crate::error::DeployError;

/// Immutable zip bytes for one upload attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    bytes: Vec<u8>,
}

impl Archive {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Build a deflate-compressed zip archive from ordered entries
pub fn build_archive(entries: &[FileEntry]) -> Result<Archive, DeployError> {
    let mut members: IndexMap<&str, &str> = IndexMap::with_capacity(entries.len());
    for entry in entries {
        members.insert(entry.path.as_str(), entry.content.as_str());
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644);

    for (path, content) in members {
        zip.start_file(path, options)?;
        zip.write_all(content.as_bytes())
            .map_err(|e| DeployError::Archive(format!("{}: {}", path, e)))?;
    }

    let bytes = zip.finish()?.into_inner();
    Ok(Archive { bytes })
}

/// Decompress an archive back into entries, in archive order
pub fn read_archive(bytes: &[u8]) -> Result<Vec<FileEntry>, DeployError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut entries = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let mut member = archive.by_index(index)?;
        let mut content = String::new();
        member
            .read_to_string(&mut content)
            .map_err(|e| DeployError::Archive(format!("{}: {}", member.name(), e)))?;
        entries.push(FileEntry::new(member.name(), content));
    }

    Ok(entries)
}
