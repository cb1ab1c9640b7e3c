use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs::DirEntry;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ListingError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid entry name: {0}")]
    InvalidName(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Folder,
    File,
}

/// One row of a directory listing. `path` is relative to the owning
/// server's root, with `/` separators on every platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerFileEntry {
    pub name: String,
    pub path: String,
    pub kind: FileKind,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
}

impl ServerFileEntry {
    /// Builds a row from a raw directory entry; `parent` is the listed
    /// directory's path relative to the server root.
    pub fn from_dir_entry(entry: &DirEntry, parent: &Path) -> Result<Self, ListingError> {
        let metadata = entry.metadata()?;
        let name = entry
            .file_name()
            .into_string()
            .map_err(|name| ListingError::InvalidName(name.to_string_lossy().into_owned()))?;
        let kind = if metadata.is_dir() {
            FileKind::Folder
        } else {
            FileKind::File
        };
        let path = parent
            .join(&name)
            .to_string_lossy()
            .replace('\\', "/")
            .trim_start_matches('/')
            .to_owned();

        Ok(Self {
            path,
            kind,
            size: (kind == FileKind::File).then(|| metadata.len()),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            name,
        })
    }
}

/// Folders sort before files, then names alphabetically.
pub fn sort_entries(entries: &mut [ServerFileEntry]) {
    entries.sort_by(|a, b| match (a.kind, b.kind) {
        (FileKind::Folder, FileKind::File) => Ordering::Less,
        (FileKind::File, FileKind::Folder) => Ordering::Greater,
        _ => a.name.cmp(&b.name),
    });
}
