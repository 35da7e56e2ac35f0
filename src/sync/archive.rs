use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::path::{Component, Path};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::AppError;

/// In-memory mirror of the uploaded archive: relative path → file bytes.
///
/// Keys always use `/` separators so that the serialized archive is the
/// same on every platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveSnapshot {
    entries: BTreeMap<String, Vec<u8>>,
}

impl ArchiveSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every file entry of a zip archive. Directory entries are skipped and
    /// entries escaping the archive root are rejected.
    pub fn from_zip_bytes(bytes: &[u8]) -> Result<Self, AppError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = BTreeMap::new();

        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            if file.is_dir() {
                continue;
            }
            let Some(name) = file.enclosed_name() else {
                return Err(AppError::LocalState(format!(
                    "Archive entry escapes the exercise folder: {}",
                    file.name()
                )));
            };
            let Some(key) = archive_key(&name) else {
                continue;
            };
            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            entries.insert(key, contents);
        }

        Ok(Self { entries })
    }

    pub fn to_zip_bytes(&self) -> Result<Vec<u8>, AppError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (path, contents) in &self.entries {
            writer.start_file(path.as_str(), options)?;
            writer.write_all(contents)?;
        }

        Ok(writer.finish()?.into_inner())
    }

    /// Writes every entry below `dir`, creating directories as needed.
    pub fn write_to(&self, dir: &Path) -> Result<(), AppError> {
        std::fs::create_dir_all(dir)?;
        for (key, contents) in &self.entries {
            let path = dir.join(key);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, contents)?;
        }
        Ok(())
    }

    /// Inserts or replaces an entry. Returns true when the content changed.
    pub fn insert(&mut self, key: impl Into<String>, contents: Vec<u8>) -> bool {
        let key = key.into();
        if self.entries.get(&key) == Some(&contents) {
            return false;
        }
        self.entries.insert(key, contents);
        true
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Removes every entry below the directory `key`. Returns how many went away.
    pub fn remove_dir(&mut self, key: &str) -> usize {
        let prefix = format!("{}/", key.trim_end_matches('/'));
        let before = self.entries.len();
        self.entries.retain(|path, _| !path.starts_with(&prefix));
        before - self.entries.len()
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries.iter().map(|(path, contents)| (path.as_str(), contents.as_slice()))
    }
}

/// `/`-joined form of a relative path; `None` for paths that are empty or not plain relative paths.
pub fn archive_key(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?.to_string()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}
