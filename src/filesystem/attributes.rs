use std::time::SystemTime;

use snafu::ResultExt;

use super::entry::{Node, StorageError, StorageSnafu};
use super::SimpleFile;

/// Snapshot of a file's timestamps.
///
/// Values are read once when the snapshot is taken and only change through
/// [`FileAttributes::refresh`]. A file that does not exist has no timestamps.
#[derive(Debug, Clone)]
pub struct FileAttributes {
    file: SimpleFile,
    last_modified: Option<SystemTime>,
    created: Option<SystemTime>,
    last_accessed: Option<SystemTime>,
}

impl FileAttributes {
    pub(crate) fn read(file: &SimpleFile) -> Result<Self, StorageError> {
        let mut attributes = Self {
            file: file.clone(),
            last_modified: None,
            created: None,
            last_accessed: None,
        };
        attributes.refresh()?;
        Ok(attributes)
    }

    pub fn refresh(&mut self) -> Result<(), StorageError> {
        if !self.file.exists() {
            self.last_modified = None;
            self.created = None;
            self.last_accessed = None;
            return Ok(());
        }

        let metadata = self
            .file
            .backend()
            .metadata(self.file.physical_path())
            .context(StorageSnafu {
                path: self.file.path(),
            })?;

        self.last_modified = metadata.modified;
        self.created = metadata.created;
        self.last_accessed = metadata.accessed;
        Ok(())
    }

    pub fn file(&self) -> &SimpleFile {
        &self.file
    }

    pub fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }

    /// Not every platform records creation time.
    pub fn created(&self) -> Option<SystemTime> {
        self.created
    }

    pub fn last_accessed(&self) -> Option<SystemTime> {
        self.last_accessed
    }
}
