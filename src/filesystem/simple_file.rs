use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use snafu::{ResultExt, Snafu, ensure};
use tracing::debug;

use crate::backend::Backend;
use crate::config::Charset;

use super::attributes::FileAttributes;
use super::entry::{
    CreateFailedSnafu, CreationError, DeletionError, Node, ParentMissingSnafu, RemoveFailedSnafu,
    StorageError, StorageSnafu,
};
use super::location::Location;
use super::Directory;

/// A plain file node. Its parent is always a directory node.
#[derive(Clone)]
pub struct SimpleFile {
    parent: Directory,
    name: Arc<str>,
    location: Location,
    physical: PathBuf,
}

impl SimpleFile {
    pub(crate) fn new(parent: Directory, name: &str) -> Self {
        let physical = parent.physical_path().join(name);
        Self::with_physical(parent, name, physical)
    }

    /// `physical` may differ from `parent + name` when the on-disk name is
    /// not valid UTF-8 and `name` is its lossy rendering.
    pub(crate) fn with_physical(parent: Directory, name: &str, physical: PathBuf) -> Self {
        Self {
            location: Location::file(parent.location(), name),
            name: Arc::from(name),
            physical,
            parent,
        }
    }

    pub(crate) fn backend(&self) -> &dyn Backend {
        self.parent.shared().backend()
    }

    pub fn physical_path(&self) -> &Path {
        &self.physical
    }

    /// Charset configured on the owning filesystem, passed through untouched.
    pub fn charset(&self) -> &Charset {
        self.parent.shared().settings().charset()
    }

    pub fn size(&self) -> Result<u64, StorageError> {
        self.backend()
            .metadata(&self.physical)
            .map(|metadata| metadata.size)
            .context(StorageSnafu { path: self.path() })
    }

    pub fn attributes(&self) -> Result<FileAttributes, StorageError> {
        FileAttributes::read(self)
    }

    /// Creates the file unless it is already there. Losing a creation race
    /// to someone else counts as success.
    pub fn create_safe(&self) -> Result<(), CreationError> {
        if self.exists() {
            return Ok(());
        }
        match self.create() {
            Err(CreationError::CreateFailed { source, .. }) if source.is_already_exists() => Ok(()),
            result => result,
        }
    }

    pub fn open_read(&self) -> Result<Box<dyn Read + Send>, AccessError> {
        debug!("Opening {} for reading", self.path());
        self.prepare_access()?;
        self.backend()
            .open_read(&self.physical)
            .context(StorageSnafu { path: self.path() })
            .context(OpenSnafu)
    }

    pub fn open_write(&self) -> Result<Box<dyn Write + Send>, AccessError> {
        debug!("Opening {} for writing", self.path());
        self.prepare_access()?;
        self.backend()
            .open_write(&self.physical)
            .context(StorageSnafu { path: self.path() })
            .context(OpenSnafu)
    }

    pub fn open_append(&self) -> Result<Box<dyn Write + Send>, AccessError> {
        debug!("Opening {} for appending", self.path());
        self.prepare_access()?;
        self.backend()
            .open_append(&self.physical)
            .context(StorageSnafu { path: self.path() })
            .context(OpenSnafu)
    }

    fn prepare_access(&self) -> Result<(), AccessError> {
        if self.parent.shared().settings().create_on_access() {
            debug!("Creating {} before access", self.path());
            self.create_safe().context(CreateOnAccessSnafu)?;
        }
        Ok(())
    }
}

impl Node for SimpleFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> &str {
        self.location.as_str()
    }

    fn parent(&self) -> Option<&Directory> {
        Some(&self.parent)
    }

    fn exists(&self) -> bool {
        self.backend().exists(&self.physical)
    }

    fn create(&self) -> Result<(), CreationError> {
        ensure!(
            self.parent.exists(),
            ParentMissingSnafu {
                path: self.path(),
                parent: self.parent.path(),
            }
        );

        self.backend()
            .create_file(&self.physical)
            .context(CreateFailedSnafu { path: self.path() })
    }

    fn delete(&self) -> Result<(), DeletionError> {
        if !self.exists() {
            return Ok(());
        }
        self.backend()
            .remove_file(&self.physical)
            .context(RemoveFailedSnafu { path: self.path() })
    }
}

impl PartialEq for SimpleFile {
    fn eq(&self, other: &Self) -> bool {
        self.location == other.location
    }
}

impl Eq for SimpleFile {}

impl Hash for SimpleFile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.location.hash(state);
    }
}

impl fmt::Debug for SimpleFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleFile")
            .field("path", &self.location)
            .field("physical", &self.physical)
            .finish()
    }
}

impl fmt::Display for SimpleFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Snafu)]
pub enum AccessError {
    #[snafu(display("Failed to create the file before accessing it"))]
    CreateOnAccessError { source: CreationError },
    #[snafu(display("Failed to open the file"))]
    OpenError { source: StorageError },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileSettings;
    use crate::filesystem::{FileSystem, Navigable};
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn file_system_with(settings: FileSettings) -> (TempDir, FileSystem) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let fs = FileSystem::with_settings(temp_dir.path(), settings)
            .expect("Failed to create filesystem");
        (temp_dir, fs)
    }

    fn file_system() -> (TempDir, FileSystem) {
        file_system_with(FileSettings::default())
    }

    #[test]
    fn file_path_is_parent_path_plus_name() {
        let (_temp_dir, fs) = file_system();

        let file = fs.file("a/b/x.txt").unwrap();

        assert_eq!(file.path(), "/a/b/x.txt");
        assert_eq!(file.name(), "x.txt");
        assert_eq!(file.parent().unwrap().path(), "/a/b/");
    }

    #[test]
    fn files_with_same_location_are_interchangeable() {
        let (_temp_dir, fs) = file_system();
        let first = fs.file("a/x.txt").unwrap();
        let second = fs.directory("a").unwrap().get_file("x.txt").unwrap();

        assert_eq!(first, second);
        let set: HashSet<_> = [first, second].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn create_requires_existing_parent() {
        let (_temp_dir, fs) = file_system();
        let file = fs.file("missing/x.txt").unwrap();

        assert!(matches!(file.create(), Err(CreationError::ParentMissing { .. })));

        file.parent().unwrap().create().unwrap();
        file.create().expect("Failed to create file");
        assert!(file.exists());
    }

    #[test]
    fn delete_missing_file_is_noop() {
        let (_temp_dir, fs) = file_system();

        fs.file("ghost.txt").unwrap().delete().expect("Deleting nothing should succeed");
    }

    #[test]
    fn write_then_read_back() {
        let (_temp_dir, fs) = file_system();
        let file = fs.file("note.txt").unwrap();
        file.create().unwrap();

        {
            let mut writer = file.open_write().expect("Failed to open for writing");
            writer.write_all(b"hello").unwrap();
        }
        {
            let mut writer = file.open_append().expect("Failed to open for appending");
            writer.write_all(b" world").unwrap();
        }
        let mut contents = String::new();
        file.open_read()
            .expect("Failed to open for reading")
            .read_to_string(&mut contents)
            .unwrap();

        assert_eq!(contents, "hello world");
        assert_eq!(file.size().unwrap(), 11);
    }

    #[test]
    fn open_missing_file_fails_without_create_on_access() {
        let (_temp_dir, fs) = file_system();

        let result = fs.file("absent.txt").unwrap().open_read();

        assert!(matches!(result, Err(AccessError::OpenError { .. })));
    }

    #[test]
    fn create_on_access_creates_missing_file() {
        let (_temp_dir, fs) = file_system_with(FileSettings::default().with_create_on_access(true));
        let file = fs.file("auto.txt").unwrap();

        let mut contents = String::new();
        file.open_read()
            .expect("File should be created on access")
            .read_to_string(&mut contents)
            .unwrap();

        assert!(file.exists());
        assert!(contents.is_empty());
    }

    #[test]
    fn create_on_access_still_requires_parent() {
        let (_temp_dir, fs) = file_system_with(FileSettings::default().with_create_on_access(true));

        let result = fs.file("nowhere/auto.txt").unwrap().open_append();

        assert!(matches!(result, Err(AccessError::CreateOnAccessError { .. })));
    }

    #[test]
    fn charset_comes_from_settings() {
        let (_temp_dir, fs) =
            file_system_with(FileSettings::default().with_charset(Charset::new("ISO-8859-1")));

        assert_eq!(fs.file("x").unwrap().charset().as_ref(), "ISO-8859-1");
    }
}
