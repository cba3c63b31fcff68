use snafu::Snafu;

use crate::backend::BackendError;
use crate::watch::{FileModification, WatchUnavailable};

use super::path_resolver::NavigationError;
use super::{Directory, SimpleFile};

/// Capabilities every node has: a structural identity and a physical
/// counterpart that may or may not exist.
pub trait Node {
    /// Last path segment; `/` for the root.
    fn name(&self) -> &str;
    /// Logical path rendered from the parent chain.
    fn path(&self) -> &str;
    fn parent(&self) -> Option<&Directory>;
    fn exists(&self) -> bool;
    /// Creates the physical counterpart. Fails if the parent is missing and,
    /// passing the backend through, if the node already exists.
    fn create(&self) -> Result<(), CreationError>;
    /// Removes the physical counterpart. Missing nodes are not an error.
    fn delete(&self) -> Result<(), DeletionError>;
}

pub trait Navigable {
    fn change_directory(&self, path: &str) -> Result<Directory, NavigationError>;
    fn get_file(&self, path: &str) -> Result<SimpleFile, NavigationError>;
}

pub trait Enumerable {
    /// Immediate plain-file children accepted by `predicate`, sorted by name.
    fn list_files<P>(&self, predicate: P) -> Result<Vec<SimpleFile>, StorageError>
    where
        P: FnMut(&SimpleFile) -> bool;

    fn list_all_files(&self) -> Result<Vec<SimpleFile>, StorageError> {
        self.list_files(|_| true)
    }

    /// Immediate sub-directories, sorted by name.
    fn list_directories(&self) -> Result<Vec<Directory>, StorageError>;
}

/// Change notification for the direct children of a directory.
pub trait Watchable {
    fn activate(&self);
    fn deactivate(&self);
    fn is_active(&self) -> bool;
    /// Why the native watch could not be registered, if it could not.
    fn watch_unavailable(&self) -> Option<&WatchUnavailable>;
    fn on_create<H>(&self, handler: H)
    where
        H: Fn(&FileModification) + Send + Sync + 'static;
    fn on_delete<H>(&self, handler: H)
    where
        H: Fn(&FileModification) + Send + Sync + 'static;
    fn on_modify<H>(&self, handler: H)
    where
        H: Fn(&FileModification) + Send + Sync + 'static;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Entry {
    Directory(Directory),
    File(SimpleFile),
}

impl Node for Entry {
    fn name(&self) -> &str {
        match self {
            Entry::Directory(directory) => directory.name(),
            Entry::File(file) => file.name(),
        }
    }

    fn path(&self) -> &str {
        match self {
            Entry::Directory(directory) => directory.path(),
            Entry::File(file) => file.path(),
        }
    }

    fn parent(&self) -> Option<&Directory> {
        match self {
            Entry::Directory(directory) => directory.parent(),
            Entry::File(file) => file.parent(),
        }
    }

    fn exists(&self) -> bool {
        match self {
            Entry::Directory(directory) => directory.exists(),
            Entry::File(file) => file.exists(),
        }
    }

    fn create(&self) -> Result<(), CreationError> {
        match self {
            Entry::Directory(directory) => directory.create(),
            Entry::File(file) => file.create(),
        }
    }

    fn delete(&self) -> Result<(), DeletionError> {
        match self {
            Entry::Directory(directory) => directory.delete(),
            Entry::File(file) => file.delete(),
        }
    }
}

impl From<Directory> for Entry {
    fn from(directory: Directory) -> Self {
        Entry::Directory(directory)
    }
}

impl From<SimpleFile> for Entry {
    fn from(file: SimpleFile) -> Self {
        Entry::File(file)
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), display("Storage access failed for {}", path))]
pub struct StorageError {
    path: String,
    source: BackendError,
}

impl StorageError {
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CreationError {
    #[snafu(display("Cannot create {}: parent {} does not exist", path, parent))]
    ParentMissing { path: String, parent: String },
    #[snafu(display("Failed to create {}", path))]
    CreateFailed { path: String, source: BackendError },
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DeletionError {
    #[snafu(display("Failed to enumerate {} for deletion", path))]
    Enumerate { path: String, source: StorageError },
    #[snafu(display("Failed to delete {} inside {}", source.failed_path(), path))]
    Descendant {
        path: String,
        source: Box<DeletionError>,
    },
    #[snafu(display("Failed to delete {}", path))]
    RemoveFailed { path: String, source: BackendError },
}

impl DeletionError {
    /// Logical path of the node whose removal actually failed.
    pub fn failed_path(&self) -> &str {
        match self {
            DeletionError::Descendant { source, .. } => source.failed_path(),
            DeletionError::Enumerate { path, .. } | DeletionError::RemoveFailed { path, .. } => path,
        }
    }
}
