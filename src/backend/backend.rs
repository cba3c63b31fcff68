use std::ffi::OsString;
use std::fmt::Debug;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use derive_more::Display;
use snafu::Snafu;

use crate::ext::BestEffortPathExt;

/// Physical storage primitives the virtual filesystem is built on.
///
/// Everything above this trait works on logical nodes; implementations only
/// ever see physical paths.
pub trait Backend: Debug + Send + Sync {
    /// Whether anything is at `path`. A dangling link counts.
    fn exists(&self, path: &Path) -> bool;
    fn is_symlink(&self, path: &Path) -> bool;
    fn create_directory(&self, path: &Path) -> Result<(), BackendError>;
    fn create_directory_all(&self, path: &Path) -> Result<(), BackendError>;
    fn create_file(&self, path: &Path) -> Result<(), BackendError>;
    fn remove_directory(&self, path: &Path) -> Result<(), BackendError>;
    /// Removes a non-directory entry. A link is removed, never its target.
    fn remove_file(&self, path: &Path) -> Result<(), BackendError>;
    /// Immediate children of `path`, in no particular order.
    fn list_entries(&self, path: &Path) -> Result<Vec<EntryInfo>, BackendError>;
    fn metadata(&self, path: &Path) -> Result<EntryMetadata, BackendError>;
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>, BackendError>;
    fn open_write(&self, path: &Path) -> Result<Box<dyn Write + Send>, BackendError>;
    fn open_append(&self, path: &Path) -> Result<Box<dyn Write + Send>, BackendError>;
    /// Registers interest in create/delete/modify events for the direct
    /// children of `directory`.
    fn watch(&self, directory: &Path) -> Result<Box<dyn ChangeSource>, BackendError>;
}

/// A native change-event source for a single directory.
pub trait ChangeSource: Debug + Send + Sync {
    /// Takes every change reported since the previous call, in arrival order.
    fn drain(&self) -> Vec<RawChange>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ModificationKind {
    #[display("CREATE")]
    Create,
    #[display("DELETE")]
    Delete,
    #[display("MODIFY")]
    Modify,
}

/// An undecorated native event: the bare entry name plus what happened to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChange {
    pub entry_name: String,
    pub kind: ModificationKind,
}

impl RawChange {
    pub fn new(entry_name: impl Into<String>, kind: ModificationKind) -> Self {
        Self {
            entry_name: entry_name.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

/// One child of a listed directory.
///
/// `kind` describes the entry itself and never follows links, `target_kind`
/// follows them (`Other` for a dangling link). `name` is the raw name and may
/// not be valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub name: OsString,
    pub kind: EntryKind,
    pub target_kind: EntryKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntryMetadata {
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub created: Option<SystemTime>,
    pub accessed: Option<SystemTime>,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BackendError {
    #[snafu(display("Failed to create directory {}", path.best_effort_path_display()))]
    CreateDirectoryError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to create file {}", path.best_effort_path_display()))]
    CreateFileError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to remove {}", path.best_effort_path_display()))]
    RemoveError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to list entries of {}", path.best_effort_path_display()))]
    ListError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to read metadata of {}", path.best_effort_path_display()))]
    MetadataError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to open {}", path.best_effort_path_display()))]
    OpenError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to watch {}", path.best_effort_path_display()))]
    WatchError {
        path: PathBuf,
        source: notify::Error,
    },
}

impl BackendError {
    /// True when the underlying I/O failure means the target was already there.
    pub fn is_already_exists(&self) -> bool {
        match self {
            BackendError::CreateDirectoryError { source, .. }
            | BackendError::CreateFileError { source, .. } => {
                source.kind() == std::io::ErrorKind::AlreadyExists
            }
            _ => false,
        }
    }
}
