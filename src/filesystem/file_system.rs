use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use snafu::{ResultExt, Snafu};
use tracing::info;

use crate::backend::{Backend, BackendError, LocalBackend};
use crate::config::FileSettings;
use crate::ext::BestEffortPathExt;
use crate::watch::{SchedulerError, WatchScheduler};

use super::entry::CreationError;
use super::location::SEPARATOR;
use super::path_resolver::{NavigationError, PathResolver};
use super::{Directory, SimpleFile};

/// State every node of one filesystem instance shares.
pub(crate) struct FileSystemShared {
    backend: Arc<dyn Backend>,
    physical_root: PathBuf,
    settings: FileSettings,
    scheduler: WatchScheduler,
}

impl FileSystemShared {
    pub(crate) fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub(crate) fn physical_root(&self) -> &Path {
        &self.physical_root
    }

    pub(crate) fn settings(&self) -> &FileSettings {
        &self.settings
    }

    pub(crate) fn scheduler(&self) -> &WatchScheduler {
        &self.scheduler
    }
}

/// A virtual filesystem rooted at one physical directory.
///
/// Paths are `/`-separated on every platform, `.` is the current directory and
/// `..` the parent one. Paths starting with `/` are relative to this
/// filesystem's root, never to the physical store's root.
#[derive(Clone)]
pub struct FileSystem {
    shared: Arc<FileSystemShared>,
    root: Directory,
}

impl FileSystem {
    /// Local-disk filesystem with default settings. The physical root is
    /// created if missing.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, FileSystemCreationError> {
        Self::with_settings(root, FileSettings::default())
    }

    pub fn with_settings(
        root: impl Into<PathBuf>,
        settings: FileSettings,
    ) -> Result<Self, FileSystemCreationError> {
        Self::with_backend(Arc::new(LocalBackend::new()), root, settings)
    }

    pub fn with_backend(
        backend: Arc<dyn Backend>,
        root: impl Into<PathBuf>,
        settings: FileSettings,
    ) -> Result<Self, FileSystemCreationError> {
        let physical_root = root.into();

        // The root has to exist before its node is built, otherwise the
        // root's watch registration is lost for good.
        backend
            .create_directory_all(&physical_root)
            .context(RootCreationSnafu {
                path: physical_root.best_effort_path_display(),
            })?;

        let scheduler = WatchScheduler::start(settings.poll_interval()).context(SchedulerSnafu)?;
        let shared = Arc::new(FileSystemShared {
            backend,
            physical_root,
            settings,
            scheduler,
        });
        let root = Directory::new_root(shared.clone());

        info!(
            "Created filesystem rooted at {}",
            shared.physical_root.best_effort_path_display()
        );
        Ok(Self { shared, root })
    }

    pub(crate) fn from_parts(shared: Arc<FileSystemShared>, root: Directory) -> Self {
        Self { shared, root }
    }

    pub fn root(&self) -> Directory {
        self.root.clone()
    }

    pub fn directory(&self, path: &str) -> Result<Directory, NavigationError> {
        PathResolver::resolve(&self.root, path)
    }

    pub fn file(&self, path: &str) -> Result<SimpleFile, NavigationError> {
        PathResolver::resolve_file(&self.root, path)
    }

    pub fn settings(&self) -> &FileSettings {
        &self.shared.settings
    }

    pub fn separator(&self) -> char {
        SEPARATOR
    }

    pub fn physical_root(&self) -> &Path {
        &self.shared.physical_root
    }

    /// A new filesystem rooted at `path`, sharing this one's backend and
    /// settings. The directory is created if missing.
    pub fn sub_file_system(&self, path: &str) -> Result<FileSystem, SubFileSystemError> {
        let directory = self.directory(path).context(NavigationSnafu)?;
        directory.create_all().context(CreationSnafu)?;
        FileSystem::with_backend(
            self.shared.backend.clone(),
            directory.physical_path(),
            self.shared.settings.clone(),
        )
        .map_err(Box::new)
        .context(ConstructionSnafu)
    }
}

impl fmt::Debug for FileSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSystem")
            .field("physical_root", &self.shared.physical_root)
            .field("settings", &self.shared.settings)
            .field("backend", &self.shared.backend)
            .finish()
    }
}

#[derive(Debug, Snafu)]
pub enum FileSystemCreationError {
    #[snafu(display("Failed to create the filesystem root {}", path))]
    RootCreationError { path: String, source: BackendError },
    #[snafu(display("Failed to start the watch scheduler"))]
    SchedulerError { source: SchedulerError },
}

#[derive(Debug, Snafu)]
pub enum SubFileSystemError {
    #[snafu(display("Failed to resolve the sub filesystem root"))]
    NavigationError { source: NavigationError },
    #[snafu(display("Failed to create the sub filesystem root"))]
    CreationError { source: CreationError },
    #[snafu(display("Failed to construct the sub filesystem"))]
    ConstructionError {
        source: Box<FileSystemCreationError>,
    },
}
