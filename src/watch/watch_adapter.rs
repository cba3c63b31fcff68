use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use snafu::Snafu;
use tracing::debug;

use crate::backend::{Backend, BackendError, ChangeSource};
use crate::ext::BestEffortPathExt;
use crate::filesystem::Directory;

use super::FileModification;

/// The native source for one directory plus the directory it watches.
pub(crate) struct WatchRegistration {
    source: Box<dyn ChangeSource>,
    directory: PathBuf,
}

/// Bridges one native change source to typed [`FileModification`]s.
///
/// Registration is attempted exactly once. When it fails the adapter stays
/// empty for the rest of its life and the failure is kept for inspection.
pub(crate) struct WatchAdapter {
    registration: Result<WatchRegistration, WatchUnavailable>,
}

impl WatchAdapter {
    pub(crate) fn register(backend: &dyn Backend, directory: &Path) -> Self {
        let registration = if !backend.exists(directory) {
            Err(WatchUnavailable::DirectoryMissing {
                path: directory.to_path_buf(),
            })
        } else {
            backend
                .watch(directory)
                .map(|source| WatchRegistration {
                    source,
                    directory: directory.to_path_buf(),
                })
                .map_err(|source| WatchUnavailable::RegistrationFailed {
                    path: directory.to_path_buf(),
                    source,
                })
        };

        if let Err(reason) = &registration {
            debug!("Watch unavailable: {}", reason);
        }
        Self { registration }
    }

    pub(crate) fn unavailable(&self) -> Option<&WatchUnavailable> {
        self.registration.as_ref().err()
    }

    /// Everything the native source reported since the last drain, as
    /// events on files of `watched`. One detection time per drain.
    pub(crate) fn drain(&self, watched: &Directory) -> Vec<FileModification> {
        let Ok(registration) = &self.registration else {
            return Vec::new();
        };

        let changes = registration.source.drain();
        if changes.is_empty() {
            return Vec::new();
        }

        let detected_at = SystemTime::now();
        changes
            .into_iter()
            .map(|change| {
                FileModification::new(watched.file(&change.entry_name), change.kind, detected_at)
            })
            .collect()
    }
}

impl fmt::Debug for WatchAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.registration {
            Ok(registration) => f
                .debug_struct("WatchAdapter")
                .field("directory", &registration.directory)
                .field("source", &registration.source)
                .finish(),
            Err(reason) => f.debug_struct("WatchAdapter").field("unavailable", reason).finish(),
        }
    }
}

/// Why a directory node has no native watch. Recorded, never returned.
#[derive(Debug, Snafu)]
pub enum WatchUnavailable {
    #[snafu(display("{} did not exist when its node was built", path.best_effort_path_display()))]
    DirectoryMissing { path: PathBuf },
    #[snafu(display("Native watch registration failed for {}", path.best_effort_path_display()))]
    RegistrationFailed { path: PathBuf, source: BackendError },
}
