use std::collections::{HashMap, HashSet};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::backend::{
    Backend, BackendError, ChangeSource, EntryInfo, EntryMetadata, LocalBackend, RawChange,
};

type ChangeQueue = Arc<Mutex<Vec<RawChange>>>;

/// Local-disk backend whose change sources are fed by the test instead of
/// the OS. Removals of chosen paths can be made to fail.
#[derive(Debug, Default)]
pub(crate) struct ScriptedBackend {
    local: LocalBackend,
    queues: Mutex<HashMap<PathBuf, ChangeQueue>>,
    failing_removals: Mutex<HashSet<PathBuf>>,
}

impl ScriptedBackend {
    /// Queues `changes` for `directory` atomically, so they land in one drain.
    pub(crate) fn push(&self, directory: &Path, changes: impl IntoIterator<Item = RawChange>) {
        self.queue(directory).lock().extend(changes);
    }

    /// Every later removal of `path` fails with permission denied.
    pub(crate) fn fail_removal_of(&self, path: &Path) {
        self.failing_removals.lock().insert(path.to_path_buf());
    }

    fn check_removal(&self, path: &Path) -> Result<(), BackendError> {
        if self.failing_removals.lock().contains(path) {
            return Err(BackendError::RemoveError {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "scripted removal failure"),
            });
        }
        Ok(())
    }

    fn queue(&self, directory: &Path) -> ChangeQueue {
        self.queues
            .lock()
            .entry(directory.to_path_buf())
            .or_default()
            .clone()
    }
}

impl Backend for ScriptedBackend {
    fn exists(&self, path: &Path) -> bool {
        self.local.exists(path)
    }

    fn is_symlink(&self, path: &Path) -> bool {
        self.local.is_symlink(path)
    }

    fn create_directory(&self, path: &Path) -> Result<(), BackendError> {
        self.local.create_directory(path)
    }

    fn create_directory_all(&self, path: &Path) -> Result<(), BackendError> {
        self.local.create_directory_all(path)
    }

    fn create_file(&self, path: &Path) -> Result<(), BackendError> {
        self.local.create_file(path)
    }

    fn remove_directory(&self, path: &Path) -> Result<(), BackendError> {
        self.check_removal(path)?;
        self.local.remove_directory(path)
    }

    fn remove_file(&self, path: &Path) -> Result<(), BackendError> {
        self.check_removal(path)?;
        self.local.remove_file(path)
    }

    fn list_entries(&self, path: &Path) -> Result<Vec<EntryInfo>, BackendError> {
        self.local.list_entries(path)
    }

    fn metadata(&self, path: &Path) -> Result<EntryMetadata, BackendError> {
        self.local.metadata(path)
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>, BackendError> {
        self.local.open_read(path)
    }

    fn open_write(&self, path: &Path) -> Result<Box<dyn Write + Send>, BackendError> {
        self.local.open_write(path)
    }

    fn open_append(&self, path: &Path) -> Result<Box<dyn Write + Send>, BackendError> {
        self.local.open_append(path)
    }

    fn watch(&self, directory: &Path) -> Result<Box<dyn ChangeSource>, BackendError> {
        Ok(Box::new(ScriptedChangeSource {
            queue: self.queue(directory),
        }))
    }
}

#[derive(Debug)]
struct ScriptedChangeSource {
    queue: ChangeQueue,
}

impl ChangeSource for ScriptedChangeSource {
    fn drain(&self) -> Vec<RawChange> {
        std::mem::take(&mut *self.queue.lock())
    }
}

/// Polls `condition` until it holds or `timeout` passes.
pub(crate) fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
