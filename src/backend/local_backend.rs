use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use futures_channel::mpsc::{self, Receiver, Sender};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventHandler, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use snafu::ResultExt;
use tracing::{debug, warn};

use super::backend::{
    Backend, BackendError, ChangeSource, CreateDirectorySnafu, CreateFileSnafu, EntryInfo,
    EntryKind, EntryMetadata, ListSnafu, MetadataSnafu, ModificationKind, OpenSnafu, RawChange,
    RemoveSnafu, WatchSnafu,
};

/// Changes buffered per native watcher between two drains. Later events are
/// dropped until the buffer is drained.
pub const CHANGE_BUFFER_CAPACITY: usize = 1024;

/// Backend over the local disk, with `notify` as the native change source.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalBackend;

impl LocalBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for LocalBackend {
    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn is_symlink(&self, path: &Path) -> bool {
        path.is_symlink()
    }

    fn create_directory(&self, path: &Path) -> Result<(), BackendError> {
        fs::create_dir(path).context(CreateDirectorySnafu { path })
    }

    fn create_directory_all(&self, path: &Path) -> Result<(), BackendError> {
        fs::create_dir_all(path).context(CreateDirectorySnafu { path })
    }

    fn create_file(&self, path: &Path) -> Result<(), BackendError> {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map(|_| ())
            .context(CreateFileSnafu { path })
    }

    fn remove_directory(&self, path: &Path) -> Result<(), BackendError> {
        fs::remove_dir(path).context(RemoveSnafu { path })
    }

    fn remove_file(&self, path: &Path) -> Result<(), BackendError> {
        fs::remove_file(path).context(RemoveSnafu { path })
    }

    fn list_entries(&self, path: &Path) -> Result<Vec<EntryInfo>, BackendError> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).context(ListSnafu { path })? {
            let entry = entry.context(ListSnafu { path })?;
            // file_type() does not follow symlinks, fs::metadata() does
            let kind = entry
                .file_type()
                .map(entry_kind)
                .unwrap_or(EntryKind::Other);
            let target_kind = match kind {
                EntryKind::Symlink => fs::metadata(entry.path())
                    .map(|meta| entry_kind(meta.file_type()))
                    .unwrap_or(EntryKind::Other),
                kind => kind,
            };
            entries.push(EntryInfo {
                name: entry.file_name(),
                kind,
                target_kind,
            });
        }
        Ok(entries)
    }

    fn metadata(&self, path: &Path) -> Result<EntryMetadata, BackendError> {
        let meta = fs::metadata(path).context(MetadataSnafu { path })?;
        Ok(EntryMetadata {
            size: meta.len(),
            modified: meta.modified().ok(),
            created: meta.created().ok(),
            accessed: meta.accessed().ok(),
        })
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>, BackendError> {
        let file = fs::File::open(path).context(OpenSnafu { path })?;
        Ok(Box::new(file))
    }

    fn open_write(&self, path: &Path) -> Result<Box<dyn Write + Send>, BackendError> {
        let file = fs::File::create(path).context(OpenSnafu { path })?;
        Ok(Box::new(file))
    }

    fn open_append(&self, path: &Path) -> Result<Box<dyn Write + Send>, BackendError> {
        let file = OpenOptions::new()
            .append(true)
            .open(path)
            .context(OpenSnafu { path })?;
        Ok(Box::new(file))
    }

    fn watch(&self, directory: &Path) -> Result<Box<dyn ChangeSource>, BackendError> {
        NotifyChangeSource::register(directory).map(|source| Box::new(source) as Box<dyn ChangeSource>)
    }
}

fn entry_kind(file_type: fs::FileType) -> EntryKind {
    if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_dir() {
        EntryKind::Directory
    } else if file_type.is_file() {
        EntryKind::File
    } else {
        EntryKind::Other
    }
}

/// Owns one `notify` watcher. The watcher callback runs on notify's own
/// thread and only pushes into a bounded channel; draining happens on poll.
pub struct NotifyChangeSource {
    directory: PathBuf,
    _watcher: Mutex<RecommendedWatcher>,
    events: Mutex<Receiver<RawChange>>,
}

impl fmt::Debug for NotifyChangeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyChangeSource")
            .field("directory", &self.directory)
            .finish_non_exhaustive()
    }
}

impl NotifyChangeSource {
    fn register(directory: &Path) -> Result<Self, BackendError> {
        let (forwarder, receiver) = ChangeForwarder::new(directory, CHANGE_BUFFER_CAPACITY);

        let mut watcher =
            notify::recommended_watcher(forwarder).context(WatchSnafu { path: directory })?;

        watcher
            .watch(directory, RecursiveMode::NonRecursive)
            .context(WatchSnafu { path: directory })?;
        debug!("Registered native watch for {}", directory.display());

        Ok(Self {
            directory: directory.to_path_buf(),
            _watcher: Mutex::new(watcher),
            events: Mutex::new(receiver),
        })
    }
}

impl ChangeSource for NotifyChangeSource {
    fn drain(&self) -> Vec<RawChange> {
        let mut receiver = self.events.lock();
        let mut drained = Vec::new();
        while let Ok(Some(change)) = receiver.try_next() {
            drained.push(change);
        }
        drained
    }
}

/// Runs on notify's thread. Never blocks: a full buffer drops the change.
struct ChangeForwarder {
    directory: PathBuf,
    sender: Sender<RawChange>,
    dropped: u64,
}

impl ChangeForwarder {
    fn new(directory: &Path, capacity: usize) -> (Self, Receiver<RawChange>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let forwarder = Self {
            directory: directory.to_path_buf(),
            sender,
            dropped: 0,
        };
        (forwarder, receiver)
    }

    fn forward(&mut self, change: RawChange) {
        match self.sender.try_send(change) {
            Ok(()) if self.dropped > 0 => {
                debug!(
                    "Change buffer for {} drained, {} event(s) were lost",
                    self.directory.display(),
                    self.dropped
                );
                self.dropped = 0;
            }
            Ok(()) => {}
            Err(e) if e.is_full() => {
                if self.dropped == 0 {
                    warn!(
                        "Change buffer for {} is full, dropping events until it is drained",
                        self.directory.display()
                    );
                }
                self.dropped += 1;
            }
            Err(_) => debug!("Dropping native event, receiver is gone"),
        }
    }
}

impl EventHandler for ChangeForwarder {
    fn handle_event(&mut self, result: notify::Result<Event>) {
        match result {
            Ok(event) => {
                for change in translate_event(&event) {
                    self.forward(change);
                }
            }
            Err(e) => warn!("Native watcher for {} reported: {}", self.directory.display(), e),
        }
    }
}

/// Maps one `notify` event onto zero or more raw changes. Renames surface as
/// a delete of the old name and a create of the new one.
pub(crate) fn translate_event(event: &Event) -> Vec<RawChange> {
    let kinds: Vec<ModificationKind> = match event.kind {
        EventKind::Create(_) => vec![ModificationKind::Create],
        EventKind::Remove(_) => vec![ModificationKind::Delete],
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => vec![ModificationKind::Delete],
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => vec![ModificationKind::Create],
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            vec![ModificationKind::Delete, ModificationKind::Create]
        }
        EventKind::Modify(_) => vec![ModificationKind::Modify],
        EventKind::Access(_) | EventKind::Any | EventKind::Other => return Vec::new(),
    };

    // For `Both`, paths are [from, to] and pair up with [Delete, Create].
    // Otherwise every path carries the single kind.
    event
        .paths
        .iter()
        .enumerate()
        .filter_map(|(index, path)| {
            let kind = *kinds.get(index).or_else(|| kinds.last())?;
            let name = path.file_name()?.to_string_lossy().to_string();
            Some(RawChange::new(name, kind))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};
    use rstest::*;
    use tempfile::TempDir;

    #[rstest]
    #[case(EventKind::Create(CreateKind::File), ModificationKind::Create)]
    #[case(EventKind::Remove(RemoveKind::File), ModificationKind::Delete)]
    #[case(EventKind::Modify(ModifyKind::Data(DataChange::Content)), ModificationKind::Modify)]
    #[case(EventKind::Modify(ModifyKind::Name(RenameMode::From)), ModificationKind::Delete)]
    #[case(EventKind::Modify(ModifyKind::Name(RenameMode::To)), ModificationKind::Create)]
    fn translate_maps_single_path_events(#[case] kind: EventKind, #[case] expected: ModificationKind) {
        let event = Event::new(kind).add_path("/watched/x.txt".into());

        assert_eq!(translate_event(&event), vec![RawChange::new("x.txt", expected)]);
    }

    #[test]
    fn translate_splits_rename_into_delete_and_create() {
        let event = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path("/watched/old.txt".into())
            .add_path("/watched/new.txt".into());

        assert_eq!(
            translate_event(&event),
            vec![
                RawChange::new("old.txt", ModificationKind::Delete),
                RawChange::new("new.txt", ModificationKind::Create),
            ]
        );
    }

    #[test]
    fn translate_ignores_access_events() {
        let event = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path("/watched/x.txt".into());

        assert!(translate_event(&event).is_empty());
    }

    #[test]
    fn list_entries_classifies_children() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir(temp_dir.path().join("sub")).expect("Failed to create sub directory");
        let mut file = fs::File::create(temp_dir.path().join("a.txt")).expect("Failed to create file");
        writeln!(file, "content").expect("Failed to write file");

        let mut entries = LocalBackend::new()
            .list_entries(temp_dir.path())
            .expect("Failed to list entries");
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(
            entries,
            vec![
                EntryInfo {
                    name: "a.txt".into(),
                    kind: EntryKind::File,
                    target_kind: EntryKind::File,
                },
                EntryInfo {
                    name: "sub".into(),
                    kind: EntryKind::Directory,
                    target_kind: EntryKind::Directory,
                },
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn list_entries_does_not_follow_links() {
        use std::os::unix::fs::symlink;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let outside = TempDir::new().expect("Failed to create outside directory");
        symlink(outside.path(), temp_dir.path().join("dir_link")).expect("Failed to create link");
        symlink(temp_dir.path().join("nowhere"), temp_dir.path().join("dangling"))
            .expect("Failed to create link");

        let mut entries = LocalBackend::new()
            .list_entries(temp_dir.path())
            .expect("Failed to list entries");
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(
            entries,
            vec![
                EntryInfo {
                    name: "dangling".into(),
                    kind: EntryKind::Symlink,
                    target_kind: EntryKind::Other,
                },
                EntryInfo {
                    name: "dir_link".into(),
                    kind: EntryKind::Symlink,
                    target_kind: EntryKind::Directory,
                },
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn dangling_link_exists_and_removes_as_file() {
        use std::os::unix::fs::symlink;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let link = temp_dir.path().join("dangling");
        symlink(temp_dir.path().join("nowhere"), &link).expect("Failed to create link");
        let backend = LocalBackend::new();

        assert!(backend.exists(&link));
        assert!(backend.is_symlink(&link));
        backend.remove_file(&link).expect("Failed to remove link");
        assert!(!backend.exists(&link));
    }

    fn create_event(name: &str) -> notify::Result<Event> {
        Ok(Event::new(EventKind::Create(CreateKind::File)).add_path(format!("/watched/{name}").into()))
    }

    fn drain_all(receiver: &mut Receiver<RawChange>) -> Vec<RawChange> {
        let mut drained = Vec::new();
        while let Ok(Some(change)) = receiver.try_next() {
            drained.push(change);
        }
        drained
    }

    #[test]
    fn forwarder_drops_changes_beyond_capacity() {
        let (mut forwarder, mut receiver) = ChangeForwarder::new(Path::new("/watched"), 4);

        for index in 0..20 {
            forwarder.handle_event(create_event(&format!("{index}.txt")));
        }
        let drained = drain_all(&mut receiver);

        // One extra slot is reserved for the single sender
        assert_eq!(drained.len(), 5);
        assert_eq!(drained[0], RawChange::new("0.txt", ModificationKind::Create));
        assert_eq!(forwarder.dropped, 15);
    }

    #[test]
    fn forwarder_resumes_after_drain() {
        let (mut forwarder, mut receiver) = ChangeForwarder::new(Path::new("/watched"), 1);
        for index in 0..10 {
            forwarder.handle_event(create_event(&format!("{index}.txt")));
        }
        drain_all(&mut receiver);

        forwarder.handle_event(create_event("late.txt"));

        assert_eq!(
            drain_all(&mut receiver),
            vec![RawChange::new("late.txt", ModificationKind::Create)]
        );
        assert_eq!(forwarder.dropped, 0);
    }

    #[test]
    fn create_file_fails_when_it_already_exists() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("a.txt");
        let backend = LocalBackend::new();

        backend.create_file(&path).expect("First create should succeed");
        let err = backend.create_file(&path).unwrap_err();

        assert!(err.is_already_exists());
    }

    #[test]
    fn watch_fails_for_missing_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");

        let result = LocalBackend::new().watch(&temp_dir.path().join("missing"));

        assert!(matches!(result, Err(BackendError::WatchError { .. })));
    }
}
