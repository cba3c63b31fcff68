use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use snafu::{ResultExt, ensure};
use tracing::{debug, warn};

use crate::backend::{EntryInfo, EntryKind};
use crate::watch::{
    ActivationController, FileModification, ModificationKind, NotificationDispatcher,
    WatchAdapter, WatchUnavailable,
};

use super::entry::{
    CreateFailedSnafu, CreationError, DeletionError, DescendantSnafu, EnumerateSnafu, Entry,
    Enumerable, Navigable, Node, ParentMissingSnafu, RemoveFailedSnafu, StorageError, StorageSnafu,
    Watchable,
};
use super::file_system::{FileSystem, FileSystemShared};
use super::location::Location;
use super::path_resolver::{NavigationError, PathResolver};
use super::SimpleFile;

/// A directory node.
///
/// Cloning is cheap and yields the same instance; resolving the same path
/// twice yields two instances that are equal but watched independently.
/// Each instance owns its native watch registration, taken at construction.
#[derive(Clone)]
pub struct Directory {
    inner: Arc<DirectoryInner>,
}

pub(crate) struct DirectoryInner {
    fs: Arc<FileSystemShared>,
    parent: Option<Directory>,
    name: Option<Arc<str>>,
    location: Location,
    physical: PathBuf,
    watch: WatchAdapter,
    activation: ActivationController,
    notifications: NotificationDispatcher,
}

impl Directory {
    pub(crate) fn new_root(fs: Arc<FileSystemShared>) -> Self {
        let physical = fs.physical_root().to_path_buf();
        Self::build(fs, None, None, Location::root(), physical)
    }

    /// A node named `name` under this one. Pure apart from the watch attempt.
    pub(crate) fn child(&self, name: &str) -> Directory {
        self.child_at(name, self.inner.physical.join(name))
    }

    fn child_at(&self, name: &str, physical: PathBuf) -> Directory {
        Self::build(
            self.inner.fs.clone(),
            Some(self.clone()),
            Some(Arc::from(name)),
            Location::directory(&self.inner.location, name),
            physical,
        )
    }

    pub(crate) fn file(&self, name: &str) -> SimpleFile {
        SimpleFile::new(self.clone(), name)
    }

    /// Node for a listed child. The physical path keeps the raw name, so
    /// children whose names are not UTF-8 stay reachable.
    fn entry_node(&self, entry: &EntryInfo) -> Entry {
        let name = entry.name.to_string_lossy();
        let physical = self.inner.physical.join(&entry.name);
        match entry.kind {
            EntryKind::Directory => Entry::from(self.child_at(&name, physical)),
            EntryKind::File | EntryKind::Symlink | EntryKind::Other => {
                Entry::from(SimpleFile::with_physical(self.clone(), &name, physical))
            }
        }
    }

    fn build(
        fs: Arc<FileSystemShared>,
        parent: Option<Directory>,
        name: Option<Arc<str>>,
        location: Location,
        physical: PathBuf,
    ) -> Self {
        let watch = WatchAdapter::register(fs.backend(), &physical);
        Self {
            inner: Arc::new(DirectoryInner {
                fs,
                parent,
                name,
                location,
                physical,
                watch,
                activation: ActivationController::new(),
                notifications: NotificationDispatcher::default(),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<DirectoryInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<DirectoryInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn shared(&self) -> &Arc<FileSystemShared> {
        &self.inner.fs
    }

    pub(crate) fn location(&self) -> &Location {
        &self.inner.location
    }

    /// The topmost ancestor of this node.
    pub fn root(&self) -> Directory {
        let mut current = self;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current.clone()
    }

    pub fn is_root(&self) -> bool {
        self.inner.parent.is_none()
    }

    pub fn physical_path(&self) -> &Path {
        &self.inner.physical
    }

    pub fn file_system(&self) -> FileSystem {
        FileSystem::from_parts(self.inner.fs.clone(), self.root())
    }

    /// Creates this directory and every missing ancestor. Idempotent.
    pub fn create_all(&self) -> Result<(), CreationError> {
        self.inner
            .fs
            .backend()
            .create_directory_all(&self.inner.physical)
            .context(CreateFailedSnafu { path: self.path() })
    }

    /// One poll tick: drain the native source and deliver in arrival order.
    pub(crate) fn poll(&self) {
        let events = self.inner.watch.drain(self);
        if events.is_empty() {
            return;
        }
        debug!("Delivering {} change(s) for {}", events.len(), self.path());
        for event in &events {
            self.inner.notifications.dispatch(event);
        }
    }

    fn entries(&self) -> Result<Vec<EntryInfo>, StorageError> {
        if !self.exists() {
            return Ok(Vec::new());
        }

        self.inner
            .fs
            .backend()
            .list_entries(&self.inner.physical)
            .context(StorageSnafu { path: self.path() })
    }

    /// Names of the children that are `wanted` once links are followed.
    fn list_names(&self, wanted: EntryKind) -> Result<Vec<String>, StorageError> {
        let mut names: Vec<String> = self
            .entries()?
            .into_iter()
            .filter(|entry| entry.target_kind == wanted)
            .filter_map(|entry| match entry.name.into_string() {
                Ok(name) => Some(name),
                Err(raw) => {
                    warn!("Skipping {:?} in {}: name is not valid UTF-8", raw, self.path());
                    None
                }
            })
            .collect();
        names.sort();
        Ok(names)
    }
}

impl Node for Directory {
    fn name(&self) -> &str {
        self.inner.name.as_deref().unwrap_or("/")
    }

    fn path(&self) -> &str {
        self.inner.location.as_str()
    }

    fn parent(&self) -> Option<&Directory> {
        self.inner.parent.as_ref()
    }

    fn exists(&self) -> bool {
        self.inner.fs.backend().exists(&self.inner.physical)
    }

    fn create(&self) -> Result<(), CreationError> {
        if let Some(parent) = self.parent() {
            ensure!(
                parent.exists(),
                ParentMissingSnafu {
                    path: self.path(),
                    parent: parent.path(),
                }
            );
        }

        self.inner
            .fs
            .backend()
            .create_directory(&self.inner.physical)
            .context(CreateFailedSnafu { path: self.path() })
    }

    /// Depth first: sub-directories, then every other entry, then this
    /// directory. The first failing descendant aborts the whole deletion.
    ///
    /// Links are never followed: a linked directory loses the link, not its
    /// contents, and a node that is itself a link removes only the link.
    fn delete(&self) -> Result<(), DeletionError> {
        if !self.exists() {
            return Ok(());
        }

        let backend = self.inner.fs.backend();
        if backend.is_symlink(&self.inner.physical) {
            return backend
                .remove_file(&self.inner.physical)
                .context(RemoveFailedSnafu { path: self.path() });
        }

        let mut entries = self
            .entries()
            .context(EnumerateSnafu { path: self.path() })?;
        entries.sort_by(|a, b| {
            (a.kind != EntryKind::Directory)
                .cmp(&(b.kind != EntryKind::Directory))
                .then_with(|| a.name.cmp(&b.name))
        });
        for entry in &entries {
            self.entry_node(entry)
                .delete()
                .map_err(Box::new)
                .context(DescendantSnafu { path: self.path() })?;
        }

        match backend.remove_directory(&self.inner.physical) {
            Ok(()) => {
                debug!("Deleted directory {}", self.path());
                Ok(())
            }
            // Someone else removed it in the meantime
            Err(_) if !self.exists() => Ok(()),
            Err(source) => Err(source).context(RemoveFailedSnafu { path: self.path() }),
        }
    }
}

impl Navigable for Directory {
    fn change_directory(&self, path: &str) -> Result<Directory, NavigationError> {
        PathResolver::resolve(self, path)
    }

    fn get_file(&self, path: &str) -> Result<SimpleFile, NavigationError> {
        PathResolver::resolve_file(self, path)
    }
}

impl Enumerable for Directory {
    fn list_files<P>(&self, mut predicate: P) -> Result<Vec<SimpleFile>, StorageError>
    where
        P: FnMut(&SimpleFile) -> bool,
    {
        Ok(self
            .list_names(EntryKind::File)?
            .iter()
            .map(|name| self.file(name))
            .filter(|file| predicate(file))
            .collect())
    }

    fn list_directories(&self) -> Result<Vec<Directory>, StorageError> {
        Ok(self
            .list_names(EntryKind::Directory)?
            .iter()
            .map(|name| self.child(name))
            .collect())
    }
}

impl Watchable for Directory {
    fn activate(&self) {
        self.inner.activation.activate(self);
    }

    fn deactivate(&self) {
        self.inner.activation.deactivate(self.inner.fs.scheduler());
    }

    fn is_active(&self) -> bool {
        self.inner.activation.is_active()
    }

    fn watch_unavailable(&self) -> Option<&WatchUnavailable> {
        self.inner.watch.unavailable()
    }

    fn on_create<H>(&self, handler: H)
    where
        H: Fn(&FileModification) + Send + Sync + 'static,
    {
        self.inner
            .notifications
            .register(ModificationKind::Create, handler);
    }

    fn on_delete<H>(&self, handler: H)
    where
        H: Fn(&FileModification) + Send + Sync + 'static,
    {
        self.inner
            .notifications
            .register(ModificationKind::Delete, handler);
    }

    fn on_modify<H>(&self, handler: H)
    where
        H: Fn(&FileModification) + Send + Sync + 'static,
    {
        self.inner
            .notifications
            .register(ModificationKind::Modify, handler);
    }
}

impl Drop for DirectoryInner {
    fn drop(&mut self) {
        self.activation.deactivate(self.fs.scheduler());
    }
}

impl PartialEq for Directory {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.location == other.inner.location
    }
}

impl Eq for Directory {}

impl Hash for Directory {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.location.hash(state);
    }
}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directory")
            .field("path", &self.inner.location)
            .field("physical", &self.inner.physical)
            .finish()
    }
}

impl fmt::Display for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
