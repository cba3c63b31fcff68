//! Logical node tree over a physical store.
//!
//! Nodes are identified by location, not by any native handle: every
//! navigation step builds a fresh node, and nodes built independently for the
//! same path compare and hash equal.

mod attributes;
mod directory;
mod entry;
mod file_system;
mod location;
mod path_resolver;
mod simple_file;

pub use attributes::FileAttributes;
pub use directory::Directory;
pub(crate) use directory::DirectoryInner;
pub use entry::{CreationError, DeletionError, Entry, Enumerable, Navigable, Node, StorageError, Watchable};
pub use file_system::{FileSystem, FileSystemCreationError, SubFileSystemError};
pub use location::SEPARATOR;
pub use path_resolver::{NavigationError, PathResolver};
pub use simple_file::{AccessError, SimpleFile};
