#![allow(clippy::enum_variant_names)]

//! A virtual filesystem over a physical directory, with `/`-separated logical
//! paths and polled change notification for the direct children of watched
//! directories.
//!
//! ```no_run
//! use cfs::prelude::*;
//!
//! let fs = FileSystem::new("/tmp/cfs-demo")?;
//! fs.directory("inbox")?.create_all()?;
//!
//! let inbox = fs.directory("inbox")?;
//! inbox.on_create(|event| println!("{event}"));
//! inbox.activate();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! A directory node must exist when it is built to be watchable; nodes
//! resolved before their directory was created stay unwatched.

pub mod backend;
pub mod config;
pub mod ext;
pub mod filesystem;
pub mod watch;

#[cfg(test)]
mod test_support;

pub mod prelude {
    pub use crate::filesystem::{
        Directory, Entry, Enumerable, FileSystem, Navigable, Node, SimpleFile, Watchable,
    };
    pub use crate::watch::{FileModification, ModificationKind};
}
