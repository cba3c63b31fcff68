//! Physical storage primitives.
//!
//! The virtual filesystem only talks to storage through [`Backend`]; the
//! local-disk implementation uses `std::fs` for entries and `notify` for
//! native change events.

mod backend;
mod local_backend;

pub use backend::{
    Backend, BackendError, ChangeSource, EntryInfo, EntryKind, EntryMetadata, ModificationKind,
    RawChange,
};
pub use local_backend::{LocalBackend, NotifyChangeSource};
