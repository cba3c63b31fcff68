use std::fmt;
use std::time::SystemTime;

pub use crate::backend::ModificationKind;
use crate::filesystem::{Node, SimpleFile};

/// A change detected in a watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileModification {
    target: SimpleFile,
    kind: ModificationKind,
    timestamp: SystemTime,
}

impl FileModification {
    pub(crate) fn new(target: SimpleFile, kind: ModificationKind, timestamp: SystemTime) -> Self {
        Self {
            target,
            kind,
            timestamp,
        }
    }

    pub fn target(&self) -> &SimpleFile {
        &self.target
    }

    pub fn kind(&self) -> ModificationKind {
        self.kind
    }

    /// When the poller picked the change up, not when it happened.
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }
}

impl fmt::Display for FileModification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.target.path())
    }
}
