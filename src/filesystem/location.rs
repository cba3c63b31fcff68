use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use metrohash::MetroHash64;

pub const SEPARATOR: char = '/';

/// Logical location of a node, rendered once at construction.
///
/// Equality over the rendered path is the same relation as comparing the
/// `(parent, name)` chains, since names never contain the separator. The
/// fingerprint lets comparisons and hashing skip the string walk.
#[derive(Clone)]
pub(crate) struct Location {
    rendered: Arc<str>,
    fingerprint: u64,
}

impl Location {
    pub(crate) fn root() -> Self {
        Self::from_rendered(SEPARATOR.to_string())
    }

    pub(crate) fn directory(parent: &Location, name: &str) -> Self {
        Self::from_rendered(format!("{}{}{}", parent.rendered, name, SEPARATOR))
    }

    pub(crate) fn file(parent: &Location, name: &str) -> Self {
        Self::from_rendered(format!("{}{}", parent.rendered, name))
    }

    fn from_rendered(rendered: String) -> Self {
        let mut hasher = MetroHash64::default();
        hasher.write(rendered.as_bytes());
        Self {
            fingerprint: hasher.finish(),
            rendered: rendered.into(),
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.rendered
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint && self.rendered == other.rendered
    }
}

impl Eq for Location {}

impl Hash for Location {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.fingerprint);
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}
