use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::error;

use crate::filesystem::Node;

use super::{FileModification, ModificationKind};

pub type ModificationHandler = Arc<dyn Fn(&FileModification) + Send + Sync>;

#[derive(Default)]
struct Handlers {
    create: Option<ModificationHandler>,
    delete: Option<ModificationHandler>,
    modify: Option<ModificationHandler>,
}

impl Handlers {
    fn slot(&mut self, kind: ModificationKind) -> &mut Option<ModificationHandler> {
        match kind {
            ModificationKind::Create => &mut self.create,
            ModificationKind::Delete => &mut self.delete,
            ModificationKind::Modify => &mut self.modify,
        }
    }

    fn get(&self, kind: ModificationKind) -> Option<&ModificationHandler> {
        match kind {
            ModificationKind::Create => self.create.as_ref(),
            ModificationKind::Delete => self.delete.as_ref(),
            ModificationKind::Modify => self.modify.as_ref(),
        }
    }
}

/// At most one handler per modification kind; registering replaces.
///
/// Registration may race with a tick in progress. The lock is released
/// before a handler runs, so handlers may register handlers.
#[derive(Default)]
pub struct NotificationDispatcher {
    handlers: RwLock<Handlers>,
}

impl NotificationDispatcher {
    pub fn register<H>(&self, kind: ModificationKind, handler: H)
    where
        H: Fn(&FileModification) + Send + Sync + 'static,
    {
        *self.handlers.write().slot(kind) = Some(Arc::new(handler));
    }

    pub fn clear(&self, kind: ModificationKind) {
        *self.handlers.write().slot(kind) = None;
    }

    pub fn has_handler(&self, kind: ModificationKind) -> bool {
        self.handlers.read().get(kind).is_some()
    }

    /// Runs the handler for `event.kind()`, if any. A panicking handler is
    /// logged and swallowed.
    pub fn dispatch(&self, event: &FileModification) {
        let Some(handler) = self.handlers.read().get(event.kind()).cloned() else {
            return;
        };

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
            error!(
                "Handler for {} on {} panicked: {}",
                event.kind(),
                event.target().path(),
                panic_message(payload.as_ref())
            );
        }
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read();
        f.debug_struct("NotificationDispatcher")
            .field("create", &handlers.create.is_some())
            .field("delete", &handlers.delete.is_some())
            .field("modify", &handlers.modify.is_some())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}
