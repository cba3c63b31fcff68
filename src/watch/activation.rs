use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use crate::filesystem::{Directory, Node, Watchable};

use super::{SchedulerCommand, WatchKey, WatchScheduler};

static NEXT_WATCH_KEY: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    Inactive,
    Active,
}

/// Per-directory activation state. Only transitions that actually change the
/// state reach the scheduler.
#[derive(Debug)]
pub struct ActivationController {
    key: WatchKey,
    state: Mutex<ActivationState>,
}

impl ActivationController {
    pub(crate) fn new() -> Self {
        Self {
            key: WatchKey(NEXT_WATCH_KEY.fetch_add(1, Ordering::Relaxed)),
            state: Mutex::new(ActivationState::Inactive),
        }
    }

    pub(crate) fn activate(&self, directory: &Directory) {
        let mut state = self.state.lock();
        if *state == ActivationState::Active {
            return;
        }
        if !directory.exists() {
            debug!("Not activating {}: directory does not exist", directory.path());
            return;
        }
        if let Some(reason) = directory.watch_unavailable() {
            debug!("Not activating {}: {}", directory.path(), reason);
            return;
        }

        directory.shared().scheduler().send(SchedulerCommand::Activate {
            key: self.key,
            directory: directory.downgrade(),
        });
        *state = ActivationState::Active;
        debug!("Activated {}", directory.path());
    }

    pub(crate) fn deactivate(&self, scheduler: &WatchScheduler) {
        let mut state = self.state.lock();
        if *state == ActivationState::Inactive {
            return;
        }
        scheduler.send(SchedulerCommand::Deactivate { key: self.key });
        *state = ActivationState::Inactive;
        debug!("Deactivated watch {}", self.key.0);
    }

    pub fn is_active(&self) -> bool {
        self.state() == ActivationState::Active
    }

    pub fn state(&self) -> ActivationState {
        *self.state.lock()
    }
}
