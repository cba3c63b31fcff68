use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Weak;
use std::time::Duration;

use compio::dispatcher::{Dispatcher, DispatcherBuilder};
use compio::time::sleep;
use futures_channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use hashlink::LinkedHashMap;
use snafu::{ResultExt, Snafu};
use tracing::{debug, warn};

use crate::filesystem::{Directory, DirectoryInner};

/// Identifies one activation of one directory node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchKey(pub(crate) u64);

pub(crate) enum SchedulerCommand {
    Activate {
        key: WatchKey,
        directory: Weak<DirectoryInner>,
    },
    Deactivate {
        key: WatchKey,
    },
}

impl fmt::Debug for SchedulerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerCommand::Activate { key, .. } => {
                f.debug_struct("Activate").field("key", key).finish()
            }
            SchedulerCommand::Deactivate { key } => {
                f.debug_struct("Deactivate").field("key", key).finish()
            }
        }
    }
}

/// The poll loop shared by every directory of one filesystem.
///
/// Runs on a dedicated single-threaded dispatcher; handlers are invoked on
/// that thread. The loop stops once the scheduler is dropped.
pub struct WatchScheduler {
    _dispatcher: Dispatcher,
    commands: UnboundedSender<SchedulerCommand>,
    poll_interval: Duration,
}

impl WatchScheduler {
    pub fn start(poll_interval: Duration) -> Result<Self, SchedulerError> {
        let dispatcher = DispatcherBuilder::new()
            .worker_threads(NonZeroUsize::MIN)
            .build()
            .context(DispatcherSnafu)?;

        let (commands, receiver) = mpsc::unbounded::<SchedulerCommand>();
        let _completion = dispatcher
            .dispatch(move || run_poll_loop(receiver, poll_interval))
            .map_err(|e| SchedulerError::StartError {
                error: e.to_string(),
            })?;

        debug!("Started watch scheduler polling every {:?}", poll_interval);
        Ok(Self {
            _dispatcher: dispatcher,
            commands,
            poll_interval,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub(crate) fn send(&self, command: SchedulerCommand) {
        if let Err(send_err) = self.commands.unbounded_send(command) {
            warn!(
                "Watch scheduler is gone, dropping {:?}",
                send_err.into_inner()
            );
        }
    }
}

impl fmt::Debug for WatchScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchScheduler")
            .field("poll_interval", &self.poll_interval)
            .field("running", &!self.commands.is_closed())
            .finish()
    }
}

async fn run_poll_loop(mut commands: UnboundedReceiver<SchedulerCommand>, interval: Duration) {
    let mut watched: LinkedHashMap<WatchKey, Weak<DirectoryInner>> = LinkedHashMap::new();

    loop {
        sleep(interval).await;

        if !apply_pending(&mut commands, &mut watched) {
            debug!("Watch scheduler stopped");
            return;
        }

        let mut dropped = Vec::new();
        let live: Vec<Directory> = watched
            .iter()
            .filter_map(|(key, weak)| match weak.upgrade() {
                Some(inner) => Some(Directory::from_inner(inner)),
                None => {
                    dropped.push(*key);
                    None
                }
            })
            .collect();
        for key in dropped {
            watched.remove(&key);
        }

        for directory in live {
            directory.poll();
        }
    }
}

/// Applies every queued command in order. Returns `false` once all senders
/// are gone.
fn apply_pending(
    commands: &mut UnboundedReceiver<SchedulerCommand>,
    watched: &mut LinkedHashMap<WatchKey, Weak<DirectoryInner>>,
) -> bool {
    loop {
        match commands.try_next() {
            Ok(Some(SchedulerCommand::Activate { key, directory })) => {
                watched.insert(key, directory);
            }
            Ok(Some(SchedulerCommand::Deactivate { key })) => {
                watched.remove(&key);
            }
            Ok(None) => return false,
            // Nothing queued
            Err(_) => return true,
        }
    }
}

#[derive(Debug, Snafu)]
pub enum SchedulerError {
    #[snafu(display("Failed to create the watch dispatcher"))]
    DispatcherError { source: std::io::Error },
    #[snafu(display("Failed to start the poll loop: {}", error))]
    StartError { error: String },
}
