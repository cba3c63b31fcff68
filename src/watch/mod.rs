mod activation;
mod modification;
mod notification_dispatcher;
mod scheduler;
mod watch_adapter;

pub use activation::{ActivationController, ActivationState};
pub use modification::{FileModification, ModificationKind};
pub use notification_dispatcher::{ModificationHandler, NotificationDispatcher};
pub(crate) use scheduler::SchedulerCommand;
pub use scheduler::{SchedulerError, WatchKey, WatchScheduler};
pub(crate) use watch_adapter::WatchAdapter;
pub use watch_adapter::WatchUnavailable;
