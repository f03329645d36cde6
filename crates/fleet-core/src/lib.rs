//! Command dispatch and task management for the node agent.
//!
//! Inbound requests are routed by [`Dispatcher`] to an [`Action`] resolved through an
//! [`ActionFactory`]. Synchronous actions run inline; asynchronous ones are handed to the
//! [`TaskService`] registry and tracked on disk by a [`TaskManager`] for restart recovery.
//! Shared mutable state lives behind an [`Arbiter`], never behind a lock.

pub mod error;
pub use error::{ActionError, ArbiterClosed, CoreError, ManagerError};

pub mod arbiter;
pub use arbiter::Arbiter;

pub mod task;
pub use task::{CancelFn, ExclusiveGuard, Task, TaskService};

pub mod manager;
pub use manager::{FileTaskManager, TaskManager};

pub mod action;
pub use action::{Action, ActionFactory};

pub mod dispatch;
pub use dispatch::Dispatcher;

mod system;
pub use system::{arch, hostname, init_uptime, os_info, platform, resolve_agent_id, uptime_seconds};
