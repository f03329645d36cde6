//! Asynchronous task registry.
//!
//! The id → [`Task`] map is owned by an [`Arbiter`]: registration, lookups and the worker's
//! terminal write are all closures applied on that arbiter, so a reader never observes a
//! half-written task. Each task's work runs on its own tokio task.

mod events;
pub use events::{TaskEvent, TaskEventKind, log_event, message_for};

use std::{
    collections::HashMap,
    fmt,
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

use fleet_model::{RemoteException, TaskId, TaskState, TaskValue};
use serde_json::Value;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::error;
use uuid::Uuid;

use crate::{
    arbiter::Arbiter,
    error::{ActionError, CoreError},
};

/// Cancellation hook attached to a task.
pub type CancelFn = Arc<dyn Fn() -> Result<(), ActionError> + Send + Sync>;

type Registry = HashMap<TaskId, Task>;

/// Snapshot of one unit of background work.
#[derive(Clone)]
pub struct Task {
    pub id: TaskId,
    pub state: TaskState,
    pub value: Option<Value>,
    pub error: Option<String>,
    cancel: Option<CancelFn>,
    finished_at: Option<Instant>,
}

impl Task {
    fn running(id: TaskId, cancel: Option<CancelFn>) -> Self {
        Self {
            id,
            state: TaskState::Running,
            value: None,
            error: None,
            cancel,
            finished_at: None,
        }
    }

    /// Invoke the cancel hook; a task without one cancels trivially.
    pub fn cancel(&self) -> Result<(), ActionError> {
        match &self.cancel {
            Some(cancel) => cancel(),
            None => Ok(()),
        }
    }

    fn expired(&self, retention: Duration) -> bool {
        self.finished_at.is_some_and(|at| at.elapsed() >= retention)
    }

    /// Wire body for async-start replies and `get_task` polls.
    pub fn to_value(&self) -> TaskValue {
        TaskValue {
            agent_task_id: self.id.clone(),
            state: self.state,
            value: self.value.clone(),
            exception: self.error.clone().map(|message| RemoteException { message }),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("value", &self.value)
            .field("error", &self.error)
            .field("cancelable", &self.cancel.is_some())
            .finish()
    }
}

/// Holds the agent-wide exclusive slot until dropped.
pub struct ExclusiveGuard {
    _permit: OwnedSemaphorePermit,
}

/// How long a finished task stays pollable by default.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(60 * 60);

/// Registry of asynchronous tasks.
///
/// Finished tasks are dropped once they are older than the retention window; pruning
/// happens whenever a new task is registered.
#[derive(Clone)]
pub struct TaskService {
    registry: Arbiter<Registry>,
    exclusive: Arc<Semaphore>,
    retention: Duration,
}

impl TaskService {
    pub fn new() -> Result<Self, CoreError> {
        Self::with_retention(DEFAULT_RETENTION)
    }

    pub fn with_retention(retention: Duration) -> Result<Self, CoreError> {
        Ok(Self {
            registry: Arbiter::spawn("task-registry", Registry::new())?,
            exclusive: Arc::new(Semaphore::new(1)),
            retention,
        })
    }

    /// Fresh random task id; unique for the lifetime of the process.
    pub fn generate_id() -> TaskId {
        TaskId::from(Uuid::new_v4().to_string())
    }

    /// Claim the single exclusive slot, failing immediately if it is taken.
    pub fn acquire_exclusive(&self) -> Result<ExclusiveGuard, CoreError> {
        Arc::clone(&self.exclusive)
            .try_acquire_owned()
            .map(|permit| ExclusiveGuard { _permit: permit })
            .map_err(|_| CoreError::ExclusiveTaskRunning)
    }

    /// Register a new `Running` task and start `work` in the background.
    pub async fn start_task<F>(&self, work: F, cancel: Option<CancelFn>) -> Result<Task, CoreError>
    where
        F: Future<Output = Result<Value, ActionError>> + Send + 'static,
    {
        self.start_task_with_id(Self::generate_id(), work, cancel)
            .await
    }

    /// Same as [`TaskService::start_task`] with a caller-chosen id (used when resuming).
    ///
    /// The task is visible to [`TaskService::find_task`] before this returns; the work may
    /// not have started yet.
    pub async fn start_task_with_id<F>(
        &self,
        id: TaskId,
        work: F,
        cancel: Option<CancelFn>,
    ) -> Result<Task, CoreError>
    where
        F: Future<Output = Result<Value, ActionError>> + Send + 'static,
    {
        let task = Task::running(id.clone(), cancel);
        let registered = task.clone();
        let retention = self.retention;
        self.registry
            .call(move |tasks| {
                tasks.retain(|_, t| !t.expired(retention));
                tasks.insert(registered.id.clone(), registered);
            })
            .await?;
        log_event(TaskEvent::new(TaskEventKind::Added).task(&id));

        let registry = self.registry.clone();
        tokio::spawn(async move {
            let outcome = match tokio::spawn(work).await {
                Ok(result) => result,
                Err(e) if e.is_panic() => Err(ActionError::Panicked),
                Err(_) => Err(ActionError::Canceled),
            };
            record_outcome(&registry, id, outcome).await;
        });

        Ok(task)
    }

    /// Current snapshot of a task, `None` for ids never issued.
    pub async fn find_task(&self, id: &TaskId) -> Result<Option<Task>, CoreError> {
        let id = id.clone();
        Ok(self.registry.call(move |tasks| tasks.get(&id).cloned()).await?)
    }
}

async fn record_outcome(
    registry: &Arbiter<Registry>,
    id: TaskId,
    outcome: Result<Value, ActionError>,
) {
    let (state, value, reason) = match outcome {
        Ok(v) => {
            log_event(TaskEvent::new(TaskEventKind::Completed).task(&id));
            (TaskState::Done, Some(v), None)
        }
        Err(e) => {
            let reason = e.to_string();
            let kind = match e {
                ActionError::Panicked => TaskEventKind::Panicked,
                ActionError::Canceled => TaskEventKind::Canceled,
                _ => TaskEventKind::Failed,
            };
            log_event(TaskEvent::new(kind).task(&id).reason(&reason));
            (TaskState::Failed, None, Some(reason))
        }
    };

    let key = id.clone();
    let written = registry
        .call(move |tasks| {
            if let Some(task) = tasks.get_mut(&key)
                && !task.state.is_terminal()
            {
                task.state = state;
                task.value = value;
                task.error = reason;
                task.finished_at = Some(Instant::now());
            }
        })
        .await;
    if let Err(e) = written {
        error!(task = %id, error = %e, "terminal state lost");
    }
}
