use fleet_model::TaskId;
use tracing::{debug, error, info, warn};

/// Lifecycle points of an asynchronous task worth a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEventKind {
    Added,
    Resumed,
    Completed,
    Failed,
    Panicked,
    Canceled,
    Rejected,
}

#[derive(Debug, Clone, Copy)]
pub struct TaskEvent<'a> {
    pub kind: TaskEventKind,
    pub task: Option<&'a TaskId>,
    pub method: Option<&'a str>,
    pub reason: Option<&'a str>,
}

impl<'a> TaskEvent<'a> {
    pub fn new(kind: TaskEventKind) -> Self {
        Self {
            kind,
            task: None,
            method: None,
            reason: None,
        }
    }

    pub fn task(mut self, id: &'a TaskId) -> Self {
        self.task = Some(id);
        self
    }

    pub fn method(mut self, method: &'a str) -> Self {
        self.method = Some(method);
        self
    }

    pub fn reason(mut self, reason: &'a str) -> Self {
        self.reason = Some(reason);
        self
    }

    #[inline]
    fn as_task(&self) -> &str {
        self.task.map(TaskId::as_str).unwrap_or("unknown")
    }

    #[inline]
    fn as_method(&self) -> &str {
        self.method.unwrap_or("unknown")
    }

    #[inline]
    fn as_reason(&self) -> &str {
        self.reason.unwrap_or("unknown")
    }
}

#[inline]
pub fn message_for(kind: TaskEventKind) -> &'static str {
    match kind {
        TaskEventKind::Added => "task registered (running)",
        TaskEventKind::Resumed => "task resumed from persisted info",
        TaskEventKind::Completed => "task completed",
        TaskEventKind::Failed => "task failed",
        TaskEventKind::Panicked => "task panicked while running",
        TaskEventKind::Canceled => "task canceled",
        TaskEventKind::Rejected => "exclusive task rejected (another one is running)",
    }
}

pub fn log_event(e: TaskEvent<'_>) {
    let msg = message_for(e.kind);

    match e.kind {
        TaskEventKind::Added => debug!(task = e.as_task(), "{msg}"),
        TaskEventKind::Completed => debug!(task = e.as_task(), "{msg}"),
        TaskEventKind::Resumed => {
            info!(task = e.as_task(), method = e.as_method(), "{msg}")
        }
        TaskEventKind::Canceled => info!(task = e.as_task(), "{msg}"),
        TaskEventKind::Rejected => warn!(method = e.as_method(), "{msg}"),
        TaskEventKind::Failed => {
            warn!(task = e.as_task(), reason = e.as_reason(), "{msg}")
        }
        TaskEventKind::Panicked => {
            error!(task = e.as_task(), reason = e.as_reason(), "{msg}")
        }
    }
}
