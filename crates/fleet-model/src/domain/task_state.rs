use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of an asynchronous task.
///
/// A task is created `Running` and moves exactly once to `Done` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Work has been registered and may or may not have started yet.
    Running,
    /// Work completed without error.
    Done,
    /// Work returned an error (or panicked, or was canceled).
    Failed,
}

impl TaskState {
    /// Returns `true` once the task can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Done | TaskState::Failed)
    }

    /// Wire representation used in task responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Running => "running",
            TaskState::Done => "done",
            TaskState::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
