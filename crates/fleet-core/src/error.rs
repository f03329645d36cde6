use std::{io, path::PathBuf};

use thiserror::Error;

/// Failures surfaced by the dispatcher. The display string is the wire exception message.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown message {0}")]
    UnknownMessage(String),
    #[error("invalid arguments")]
    InvalidArguments,
    #[error("exclusive task already running")]
    ExclusiveTaskRunning,
    #[error("unknown task id")]
    UnknownTaskId,
    #[error("{method}: {source}")]
    Action {
        method: String,
        #[source]
        source: ActionError,
    },
    #[error(transparent)]
    Manager(#[from] ManagerError),
    #[error(transparent)]
    Arbiter(#[from] ArbiterClosed),
    #[error("spawning arbiter: {0}")]
    Spawn(#[source] io::Error),
}

/// Error returned by an action's work function.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("{0}")]
    Failed(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("canceled")]
    Canceled,
    #[error("task panicked")]
    Panicked,
}

impl ActionError {
    pub fn failed(reason: impl Into<String>) -> Self {
        ActionError::Failed(reason.into())
    }
}

/// Failures of the persisted task file.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("accessing task file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("task file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("encoding task infos: {0}")]
    Encode(#[source] serde_json::Error),
    #[error(transparent)]
    Arbiter(#[from] ArbiterClosed),
}

/// The arbiter loop is gone; the state it owned is unreachable.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("arbiter '{0}' is closed")]
pub struct ArbiterClosed(pub &'static str);
