use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log format {0:?}; use text, json or journald")]
    InvalidFormat(String),

    #[error("journald output needs linux and the `journald` feature")]
    JournaldUnavailable,

    #[error("a global logger is already installed")]
    AlreadyInitialized,

    #[error("logger setup failed: {0}")]
    Setup(String),

    #[error("invalid log level {directive:?}: {reason}")]
    InvalidLevel { directive: String, reason: String },
}
