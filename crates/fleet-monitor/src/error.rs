use std::path::PathBuf;

use fleet_transport::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VitalsError {
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("statvfs {path}: {source}")]
    Statvfs {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("vitals are not supported on this platform")]
    Unsupported,
}

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("invalid alert pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("encode alert: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
