use thiserror::Error;

/// Envelope-level failures. A message that fails here never reaches the dispatcher.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("missing method")]
    MissingMethod,
    #[error("missing reply_to")]
    MissingReplyTo,
}
