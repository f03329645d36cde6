use fleet_model::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid connection url: {0}")]
    InvalidUrl(String),

    #[error("unsupported transport scheme: {0}")]
    UnsupportedScheme(String),

    #[error("connection url must carry a user and a password")]
    MissingCredentials,

    #[error("https transport requires a tls certificate and key")]
    MissingTls,

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("publish to {subject} failed: {reason}")]
    Publish { subject: String, reason: String },

    #[error("tls setup failed: {0}")]
    Tls(String),

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),

    #[error("subscription closed by the broker")]
    Disconnected,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
