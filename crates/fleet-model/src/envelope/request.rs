use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Method, ProtocolError};

/// Legacy method name that is served by the `state` action.
pub const GET_STATE_ALIAS: &str = "get_state";

/// Incoming command from the director.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub method: Method,
    pub arguments: Vec<Value>,
    /// Reply subject; only the pub/sub transport carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

#[derive(Deserialize)]
struct WireRequest {
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    arguments: Option<Vec<Value>>,
    #[serde(default)]
    reply_to: Option<String>,
}

impl Request {
    /// Build a request, applying method aliasing.
    pub fn new(method: impl Into<Method>, arguments: Vec<Value>) -> Self {
        let mut method = method.into();
        if method == GET_STATE_ALIAS {
            method = "state".to_string();
        }
        Self {
            method,
            arguments,
            reply_to: None,
        }
    }

    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    /// Decode a JSON envelope.
    ///
    /// An absent or empty `method` is rejected; `reply_to` is left to the transport to check.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let wire: WireRequest = serde_json::from_slice(bytes)?;
        let method = wire
            .method
            .filter(|m| !m.trim().is_empty())
            .ok_or(ProtocolError::MissingMethod)?;

        let mut req = Request::new(method, wire.arguments.unwrap_or_default());
        req.reply_to = wire.reply_to.filter(|r| !r.is_empty());
        Ok(req)
    }

    /// Reply subject, required by transports that answer on a separate channel.
    pub fn reply_target(&self) -> Result<&str, ProtocolError> {
        self.reply_to.as_deref().ok_or(ProtocolError::MissingReplyTo)
    }
}
