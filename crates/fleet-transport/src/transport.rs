use std::sync::Arc;

use async_trait::async_trait;
use fleet_model::Topic;
use serde_json::Value;

use crate::{error::TransportError, handler::DispatchHandler};

/// A bidirectional channel between the agent and its control plane.
///
/// Implementations must tolerate concurrent `send_to_health_manager` calls from
/// the heartbeat, alert and command paths.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Serve inbound requests until [`Transport::stop`] is called or the
    /// underlying connection fails.
    async fn start(&self, handler: Arc<dyn DispatchHandler>) -> Result<(), TransportError>;

    /// Ask a running `start` to return.
    fn stop(&self);

    /// Publish a health payload on the channel for `topic`.
    async fn send_to_health_manager(&self, topic: Topic, payload: &Value) -> Result<(), TransportError>;
}

/// Subject names used by one agent instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subjects {
    pub inbox: String,
    pub heartbeat: String,
    pub alert: String,
}

impl Subjects {
    pub fn for_agent(agent_id: &str) -> Self {
        Self {
            inbox: format!("agent.{agent_id}"),
            heartbeat: format!("hm.agent.heartbeat.{agent_id}"),
            alert: format!("hm.agent.alert.{agent_id}"),
        }
    }

    pub fn health(&self, topic: Topic) -> &str {
        match topic {
            Topic::Heartbeat => &self.heartbeat,
            Topic::Alert => &self.alert,
        }
    }
}
