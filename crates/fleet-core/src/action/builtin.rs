use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{
    action::Action,
    error::ActionError,
    system::{arch, hostname, os_info, platform, uptime_seconds},
};

/// Liveness check used by the director.
pub struct PingAction;

#[async_trait]
impl Action for PingAction {
    fn is_asynchronous(&self) -> bool {
        false
    }

    async fn run(&self, _arguments: Vec<Value>) -> Result<Value, ActionError> {
        Ok(Value::from("pong"))
    }
}

pub struct NoopAction;

#[async_trait]
impl Action for NoopAction {
    fn is_asynchronous(&self) -> bool {
        false
    }

    async fn run(&self, _arguments: Vec<Value>) -> Result<Value, ActionError> {
        Ok(Value::from("nope"))
    }
}

/// Identity snapshot of this agent (served for both `state` and `get_state`).
pub struct StateAction {
    agent_id: String,
}

impl StateAction {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
        }
    }
}

#[async_trait]
impl Action for StateAction {
    fn is_asynchronous(&self) -> bool {
        false
    }

    async fn run(&self, _arguments: Vec<Value>) -> Result<Value, ActionError> {
        Ok(json!({
            "agent_id": self.agent_id,
            "hostname": hostname(),
            "platform": platform(),
            "arch": arch(),
            "os": os_info(),
            "uptime_seconds": uptime_seconds(),
        }))
    }
}
