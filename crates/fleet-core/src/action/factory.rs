use std::{collections::HashMap, sync::Arc};

use tracing::trace;

use crate::{
    action::{Action, NoopAction, PingAction, StateAction},
    error::CoreError,
};

/// String-keyed table of actions, built once at startup and injected into the dispatcher.
#[derive(Default, Clone)]
pub struct ActionFactory {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionFactory {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory preloaded with `ping`, `noop` and `state`.
    pub fn with_builtins(agent_id: impl Into<String>) -> Self {
        Self::new()
            .with_action("ping", Arc::new(PingAction))
            .with_action("noop", Arc::new(NoopAction))
            .with_action("state", Arc::new(StateAction::new(agent_id)))
    }

    /// Register `action` under `method`, replacing any previous entry.
    pub fn register(&mut self, method: impl Into<String>, action: Arc<dyn Action>) {
        let method = method.into();
        trace!(%method, "action registered");
        self.actions.insert(method, action);
    }

    #[inline]
    pub fn with_action(mut self, method: impl Into<String>, action: Arc<dyn Action>) -> Self {
        self.register(method, action);
        self
    }

    pub fn create(&self, method: &str) -> Result<Arc<dyn Action>, CoreError> {
        self.actions
            .get(method)
            .cloned()
            .ok_or_else(|| CoreError::UnknownMessage(method.to_string()))
    }

    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }
}
