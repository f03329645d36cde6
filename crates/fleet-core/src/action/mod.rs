mod factory;
pub use factory::ActionFactory;

mod builtin;
pub use builtin::{NoopAction, PingAction, StateAction};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ActionError;

/// A command the agent knows how to execute.
///
/// Actions are unaware of how they are scheduled: the dispatcher decides, from
/// [`Action::is_asynchronous`], whether `run` is awaited inline or handed to the task registry.
#[async_trait]
pub trait Action: Send + Sync + 'static {
    /// `true` if the director should get a task id back instead of the result.
    fn is_asynchronous(&self) -> bool;

    /// `true` if at most one instance of this action may run agent-wide.
    fn is_exclusive(&self) -> bool {
        false
    }

    async fn run(&self, arguments: Vec<Value>) -> Result<Value, ActionError>;
}
