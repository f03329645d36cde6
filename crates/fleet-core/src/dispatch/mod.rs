//! Routing of requests to actions.

use std::sync::Arc;

use fleet_model::{Request, Response, TaskId, TaskInfo};
use serde_json::Value;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::{
    action::{Action, ActionFactory},
    error::{ActionError, CoreError},
    manager::TaskManager,
    task::{CancelFn, ExclusiveGuard, Task, TaskEvent, TaskEventKind, TaskService, log_event},
};

/// Pseudo-method polling an asynchronous task.
pub const GET_TASK: &str = "get_task";
/// Pseudo-method canceling an asynchronous task.
pub const CANCEL_TASK: &str = "cancel_task";

/// Turns a [`Request`] into a [`Response`]; never fails.
pub struct Dispatcher {
    factory: ActionFactory,
    tasks: TaskService,
    manager: Arc<dyn TaskManager>,
}

impl Dispatcher {
    pub fn new(factory: ActionFactory, tasks: TaskService, manager: Arc<dyn TaskManager>) -> Self {
        Self {
            factory,
            tasks,
            manager,
        }
    }

    #[instrument(level = "debug", skip(self, req), fields(method = %req.method))]
    pub async fn dispatch(&self, req: Request) -> Response {
        let result = match req.method.as_str() {
            GET_TASK => self.get_task(&req.arguments).await,
            CANCEL_TASK => self.cancel_task(&req.arguments).await,
            _ => self.run_action(req).await,
        };

        result.unwrap_or_else(|e| {
            debug!(error = %e, "request failed");
            Response::exception(e.to_string())
        })
    }

    /// Restart the work described by persisted task infos, keeping their ids.
    ///
    /// Infos whose method no longer maps to an asynchronous action are discarded. Work that had
    /// already finished before the restart may run again.
    pub async fn resume_previous_tasks(&self) -> Result<usize, CoreError> {
        let mut resumed = 0;

        for info in self.manager.get_task_infos().await? {
            let action = match self.factory.create(&info.method) {
                Ok(action) if action.is_asynchronous() => action,
                _ => {
                    warn!(task = %info.task_id, method = %info.method, "discarding unresumable task info");
                    self.manager.remove_task_info(&info.task_id).await?;
                    continue;
                }
            };

            let guard = match self.claim_exclusive(action.as_ref(), &info.method) {
                Ok(guard) => guard,
                Err(e) => {
                    warn!(task = %info.task_id, error = %e, "discarding task info");
                    self.manager.remove_task_info(&info.task_id).await?;
                    continue;
                }
            };

            log_event(
                TaskEvent::new(TaskEventKind::Resumed)
                    .task(&info.task_id)
                    .method(&info.method),
            );
            let arguments = match info.payload {
                Value::Array(args) => args,
                Value::Null => Vec::new(),
                other => vec![other],
            };
            self.launch(info.task_id, action, info.method, arguments, guard)
                .await?;
            resumed += 1;
        }

        Ok(resumed)
    }

    async fn run_action(&self, req: Request) -> Result<Response, CoreError> {
        let action = self.factory.create(&req.method)?;
        let guard = self.claim_exclusive(action.as_ref(), &req.method)?;

        if action.is_asynchronous() {
            let task = self
                .launch(
                    TaskService::generate_id(),
                    action,
                    req.method,
                    req.arguments,
                    guard,
                )
                .await?;
            return Ok(Response::task(task.to_value()));
        }

        // A panicking action must not take the caller's task down with it.
        let run = tokio::spawn(async move { action.run(req.arguments).await });
        let outcome = joined_outcome(run.await);
        drop(guard);
        let value = outcome.map_err(|source| CoreError::Action {
            method: req.method,
            source,
        })?;
        Ok(Response::value(value))
    }

    async fn get_task(&self, arguments: &[Value]) -> Result<Response, CoreError> {
        let id = task_id_argument(arguments)?;
        let task = self.find(&id).await?;
        Ok(Response::task(task.to_value()))
    }

    async fn cancel_task(&self, arguments: &[Value]) -> Result<Response, CoreError> {
        let id = task_id_argument(arguments)?;
        let task = self.find(&id).await?;
        task.cancel().map_err(|source| CoreError::Action {
            method: CANCEL_TASK.to_string(),
            source,
        })?;
        Ok(Response::value("canceled"))
    }

    async fn find(&self, id: &TaskId) -> Result<Task, CoreError> {
        self.tasks
            .find_task(id)
            .await?
            .ok_or(CoreError::UnknownTaskId)
    }

    fn claim_exclusive(
        &self,
        action: &dyn Action,
        method: &str,
    ) -> Result<Option<ExclusiveGuard>, CoreError> {
        if !action.is_exclusive() {
            return Ok(None);
        }
        self.tasks.acquire_exclusive().map(Some).inspect_err(|_| {
            log_event(TaskEvent::new(TaskEventKind::Rejected).method(method));
        })
    }

    /// Persist the task info, then run `action` as a cancelable background task.
    ///
    /// The info is removed once the action returns; that removal and the registry's terminal
    /// write are independent steps.
    async fn launch(
        &self,
        id: TaskId,
        action: Arc<dyn Action>,
        method: String,
        arguments: Vec<Value>,
        guard: Option<ExclusiveGuard>,
    ) -> Result<Task, CoreError> {
        let info = TaskInfo::new(id.clone(), method, Value::Array(arguments.clone()));
        self.manager.add_task_info(info).await?;

        let token = CancellationToken::new();
        let cancel: CancelFn = {
            let token = token.clone();
            Arc::new(move || {
                token.cancel();
                Ok(())
            })
        };

        let manager = Arc::clone(&self.manager);
        let task_id = id.clone();
        let work = async move {
            let _guard = guard;
            let run = tokio::spawn(async move { action.run(arguments).await });
            let result = race_cancel(run, token).await;

            if let Err(e) = manager.remove_task_info(&task_id).await {
                warn!(task = %task_id, error = %e, "task info not removed");
            }
            result
        };

        self.tasks.start_task_with_id(id, work, Some(cancel)).await
    }
}

/// Await `run` unless `token` fires first; a result that is already in wins over a
/// concurrent cancel.
async fn race_cancel(
    mut run: JoinHandle<Result<Value, ActionError>>,
    token: CancellationToken,
) -> Result<Value, ActionError> {
    tokio::select! {
        biased;
        joined = &mut run => joined_outcome(joined),
        _ = token.cancelled() => {
            run.abort();
            Err(ActionError::Canceled)
        }
    }
}

fn joined_outcome(joined: Result<Result<Value, ActionError>, JoinError>) -> Result<Value, ActionError> {
    joined.unwrap_or_else(|e| {
        Err(if e.is_panic() { ActionError::Panicked } else { ActionError::Canceled })
    })
}

fn task_id_argument(arguments: &[Value]) -> Result<TaskId, CoreError> {
    match arguments.first() {
        Some(Value::String(id)) => Ok(TaskId::from(id.as_str())),
        _ => Err(CoreError::InvalidArguments),
    }
}

#[cfg(test)]
mod tests;
