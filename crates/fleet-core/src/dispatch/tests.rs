use std::time::Duration;

use async_trait::async_trait;
use fleet_model::{Response, TaskState, TaskValue};
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::Semaphore;

use super::*;
use crate::manager::FileTaskManager;

struct Fixed(Value);

#[async_trait]
impl Action for Fixed {
    fn is_asynchronous(&self) -> bool {
        false
    }

    async fn run(&self, _arguments: Vec<Value>) -> Result<Value, ActionError> {
        Ok(self.0.clone())
    }
}

struct Failing;

#[async_trait]
impl Action for Failing {
    fn is_asynchronous(&self) -> bool {
        false
    }

    async fn run(&self, _arguments: Vec<Value>) -> Result<Value, ActionError> {
        Err(ActionError::failed("disk full"))
    }
}

struct Panicky {
    exclusive: bool,
}

#[async_trait]
impl Action for Panicky {
    fn is_asynchronous(&self) -> bool {
        false
    }

    fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    async fn run(&self, _arguments: Vec<Value>) -> Result<Value, ActionError> {
        panic!("boom");
    }
}

/// Asynchronous action that finishes only when its gate gets a permit.
struct Gated {
    gate: Arc<Semaphore>,
    outcome: Result<Value, ActionError>,
    exclusive: bool,
}

impl Gated {
    fn new(outcome: Result<Value, ActionError>) -> (Arc<Self>, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let action = Arc::new(Self {
            gate: Arc::clone(&gate),
            outcome,
            exclusive: false,
        });
        (action, gate)
    }

    fn exclusive() -> (Arc<Self>, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let action = Arc::new(Self {
            gate: Arc::clone(&gate),
            outcome: Ok(json!("drained")),
            exclusive: true,
        });
        (action, gate)
    }
}

#[async_trait]
impl Action for Gated {
    fn is_asynchronous(&self) -> bool {
        true
    }

    fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    async fn run(&self, _arguments: Vec<Value>) -> Result<Value, ActionError> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| ActionError::failed("gate closed"))?;
        self.outcome.clone()
    }
}

struct Harness {
    dispatcher: Dispatcher,
    manager: Arc<FileTaskManager>,
    _dir: TempDir,
}

fn harness(factory: ActionFactory) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(FileTaskManager::new(dir.path().join("tasks.json")).unwrap());
    let dispatcher = Dispatcher::new(
        factory,
        TaskService::new().unwrap(),
        Arc::clone(&manager) as Arc<dyn TaskManager>,
    );
    Harness {
        dispatcher,
        manager,
        _dir: dir,
    }
}

fn task_value(resp: &Response) -> TaskValue {
    match resp {
        Response::Value(v) => serde_json::from_value(v.clone()).unwrap(),
        Response::Exception(e) => panic!("expected task value, got exception: {}", e.message),
    }
}

fn exception_message(resp: &Response) -> &str {
    match resp {
        Response::Exception(e) => &e.message,
        Response::Value(v) => panic!("expected exception, got value: {v}"),
    }
}

async fn poll(d: &Dispatcher, id: &TaskId) -> TaskValue {
    task_value(&d.dispatch(Request::new(GET_TASK, vec![json!(id.as_str())])).await)
}

async fn poll_until_terminal(d: &Dispatcher, id: &TaskId) -> TaskValue {
    for _ in 0..200 {
        let v = poll(d, id).await;
        if v.state.is_terminal() {
            return v;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("task {id} never finished");
}

#[tokio::test]
async fn unknown_method_is_an_exception() {
    let h = harness(ActionFactory::new());
    let resp = h.dispatcher.dispatch(Request::new("bogus", vec![])).await;
    assert!(exception_message(&resp).contains("unknown message bogus"));
}

#[tokio::test]
async fn get_state_reaches_the_state_action() {
    let h = harness(ActionFactory::with_builtins("agent-1"));
    let req = Request::decode(br#"{"method":"get_state","arguments":[]}"#).unwrap();

    match h.dispatcher.dispatch(req).await {
        Response::Value(v) => assert_eq!(v["agent_id"], "agent-1"),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn synchronous_success_returns_value() {
    let h = harness(ActionFactory::new().with_action("answer", Arc::new(Fixed(json!(123)))));
    let resp = h.dispatcher.dispatch(Request::new("answer", vec![])).await;
    assert_eq!(resp, Response::value(123));
}

#[tokio::test]
async fn synchronous_failure_names_method_and_cause() {
    let h = harness(ActionFactory::new().with_action("compile", Arc::new(Failing)));
    let resp = h.dispatcher.dispatch(Request::new("compile", vec![])).await;

    let msg = exception_message(&resp);
    assert!(msg.contains("compile"), "{msg}");
    assert!(msg.contains("disk full"), "{msg}");
}

#[tokio::test]
async fn synchronous_panic_becomes_exception() {
    let h = Arc::new(harness(
        ActionFactory::new().with_action("boom", Arc::new(Panicky { exclusive: false })),
    ));

    let d = Arc::clone(&h);
    let resp = tokio::spawn(async move { d.dispatcher.dispatch(Request::new("boom", vec![])).await })
        .await
        .expect("dispatch must not panic");

    let msg = exception_message(&resp);
    assert!(msg.contains("boom"), "{msg}");
    assert!(msg.contains("task panicked"), "{msg}");
}

#[tokio::test]
async fn synchronous_panic_releases_exclusive_slot() {
    let h = harness(ActionFactory::new().with_action("boom", Arc::new(Panicky { exclusive: true })));

    for _ in 0..2 {
        let resp = h.dispatcher.dispatch(Request::new("boom", vec![])).await;
        let msg = exception_message(&resp);
        assert!(msg.contains("task panicked"), "{msg}");
    }
}

#[tokio::test]
async fn finished_work_wins_over_simultaneous_cancel() {
    let run = tokio::spawn(async { Ok(json!("done")) });
    while !run.is_finished() {
        tokio::task::yield_now().await;
    }
    let token = CancellationToken::new();
    token.cancel();

    assert_eq!(race_cancel(run, token).await, Ok(json!("done")));
}

#[tokio::test]
async fn cancel_aborts_unfinished_work() {
    let run = tokio::spawn(std::future::pending::<Result<Value, ActionError>>());
    let token = CancellationToken::new();
    token.cancel();

    assert_eq!(race_cancel(run, token).await, Err(ActionError::Canceled));
}

#[tokio::test]
async fn async_task_runs_to_done() {
    let (action, gate) = Gated::new(Ok(json!({ "applied": true })));
    let h = harness(ActionFactory::new().with_action("apply", action));

    let started = task_value(&h.dispatcher.dispatch(Request::new("apply", vec![])).await);
    assert_eq!(started.state, TaskState::Running);
    assert!(started.value.is_none());

    let polled = poll(&h.dispatcher, &started.agent_task_id).await;
    assert_eq!(polled.state, TaskState::Running);

    gate.add_permits(1);
    let done = poll_until_terminal(&h.dispatcher, &started.agent_task_id).await;
    assert_eq!(done.state, TaskState::Done);
    assert_eq!(done.value, Some(json!({ "applied": true })));
    assert!(done.exception.is_none());
}

#[tokio::test]
async fn async_task_failure_is_reported_on_poll() {
    let (action, gate) = Gated::new(Err(ActionError::failed("package missing")));
    let h = harness(ActionFactory::new().with_action("compile_package", action));

    let started = task_value(&h.dispatcher.dispatch(Request::new("compile_package", vec![])).await);
    gate.add_permits(1);

    let failed = poll_until_terminal(&h.dispatcher, &started.agent_task_id).await;
    assert_eq!(failed.state, TaskState::Failed);
    assert_eq!(failed.exception.unwrap().message, "package missing");
}

#[tokio::test]
async fn second_exclusive_task_is_rejected() {
    let (drain, gate) = Gated::exclusive();
    let factory = ActionFactory::with_builtins("agent-1").with_action("drain", drain);
    let h = harness(factory);

    let first = task_value(&h.dispatcher.dispatch(Request::new("drain", vec![])).await);
    assert_eq!(first.state, TaskState::Running);

    let second = h.dispatcher.dispatch(Request::new("drain", vec![])).await;
    assert_eq!(exception_message(&second), "exclusive task already running");

    let ping = h.dispatcher.dispatch(Request::new("ping", vec![])).await;
    assert_eq!(ping, Response::value("pong"));

    gate.add_permits(1);
    poll_until_terminal(&h.dispatcher, &first.agent_task_id).await;

    let third = h.dispatcher.dispatch(Request::new("drain", vec![])).await;
    assert_eq!(task_value(&third).state, TaskState::Running);
}

#[tokio::test]
async fn unknown_task_id_is_an_exception() {
    let h = harness(ActionFactory::new());
    let resp = h
        .dispatcher
        .dispatch(Request::new(GET_TASK, vec![json!("never-issued")]))
        .await;
    assert_eq!(exception_message(&resp), "unknown task id");
}

#[tokio::test]
async fn get_task_rejects_bad_arguments() {
    let h = harness(ActionFactory::new());

    for args in [vec![], vec![json!(42)], vec![json!({ "id": "x" })]] {
        let resp = h.dispatcher.dispatch(Request::new(GET_TASK, args)).await;
        assert_eq!(exception_message(&resp), "invalid arguments");
    }
}

#[tokio::test]
async fn canceled_task_ends_failed() {
    let (action, _gate) = Gated::new(Ok(json!("never")));
    let h = harness(ActionFactory::new().with_action("stop", action));

    let started = task_value(&h.dispatcher.dispatch(Request::new("stop", vec![])).await);
    let id = started.agent_task_id.as_str();

    let resp = h
        .dispatcher
        .dispatch(Request::new(CANCEL_TASK, vec![json!(id)]))
        .await;
    assert_eq!(resp, Response::value("canceled"));

    let failed = poll_until_terminal(&h.dispatcher, &started.agent_task_id).await;
    assert_eq!(failed.state, TaskState::Failed);
    assert_eq!(failed.exception.unwrap().message, "canceled");
}

#[tokio::test]
async fn cancel_task_validates_its_argument() {
    let h = harness(ActionFactory::new());

    let resp = h.dispatcher.dispatch(Request::new(CANCEL_TASK, vec![])).await;
    assert_eq!(exception_message(&resp), "invalid arguments");

    let resp = h
        .dispatcher
        .dispatch(Request::new(CANCEL_TASK, vec![json!("ghost")]))
        .await;
    assert_eq!(exception_message(&resp), "unknown task id");
}

#[tokio::test]
async fn task_info_lives_only_while_running() {
    let (action, gate) = Gated::new(Ok(json!("ok")));
    let h = harness(ActionFactory::new().with_action("apply", action));

    let started = task_value(
        &h.dispatcher
            .dispatch(Request::new("apply", vec![json!({ "job": "web" })]))
            .await,
    );

    let infos = h.manager.get_task_infos().await.unwrap();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].task_id, started.agent_task_id);
    assert_eq!(infos[0].method, "apply");
    assert_eq!(infos[0].payload, json!([{ "job": "web" }]));

    gate.add_permits(1);
    poll_until_terminal(&h.dispatcher, &started.agent_task_id).await;

    for _ in 0..200 {
        if h.manager.get_task_infos().await.unwrap().is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("task info was never removed");
}

#[tokio::test]
async fn resume_restarts_known_tasks_under_the_same_id() {
    let (action, gate) = Gated::new(Ok(json!("resumed")));
    let h = harness(ActionFactory::new().with_action("apply", action));

    let kept = TaskId::from("persisted-1");
    h.manager
        .add_task_info(TaskInfo::new(kept.clone(), "apply", json!(["manifest"])))
        .await
        .unwrap();
    h.manager
        .add_task_info(TaskInfo::new(TaskId::from("persisted-2"), "retired", json!([])))
        .await
        .unwrap();

    let resumed = h.dispatcher.resume_previous_tasks().await.unwrap();
    assert_eq!(resumed, 1);

    let infos = h.manager.get_task_infos().await.unwrap();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].task_id, kept);

    assert_eq!(poll(&h.dispatcher, &kept).await.state, TaskState::Running);
    gate.add_permits(1);
    let done = poll_until_terminal(&h.dispatcher, &kept).await;
    assert_eq!(done.value, Some(json!("resumed")));
}
