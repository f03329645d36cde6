use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ProtocolError, TaskId, TaskState};

/// Failure description carried back to the director.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteException {
    pub message: String,
}

/// Outgoing result; exactly one of `value` or `exception` is present on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    Value(Value),
    Exception(RemoteException),
}

/// Body of every response that refers to an asynchronous task.
///
/// The async-start reply and every later `get_task` poll share this shape;
/// only `state` and the terminal `value`/`exception` change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskValue {
    pub agent_task_id: TaskId,
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<RemoteException>,
}

impl Response {
    pub fn value(value: impl Into<Value>) -> Self {
        Response::Value(value.into())
    }

    pub fn exception(message: impl Into<String>) -> Self {
        Response::Exception(RemoteException {
            message: message.into(),
        })
    }

    pub fn task(task: TaskValue) -> Self {
        match serde_json::to_value(task) {
            Ok(v) => Response::Value(v),
            Err(e) => Response::exception(format!("encoding task value: {e}")),
        }
    }

    pub fn is_exception(&self) -> bool {
        matches!(self, Response::Exception(_))
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl TaskValue {
    pub fn running(id: TaskId) -> Self {
        Self {
            agent_task_id: id,
            state: TaskState::Running,
            value: None,
            exception: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn value_wire_shape() {
        let json = serde_json::to_value(Response::value(123)).unwrap();
        assert_eq!(json, json!({ "value": 123 }));
    }

    #[test]
    fn exception_wire_shape() {
        let json = serde_json::to_value(Response::exception("boom")).unwrap();
        assert_eq!(json, json!({ "exception": { "message": "boom" } }));
    }

    #[test]
    fn async_start_wire_shape() {
        let resp = Response::task(TaskValue::running(TaskId::from("t-1")));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            json,
            json!({ "value": { "agent_task_id": "t-1", "state": "running" } })
        );
    }

    #[test]
    fn every_variant_survives_encode_decode() {
        let failed = TaskValue {
            agent_task_id: TaskId::from("t-2"),
            state: TaskState::Failed,
            value: None,
            exception: Some(RemoteException {
                message: "disk full".into(),
            }),
        };
        let cases = [
            Response::value(json!({ "nested": [1, 2, 3] })),
            Response::exception("unknown message bogus"),
            Response::task(TaskValue::running(TaskId::from("t-1"))),
            Response::task(failed),
        ];

        for resp in cases {
            let bytes = resp.encode().unwrap();
            assert_eq!(Response::decode(&bytes).unwrap(), resp);
        }
    }

    #[test]
    fn both_variants_are_never_accepted_together() {
        let res = Response::decode(br#"{"value":1,"exception":{"message":"x"}}"#);
        assert!(res.is_err());
    }
}
