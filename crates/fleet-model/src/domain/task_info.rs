use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Method, TaskId};

/// Persisted projection of an in-flight task.
///
/// Written when an asynchronous task starts and removed once it finishes, so that an
/// agent restart can rediscover work that was interrupted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub task_id: TaskId,
    pub method: Method,
    /// Request arguments, replayed verbatim on resume.
    #[serde(default)]
    pub payload: Value,
}

impl TaskInfo {
    pub fn new(task_id: TaskId, method: impl Into<Method>, payload: Value) -> Self {
        Self {
            task_id,
            method: method.into(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn uses_snake_case_field_names() {
        let info = TaskInfo::new(TaskId::from("t-1"), "apply", json!(["manifest"]));
        let json = serde_json::to_value(&info).unwrap();

        assert_eq!(
            json,
            json!({ "task_id": "t-1", "method": "apply", "payload": ["manifest"] })
        );
    }

    #[test]
    fn missing_payload_defaults_to_null() {
        let info: TaskInfo =
            serde_json::from_str(r#"{"task_id":"t-2","method":"drain"}"#).unwrap();
        assert_eq!(info.payload, Value::Null);
    }
}
