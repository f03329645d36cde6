mod task_id;
pub use task_id::TaskId;

mod task_state;
pub use task_state::TaskState;

mod task_info;
pub use task_info::TaskInfo;

/// Name of a command understood by the agent (e.g. `"ping"`, `"apply"`).
pub type Method = String;
