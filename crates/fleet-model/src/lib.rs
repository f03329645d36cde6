//! Data model shared by every part of the agent.
//!
//! - [`Request`] / [`Response`]: the transport-agnostic envelope exchanged with the director.
//! - [`TaskId`], [`TaskState`], [`TaskInfo`]: identity and lifecycle of background work.
//! - [`Heartbeat`], [`Alert`]: values pushed to the health manager.

mod domain;
pub use domain::*;

mod envelope;
pub use envelope::*;

mod health;
pub use health::*;
