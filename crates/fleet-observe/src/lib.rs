//! Logging setup for the agent.

mod logger;
pub use logger::*;
