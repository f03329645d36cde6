//! Health reporting: periodic heartbeats with host vitals, and alerts raised from
//! job-supervisor events and SSH activity seen in syslog.

mod error;
pub use error::{AlertError, VitalsError};

pub mod vitals;
pub use vitals::{DiskPaths, LinuxVitalsCollector, VitalsCollector, collect_vitals};

mod heartbeat;
pub use heartbeat::{FixedJobState, HeartbeatConfig, HeartbeatGenerator, JobStateProvider};

pub mod alert;
pub use alert::{AlertBuilder, AlertSender, MonitAlert, MonitAlertBuilder, SshMatcher};

mod syslog;
pub use syslog::SyslogListener;

#[cfg(test)]
pub(crate) mod testing;
