mod heartbeat;
pub use heartbeat::{CpuVitals, DiskUsage, DiskVitals, Heartbeat, MemoryUsage, Vitals};

mod alert;
pub use alert::{Alert, Severity};

/// Health-manager channel a payload is published on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Heartbeat,
    Alert,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Heartbeat => "heartbeat",
            Topic::Alert => "alert",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
