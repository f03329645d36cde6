use serde::{Deserialize, Serialize};

/// Alert severity as understood by the health manager.
///
/// `Ignored` never leaves the agent; it marks events that are deliberately suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Severity {
    Alert,
    Critical,
    Error,
    Warning,
    Ignored,
}

impl From<Severity> for i8 {
    fn from(s: Severity) -> i8 {
        match s {
            Severity::Alert => 1,
            Severity::Critical => 2,
            Severity::Error => 3,
            Severity::Warning => 4,
            Severity::Ignored => -1,
        }
    }
}

impl TryFrom<i8> for Severity {
    type Error = String;

    fn try_from(v: i8) -> Result<Self, String> {
        match v {
            1 => Ok(Severity::Alert),
            2 => Ok(Severity::Critical),
            3 => Ok(Severity::Error),
            4 => Ok(Severity::Warning),
            -1 => Ok(Severity::Ignored),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub severity: Severity,
    pub title: String,
    pub summary: String,
    /// Unix timestamp in seconds.
    pub created_at: i64,
}

impl Alert {
    pub fn is_ignored(&self) -> bool {
        self.severity == Severity::Ignored
    }
}
