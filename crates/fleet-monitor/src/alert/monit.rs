use fleet_model::{Alert, Severity};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc2822};

/// Failure event reported by the job supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitAlert {
    pub id: String,
    pub service: String,
    pub event: String,
    pub action: String,
    /// RFC 2822 timestamp as written by monit.
    pub date: String,
    pub description: String,
}

/// Turns a supervisor event into a health-manager alert.
pub trait AlertBuilder: Send + Sync + 'static {
    fn build(&self, alert: &MonitAlert) -> Alert;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MonitAlertBuilder;

impl AlertBuilder for MonitAlertBuilder {
    fn build(&self, alert: &MonitAlert) -> Alert {
        Alert {
            id: alert.id.clone(),
            severity: severity_for(&alert.event),
            title: format!("{} - {} - {}", alert.service, alert.event, alert.action),
            summary: alert.description.clone(),
            created_at: parse_date(&alert.date),
        }
    }
}

/// Severity of a monit event name; events not listed are `Critical`.
pub fn severity_for(event: &str) -> Severity {
    match event.trim().to_ascii_lowercase().as_str() {
        "action done"
        | "checksum succeeded"
        | "connection succeeded"
        | "content doesn't match"
        | "data access succeeded"
        | "execution succeeded"
        | "exists"
        | "gid succeeded"
        | "icmp succeeded"
        | "permission succeeded"
        | "pid succeeded"
        | "ppid succeeded"
        | "resource limit succeeded"
        | "size succeeded"
        | "timestamp succeeded"
        | "type succeeded"
        | "uid succeeded" => Severity::Ignored,

        "connection failed" | "does not exist" | "execution failed" | "gid failed" | "pid failed"
        | "ppid failed" | "uid failed" => Severity::Alert,

        "checksum failed" | "icmp failed" | "monit instance changed" | "timeout" => Severity::Critical,

        "content match" | "data access error" | "invalid type" | "permission failed"
        | "resource limit matched" | "size failed" | "timestamp failed" | "type failed" => Severity::Error,

        "checksum changed" | "content changed" | "data changed" | "pid changed" | "ppid changed"
        | "size changed" | "timestamp changed" => Severity::Warning,

        _ => Severity::Critical,
    }
}

fn parse_date(date: &str) -> i64 {
    OffsetDateTime::parse(date.trim(), &Rfc2822)
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .unix_timestamp()
}
