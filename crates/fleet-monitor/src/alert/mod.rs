//! Alert construction and delivery.

mod monit;
pub use monit::{AlertBuilder, MonitAlert, MonitAlertBuilder, severity_for};

mod ssh;
pub use ssh::{SshEvent, SshMatcher};

use std::sync::Arc;

use fleet_model::{Alert, Severity, Topic};
use fleet_transport::Transport;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::error::AlertError;

/// Funnels supervisor and syslog alerts into the health manager.
pub struct AlertSender {
    transport: Arc<dyn Transport>,
    builder: Arc<dyn AlertBuilder>,
    ssh: SshMatcher,
}

impl AlertSender {
    pub fn new(transport: Arc<dyn Transport>, builder: Arc<dyn AlertBuilder>) -> Result<Self, AlertError> {
        Ok(Self {
            transport,
            builder,
            ssh: SshMatcher::new()?,
        })
    }

    /// Publish an alert for a supervisor event. Returns `false` if it was suppressed.
    pub async fn send_monit_alert(&self, event: &MonitAlert) -> Result<bool, AlertError> {
        let alert = self.builder.build(event);
        self.publish(alert).await
    }

    /// Publish an alert if `line` records an SSH login or logout.
    ///
    /// Returns `false` for lines that match neither.
    pub async fn send_ssh_alert(&self, line: &str) -> Result<bool, AlertError> {
        let Some(event) = self.ssh.classify(line) else {
            return Ok(false);
        };
        let alert = Alert {
            id: uuid::Uuid::new_v4().to_string(),
            severity: Severity::Warning,
            title: event.title().to_string(),
            summary: line.trim().to_string(),
            created_at: OffsetDateTime::now_utc().unix_timestamp(),
        };
        self.publish(alert).await
    }

    async fn publish(&self, alert: Alert) -> Result<bool, AlertError> {
        if alert.is_ignored() {
            debug!(id = %alert.id, title = %alert.title, "alert suppressed");
            return Ok(false);
        }
        let payload = serde_json::to_value(&alert)?;
        self.transport.send_to_health_manager(Topic::Alert, &payload).await?;
        info!(id = %alert.id, title = %alert.title, "alert sent");
        Ok(true)
    }
}
