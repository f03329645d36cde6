use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::Context;
use fleet_monitor::DiskPaths;
use fleet_observe::{LoggerConfig, LoggerFormat, LoggerLevel};
use fleet_transport::{RetryPolicy, TlsFiles};
use serde::Deserialize;

pub const ENV_PREFIX: &str = "FLEET_AGENT_";

/// Agent settings loaded from environment variables via `envy`.
///
/// Each field maps to `FLEET_AGENT_<FIELD>`:
///   - `MBUS`                    (required, `redis://` / `rediss://` / `https://` with user and password)
///   - `AGENT_ID`                (optional, otherwise read from or written to `AGENT_ID_PATH`)
///   - `AGENT_ID_PATH`           (default `/var/lib/fleet/agent_id`)
///   - `TLS_CERT`, `TLS_KEY`     (required for `https`)
///   - `MBUS_RETRIES`            (default `10`, broker connect attempts before giving up)
///   - `MBUS_RETRY_DELAY_MS`     (default `500`)
///   - `TASKS_PATH`              (default `/var/lib/fleet/tasks.json`)
///   - `HEARTBEAT_INTERVAL_SECS` (default `60`, `0` disables)
///   - `SYSLOG_ADDR`             (default `127.0.0.1:33331`, empty disables)
///   - `JOB`, `INDEX`, `EPHEMERAL_DISK`, `PERSISTENT_DISK`
///   - `LOG_LEVEL`, `LOG_FORMAT` (default `info`, `text`)
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub mbus: String,

    #[serde(default)]
    pub agent_id: Option<String>,

    #[serde(default = "default_agent_id_path")]
    pub agent_id_path: PathBuf,

    #[serde(default)]
    pub tls_cert: Option<PathBuf>,

    #[serde(default)]
    pub tls_key: Option<PathBuf>,

    #[serde(default = "default_mbus_retries")]
    pub mbus_retries: u32,

    #[serde(default = "default_mbus_retry_delay_ms")]
    pub mbus_retry_delay_ms: u64,

    #[serde(default = "default_tasks_path")]
    pub tasks_path: PathBuf,

    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    #[serde(default = "default_syslog_addr")]
    pub syslog_addr: String,

    #[serde(default)]
    pub job: Option<String>,

    #[serde(default)]
    pub index: Option<u32>,

    #[serde(default)]
    pub ephemeral_disk: Option<PathBuf>,

    #[serde(default)]
    pub persistent_disk: Option<PathBuf>,

    #[serde(default)]
    pub log_level: LoggerLevel,

    #[serde(default)]
    pub log_format: LoggerFormat,
}

fn default_agent_id_path() -> PathBuf {
    PathBuf::from("/var/lib/fleet/agent_id")
}

fn default_tasks_path() -> PathBuf {
    PathBuf::from("/var/lib/fleet/tasks.json")
}

fn default_mbus_retries() -> u32 {
    RetryPolicy::default().attempts
}

fn default_mbus_retry_delay_ms() -> u64 {
    500
}

fn default_heartbeat_interval() -> u64 {
    60
}

fn default_syslog_addr() -> String {
    "127.0.0.1:33331".to_string()
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        envy::prefixed(ENV_PREFIX)
            .from_env()
            .with_context(|| format!("failed to load config from {ENV_PREFIX}* env vars ({ENV_PREFIX}MBUS is required)"))
    }

    pub fn heartbeat_interval(&self) -> Option<Duration> {
        (self.heartbeat_interval_secs > 0).then(|| Duration::from_secs(self.heartbeat_interval_secs))
    }

    pub fn syslog_addr(&self) -> anyhow::Result<Option<SocketAddr>> {
        let raw = self.syslog_addr.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        let addr = raw
            .parse()
            .with_context(|| format!("invalid {ENV_PREFIX}SYSLOG_ADDR: {raw}"))?;
        Ok(Some(addr))
    }

    pub fn tls(&self) -> Option<TlsFiles> {
        match (&self.tls_cert, &self.tls_key) {
            (Some(cert), Some(key)) => Some(TlsFiles {
                cert: cert.clone(),
                key: key.clone(),
            }),
            _ => None,
        }
    }

    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy::new(self.mbus_retries, Duration::from_millis(self.mbus_retry_delay_ms))
    }

    pub fn disks(&self) -> DiskPaths {
        DiskPaths {
            ephemeral: self.ephemeral_disk.clone(),
            persistent: self.persistent_disk.clone(),
            ..DiskPaths::default()
        }
    }

    pub fn logger(&self) -> LoggerConfig {
        LoggerConfig {
            format: self.log_format,
            level: self.log_level.clone(),
            ..LoggerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Settings, envy::Error> {
        envy::prefixed(ENV_PREFIX).from_iter(
            vars.iter()
                .map(|(k, v)| (format!("{ENV_PREFIX}{k}"), v.to_string())),
        )
    }

    #[test]
    fn defaults_apply() {
        let s = load(&[("MBUS", "redis://a:b@localhost:6379")]).unwrap();
        assert_eq!(s.tasks_path, PathBuf::from("/var/lib/fleet/tasks.json"));
        assert_eq!(s.heartbeat_interval(), Some(Duration::from_secs(60)));
        assert_eq!(s.syslog_addr().unwrap(), Some("127.0.0.1:33331".parse().unwrap()));
        assert_eq!(s.log_level.as_str(), "info");
        assert_eq!(s.log_format, LoggerFormat::Text);
        assert!(s.tls().is_none());
        assert_eq!(s.retry(), RetryPolicy::default());
        assert_eq!(s.disks(), DiskPaths::default());
    }

    #[test]
    fn mbus_is_required() {
        assert!(load(&[]).is_err());
    }

    #[test]
    fn overrides_are_read() {
        let s = load(&[
            ("MBUS", "https://a:b@0.0.0.0:6868"),
            ("TLS_CERT", "/etc/fleet/cert.pem"),
            ("TLS_KEY", "/etc/fleet/key.pem"),
            ("HEARTBEAT_INTERVAL_SECS", "0"),
            ("MBUS_RETRIES", "3"),
            ("MBUS_RETRY_DELAY_MS", "2000"),
            ("SYSLOG_ADDR", ""),
            ("JOB", "web"),
            ("INDEX", "3"),
            ("EPHEMERAL_DISK", "/var/vcap/data"),
            ("LOG_LEVEL", "debug"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();

        assert_eq!(s.heartbeat_interval(), None);
        assert_eq!(s.retry(), RetryPolicy::new(3, Duration::from_secs(2)));
        assert_eq!(s.syslog_addr().unwrap(), None);
        assert_eq!(s.job.as_deref(), Some("web"));
        assert_eq!(s.index, Some(3));
        assert_eq!(s.disks().ephemeral, Some(PathBuf::from("/var/vcap/data")));
        assert_eq!(s.log_format, LoggerFormat::Json);
        let tls = s.tls().unwrap();
        assert_eq!(tls.key, PathBuf::from("/etc/fleet/key.pem"));
    }

    #[test]
    fn invalid_log_level_is_rejected() {
        assert!(load(&[("MBUS", "redis://a:b@h"), ("LOG_LEVEL", "[[")]).is_err());
    }

    #[test]
    fn bad_syslog_addr_is_reported() {
        let s = load(&[("MBUS", "redis://a:b@h"), ("SYSLOG_ADDR", "nowhere")]).unwrap();
        assert!(s.syslog_addr().is_err());
    }
}
