use std::{fs, path::Path, sync::OnceLock, time::Instant};

use tracing::{debug, warn};

static START_TIME: OnceLock<Instant> = OnceLock::new();

/// Mark the agent start time.
pub fn init_uptime() {
    START_TIME.get_or_init(Instant::now);
}

/// Agent uptime in seconds.
pub fn uptime_seconds() -> u64 {
    let start = START_TIME.get_or_init(Instant::now);
    start.elapsed().as_secs()
}

/// OS family.
#[inline]
pub fn platform() -> &'static str {
    std::env::consts::OS
}

#[inline]
pub fn arch() -> &'static str {
    std::env::consts::ARCH
}

pub fn hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// OS distribution name from `/etc/os-release`, or the platform name.
pub fn os_info() -> String {
    if cfg!(target_os = "linux")
        && let Some(name) = fs::read_to_string("/etc/os-release")
            .ok()
            .as_deref()
            .and_then(pretty_name)
    {
        return name;
    }
    platform().to_string()
}

fn pretty_name(os_release: &str) -> Option<String> {
    os_release.lines().find_map(|line| {
        line.strip_prefix("PRETTY_NAME=")
            .map(|name| name.trim_matches('"').to_string())
    })
}

/// Agent identity: the configured id, else the id persisted at `id_path`, else a new UUID
/// which is persisted for the next start (best effort).
pub fn resolve_agent_id(configured: Option<&str>, id_path: &Path) -> String {
    if let Some(id) = configured.map(str::trim).filter(|id| !id.is_empty()) {
        return id.to_string();
    }

    if let Ok(id) = fs::read_to_string(id_path) {
        let id = id.trim();
        if !id.is_empty() {
            debug!(path = %id_path.display(), "agent id loaded");
            return id.to_string();
        }
    }

    let id = uuid::Uuid::new_v4().to_string();
    if let Some(parent) = id_path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if let Err(e) = fs::write(id_path, &id) {
        warn!(path = %id_path.display(), error = %e, "agent id not persisted");
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_id_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent-id");
        std::fs::write(&path, "from-file").unwrap();

        assert_eq!(resolve_agent_id(Some("configured"), &path), "configured");
    }

    #[test]
    fn generated_id_is_persisted_and_reused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("agent-id");

        let first = resolve_agent_id(None, &path);
        let second = resolve_agent_id(Some("  "), &path);
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn reads_pretty_name() {
        let release = "NAME=\"Ubuntu\"\nPRETTY_NAME=\"Ubuntu 24.04 LTS\"\nID=ubuntu\n";
        assert_eq!(pretty_name(release).as_deref(), Some("Ubuntu 24.04 LTS"));
        assert_eq!(pretty_name("ID=alpine\n"), None);
    }

    #[test]
    fn platform_is_known() {
        assert!(!platform().is_empty());
        assert!(!arch().is_empty());
    }
}
