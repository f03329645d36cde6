use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use fleet_model::{CpuVitals, DiskUsage, MemoryUsage};

use crate::{error::VitalsError, vitals::VitalsCollector};

/// Reads vitals from procfs and `statvfs`.
pub struct LinuxVitalsCollector {
    proc_root: PathBuf,
    prev_cpu: Mutex<CpuTimes>,
}

/// Cumulative jiffies from the aggregate `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct CpuTimes {
    user: u64,
    nice: u64,
    system: u64,
    idle: u64,
    iowait: u64,
    rest: u64,
}

impl CpuTimes {
    fn total(&self) -> u64 {
        self.user + self.nice + self.system + self.idle + self.iowait + self.rest
    }
}

impl Default for LinuxVitalsCollector {
    fn default() -> Self {
        Self::with_proc_root("/proc")
    }
}

impl LinuxVitalsCollector {
    pub fn with_proc_root(root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: root.into(),
            prev_cpu: Mutex::new(CpuTimes::default()),
        }
    }

    fn read(&self, name: &str) -> Result<(PathBuf, String), VitalsError> {
        let path = self.proc_root.join(name);
        let text = fs::read_to_string(&path).map_err(|source| VitalsError::Read {
            path: path.clone(),
            source,
        })?;
        Ok((path, text))
    }
}

impl VitalsCollector for LinuxVitalsCollector {
    fn load(&self) -> Result<[f64; 3], VitalsError> {
        let (path, text) = self.read("loadavg")?;
        parse_loadavg(&text).ok_or_else(|| parse_error(path, "expected three load averages"))
    }

    fn cpu(&self) -> Result<CpuVitals, VitalsError> {
        let (path, text) = self.read("stat")?;
        let current = parse_cpu_times(&text).ok_or_else(|| parse_error(path, "missing aggregate cpu line"))?;

        let mut prev = self.prev_cpu.lock().unwrap_or_else(|p| p.into_inner());
        let split = cpu_split(&prev, &current);
        *prev = current;
        Ok(split)
    }

    fn memory(&self) -> Result<MemoryUsage, VitalsError> {
        let (path, text) = self.read("meminfo")?;
        let info = MemInfo::parse(&text);
        let total = info.mem_total.ok_or_else(|| parse_error(path, "missing MemTotal"))?;
        let available = info
            .mem_available
            .unwrap_or_else(|| info.mem_free.unwrap_or(0) + info.buffers.unwrap_or(0) + info.cached.unwrap_or(0));
        Ok(usage(total, total.saturating_sub(available)))
    }

    fn swap(&self) -> Result<MemoryUsage, VitalsError> {
        let (path, text) = self.read("meminfo")?;
        let info = MemInfo::parse(&text);
        let total = info.swap_total.ok_or_else(|| parse_error(path, "missing SwapTotal"))?;
        let free = info.swap_free.unwrap_or(total);
        Ok(usage(total, total.saturating_sub(free)))
    }

    fn disk(&self, path: &Path) -> Result<DiskUsage, VitalsError> {
        statvfs_usage(path)
    }
}

fn parse_error(path: PathBuf, reason: &str) -> VitalsError {
    VitalsError::Parse {
        path,
        reason: reason.to_string(),
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 * 100.0 / whole as f64
}

fn usage(total_kb: u64, used_kb: u64) -> MemoryUsage {
    MemoryUsage {
        percent: percent(used_kb, total_kb),
        kb: used_kb,
    }
}

pub(crate) fn parse_loadavg(text: &str) -> Option<[f64; 3]> {
    let mut it = text.split_whitespace().map(str::parse::<f64>);
    Some([it.next()?.ok()?, it.next()?.ok()?, it.next()?.ok()?])
}

pub(crate) fn parse_cpu_times(text: &str) -> Option<CpuTimes> {
    let line = text.lines().find(|l| l.split_whitespace().next() == Some("cpu"))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    if fields.len() < 5 {
        return None;
    }
    Some(CpuTimes {
        user: fields[0],
        nice: fields[1],
        system: fields[2],
        idle: fields[3],
        iowait: fields[4],
        // guest time is already counted in user
        rest: fields.iter().skip(5).take(3).sum(),
    })
}

pub(crate) fn cpu_split(prev: &CpuTimes, cur: &CpuTimes) -> CpuVitals {
    let total = cur.total().saturating_sub(prev.total());
    let delta = |a: u64, b: u64| a.saturating_sub(b);
    CpuVitals {
        user: percent(delta(cur.user + cur.nice, prev.user + prev.nice), total),
        sys: percent(delta(cur.system, prev.system), total),
        wait: percent(delta(cur.iowait, prev.iowait), total),
    }
}

#[derive(Debug, Default)]
pub(crate) struct MemInfo {
    mem_total: Option<u64>,
    mem_free: Option<u64>,
    mem_available: Option<u64>,
    buffers: Option<u64>,
    cached: Option<u64>,
    swap_total: Option<u64>,
    swap_free: Option<u64>,
}

impl MemInfo {
    /// Values are in kB, as `/proc/meminfo` reports them.
    pub(crate) fn parse(text: &str) -> Self {
        let mut info = MemInfo::default();
        for line in text.lines() {
            let Some((key, rest)) = line.split_once(':') else {
                continue;
            };
            let Some(value) = rest.split_whitespace().next().and_then(|v| v.parse().ok()) else {
                continue;
            };
            let slot = match key.trim() {
                "MemTotal" => &mut info.mem_total,
                "MemFree" => &mut info.mem_free,
                "MemAvailable" => &mut info.mem_available,
                "Buffers" => &mut info.buffers,
                "Cached" => &mut info.cached,
                "SwapTotal" => &mut info.swap_total,
                "SwapFree" => &mut info.swap_free,
                _ => continue,
            };
            *slot = Some(value);
        }
        info
    }
}

#[cfg(unix)]
fn statvfs_usage(path: &Path) -> Result<DiskUsage, VitalsError> {
    use std::{ffi::CString, io, os::unix::ffi::OsStrExt};

    let statvfs_err = |source: io::Error| VitalsError::Statvfs {
        path: path.to_path_buf(),
        source,
    };
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| statvfs_err(io::Error::new(io::ErrorKind::InvalidInput, e)))?;

    // SAFETY: statvfs is plain old data, all-zero is a valid value.
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    // SAFETY: `c_path` is NUL-terminated and `stat` is writable for the duration of the call.
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(statvfs_err(io::Error::last_os_error()));
    }

    let blocks = stat.f_blocks as u64;
    let files = stat.f_files as u64;
    Ok(DiskUsage {
        percent: percent(blocks.saturating_sub(stat.f_bfree as u64), blocks),
        inode_percent: percent(files.saturating_sub(stat.f_ffree as u64), files),
    })
}

#[cfg(not(unix))]
fn statvfs_usage(_path: &Path) -> Result<DiskUsage, VitalsError> {
    Err(VitalsError::Unsupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMINFO: &str = "\
MemTotal:        8000000 kB
MemFree:         1000000 kB
MemAvailable:    6000000 kB
Buffers:          100000 kB
Cached:          2000000 kB
SwapTotal:       2000000 kB
SwapFree:        1500000 kB
";

    #[test]
    fn parses_loadavg() {
        assert_eq!(parse_loadavg("0.52 0.58 0.59 1/467 12345\n"), Some([0.52, 0.58, 0.59]));
        assert_eq!(parse_loadavg("0.52 nope"), None);
    }

    #[test]
    fn cpu_split_uses_deltas() {
        let prev = parse_cpu_times("cpu  100 0 50 800 50 0 0 0 0 0\ncpu0 1 1 1 1 1\n").unwrap();
        let cur = parse_cpu_times("cpu  130 10 60 880 70 0 0 0 0 0\n").unwrap();
        let split = cpu_split(&prev, &cur);
        let total = (cur.total() - prev.total()) as f64;
        assert!((split.user - 40.0 * 100.0 / total).abs() < 1e-9);
        assert!((split.sys - 10.0 * 100.0 / total).abs() < 1e-9);
        assert!((split.wait - 20.0 * 100.0 / total).abs() < 1e-9);
    }

    #[test]
    fn identical_samples_yield_zero() {
        let t = parse_cpu_times("cpu 1 2 3 4 5\n").unwrap();
        assert_eq!(cpu_split(&t, &t), CpuVitals::default());
    }

    #[test]
    fn rejects_stat_without_cpu_line() {
        assert!(parse_cpu_times("intr 1 2 3\n").is_none());
        assert!(parse_cpu_times("cpu 1 2\n").is_none());
    }

    #[test]
    fn memory_and_swap_from_meminfo() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("meminfo"), MEMINFO).unwrap();
        let c = LinuxVitalsCollector::with_proc_root(dir.path());

        let mem = c.memory().unwrap();
        assert_eq!(mem.kb, 2_000_000);
        assert!((mem.percent - 25.0).abs() < 1e-9);

        let swap = c.swap().unwrap();
        assert_eq!(swap.kb, 500_000);
        assert!((swap.percent - 25.0).abs() < 1e-9);
    }

    #[test]
    fn missing_proc_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let c = LinuxVitalsCollector::with_proc_root(dir.path());
        assert!(matches!(c.load(), Err(VitalsError::Read { .. })));
    }

    #[test]
    fn cpu_remembers_previous_sample() {
        let dir = tempfile::tempdir().unwrap();
        let c = LinuxVitalsCollector::with_proc_root(dir.path());

        fs::write(dir.path().join("stat"), "cpu 100 0 100 800 0\n").unwrap();
        c.cpu().unwrap();
        fs::write(dir.path().join("stat"), "cpu 150 0 100 850 0\n").unwrap();
        let split = c.cpu().unwrap();
        assert!((split.user - 50.0).abs() < 1e-9);
        assert_eq!(split.sys, 0.0);
    }

    #[cfg(unix)]
    #[test]
    fn statvfs_on_root() {
        let usage = LinuxVitalsCollector::default().disk(Path::new("/")).unwrap();
        assert!((0.0..=100.0).contains(&usage.percent));
    }
}
