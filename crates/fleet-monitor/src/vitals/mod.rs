//! Host vitals sampling.
//!
//! A [`VitalsCollector`] reads one subsystem per call; [`collect_vitals`] assembles
//! a full [`Vitals`] snapshot and degrades any subsystem that fails to its zero value.

mod linux;
pub use linux::LinuxVitalsCollector;

use std::path::{Path, PathBuf};

use fleet_model::{CpuVitals, DiskUsage, DiskVitals, MemoryUsage, Vitals};
use tracing::warn;

use crate::error::VitalsError;

pub trait VitalsCollector: Send + Sync + 'static {
    /// 1, 5 and 15 minute load averages.
    fn load(&self) -> Result<[f64; 3], VitalsError>;

    /// CPU split since the previous call.
    fn cpu(&self) -> Result<CpuVitals, VitalsError>;

    fn memory(&self) -> Result<MemoryUsage, VitalsError>;

    fn swap(&self) -> Result<MemoryUsage, VitalsError>;

    fn disk(&self, path: &Path) -> Result<DiskUsage, VitalsError>;
}

/// Mount points reported in the heartbeat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskPaths {
    pub system: PathBuf,
    pub ephemeral: Option<PathBuf>,
    pub persistent: Option<PathBuf>,
}

impl Default for DiskPaths {
    fn default() -> Self {
        Self {
            system: PathBuf::from("/"),
            ephemeral: None,
            persistent: None,
        }
    }
}

pub fn collect_vitals(collector: &dyn VitalsCollector, disks: &DiskPaths) -> Vitals {
    Vitals {
        load: degrade("load", collector.load()),
        cpu: degrade("cpu", collector.cpu()),
        mem: degrade("memory", collector.memory()),
        swap: degrade("swap", collector.swap()),
        disk: DiskVitals {
            system: degrade("system disk", collector.disk(&disks.system)),
            ephemeral: disks
                .ephemeral
                .as_deref()
                .map(|p| degrade("ephemeral disk", collector.disk(p))),
            persistent: disks
                .persistent
                .as_deref()
                .map(|p| degrade("persistent disk", collector.disk(p))),
        },
    }
}

fn degrade<T: Default>(what: &'static str, res: Result<T, VitalsError>) -> T {
    res.unwrap_or_else(|e| {
        warn!(vital = what, error = %e, "vitals unavailable, reporting zero");
        T::default()
    })
}
