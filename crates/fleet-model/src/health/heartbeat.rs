use serde::{Deserialize, Serialize};

/// Liveness snapshot sent to the health manager on every tick.
///
/// Built fresh each time and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub job: Option<String>,
    pub index: Option<u32>,
    pub job_state: String,
    pub vitals: Vitals,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    /// 1, 5 and 15 minute load averages.
    pub load: [f64; 3],
    pub cpu: CpuVitals,
    pub mem: MemoryUsage,
    pub swap: MemoryUsage,
    pub disk: DiskVitals,
}

/// CPU time split in percent since the previous sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuVitals {
    pub user: f64,
    pub sys: f64,
    pub wait: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub percent: f64,
    pub kb: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskUsage {
    pub percent: f64,
    pub inode_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskVitals {
    pub system: DiskUsage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ephemeral: Option<DiskUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent: Option<DiskUsage>,
}
