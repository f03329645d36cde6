use std::{sync::Arc, time::Duration};

use fleet_model::{Heartbeat, Topic};
use fleet_transport::Transport;
use tokio::{
    sync::mpsc,
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::vitals::{DiskPaths, VitalsCollector, collect_vitals};

const PUBLISH_QUEUE: usize = 4;

/// Source of the job state string reported in each heartbeat.
pub trait JobStateProvider: Send + Sync + 'static {
    fn job_state(&self) -> String;
}

/// Reports the same state on every tick.
#[derive(Debug, Clone)]
pub struct FixedJobState(pub String);

impl JobStateProvider for FixedJobState {
    fn job_state(&self) -> String {
        self.0.clone()
    }
}

#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    pub interval: Duration,
    pub job: Option<String>,
    pub index: Option<u32>,
    pub disks: DiskPaths,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            job: None,
            index: None,
            disks: DiskPaths::default(),
        }
    }
}

pub struct HeartbeatGenerator {
    config: HeartbeatConfig,
    collector: Arc<dyn VitalsCollector>,
    job_state: Arc<dyn JobStateProvider>,
    transport: Arc<dyn Transport>,
}

impl HeartbeatGenerator {
    pub fn new(
        config: HeartbeatConfig,
        collector: Arc<dyn VitalsCollector>,
        job_state: Arc<dyn JobStateProvider>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            collector,
            job_state,
            transport,
        }
    }

    /// Sample vitals and assemble one heartbeat.
    pub fn heartbeat(&self) -> Heartbeat {
        Heartbeat {
            job: self.config.job.clone(),
            index: self.config.index,
            job_state: self.job_state.job_state(),
            vitals: collect_vitals(self.collector.as_ref(), &self.config.disks),
        }
    }

    /// Emit a heartbeat now and then once per interval until `shutdown` fires.
    ///
    /// Sampling and publishing run on separate tasks joined by a channel, so a
    /// slow broker never delays the next sample.
    pub async fn run(self, shutdown: CancellationToken) {
        let (tx, mut rx) = mpsc::channel::<Heartbeat>(PUBLISH_QUEUE);

        let transport = Arc::clone(&self.transport);
        let publisher = tokio::spawn(async move {
            while let Some(hb) = rx.recv().await {
                let payload = match serde_json::to_value(&hb) {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(error = %e, "failed to encode heartbeat");
                        continue;
                    }
                };
                if let Err(e) = transport.send_to_health_manager(Topic::Heartbeat, &payload).await {
                    warn!(error = %e, "failed to publish heartbeat");
                }
            }
        });

        info!(interval_secs = self.config.interval.as_secs(), "heartbeat generator started");
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let hb = self.heartbeat();
                    debug!(job_state = %hb.job_state, "heartbeat sampled");
                    if tx.send(hb).await.is_err() {
                        break;
                    }
                }
            }
        }

        drop(tx);
        let _ = publisher.await;
        info!("heartbeat generator stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::{
        path::Path,
        sync::atomic::{AtomicU64, Ordering},
    };

    use fleet_model::{CpuVitals, DiskUsage, MemoryUsage};

    use super::*;
    use crate::{VitalsError, testing::RecordingTransport};

    /// Reports an increasing 1-minute load so each sample is distinguishable.
    #[derive(Default)]
    struct Counting(AtomicU64);

    impl VitalsCollector for Counting {
        fn load(&self) -> Result<[f64; 3], VitalsError> {
            let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
            Ok([n as f64, 0.0, 0.0])
        }
        fn cpu(&self) -> Result<CpuVitals, VitalsError> {
            Ok(CpuVitals::default())
        }
        fn memory(&self) -> Result<MemoryUsage, VitalsError> {
            Ok(MemoryUsage::default())
        }
        fn swap(&self) -> Result<MemoryUsage, VitalsError> {
            Err(VitalsError::Unsupported)
        }
        fn disk(&self, _path: &Path) -> Result<DiskUsage, VitalsError> {
            Ok(DiskUsage::default())
        }
    }

    fn generator(transport: Arc<RecordingTransport>) -> HeartbeatGenerator {
        HeartbeatGenerator::new(
            HeartbeatConfig {
                interval: Duration::from_secs(60),
                job: Some("web".into()),
                index: Some(2),
                disks: DiskPaths::default(),
            },
            Arc::new(Counting::default()),
            Arc::new(FixedJobState("running".into())),
            transport,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn emits_immediately_then_every_interval() {
        let transport = Arc::new(RecordingTransport::default());
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(generator(Arc::clone(&transport)).run(shutdown.clone()));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(transport.sent().len(), 1, "startup heartbeat");

        tokio::time::sleep(Duration::from_secs(120)).await;
        shutdown.cancel();
        handle.await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 3);
        let loads: Vec<f64> = sent
            .iter()
            .map(|(topic, hb)| {
                assert_eq!(*topic, Topic::Heartbeat);
                hb["vitals"]["load"][0].as_f64().unwrap()
            })
            .collect();
        assert_eq!(loads, vec![1.0, 2.0, 3.0]);
    }

    #[tokio::test]
    async fn heartbeat_carries_job_identity() {
        let hb = generator(Arc::new(RecordingTransport::default())).heartbeat();
        assert_eq!(hb.job.as_deref(), Some("web"));
        assert_eq!(hb.index, Some(2));
        assert_eq!(hb.job_state, "running");
        assert_eq!(hb.vitals.swap, MemoryUsage::default());
    }
}
