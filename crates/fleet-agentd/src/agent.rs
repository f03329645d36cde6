use std::sync::Arc;

use anyhow::Context;
use fleet_core::{ActionFactory, Dispatcher, FileTaskManager, TaskService, init_uptime, resolve_agent_id};
use fleet_monitor::{
    AlertSender, FixedJobState, HeartbeatConfig, HeartbeatGenerator, LinuxVitalsCollector, MonitAlertBuilder,
    SyslogListener,
};
use fleet_transport::{BusUrl, DispatchHandler, DispatcherAdapter, Transport, build_transport};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Settings;

const DEFAULT_JOB_STATE: &str = "running";

/// Wire every component together and serve until the transport fails or the
/// process is asked to stop.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    init_uptime();

    let url = BusUrl::parse(&settings.mbus).context("invalid FLEET_AGENT_MBUS")?;
    let agent_id = resolve_agent_id(settings.agent_id.as_deref(), &settings.agent_id_path);
    info!(agent_id = %agent_id, transport = ?url.kind(), "starting agent");

    // 1) Dispatch
    let factory = ActionFactory::with_builtins(agent_id.clone());
    let tasks = TaskService::new().context("failed to start task registry")?;
    let manager = Arc::new(FileTaskManager::new(&settings.tasks_path).context("failed to start task manager")?);
    let dispatcher = Arc::new(Dispatcher::new(factory, tasks, manager));

    match dispatcher.resume_previous_tasks().await {
        Ok(0) => {}
        Ok(n) => info!(count = n, "resumed previous tasks"),
        Err(e) => warn!(error = %e, "could not resume previous tasks"),
    }

    // 2) Transport
    let transport = build_transport(url, &agent_id, settings.tls(), settings.retry()).context("failed to configure transport")?;

    // 3) Health reporting
    let shutdown = CancellationToken::new();
    let mut background: Vec<JoinHandle<()>> = Vec::new();

    if let Some(interval) = settings.heartbeat_interval() {
        let generator = HeartbeatGenerator::new(
            HeartbeatConfig {
                interval,
                job: settings.job.clone(),
                index: settings.index,
                disks: settings.disks(),
            },
            Arc::new(LinuxVitalsCollector::default()),
            Arc::new(FixedJobState(DEFAULT_JOB_STATE.to_string())),
            Arc::clone(&transport),
        );
        background.push(tokio::spawn(generator.run(shutdown.clone())));
    } else {
        info!("heartbeats disabled");
    }

    if let Some(addr) = settings.syslog_addr()? {
        let alerts = Arc::new(
            AlertSender::new(Arc::clone(&transport), Arc::new(MonitAlertBuilder))
                .context("failed to build alert sender")?,
        );
        match SyslogListener::bind(addr).await {
            Ok(listener) => background.push(tokio::spawn(listener.run(alerts, shutdown.clone()))),
            Err(e) => warn!(%addr, error = %e, "syslog listener disabled"),
        }
    }

    // 4) Serve
    let handler: Arc<dyn DispatchHandler> = Arc::new(DispatcherAdapter::new(dispatcher));
    let result = serve(transport.as_ref(), handler).await;

    shutdown.cancel();
    for handle in background {
        let _ = handle.await;
    }
    info!("agent stopped");
    result
}

async fn serve(transport: &dyn Transport, handler: Arc<dyn DispatchHandler>) -> anyhow::Result<()> {
    tokio::select! {
        res = transport.start(handler) => res.context("transport failed"),
        sig = tokio::signal::ctrl_c() => {
            sig.context("failed to listen for ctrl-c")?;
            info!("shutdown requested");
            transport.stop();
            Ok(())
        }
    }
}
