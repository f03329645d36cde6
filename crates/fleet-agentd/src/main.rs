mod agent;
mod config;

use fleet_observe::init_logger;
use tracing::info;

use crate::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;
    init_logger(&settings.logger())?;
    info!(version = env!("CARGO_PKG_VERSION"), "logger initialized");

    agent::run(settings).await
}
