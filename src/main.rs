//! docker-logstash-forwarder daemon entry point.

use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use tokio::signal;

mod cli;
mod config;
mod forwarder;
mod refresh;
mod runtime;
mod types;
mod watcher;

use cli::Args;
use config::Config;
use runtime::{ContainerRuntime, DockerRuntime};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting up");

    // Load configuration
    let cfg = Config::load(&Args::parse())?;
    info!("Starting with config: {:?}", cfg);

    // Container Runtime (Docker)
    let runtime = DockerRuntime::connect(&cfg.docker_host)?;
    let version = runtime.version().await.map_err(|e| {
        anyhow::anyhow!("Unable to retrieve version information from docker: {}", e)
    })?;
    info!("Connected to docker at {} (v{})", cfg.docker_host, version);
    let runtime: Arc<dyn ContainerRuntime> = Arc::new(runtime);

    // Graceful Shutdown
    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down..."),
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }
    };

    watcher::run(runtime, &cfg, shutdown).await?;

    info!("done");
    Ok(())
}
