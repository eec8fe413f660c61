//! Keeps the logstash-forwarder config in sync with the running containers.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::stream::StreamExt;
use log::{error, info, warn};
use tokio::time::sleep;

use crate::config::Config;
use crate::forwarder::{Generator, StorageLayout};
use crate::refresh::RefreshScheduler;
use crate::runtime::ContainerRuntime;

/// Pause before resubscribing after the event stream broke off.
const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(2);

/// Writes the config once, then regenerates it on container lifecycle
/// events until `shutdown` completes.
pub async fn run<S>(runtime: Arc<dyn ContainerRuntime>, cfg: &Config, shutdown: S) -> Result<()>
where
    S: Future<Output = ()>,
{
    let generator = Arc::new(Generator::new(
        Arc::clone(&runtime),
        cfg.logstash_host.clone(),
        cfg.config_file.clone(),
        StorageLayout::new(cfg.docker_root.clone()),
    ));

    generator
        .generate()
        .await
        .context("Initial config generation failed")?;

    let scheduler = RefreshScheduler::new(cfg.laziness(), move || {
        let generator = Arc::clone(&generator);
        async move {
            if let Err(e) = generator.generate().await {
                error!("Config refresh failed: {:#}", e);
            }
        }
    });

    tokio::select! {
        _ = listen_to_events(runtime.as_ref(), &scheduler) => {}
        _ = shutdown => info!("Stopped listening to docker events"),
    }

    if scheduler.is_pending() {
        info!("Dropping pending config refresh");
    }
    scheduler.shutdown();
    Ok(())
}

/// Feeds start, stop and die events to `scheduler`, resubscribing whenever
/// the stream breaks off. Every resubscription schedules a refresh, since
/// events may have been missed while the stream was down.
pub async fn listen_to_events(runtime: &dyn ContainerRuntime, scheduler: &RefreshScheduler) {
    let mut resubscribing = false;
    loop {
        let mut events = runtime.subscribe_events();
        if resubscribing {
            info!("Resubscribed to docker events, resyncing");
            scheduler.notify();
        }
        resubscribing = true;

        while let Some(event) = events.next().await {
            match event {
                Ok(event) if event.triggers_refresh() => {
                    info!(
                        "Received event {} for container {}",
                        event.status,
                        event.short_id()
                    );
                    scheduler.notify();
                }
                Ok(_) => {}
                Err(e) => {
                    error!("{:#}", e);
                    break;
                }
            }
        }

        warn!(
            "Docker event stream ended. Resubscribing in {}s...",
            RESUBSCRIBE_DELAY.as_secs()
        );
        sleep(RESUBSCRIBE_DELAY).await;
    }
}
