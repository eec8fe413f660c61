//! Generation of the logstash-forwarder config from the running containers.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use crate::runtime::ContainerRuntime;

pub mod container;
pub mod model;
pub mod paths;

pub use container::merge_container;
pub use model::LogstashForwarderConfig;
pub use paths::StorageLayout;

/// Rebuilds the config file from scratch on every call.
pub struct Generator {
    runtime: Arc<dyn ContainerRuntime>,
    logstash_endpoint: String,
    config_file: PathBuf,
    layout: StorageLayout,
}

impl Generator {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        logstash_endpoint: impl Into<String>,
        config_file: impl Into<PathBuf>,
        layout: StorageLayout,
    ) -> Self {
        Self {
            runtime,
            logstash_endpoint: logstash_endpoint.into(),
            config_file: config_file.into(),
            layout,
        }
    }

    /// The config for the containers running right now.
    pub async fn build(&self) -> Result<LogstashForwarderConfig> {
        let mut config = LogstashForwarderConfig::from_default(&self.logstash_endpoint);
        let containers = self
            .runtime
            .list_running_containers()
            .await
            .context("Unable to enumerate running containers")?;

        for container in &containers {
            merge_container(container, &mut config, &self.layout).await;
        }
        Ok(config)
    }

    pub async fn generate(&self) -> Result<()> {
        info!("Generating logstash-forwarder config");
        let config = self.build().await?;
        config.write_to(&self.config_file).await.with_context(|| {
            format!(
                "Unable to write logstash-forwarder config to {}",
                self.config_file.display()
            )
        })?;
        info!(
            "Wrote logstash-forwarder config with {} file sections to {}",
            config.files.len(),
            self.config_file.display()
        );
        Ok(())
    }
}
