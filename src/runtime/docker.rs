use super::ContainerRuntime;
use crate::types::{ContainerSnapshot, LifecycleEvent};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bollard::container::{InspectContainerOptions, ListContainersOptions};
use bollard::models::ContainerInspectResponse;
use bollard::system::EventsOptions;
use bollard::{Docker, API_DEFAULT_VERSION};
use futures_util::stream::{BoxStream, StreamExt};
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};

/// Seconds before a request to the Docker daemon is abandoned.
const CLIENT_TIMEOUT: u64 = 120;

pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect to the Docker daemon at `endpoint`.
    ///
    /// `unix://` endpoints use the local socket, anything else (`tcp://`,
    /// `http://`) is treated as a plain HTTP address.
    pub fn connect(endpoint: &str) -> Result<Self> {
        let docker = match endpoint.strip_prefix("unix://") {
            Some(socket) => Docker::connect_with_unix(socket, CLIENT_TIMEOUT, API_DEFAULT_VERSION),
            None => Docker::connect_with_http(endpoint, CLIENT_TIMEOUT, API_DEFAULT_VERSION),
        }
        .with_context(|| format!("Unable to connect to docker at {}", endpoint))?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn version(&self) -> Result<String> {
        let version = self.docker.version().await?;
        Ok(version.version.unwrap_or_else(|| "unknown".into()))
    }

    async fn list_running_containers(&self) -> Result<Vec<ContainerSnapshot>> {
        let opts = ListContainersOptions::<String> {
            all: false,
            ..Default::default()
        };
        let containers = self
            .docker
            .list_containers(Some(opts))
            .await
            .context("Unable to list running containers")?;

        let mut snapshots = Vec::with_capacity(containers.len());
        for c in containers {
            let Some(id) = c.id else { continue };
            // A container may die between listing and inspecting it; the
            // next die event triggers another refresh anyway.
            match self.inspect_container(&id).await {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => warn!("Failed to inspect container {}: {}", id, e),
            }
        }
        debug!("Found {} running containers", snapshots.len());
        Ok(snapshots)
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerSnapshot> {
        let detail = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await?;
        snapshot_from_inspect(detail)
    }

    fn subscribe_events(&self) -> BoxStream<'static, Result<LifecycleEvent>> {
        let filters: HashMap<String, Vec<String>> =
            HashMap::from([("type".to_string(), vec!["container".to_string()])]);
        let opts = EventsOptions::<String> {
            filters,
            ..Default::default()
        };

        info!("Listening to docker events...");
        self.docker
            .events(Some(opts))
            .filter_map(|msg| async move {
                match msg {
                    Ok(event) => match (event.actor.and_then(|actor| actor.id), event.action) {
                        (Some(id), Some(status)) => Some(Ok(LifecycleEvent::new(id, status))),
                        _ => None,
                    },
                    Err(e) => Some(Err(anyhow!("Error in docker event stream: {}", e))),
                }
            })
            .boxed()
    }
}

fn snapshot_from_inspect(detail: ContainerInspectResponse) -> Result<ContainerSnapshot> {
    let id = detail
        .id
        .ok_or_else(|| anyhow!("Inspect response is missing the container id"))?;
    let (hostname, image) = detail
        .config
        .map(|c| (c.hostname.unwrap_or_default(), c.image.unwrap_or_default()))
        .unwrap_or_default();

    let volumes: BTreeMap<String, String> = detail
        .mounts
        .unwrap_or_default()
        .into_iter()
        .filter_map(|m| match (m.destination, m.source) {
            (Some(dst), Some(src)) if !dst.is_empty() && !src.is_empty() => Some((dst, src)),
            _ => None,
        })
        .collect();

    Ok(ContainerSnapshot {
        id,
        name: detail.name.unwrap_or_default(),
        driver: detail.driver.unwrap_or_default(),
        hostname,
        image,
        volumes,
    })
}
