use crate::types::{ContainerSnapshot, LifecycleEvent};
use anyhow::Result;
use async_trait::async_trait;
use futures_util::stream::BoxStream;

pub mod docker;
pub use docker::DockerRuntime;

#[cfg(test)]
pub mod mock;

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Version string reported by the runtime daemon.
    async fn version(&self) -> Result<String>;

    /// Snapshot every container that is currently running.
    async fn list_running_containers(&self) -> Result<Vec<ContainerSnapshot>>;

    async fn inspect_container(&self, id: &str) -> Result<ContainerSnapshot>;

    /// Subscribe to container lifecycle events.
    /// Dropping the returned stream ends the subscription.
    fn subscribe_events(&self) -> BoxStream<'static, Result<LifecycleEvent>>;
}
