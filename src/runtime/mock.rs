//! In-memory [`ContainerRuntime`] used by the tests.

use super::ContainerRuntime;
use crate::types::{ContainerSnapshot, LifecycleEvent};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

/// Calls made against the runtime, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    List,
    Subscribe,
}

#[derive(Default)]
pub struct MockRuntime {
    containers: Mutex<Vec<ContainerSnapshot>>,
    events: Mutex<Option<mpsc::UnboundedReceiver<LifecycleEvent>>>,
    calls: Mutex<Vec<Call>>,
    fail_list: Mutex<bool>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockRuntime {
    pub fn new(containers: Vec<ContainerSnapshot>) -> Self {
        Self {
            containers: Mutex::new(containers),
            ..Default::default()
        }
    }

    /// Returns a sender feeding the first subscription. Later
    /// subscriptions never yield anything.
    pub fn event_sender(&self) -> mpsc::UnboundedSender<LifecycleEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        *lock(&self.events) = Some(rx);
        tx
    }

    pub fn set_containers(&self, containers: Vec<ContainerSnapshot>) {
        *lock(&self.containers) = containers;
    }

    pub fn set_fail_list(&self, fail: bool) {
        *lock(&self.fail_list) = fail;
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    pub fn list_count(&self) -> usize {
        self.calls().iter().filter(|c| **c == Call::List).count()
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn version(&self) -> Result<String> {
        Ok("mock".into())
    }

    async fn list_running_containers(&self) -> Result<Vec<ContainerSnapshot>> {
        lock(&self.calls).push(Call::List);
        if *lock(&self.fail_list) {
            return Err(anyhow!("runtime unavailable"));
        }
        Ok(lock(&self.containers).clone())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerSnapshot> {
        lock(&self.containers)
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| anyhow!("no such container: {}", id))
    }

    fn subscribe_events(&self) -> BoxStream<'static, Result<LifecycleEvent>> {
        lock(&self.calls).push(Call::Subscribe);
        match lock(&self.events).take() {
            Some(rx) => stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|event| (Ok(event), rx))
            })
            .boxed(),
            None => stream::pending().boxed(),
        }
    }
}

/// A running container with no volumes on the given storage driver.
pub fn container(id: &str, driver: &str) -> ContainerSnapshot {
    ContainerSnapshot {
        id: id.into(),
        name: format!("/{}", id),
        driver: driver.into(),
        hostname: format!("{}-host", id),
        image: "busybox:latest".into(),
        volumes: Default::default(),
    }
}
