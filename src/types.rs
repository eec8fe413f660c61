//! Data structures shared between the runtime, the watcher and the
//! config generator.
//!
//! These are plain snapshots of what the container runtime reported at a
//! given moment.  They are re-fetched on every regeneration cycle and never
//! cached, so nothing here has to be kept in sync with the runtime.

use std::collections::BTreeMap;

/// Event statuses that cause the forwarder config to be regenerated.
pub const REFRESH_STATUSES: [&str; 3] = ["start", "stop", "die"];

/// A lifecycle notification received from the container runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub container_id: String,
    pub status: String,
}

impl LifecycleEvent {
    pub fn new(container_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            status: status.into(),
        }
    }

    /// Whether the set of running containers may have changed.
    pub fn triggers_refresh(&self) -> bool {
        REFRESH_STATUSES.contains(&self.status.as_str())
    }

    pub fn short_id(&self) -> &str {
        short_id(&self.container_id)
    }
}

/// Read-only view of one running container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSnapshot {
    pub id: String,
    /// Name as reported by the runtime, including the leading `/`.
    pub name: String,
    /// Storage driver backing the container's root filesystem.
    pub driver: String,
    pub hostname: String,
    pub image: String,
    /// Volume mounts, keyed by container path, valued by host path.
    pub volumes: BTreeMap<String, String>,
}

impl ContainerSnapshot {
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

/// First twelve characters of a container id, the way `docker ps` shows it.
pub fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}
