//! Maps paths inside a container to paths on the host.
//!
//! logstash-forwarder runs outside of every container, so each path it is
//! told to watch has to be expressed relative to the host filesystem. Volume
//! mounts are honoured first; everything else lives in the storage driver's
//! copy of the container's root filesystem under the docker root.

use std::path::Path;

use crate::types::ContainerSnapshot;

pub const DEFAULT_DOCKER_ROOT: &str = "/var/lib/docker";

/// Where the docker daemon keeps its state on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    root: String,
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self::new(DEFAULT_DOCKER_ROOT)
    }
}

impl StorageLayout {
    pub fn new(root: impl Into<String>) -> Self {
        let root: String = root.into();
        let trimmed = root.trim_end_matches('/');
        Self {
            root: if trimmed.is_empty() { root } else { trimmed.to_string() },
        }
    }

    /// Host path of `path` as seen from inside `container`.
    pub fn host_path(&self, container: &ContainerSnapshot, path: &str) -> String {
        if let Some(host) = volume_host_path(container, path) {
            return host;
        }

        let root = self.root_fs(container);
        if path.starts_with('/') {
            format!("{}{}", root, path)
        } else {
            format!("{}/{}", root, path)
        }
    }

    /// The json-file log driver's output for the container with `id`.
    pub fn json_log_path(&self, id: &str) -> String {
        format!("{}/containers/{}/{}-json.log", self.root, id, id)
    }

    /// Host directory holding the container's root filesystem.
    fn root_fs(&self, container: &ContainerSnapshot) -> String {
        let id = &container.id;
        match container.driver.as_str() {
            "aufs" => format!("{}/aufs/mnt/{}", self.root, id),
            "devicemapper" => format!("{}/devicemapper/mnt/{}/rootfs", self.root, id),
            _ => format!("{}/btrfs/subvolumes/{}", self.root, id),
        }
    }
}

/// Rewrites `path` through the most specific volume mount containing it.
fn volume_host_path(container: &ContainerSnapshot, path: &str) -> Option<String> {
    let path = Path::new(path);
    container
        .volumes
        .iter()
        .filter_map(|(dst, src)| {
            let rest = path.strip_prefix(dst).ok()?;
            Some((Path::new(dst).components().count(), src, rest))
        })
        .max_by_key(|(depth, _, _)| *depth)
        .map(|(_, src, rest)| {
            if rest.as_os_str().is_empty() {
                src.clone()
            } else {
                Path::new(src).join(rest).to_string_lossy().into_owned()
            }
        })
}
