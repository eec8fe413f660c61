//! Per-container contribution to the aggregate config.

use log::{info, warn};

use super::model::{ConfigError, LogstashForwarderConfig};
use super::paths::StorageLayout;
use crate::types::ContainerSnapshot;

/// Where a container may describe its own log files.
pub const OVERRIDE_PATH: &str = "/etc/logstash-forwarder.conf";

/// Outcome of looking for a container's override config.
#[derive(Debug)]
pub enum ContainerOverride {
    /// Override found, paths already rewritten to host paths.
    Found(LogstashForwarderConfig),
    NotFound,
    /// The file exists but could not be read or decoded.
    Malformed(ConfigError),
}

pub async fn lookup_override(
    container: &ContainerSnapshot,
    layout: &StorageLayout,
) -> ContainerOverride {
    let conf_path = layout.host_path(container, OVERRIDE_PATH);
    info!("Checking for logstash-forwarder config in {}", conf_path);

    let mut config = match LogstashForwarderConfig::from_file(&conf_path).await {
        Ok(config) => config,
        Err(ConfigError::NotFound { .. }) => return ContainerOverride::NotFound,
        Err(e) => return ContainerOverride::Malformed(e),
    };

    for file in &mut config.files {
        for path in &mut file.paths {
            *path = layout.host_path(container, path);
        }
    }
    ContainerOverride::Found(config)
}

/// Adds the files of `container` to `aggregate`.
///
/// A container shipping its own config contributes its file sections;
/// otherwise its json log file is added.
pub async fn merge_container(
    container: &ContainerSnapshot,
    aggregate: &mut LogstashForwarderConfig,
    layout: &StorageLayout,
) {
    match lookup_override(container, layout).await {
        ContainerOverride::Found(config) => {
            info!("Found logstash-forwarder config in {}", container.short_id());
            for file in &config.files {
                info!(
                    "Adding files {:?} of type {}",
                    file.paths,
                    file.fields.get("type").map(String::as_str).unwrap_or("")
                );
            }
            aggregate.files.extend(config.files);
        }
        ContainerOverride::NotFound => {
            info!("No logstash-forwarder config found in {}", container.short_id());
            aggregate.add_container_log_file(container, layout);
        }
        ContainerOverride::Malformed(e) => {
            warn!(
                "Ignoring logstash-forwarder config of {}: {}",
                container.short_id(),
                e
            );
            aggregate.add_container_log_file(container, layout);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn container(id: &str, volumes: &[(&str, &str)]) -> ContainerSnapshot {
        ContainerSnapshot {
            id: id.into(),
            name: format!("/{}", id),
            driver: "aufs".into(),
            hostname: "host".into(),
            image: "app:1".into(),
            volumes: volumes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn write_override(root: &Path, id: &str, content: &str) {
        let etc = root.join("aufs/mnt").join(id).join("etc");
        std::fs::create_dir_all(&etc).unwrap();
        std::fs::write(etc.join("logstash-forwarder.conf"), content).unwrap();
    }

    #[tokio::test]
    async fn test_default_entry_without_override() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path().to_string_lossy());
        let mut aggregate = LogstashForwarderConfig::from_default("logstash:5043");

        merge_container(&container("abc123", &[]), &mut aggregate, &layout).await;

        assert_eq!(aggregate.files.len(), 1);
        assert_eq!(
            aggregate.files[0].paths,
            vec![layout.json_log_path("abc123")]
        );
        assert_eq!(aggregate.files[0].fields["docker.id"], "abc123");
    }

    #[tokio::test]
    async fn test_override_paths_are_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_string_lossy().into_owned();
        let layout = StorageLayout::new(root.clone());
        write_override(
            dir.path(),
            "abc123",
            r#"{
                "files": [
                    {"paths": ["/var/log/app/*.log"], "fields": {"type": "app"}},
                    {"paths": ["/data/access.log", "/data/error.log"], "fields": {"type": "nginx"}}
                ]
            }"#,
        );
        let c = container("abc123", &[("/data", "/host/data")]);
        let mut aggregate = LogstashForwarderConfig::from_default("logstash:5043");

        merge_container(&c, &mut aggregate, &layout).await;

        assert_eq!(aggregate.files.len(), 2);
        assert_eq!(
            aggregate.files[0].paths,
            vec![format!("{}/aufs/mnt/abc123/var/log/app/*.log", root)]
        );
        assert_eq!(aggregate.files[0].fields["type"], "app");
        assert_eq!(
            aggregate.files[1].paths,
            vec![
                "/host/data/access.log".to_string(),
                "/host/data/error.log".to_string()
            ]
        );
        // Network of the override never leaks into the aggregate.
        assert_eq!(aggregate.network.servers, vec!["logstash:5043".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_override_contributes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path().to_string_lossy());
        write_override(dir.path(), "abc123", r#"{"files": []}"#);
        let mut aggregate = LogstashForwarderConfig::from_default("logstash:5043");

        merge_container(&container("abc123", &[]), &mut aggregate, &layout).await;
        assert!(aggregate.files.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_override_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path().to_string_lossy());
        write_override(dir.path(), "abc123", "{ this is not json");
        let c = container("abc123", &[]);

        assert!(matches!(
            lookup_override(&c, &layout).await,
            ContainerOverride::Malformed(ConfigError::Parse { .. })
        ));

        let mut aggregate = LogstashForwarderConfig::from_default("logstash:5043");
        merge_container(&c, &mut aggregate, &layout).await;
        assert_eq!(aggregate.files.len(), 1);
        assert_eq!(aggregate.files[0].paths, vec![layout.json_log_path("abc123")]);
    }

    #[tokio::test]
    async fn test_lookup_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path().to_string_lossy());
        assert!(matches!(
            lookup_override(&container("abc123", &[]), &layout).await,
            ContainerOverride::NotFound
        ));
    }

    #[tokio::test]
    async fn test_override_found_through_volume() {
        let dir = tempfile::tempdir().unwrap();
        let etc = dir.path().join("host-etc");
        std::fs::create_dir_all(&etc).unwrap();
        std::fs::write(
            etc.join("logstash-forwarder.conf"),
            r#"{"files": [{"paths": ["/srv/app.log"], "fields": {"type": "app"}}]}"#,
        )
        .unwrap();

        let layout = StorageLayout::new("/nonexistent-docker-root");
        let host_etc = etc.to_string_lossy().into_owned();
        let c = container("abc123", &[("/etc", host_etc.as_str())]);

        match lookup_override(&c, &layout).await {
            ContainerOverride::Found(config) => {
                assert_eq!(
                    config.files[0].paths,
                    vec!["/nonexistent-docker-root/aufs/mnt/abc123/srv/app.log".to_string()]
                );
            }
            other => panic!("expected override, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreadable_override_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path().to_string_lossy());
        // A directory where the config file should be cannot be read.
        let conf = dir.path().join("aufs/mnt/abc123/etc/logstash-forwarder.conf");
        std::fs::create_dir_all(&conf).unwrap();
        let c = container("abc123", &[]);

        assert!(matches!(
            lookup_override(&c, &layout).await,
            ContainerOverride::Malformed(ConfigError::Io { .. })
        ));

        let mut aggregate = LogstashForwarderConfig::from_default("logstash:5043");
        merge_container(&c, &mut aggregate, &layout).await;
        assert_eq!(aggregate.files.len(), 1);
        assert_eq!(aggregate.files[0].paths, vec![layout.json_log_path("abc123")]);
    }

    #[tokio::test]
    async fn test_override_with_null_fields_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_string_lossy().into_owned();
        let layout = StorageLayout::new(root.clone());
        write_override(
            dir.path(),
            "abc123",
            r#"{"files": [{"paths": ["/var/log/app.log"], "fields": null}]}"#,
        );
        let mut aggregate = LogstashForwarderConfig::from_default("logstash:5043");

        merge_container(&container("abc123", &[]), &mut aggregate, &layout).await;

        assert_eq!(aggregate.files.len(), 1);
        assert_eq!(
            aggregate.files[0].paths,
            vec![format!("{}/aufs/mnt/abc123/var/log/app.log", root)]
        );
        assert!(aggregate.files[0].fields.is_empty());
    }
}
