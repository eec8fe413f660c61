//! The logstash-forwarder configuration file.
//!
//! The same schema is used for the generated file and for the override
//! files containers may ship at `/etc/logstash-forwarder.conf`.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use super::paths::StorageLayout;
use crate::types::ContainerSnapshot;

const SSL_CERTIFICATE: &str = "/mnt/logstash-forwarder/logstash-forwarder.crt";
const SSL_KEY: &str = "/mnt/logstash-forwarder/logstash-forwarder.key";
const SSL_CA: &str = "/mnt/logstash-forwarder/logstash-forwarder.crt";
const DEFAULT_TIMEOUT: i64 = 15;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no config file at `{}`", .path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read config file `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file `{}`: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Decodes an explicit `null` as the empty value, like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Connection settings for the logstash servers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Network {
    #[serde(deserialize_with = "null_as_default")]
    pub servers: Vec<String>,
    #[serde(rename = "ssl certificate", deserialize_with = "null_as_default")]
    pub ssl_certificate: String,
    #[serde(rename = "ssl key", deserialize_with = "null_as_default")]
    pub ssl_key: String,
    #[serde(rename = "ssl ca", deserialize_with = "null_as_default")]
    pub ssl_ca: String,
    #[serde(deserialize_with = "null_as_default")]
    pub timeout: i64,
}

/// A set of files to ship, along with the fields attached to every line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct File {
    #[serde(deserialize_with = "null_as_default")]
    pub paths: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogstashForwarderConfig {
    #[serde(deserialize_with = "null_as_default")]
    pub network: Network,
    #[serde(deserialize_with = "null_as_default")]
    pub files: Vec<File>,
}

impl LogstashForwarderConfig {
    /// A config shipping to `logstash_endpoint` with no files yet.
    pub fn from_default(logstash_endpoint: &str) -> Self {
        Self {
            network: Network {
                servers: vec![logstash_endpoint.to_string()],
                ssl_certificate: SSL_CERTIFICATE.into(),
                ssl_key: SSL_KEY.into(),
                ssl_ca: SSL_CA.into(),
                timeout: DEFAULT_TIMEOUT,
            },
            files: Vec::new(),
        }
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = tokio::fs::read(path).await.map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        serde_json::from_slice(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Appends the container's json log file. No deduplication is done.
    pub fn add_container_log_file(&mut self, container: &ContainerSnapshot, layout: &StorageLayout) {
        let fields = BTreeMap::from([
            ("type".to_string(), "docker".to_string()),
            ("codec".to_string(), "json".to_string()),
            ("docker.id".to_string(), container.id.clone()),
            ("docker.hostname".to_string(), container.hostname.clone()),
            ("docker.name".to_string(), container.name.clone()),
            ("docker.image".to_string(), container.image.clone()),
        ]);
        self.files.push(File {
            paths: vec![layout.json_log_path(&container.id)],
            fields,
        });
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    /// Replaces the file at `path` with this config.
    ///
    /// The config is written to a sibling temporary file first and renamed
    /// into place, so logstash-forwarder never reads a half written file.
    pub async fn write_to(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}
