use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Args;

const DEFAULT_DOCKER_HOST: &str = "unix:///var/run/docker.sock";
const DEFAULT_LOGSTASH_HOST: &str = "logstash:5043";
const DEFAULT_CONFIG_FILE: &str = "/mnt/logstash-forwarder/logstash-forwarder.conf";
const DEFAULT_LAZINESS: u64 = 5;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Config {
    pub docker_host: String,
    pub logstash_host: String,
    pub config_file: PathBuf,
    /// Seconds to wait for events to accumulate before refreshing.
    pub laziness: u64,
    pub docker_root: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            docker_host: DEFAULT_DOCKER_HOST.into(),
            logstash_host: DEFAULT_LOGSTASH_HOST.into(),
            config_file: DEFAULT_CONFIG_FILE.into(),
            laziness: DEFAULT_LAZINESS,
            docker_root: crate::forwarder::paths::DEFAULT_DOCKER_ROOT.into(),
        }
    }
}

impl Config {
    /// Flags win over the environment, the environment over config files,
    /// config files over the defaults.
    pub fn figment(args: &Args) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("docker-logstash-forwarder.toml"))
            .merge(Json::file("docker-logstash-forwarder.json"))
            .merge(Env::raw().only(&["docker_host", "logstash_host"]))
            .merge(Env::prefixed("FORWARDER_"))
            .merge(Serialized::defaults(args))
    }

    pub fn load(args: &Args) -> anyhow::Result<Self> {
        let mut config: Config = Self::figment(args)
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        // Empty values behave as if they were not set at all.
        let defaults = Config::default();
        if config.docker_host.trim().is_empty() {
            config.docker_host = defaults.docker_host;
        }
        if config.logstash_host.trim().is_empty() {
            config.logstash_host = defaults.logstash_host;
        }
        if config.config_file.as_os_str().is_empty() {
            config.config_file = defaults.config_file;
        }
        if config.docker_root.trim().is_empty() {
            config.docker_root = defaults.docker_root;
        }

        if config.laziness == 0 {
            anyhow::bail!("laziness must be at least one second");
        }

        Ok(config)
    }

    pub fn laziness(&self) -> Duration {
        Duration::from_secs(self.laziness)
    }
}
