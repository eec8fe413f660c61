use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

/// Keeps a logstash-forwarder config in sync with the running docker containers.
///
/// Every flag is optional; unset flags fall back to the environment, then to
/// the built-in defaults.
#[derive(Parser, Serialize, Debug, Default, Clone)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Docker API endpoint [env: DOCKER_HOST] [default: unix:///var/run/docker.sock]
    #[arg(long)]
    #[serde(rename = "docker_host", skip_serializing_if = "Option::is_none")]
    pub docker: Option<String>,

    /// Logstash endpoint [env: LOGSTASH_HOST] [default: logstash:5043]
    #[arg(long)]
    #[serde(rename = "logstash_host", skip_serializing_if = "Option::is_none")]
    pub logstash: Option<String>,

    /// Path of the generated logstash-forwarder config
    #[arg(long)]
    #[serde(rename = "config_file", skip_serializing_if = "Option::is_none")]
    pub config: Option<PathBuf>,

    /// Seconds to wait after an event for more events to accumulate
    #[arg(long, visible_alias = "lazyness")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub laziness: Option<u64>,

    /// Docker's root directory on the host
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_root: Option<String>,
}
