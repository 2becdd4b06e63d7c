//! Settings file management

use serde::{Deserialize, Serialize};

use crate::logs::LogLevel;

/// Server settings, read from `settings.json` under the storage base
/// directory. Every field has a default so a missing or partial file works.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Deployment pipeline configuration
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Log broker configuration
    #[serde(default)]
    pub broker: BrokerSettings,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Deployment pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Command used to run a deployment's entry point
    #[serde(default = "default_runner")]
    pub runner: String,

    /// Base URL repositories are fetched from
    #[serde(default = "default_remote_base")]
    pub remote_base: String,

    /// Repository fetch timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Process spawn timeout in seconds
    #[serde(default = "default_spawn_timeout")]
    pub spawn_timeout_secs: u64,

    /// Grace period before a stop escalates to a forceful kill, in seconds
    #[serde(default = "default_grace_period")]
    pub grace_period_secs: u64,
}

fn default_runner() -> String {
    "python3".to_string()
}

fn default_remote_base() -> String {
    "https://github.com".to_string()
}

fn default_fetch_timeout() -> u64 {
    120
}

fn default_spawn_timeout() -> u64 {
    30
}

fn default_grace_period() -> u64 {
    10
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            runner: default_runner(),
            remote_base: default_remote_base(),
            fetch_timeout_secs: default_fetch_timeout(),
            spawn_timeout_secs: default_spawn_timeout(),
            grace_period_secs: default_grace_period(),
        }
    }
}

/// Log broker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerSettings {
    /// Output sink poll interval in milliseconds. Latency/overhead
    /// trade-off; lower values deliver chunks sooner.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval() -> u64 {
    1000
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
        }
    }
}
