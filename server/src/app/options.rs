//! Application configuration options

use std::time::Duration;

use crate::storage::layout::StorageLayout;

/// Main application options
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Storage configuration
    pub storage: StorageOptions,

    /// HTTP server configuration
    pub server: ServerOptions,

    /// Deployment pipeline configuration
    pub pipeline: PipelineOptions,

    /// Log broker configuration
    pub broker: BrokerOptions,
}

/// Lifecycle options
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// Storage configuration options
#[derive(Debug, Clone, Default)]
pub struct StorageOptions {
    /// Storage layout paths
    pub layout: StorageLayout,
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Deployment pipeline options
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Command used to run a deployment's entry point
    pub runner: String,

    /// Base URL repositories are fetched from
    pub remote_base: String,

    /// Repository fetch timeout
    pub fetch_timeout: Duration,

    /// Process spawn timeout
    pub spawn_timeout: Duration,

    /// Grace period before a stop escalates to a forceful kill
    pub grace_period: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            runner: "python3".to_string(),
            remote_base: "https://github.com".to_string(),
            fetch_timeout: Duration::from_secs(120),
            spawn_timeout: Duration::from_secs(30),
            grace_period: Duration::from_secs(10),
        }
    }
}

/// Log broker options
#[derive(Debug, Clone)]
pub struct BrokerOptions {
    /// Output sink poll interval
    pub poll_interval: Duration,
}

impl Default for BrokerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
        }
    }
}
