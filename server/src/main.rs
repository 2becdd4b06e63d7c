//! botdock - Entry Point
//!
//! Accepts deployment requests for user-owned bot repositories, fetches
//! them, runs each entry point as a supervised child process, and streams
//! the combined output to live observers.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use botdock::app::options::{AppOptions, BrokerOptions, PipelineOptions, ServerOptions, StorageOptions};
use botdock::app::run::run;
use botdock::logs::{init_logging, LogOptions};
use botdock::storage::layout::StorageLayout;
use botdock::storage::settings::Settings;

use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        println!("botdock {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    // Resolve the storage layout, optionally overridden on the CLI
    let layout = match cli_args.get("base-dir") {
        Some(dir) => StorageLayout::new(dir),
        None => StorageLayout::default(),
    };

    // Retrieve the settings file, falling back to defaults when absent
    let settings_file = layout.settings_file();
    let settings = if settings_file.exists().await {
        match settings_file.read_json::<Settings>().await {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Unable to read settings file: {}", e);
                return;
            }
        }
    } else {
        Settings::default()
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        ..Default::default()
    };
    if let Err(e) = init_logging(log_options) {
        println!("Failed to initialize logging: {e}");
    }

    // Assemble options, with CLI overrides for host/port
    let options = AppOptions {
        storage: StorageOptions { layout },
        server: ServerOptions {
            host: cli_args
                .get("host")
                .cloned()
                .unwrap_or(settings.server.host),
            port: cli_args
                .get("port")
                .and_then(|p| p.parse().ok())
                .unwrap_or(settings.server.port),
        },
        pipeline: PipelineOptions {
            runner: settings.pipeline.runner,
            remote_base: settings.pipeline.remote_base,
            fetch_timeout: Duration::from_secs(settings.pipeline.fetch_timeout_secs),
            spawn_timeout: Duration::from_secs(settings.pipeline.spawn_timeout_secs),
            grace_period: Duration::from_secs(settings.pipeline.grace_period_secs),
        },
        broker: BrokerOptions {
            poll_interval: Duration::from_millis(settings.broker.poll_interval_ms),
        },
        ..Default::default()
    };

    info!("Running botdock with options: {:?}", options);
    let result = run(options, await_shutdown_signal()).await;
    if let Err(e) = result {
        error!("Failed to run botdock: {e}");
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sig) => sig,
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                return;
            }
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(sig) => sig,
            Err(e) => {
                error!("Failed to install SIGINT handler: {}", e);
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl+C received, shutting down...");
        }
    }
}
