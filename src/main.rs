//! Regional Registration Service
//!
//! Accepts citizen registration forms and assigns each one a per-region
//! sequential ID (`ر1`, `ر2`, `ش1`, ...).
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                 REGISTRATION SERVICE                  │
//!                    │                                                       │
//!  POST /save        │  ┌────────┐   ┌──────────┐   ┌─────────┐              │
//!  ──────────────────┼─▶│  http  │──▶│  intake  │──▶│ regions │              │
//!                    │  │ server │   │ sanitize │   │ resolve │              │
//!                    │  └────────┘   └────┬─────┘   └─────────┘              │
//!                    │                    │                                  │
//!                    │                    ▼                                  │
//!                    │             ┌──────────────┐   ┌──────────────────┐   │
//!                    │             │ CounterStore │──▶│ SubmissionStore  │   │
//!                    │             │  increment   │   │     create       │   │
//!                    │             └──────────────┘   └──────────────────┘   │
//!                    │              file │ postgres │ memory                 │
//!                    │                                                       │
//!                    │  ┌───────────────────────────────────────────────┐    │
//!                    │  │ config │ observability │ lifecycle │ admin    │    │
//!                    │  └───────────────────────────────────────────────┘    │
//!                    └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use region_registry::config::{load_config, loader::apply_env_overrides, validate_config, ConfigError};
use region_registry::lifecycle::{self, Shutdown};
use region_registry::observability::logging::init_logging;
use region_registry::RegistryConfig;

#[derive(Parser)]
#[command(name = "region-registry")]
#[command(about = "Regional registration form service", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long, env = "REGISTRY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            let mut config = RegistryConfig::default();
            apply_env_overrides(&mut config);
            validate_config(&config).map_err(ConfigError::Validation)?;
            config
        }
    };

    init_logging(&config.observability);

    tracing::info!("region-registry v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend = %config.storage.backend,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    lifecycle::run(config, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
