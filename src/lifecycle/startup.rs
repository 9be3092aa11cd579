//! Startup orchestration.
//!
//! # Responsibilities
//! - Freeze the region table
//! - Open the configured storage backend
//! - Start the metrics exporter and admin API when enabled
//! - Bind the public listener last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::admin::{setup_admin_router, AdminState};
use crate::config::RegistryConfig;
use crate::http::HttpServer;
use crate::intake::IntakeService;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::regions::{RegionTable, RegionTableError};
use crate::storage::{StorageError, Stores};

/// Fatal startup failures.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("region table: {0}")]
    Regions(#[from] RegionTableError),

    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Build the intake pipeline for a configuration.
pub async fn build_intake(config: &RegistryConfig) -> Result<IntakeService, StartupError> {
    let regions = Arc::new(RegionTable::from_config(&config.regions)?);
    tracing::info!(regions = regions.len(), "Region table loaded");

    let stores = Stores::open(&config.storage).await?;
    Ok(IntakeService::new(regions, stores))
}

async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })
}

/// Start every subsystem and serve until `shutdown` fires.
pub async fn run(config: RegistryConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let intake = build_intake(&config).await?;

    if config.admin.enabled {
        let listener = bind(&config.admin.bind_address).await?;
        let router = setup_admin_router(AdminState {
            intake: intake.clone(),
            api_key: Arc::from(config.admin.api_key.as_str()),
            backend: config.storage.backend,
            started_at: Instant::now(),
        });
        let admin_shutdown = shutdown.subscribe();

        tracing::info!(address = %config.admin.bind_address, "Admin API listening");
        tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(admin_shutdown.wait())
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Admin API stopped");
            }
        });
    }

    let listener = bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for submissions");

    let server = HttpServer::new(config, intake);
    server.run(listener, shutdown.subscribe()).await?;
    Ok(())
}
