//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use region_registry::config::StorageBackend;
use region_registry::lifecycle::build_intake;
use region_registry::{HttpServer, RegistryConfig, Shutdown};

pub const RIYADH: &str = "منطقة الرياض";
pub const EASTERN: &str = "المنطقة الشرقية";

/// A running server bound to an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a file-backed server rooted at `data_dir`.
pub async fn start_file_server(data_dir: &Path) -> TestServer {
    let mut config = RegistryConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.storage.backend = StorageBackend::File;
    config.storage.data_dir = data_dir.display().to_string();
    config.static_files.enabled = false;

    start_server(config).await
}

pub async fn start_server(config: RegistryConfig) -> TestServer {
    let intake = build_intake(&config).await.unwrap();
    let listener = tokio::net::TcpListener::bind(&config.listener.bind_address)
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, intake);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    TestServer { addr, shutdown }
}

pub fn form(name: &str, region: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "phone": "0500000000",
        "email": "citizen@example.com",
        "region": region,
    })
}
