//! Persistence subsystem.
//!
//! # Data Flow
//! ```text
//! IntakeService
//!     → CounterStore::increment(region_key)   (linearized per key)
//!     → SubmissionStore::create(&Submission)  (independent, concurrent)
//!
//! Backends:
//!     file.rs      counters.json + <data_dir>/<key>/<id>.json
//!     postgres.rs  region_counters + submissions tables
//!     memory.rs    DashMap, non-durable
//! ```
//!
//! # Design Decisions
//! - Both stores are object-safe traits so the backend is picked at startup
//! - The file counter store serializes every increment behind one mutex
//! - The postgres counter relies on a single upsert statement, no app lock
//! - Records are never overwritten; a clash is reported as `AlreadyExists`

pub mod file;
pub mod memory;
pub mod postgres;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{StorageBackend, StorageConfig};

pub use file::{FileCounterStore, FileSubmissionStore};
pub use memory::{MemoryCounterStore, MemorySubmissionStore};
pub use postgres::{PgCounterStore, PgSubmissionStore};

/// One persisted registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    /// `prefix + sequence`, e.g. `ر1`.
    pub id: String,
    pub sequence: u64,
    pub region_key: String,
    /// The region label exactly as submitted.
    pub region: String,
    pub prefix: char,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub saved_at: DateTime<Utc>,
}

/// Errors surfaced by any storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The counters file exists but could not be parsed. Never treated as empty.
    #[error("counters file {path} is corrupt: {reason}")]
    CorruptCounters { path: String, reason: String },

    #[error("submission {id} already exists in region {region_key}")]
    AlreadyExists { region_key: String, id: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable per-region counter.
///
/// `increment` must return 1, 2, 3, ... for concurrent callers on the same
/// key, with no repeats and no gaps, and must not affect other keys.
pub trait CounterStore: Send + Sync {
    /// Atomically add one to the counter and return the new value.
    fn increment<'a>(&'a self, region_key: &'a str) -> BoxFuture<'a, StorageResult<u64>>;

    /// Current value, 0 if the region has never been incremented.
    fn current<'a>(&'a self, region_key: &'a str) -> BoxFuture<'a, StorageResult<u64>>;

    /// All counters that exist.
    fn snapshot(&self) -> BoxFuture<'_, StorageResult<BTreeMap<String, u64>>>;
}

/// Durable append-only submission log.
pub trait SubmissionStore: Send + Sync {
    /// Persist a new record. Fails with `AlreadyExists` rather than overwrite.
    fn create<'a>(&'a self, submission: &'a Submission) -> BoxFuture<'a, StorageResult<()>>;

    /// Number of records stored for a region.
    fn count<'a>(&'a self, region_key: &'a str) -> BoxFuture<'a, StorageResult<u64>>;
}

/// The pair of stores a running service uses.
#[derive(Clone)]
pub struct Stores {
    pub counters: Arc<dyn CounterStore>,
    pub submissions: Arc<dyn SubmissionStore>,
}

impl Stores {
    /// Non-durable stores.
    pub fn memory() -> Self {
        Self {
            counters: Arc::new(MemoryCounterStore::new()),
            submissions: Arc::new(MemorySubmissionStore::new()),
        }
    }

    /// File-backed stores rooted at `data_dir`.
    pub fn file(data_dir: impl Into<std::path::PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            counters: Arc::new(FileCounterStore::new(&data_dir)),
            submissions: Arc::new(FileSubmissionStore::new(&data_dir)),
        }
    }

    /// Open the backend selected in configuration.
    pub async fn open(config: &StorageConfig) -> StorageResult<Self> {
        let stores = match config.backend {
            StorageBackend::File => {
                tokio::fs::create_dir_all(&config.data_dir).await?;
                Self::file(&config.data_dir)
            }
            StorageBackend::Postgres => {
                let url = config.database_url.as_deref().unwrap_or_default();
                let pool = postgres::connect(url, config.max_connections).await?;
                Self {
                    counters: Arc::new(PgCounterStore::new(pool.clone())),
                    submissions: Arc::new(PgSubmissionStore::new(pool)),
                }
            }
            StorageBackend::Memory => {
                tracing::warn!("Memory storage selected; submissions will not survive a restart");
                Self::memory()
            }
        };

        tracing::info!(backend = %config.backend, "Storage opened");
        Ok(stores)
    }
}
