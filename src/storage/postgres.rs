//! PostgreSQL-backed stores.
//!
//! The counter increment is one upsert statement; Postgres takes the row
//! lock, so concurrent increments on a key serialize without an app lock.

use std::collections::BTreeMap;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::storage::{CounterStore, StorageError, StorageResult, Submission, SubmissionStore};

const CREATE_COUNTERS: &str = "CREATE TABLE IF NOT EXISTS region_counters (
    region_key TEXT PRIMARY KEY,
    value BIGINT NOT NULL
)";

// Prefixes are shared across regions, so the ID alone is not unique.
const CREATE_SUBMISSIONS: &str = "CREATE TABLE IF NOT EXISTS submissions (
    region_key TEXT NOT NULL,
    id TEXT NOT NULL,
    sequence BIGINT NOT NULL,
    region TEXT NOT NULL,
    prefix TEXT NOT NULL,
    name TEXT NOT NULL,
    phone TEXT NOT NULL,
    email TEXT NOT NULL,
    saved_at TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (region_key, id)
)";

/// Connect a pool and create the tables if they are missing.
pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    ensure_schema(&pool).await?;
    Ok(pool)
}

/// Create the counter and submission tables.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_COUNTERS).execute(pool).await?;
    sqlx::query(CREATE_SUBMISSIONS).execute(pool).await?;
    Ok(())
}

/// Counters as rows in `region_counters`.
#[derive(Clone)]
pub struct PgCounterStore {
    pool: PgPool,
}

impl PgCounterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CounterStore for PgCounterStore {
    fn increment<'a>(&'a self, region_key: &'a str) -> BoxFuture<'a, StorageResult<u64>> {
        async move {
            let value: i64 = sqlx::query_scalar(
                "INSERT INTO region_counters (region_key, value) VALUES ($1, 1)
                 ON CONFLICT (region_key) DO UPDATE SET value = region_counters.value + 1
                 RETURNING value",
            )
            .bind(region_key)
            .fetch_one(&self.pool)
            .await?;

            Ok(value as u64)
        }
        .boxed()
    }

    fn current<'a>(&'a self, region_key: &'a str) -> BoxFuture<'a, StorageResult<u64>> {
        async move {
            let value: Option<i64> =
                sqlx::query_scalar("SELECT value FROM region_counters WHERE region_key = $1")
                    .bind(region_key)
                    .fetch_optional(&self.pool)
                    .await?;

            Ok(value.unwrap_or(0) as u64)
        }
        .boxed()
    }

    fn snapshot(&self) -> BoxFuture<'_, StorageResult<BTreeMap<String, u64>>> {
        async move {
            let rows: Vec<(String, i64)> =
                sqlx::query_as("SELECT region_key, value FROM region_counters")
                    .fetch_all(&self.pool)
                    .await?;

            Ok(rows.into_iter().map(|(k, v)| (k, v as u64)).collect())
        }
        .boxed()
    }
}

/// Submissions as rows in `submissions`.
#[derive(Clone)]
pub struct PgSubmissionStore {
    pool: PgPool,
}

impl PgSubmissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl SubmissionStore for PgSubmissionStore {
    fn create<'a>(&'a self, submission: &'a Submission) -> BoxFuture<'a, StorageResult<()>> {
        async move {
            let result = sqlx::query(
                "INSERT INTO submissions (region_key, id, sequence, region, prefix,
                 name, phone, email, saved_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                 ON CONFLICT (region_key, id) DO NOTHING",
            )
            .bind(&submission.region_key)
            .bind(&submission.id)
            .bind(submission.sequence as i64)
            .bind(&submission.region)
            .bind(submission.prefix.to_string())
            .bind(&submission.name)
            .bind(&submission.phone)
            .bind(&submission.email)
            .bind(submission.saved_at)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(StorageError::AlreadyExists {
                    region_key: submission.region_key.clone(),
                    id: submission.id.clone(),
                });
            }
            Ok(())
        }
        .boxed()
    }

    fn count<'a>(&'a self, region_key: &'a str) -> BoxFuture<'a, StorageResult<u64>> {
        async move {
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM submissions WHERE region_key = $1")
                    .bind(region_key)
                    .fetch_one(&self.pool)
                    .await?;

            Ok(count as u64)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    /// Connect to `DATABASE_URL` in a private schema, or skip.
    async fn test_pool() -> Option<PgPool> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let schema = format!("registry_test_{}", uuid::Uuid::new_v4().simple());

        let admin = PgPoolOptions::new().max_connections(1).connect(&url).await.ok()?;
        sqlx::query(&format!("CREATE SCHEMA {schema}"))
            .execute(&admin)
            .await
            .ok()?;

        let search_path = format!("SET search_path TO {schema}");
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .after_connect(move |conn, _| {
                let search_path = search_path.clone();
                Box::pin(async move {
                    sqlx::query(&search_path).execute(conn).await?;
                    Ok(())
                })
            })
            .connect(&url)
            .await
            .ok()?;

        ensure_schema(&pool).await.ok()?;
        Some(pool)
    }

    #[tokio::test]
    async fn test_pg_concurrent_increments() {
        let Some(pool) = test_pool().await else {
            eprintln!("DATABASE_URL not set, skipping");
            return;
        };
        let store = PgCounterStore::new(pool);

        let mut tasks = Vec::new();
        for _ in 0..40 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move { store.increment("riyadh").await.unwrap() }));
        }
        let mut values = Vec::new();
        for task in tasks {
            values.push(task.await.unwrap());
        }
        values.sort_unstable();

        assert_eq!(values, (1..=40).collect::<Vec<_>>());
        assert_eq!(store.current("eastern").await.unwrap(), 0);
        assert_eq!(store.increment("eastern").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_pg_submission_never_overwritten() {
        let Some(pool) = test_pool().await else {
            eprintln!("DATABASE_URL not set, skipping");
            return;
        };
        let store = PgSubmissionStore::new(pool);

        let record = Submission {
            id: "م1".to_string(),
            sequence: 1,
            region_key: "makkah".to_string(),
            region: "منطقة مكة المكرمة".to_string(),
            prefix: 'م',
            name: "Omar".to_string(),
            phone: "0511111111".to_string(),
            email: "omar@example.com".to_string(),
            saved_at: Utc::now(),
        };
        store.create(&record).await.unwrap();

        let err = store.create(&record).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));

        let mut other_region = record.clone();
        other_region.region_key = "madinah".to_string();
        store.create(&other_region).await.unwrap();

        assert_eq!(store.count("makkah").await.unwrap(), 1);
        assert_eq!(store.count("madinah").await.unwrap(), 1);
    }
}
