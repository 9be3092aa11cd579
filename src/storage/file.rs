//! File-backed counter and submission stores.
//!
//! Layout under the data directory:
//! ```text
//! data/
//!   counters.json          {"riyadh": 2, "eastern": 1}
//!   riyadh/ر1.json
//!   riyadh/ر2.json
//!   eastern/ش1.json
//! ```

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use futures_util::future::{BoxFuture, FutureExt};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::storage::{CounterStore, StorageError, StorageResult, Submission, SubmissionStore};

const COUNTERS_FILE: &str = "counters.json";

/// Counters held in one JSON mapping, read-modify-written on every increment.
///
/// The whole file is one unit, so every increment (for any region) runs
/// inside `write_lock`. Two uncoordinated writers would lose updates.
pub struct FileCounterStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCounterStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(COUNTERS_FILE),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the counters file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> StorageResult<BTreeMap<String, u64>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&raw).map_err(|e| StorageError::CorruptCounters {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Write the mapping to a sibling temp file, then rename it into place.
    async fn save(&self, counters: &BTreeMap<String, u64>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let body = serde_json::to_vec_pretty(counters)?;
        let tmp = self.path.with_extension("json.tmp");

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&body).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

impl CounterStore for FileCounterStore {
    fn increment<'a>(&'a self, region_key: &'a str) -> BoxFuture<'a, StorageResult<u64>> {
        async move {
            let _guard = self.write_lock.lock().await;

            let mut counters = self.load().await?;
            let next = counters.get(region_key).copied().unwrap_or(0) + 1;
            counters.insert(region_key.to_string(), next);

            // Nothing is committed unless the write lands.
            self.save(&counters).await?;

            tracing::debug!(region = region_key, sequence = next, "Counter advanced");
            Ok(next)
        }
        .boxed()
    }

    fn current<'a>(&'a self, region_key: &'a str) -> BoxFuture<'a, StorageResult<u64>> {
        async move {
            let _guard = self.write_lock.lock().await;
            Ok(self.load().await?.get(region_key).copied().unwrap_or(0))
        }
        .boxed()
    }

    fn snapshot(&self) -> BoxFuture<'_, StorageResult<BTreeMap<String, u64>>> {
        async move {
            let _guard = self.write_lock.lock().await;
            self.load().await
        }
        .boxed()
    }
}

/// One JSON file per submission under a per-region directory.
pub struct FileSubmissionStore {
    data_dir: PathBuf,
}

impl FileSubmissionStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
        }
    }

    /// Path a submission is stored at.
    pub fn path_for(&self, region_key: &str, id: &str) -> PathBuf {
        self.data_dir.join(region_key).join(format!("{id}.json"))
    }

    /// Staging path for a record. Its `.tmp` extension keeps it out of `count`.
    pub fn tmp_path_for(&self, region_key: &str, id: &str) -> PathBuf {
        self.data_dir.join(region_key).join(format!(".{id}.json.tmp"))
    }
}

async fn write_then_link(tmp: &Path, path: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(tmp).await?;
    file.write_all(body).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::hard_link(tmp, path).await
}

impl SubmissionStore for FileSubmissionStore {
    /// Write to a hidden temp sibling, then hard-link it to `<id>.json`.
    ///
    /// The link fails if the name exists, which keeps create-once semantics,
    /// and a failed write never leaves a partial `<id>.json` behind for
    /// `count` to see.
    fn create<'a>(&'a self, submission: &'a Submission) -> BoxFuture<'a, StorageResult<()>> {
        async move {
            let region_dir = self.data_dir.join(&submission.region_key);
            tokio::fs::create_dir_all(&region_dir).await?;

            let path = self.path_for(&submission.region_key, &submission.id);
            let tmp = self.tmp_path_for(&submission.region_key, &submission.id);
            let body = serde_json::to_vec_pretty(submission)?;

            let result = write_then_link(&tmp, &path, &body).await;
            if let Err(e) = tokio::fs::remove_file(&tmp).await {
                if e.kind() != ErrorKind::NotFound {
                    tracing::warn!(path = %tmp.display(), error = %e, "Failed to remove temp record");
                }
            }

            match result {
                Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(StorageError::AlreadyExists {
                    region_key: submission.region_key.clone(),
                    id: submission.id.clone(),
                }),
                other => other.map_err(StorageError::from),
            }
        }
        .boxed()
    }

    fn count<'a>(&'a self, region_key: &'a str) -> BoxFuture<'a, StorageResult<u64>> {
        async move {
            let mut entries = match tokio::fs::read_dir(self.data_dir.join(region_key)).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
                Err(e) => return Err(e.into()),
            };

            let mut count = 0;
            while let Some(entry) = entries.next_entry().await? {
                if entry.path().extension().is_some_and(|ext| ext == "json") {
                    count += 1;
                }
            }
            Ok(count)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;

    fn submission(region_key: &str, prefix: char, sequence: u64) -> Submission {
        Submission {
            id: format!("{prefix}{sequence}"),
            sequence,
            region_key: region_key.to_string(),
            region: "منطقة الرياض".to_string(),
            prefix,
            name: "Sara".to_string(),
            phone: "0500000000".to_string(),
            email: "sara@example.com".to_string(),
            saved_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_first_increment_is_one() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCounterStore::new(dir.path());

        assert_eq!(store.current("riyadh").await.unwrap(), 0);
        assert_eq!(store.increment("riyadh").await.unwrap(), 1);
        assert_eq!(store.increment("riyadh").await.unwrap(), 2);
        assert_eq!(store.increment("eastern").await.unwrap(), 1);
        assert_eq!(store.current("riyadh").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_counters_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileCounterStore::new(dir.path());
            store.increment("riyadh").await.unwrap();
            store.increment("riyadh").await.unwrap();
        }

        let store = FileCounterStore::new(dir.path());
        assert_eq!(store.increment("riyadh").await.unwrap(), 3);

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let parsed: BTreeMap<String, u64> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["riyadh"], 3);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_gapless() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileCounterStore::new(dir.path()));

        let mut tasks = Vec::new();
        for i in 0..50 {
            let store = store.clone();
            let key = if i % 2 == 0 { "riyadh" } else { "eastern" };
            tasks.push(tokio::spawn(async move { (key, store.increment(key).await.unwrap()) }));
        }

        let mut riyadh = Vec::new();
        let mut eastern = Vec::new();
        for task in tasks {
            let (key, value) = task.await.unwrap();
            if key == "riyadh" {
                riyadh.push(value);
            } else {
                eastern.push(value);
            }
        }
        riyadh.sort_unstable();
        eastern.sort_unstable();

        assert_eq!(riyadh, (1..=25).collect::<Vec<_>>());
        assert_eq!(eastern, (1..=25).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_corrupt_counters_not_reset() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(COUNTERS_FILE), "{ not json").unwrap();
        let store = FileCounterStore::new(dir.path());

        let err = store.increment("riyadh").await.unwrap_err();
        assert!(matches!(err, StorageError::CorruptCounters { .. }));
        assert_eq!(
            std::fs::read_to_string(dir.path().join(COUNTERS_FILE)).unwrap(),
            "{ not json"
        );
    }

    #[tokio::test]
    async fn test_failed_write_not_committed() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCounterStore::new(dir.path());
        assert_eq!(store.increment("riyadh").await.unwrap(), 1);

        // A directory squatting on the temp path makes the write fail.
        std::fs::create_dir_all(dir.path().join("counters.json.tmp")).unwrap();
        assert!(store.increment("riyadh").await.is_err());
        assert_eq!(store.current("riyadh").await.unwrap(), 1);

        std::fs::remove_dir(dir.path().join("counters.json.tmp")).unwrap();
        assert_eq!(store.increment("riyadh").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_submission_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSubmissionStore::new(dir.path());
        let record = submission("riyadh", 'ر', 1);

        store.create(&record).await.unwrap();

        let path = store.path_for("riyadh", "ر1");
        let saved: Submission =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved, record);

        let mut clash = record.clone();
        clash.name = "Someone else".to_string();
        let err = store.create(&clash).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));

        let saved: Submission =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved.name, "Sara");
    }

    #[tokio::test]
    async fn test_shared_prefix_regions_do_not_clash() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSubmissionStore::new(dir.path());

        store.create(&submission("makkah", 'م', 1)).await.unwrap();
        store.create(&submission("madinah", 'م', 1)).await.unwrap();

        assert_eq!(store.count("makkah").await.unwrap(), 1);
        assert_eq!(store.count("madinah").await.unwrap(), 1);
        assert_eq!(store.count("riyadh").await.unwrap(), 0);
    }

    #[test]
    fn test_record_field_names() {
        let json = serde_json::to_value(submission("riyadh", 'ر', 7)).unwrap();
        assert_eq!(json["id"], "ر7");
        assert_eq!(json["regionKey"], "riyadh");
        assert_eq!(json["prefix"], "ر");
        assert!(json["savedAt"].is_string());
    }

    #[tokio::test]
    async fn test_failed_record_write_leaves_nothing_counted() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSubmissionStore::new(dir.path());
        let record = submission("riyadh", 'ر', 1);

        // A directory squatting on the staging path makes the write fail.
        let tmp = store.tmp_path_for("riyadh", "ر1");
        std::fs::create_dir_all(&tmp).unwrap();

        assert!(store.create(&record).await.is_err());
        assert!(!store.path_for("riyadh", "ر1").exists());
        assert_eq!(store.count("riyadh").await.unwrap(), 0);

        std::fs::remove_dir(&tmp).unwrap();
        store.create(&record).await.unwrap();
        assert_eq!(store.count("riyadh").await.unwrap(), 1);
        assert!(!tmp.exists());
    }

    #[tokio::test]
    async fn test_stale_temp_file_not_counted() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSubmissionStore::new(dir.path());
        std::fs::create_dir_all(dir.path().join("riyadh")).unwrap();
        std::fs::write(store.tmp_path_for("riyadh", "ر1"), "{ trunc").unwrap();

        assert_eq!(store.count("riyadh").await.unwrap(), 0);

        // A leftover staging file does not block the real write.
        store.create(&submission("riyadh", 'ر', 1)).await.unwrap();
        assert_eq!(store.count("riyadh").await.unwrap(), 1);
    }
}
