//! In-memory stores for development and tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{self, BoxFuture, FutureExt};

use crate::storage::{CounterStore, StorageError, StorageResult, Submission, SubmissionStore};

/// Counters in a concurrent map.
///
/// The entry guard holds the key's shard lock for the read-add-write, so
/// increments on one key are linearized without a global lock.
#[derive(Clone, Default)]
pub struct MemoryCounterStore {
    inner: Arc<DashMap<String, u64>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous view of every counter.
    pub fn snapshot_now(&self) -> BTreeMap<String, u64> {
        self.inner
            .iter()
            .map(|r| (r.key().clone(), *r.value()))
            .collect()
    }
}

impl CounterStore for MemoryCounterStore {
    fn increment<'a>(&'a self, region_key: &'a str) -> BoxFuture<'a, StorageResult<u64>> {
        let mut entry = self.inner.entry(region_key.to_string()).or_insert(0);
        *entry += 1;
        let next = *entry;
        drop(entry);
        future::ready(Ok(next)).boxed()
    }

    fn current<'a>(&'a self, region_key: &'a str) -> BoxFuture<'a, StorageResult<u64>> {
        let value = self.inner.get(region_key).map(|r| *r.value()).unwrap_or(0);
        future::ready(Ok(value)).boxed()
    }

    fn snapshot(&self) -> BoxFuture<'_, StorageResult<BTreeMap<String, u64>>> {
        future::ready(Ok(self.snapshot_now())).boxed()
    }
}

/// Submissions keyed by `(region_key, id)`.
#[derive(Clone, Default)]
pub struct MemorySubmissionStore {
    inner: Arc<DashMap<(String, String), Submission>>,
}

impl MemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a stored record.
    pub fn get(&self, region_key: &str, id: &str) -> Option<Submission> {
        self.inner
            .get(&(region_key.to_string(), id.to_string()))
            .map(|r| r.value().clone())
    }

    /// Every stored record, in no particular order.
    pub fn all(&self) -> Vec<Submission> {
        self.inner.iter().map(|r| r.value().clone()).collect()
    }
}

impl SubmissionStore for MemorySubmissionStore {
    fn create<'a>(&'a self, submission: &'a Submission) -> BoxFuture<'a, StorageResult<()>> {
        let key = (submission.region_key.clone(), submission.id.clone());
        let result = match self.inner.entry(key) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists {
                region_key: submission.region_key.clone(),
                id: submission.id.clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(submission.clone());
                Ok(())
            }
        };
        future::ready(result).boxed()
    }

    fn count<'a>(&'a self, region_key: &'a str) -> BoxFuture<'a, StorageResult<u64>> {
        let count = self
            .inner
            .iter()
            .filter(|r| r.key().0 == region_key)
            .count() as u64;
        future::ready(Ok(count)).boxed()
    }
}
