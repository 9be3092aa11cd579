//! Submission orchestration.
//!
//! `RECEIVED → VALIDATED → ID_ASSIGNED → PERSISTED → RESPONDED`

use std::sync::Arc;

use chrono::Utc;

use crate::intake::error::IntakeError;
use crate::intake::form::RawForm;
use crate::observability::metrics;
use crate::regions::RegionTable;
use crate::storage::{Stores, Submission};

/// Validates a form, assigns its ID and persists it.
#[derive(Clone)]
pub struct IntakeService {
    regions: Arc<RegionTable>,
    stores: Stores,
}

impl IntakeService {
    pub fn new(regions: Arc<RegionTable>, stores: Stores) -> Self {
        Self { regions, stores }
    }

    pub fn regions(&self) -> &RegionTable {
        &self.regions
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Run one submission on its own task and wait for the outcome.
    ///
    /// Dropping the returned future (client gone, request timed out) does not
    /// cancel the pipeline. Once a sequence number is taken the record is
    /// either written or the gap is logged.
    pub async fn submit_detached(&self, form: RawForm) -> Result<Submission, IntakeError> {
        let service = self.clone();
        tokio::spawn(async move { service.submit(form).await }).await?
    }

    /// Run one submission through the pipeline.
    ///
    /// Validation failures touch no state. A write failure after the
    /// counter advanced leaves a permanent gap in that region's sequence.
    pub async fn submit(&self, form: RawForm) -> Result<Submission, IntakeError> {
        let fields = form.sanitize();
        if fields.has_missing_fields() {
            metrics::record_submission("none", "missing_fields");
            return Err(IntakeError::MissingFields);
        }

        let Some(region) = self.regions.resolve(&fields.region) else {
            metrics::record_submission("none", "invalid_region");
            return Err(IntakeError::InvalidRegion(fields.region));
        };

        let sequence = match self.stores.counters.increment(&region.key).await {
            Ok(sequence) => sequence,
            Err(e) => {
                metrics::record_submission(&region.key, "counter_error");
                return Err(IntakeError::Counter(e));
            }
        };

        let submission = Submission {
            id: region.id_for(sequence),
            sequence,
            region_key: region.key.clone(),
            region: region.label.clone(),
            prefix: region.prefix,
            name: fields.name,
            phone: fields.phone,
            email: fields.email,
            saved_at: Utc::now(),
        };

        if let Err(e) = self.stores.submissions.create(&submission).await {
            tracing::warn!(
                region = %region.key,
                sequence,
                id = %submission.id,
                error = %e,
                "Submission write failed after counter advanced; sequence number lost"
            );
            metrics::record_sequence_gap(&region.key);
            metrics::record_submission(&region.key, "storage_error");
            return Err(IntakeError::Persist {
                id: submission.id,
                source: e,
            });
        }

        tracing::info!(region = %region.key, id = %submission.id, "Submission saved");
        metrics::record_submission(&region.key, "saved");
        Ok(submission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{
        CounterStore, MemoryCounterStore, MemorySubmissionStore, StorageError, StorageResult,
        SubmissionStore,
    };
    use futures_util::future::{self, BoxFuture, FutureExt};
    use std::time::Duration;
    use tokio::sync::Notify;

    const RIYADH: &str = "منطقة الرياض";
    const EASTERN: &str = "المنطقة الشرقية";

    fn service() -> (IntakeService, MemoryCounterStore, MemorySubmissionStore) {
        let counters = MemoryCounterStore::new();
        let submissions = MemorySubmissionStore::new();
        let stores = Stores {
            counters: Arc::new(counters.clone()),
            submissions: Arc::new(submissions.clone()),
        };
        (
            IntakeService::new(Arc::new(RegionTable::builtin()), stores),
            counters,
            submissions,
        )
    }

    fn form(name: &str, region: &str) -> RawForm {
        RawForm::new(name, "0500000000", "user@example.com", region)
    }

    #[tokio::test]
    async fn test_ids_per_region() {
        let (service, _, submissions) = service();

        assert_eq!(service.submit(form("A", RIYADH)).await.unwrap().id, "ر1");
        assert_eq!(service.submit(form("B", RIYADH)).await.unwrap().id, "ر2");

        let eastern = service.submit(form("C", EASTERN)).await.unwrap();
        assert_eq!(eastern.id, "ش1");
        assert_eq!(eastern.sequence, 1);
        assert_eq!(eastern.region_key, "eastern");
        assert_eq!(eastern.region, EASTERN);

        assert_eq!(submissions.get("riyadh", "ر2").unwrap().name, "B");
    }

    #[tokio::test]
    async fn test_blank_name_rejected_without_side_effects() {
        let (service, counters, submissions) = service();

        let err = service.submit(form("   ", RIYADH)).await.unwrap_err();
        assert!(matches!(err, IntakeError::MissingFields));
        assert_eq!(counters.current("riyadh").await.unwrap(), 0);
        assert!(submissions.all().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_region_rejected() {
        let (service, counters, submissions) = service();
        service.submit(form("A", RIYADH)).await.unwrap();

        let err = service.submit(form("A", "not a real region")).await.unwrap_err();
        assert!(matches!(err, IntakeError::InvalidRegion(_)));

        let snapshot = counters.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot["riyadh"], 1);
        assert_eq!(submissions.all().len(), 1);
    }

    #[tokio::test]
    async fn test_resubmission_is_not_deduplicated() {
        let (service, _, submissions) = service();
        let first = service.submit(form("Sara", RIYADH)).await.unwrap();
        let second = service.submit(form("Sara", RIYADH)).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(submissions.all().len(), 2);
    }

    struct FailingSubmissions;

    impl SubmissionStore for FailingSubmissions {
        fn create<'a>(&'a self, _: &'a Submission) -> BoxFuture<'a, StorageResult<()>> {
            future::ready(Err(StorageError::Io(std::io::Error::other("disk full")))).boxed()
        }

        fn count<'a>(&'a self, _: &'a str) -> BoxFuture<'a, StorageResult<u64>> {
            future::ready(Ok(0)).boxed()
        }
    }

    #[tokio::test]
    async fn test_write_failure_leaves_gap() {
        let counters = MemoryCounterStore::new();
        let stores = Stores {
            counters: Arc::new(counters.clone()),
            submissions: Arc::new(FailingSubmissions),
        };
        let service = IntakeService::new(Arc::new(RegionTable::builtin()), stores);

        let err = service.submit(form("A", RIYADH)).await.unwrap_err();
        assert!(matches!(err, IntakeError::Persist { ref id, .. } if id == "ر1"));

        // The counter is not rolled back.
        assert_eq!(counters.current("riyadh").await.unwrap(), 1);
    }

    /// Holds every write until the gate is opened.
    struct GatedSubmissions {
        inner: MemorySubmissionStore,
        gate: Arc<Notify>,
        fail: bool,
    }

    impl SubmissionStore for GatedSubmissions {
        fn create<'a>(&'a self, submission: &'a Submission) -> BoxFuture<'a, StorageResult<()>> {
            async move {
                self.gate.notified().await;
                if self.fail {
                    return Err(StorageError::Io(std::io::Error::other("disk full")));
                }
                self.inner.create(submission).await
            }
            .boxed()
        }

        fn count<'a>(&'a self, region_key: &'a str) -> BoxFuture<'a, StorageResult<u64>> {
            self.inner.count(region_key)
        }
    }

    fn gated_service(
        fail: bool,
    ) -> (IntakeService, MemoryCounterStore, MemorySubmissionStore, Arc<Notify>) {
        let counters = MemoryCounterStore::new();
        let submissions = MemorySubmissionStore::new();
        let gate = Arc::new(Notify::new());
        let stores = Stores {
            counters: Arc::new(counters.clone()),
            submissions: Arc::new(GatedSubmissions {
                inner: submissions.clone(),
                gate: gate.clone(),
                fail,
            }),
        };
        (
            IntakeService::new(Arc::new(RegionTable::builtin()), stores),
            counters,
            submissions,
            gate,
        )
    }

    #[tokio::test]
    async fn test_dropped_caller_does_not_abandon_write() {
        let (service, counters, submissions, gate) = gated_service(false);

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            service.submit_detached(form("A", RIYADH)),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(counters.current("riyadh").await.unwrap(), 1);
        assert!(submissions.get("riyadh", "ر1").is_none());

        gate.notify_one();
        for _ in 0..100 {
            if submissions.get("riyadh", "ر1").is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(submissions.get("riyadh", "ر1").unwrap().name, "A");
    }

    #[tokio::test]
    async fn test_detached_submit_reports_write_failure() {
        let (service, counters, submissions, gate) = gated_service(true);
        gate.notify_one();

        let err = service.submit_detached(form("A", RIYADH)).await.unwrap_err();
        assert!(matches!(err, IntakeError::Persist { ref id, .. } if id == "ر1"));
        assert_eq!(counters.current("riyadh").await.unwrap(), 1);
        assert!(submissions.all().is_empty());
    }
}
