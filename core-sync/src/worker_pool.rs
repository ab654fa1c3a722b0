//! # Transfer Worker Pool
//!
//! Copies one round's worth of records from the source container to the
//! destination with at most `parallelism` copies in flight.
//!
//! Every submitted record yields exactly one [`TransferOutcome`], in
//! submission order. Backend errors become outcome data and never abort the
//! round. A copy that panics or never gets a permit is reported as retryable.

use crate::counters::SyncCounters;
use crate::model::TransferOutcome;
use bridge_traits::{AccessPolicy, BridgeError, ObjectRecord, StorageBackend};
use core_async::sync::Semaphore;
use core_async::task;
use core_runtime::events::{CoreEvent, EventBus, TransferEvent};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

#[derive(Clone)]
pub struct TransferWorkerPool {
    backend: Arc<dyn StorageBackend>,
    source: String,
    destination: String,
    parallelism: usize,
    access_policy: AccessPolicy,
    counters: Arc<SyncCounters>,
    events: Option<(EventBus, String)>,
}

impl TransferWorkerPool {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        source: impl Into<String>,
        destination: impl Into<String>,
        parallelism: usize,
        access_policy: AccessPolicy,
        counters: Arc<SyncCounters>,
    ) -> Self {
        Self {
            backend,
            source: source.into(),
            destination: destination.into(),
            parallelism: parallelism.max(1),
            access_policy,
            counters,
            events: None,
        }
    }

    /// Publish `TransferEvent::Failed` for every failed copy.
    pub fn with_events(mut self, bus: EventBus, session_id: impl Into<String>) -> Self {
        self.events = Some((bus, session_id.into()));
        self
    }

    /// Copy every record, returning one outcome per record in input order.
    #[instrument(skip(self, records), fields(records = records.len(), parallelism = self.parallelism))]
    pub async fn run_round(&self, records: Vec<Arc<ObjectRecord>>) -> Vec<TransferOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        self.run_with_permits(records, semaphore).await
    }

    async fn run_with_permits(
        &self,
        records: Vec<Arc<ObjectRecord>>,
        semaphore: Arc<Semaphore>,
    ) -> Vec<TransferOutcome> {
        let mut handles = Vec::with_capacity(records.len());

        for record in records {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    handles.push((record, Err(e.to_string())));
                    continue;
                }
            };
            let pool = self.clone();
            let task_record = record.clone();

            let handle = task::spawn(async move {
                let outcome = pool.copy_one(task_record).await;
                drop(permit);
                outcome
            });
            handles.push((record, Ok(handle)));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (record, handle) in handles {
            let outcome = match handle {
                Ok(handle) => match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!(key = %record.key, error = %e, "Copy task panicked");
                        TransferOutcome::RetryableFailure {
                            record,
                            reason: format!("copy task failed: {}", e),
                        }
                    }
                },
                Err(reason) => TransferOutcome::RetryableFailure {
                    record,
                    reason: format!("copy not started: {}", reason),
                },
            };
            self.report_failure(&outcome);
            outcomes.push(outcome);
        }

        outcomes
    }

    async fn copy_one(&self, record: Arc<ObjectRecord>) -> TransferOutcome {
        match self.transfer(&record).await {
            Ok(bytes_written) => {
                self.counters.record_success(bytes_written);
                debug!(key = %record.key, bytes = bytes_written, "Object copied");
                TransferOutcome::Success {
                    key: record.key.clone(),
                    bytes_written,
                }
            }
            Err(e) => classify(record, e),
        }
    }

    async fn transfer(&self, record: &ObjectRecord) -> bridge_traits::error::Result<u64> {
        let read = self.backend.read_object(&self.source, &record.key).await?;
        self.backend
            .write_object(
                &self.destination,
                &record.key,
                read.body,
                read.metadata,
                self.access_policy,
            )
            .await
    }

    fn report_failure(&self, outcome: &TransferOutcome) {
        let (reason, permanent) = match outcome {
            TransferOutcome::Success { .. } => return,
            TransferOutcome::RetryableFailure { reason, .. } => (reason, false),
            TransferOutcome::PermanentFailure { reason, .. } => (reason, true),
        };

        warn!(key = outcome.key(), permanent, reason = %reason, "Copy failed");

        if let Some((bus, session_id)) = &self.events {
            bus.emit(CoreEvent::Transfer(TransferEvent::Failed {
                session_id: session_id.clone(),
                key: outcome.key().to_string(),
                reason: reason.clone(),
                permanent,
            }))
            .ok();
        }
    }
}

/// Malformed keys and arguments can never succeed; anything else might.
fn classify(record: Arc<ObjectRecord>, error: BridgeError) -> TransferOutcome {
    if error.is_invalid_argument() {
        TransferOutcome::PermanentFailure {
            key: record.key.clone(),
            reason: error.to_string(),
        }
    } else {
        TransferOutcome::RetryableFailure {
            record,
            reason: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::storage::{ByteStream, ListPage, ObjectMetadata, ObjectRead};
    use bridge_traits::{byte_stream_from, collect_stream};
    use bytes::Bytes;
    use mockall::mock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    mock! {
        Backend {}

        #[async_trait]
        impl StorageBackend for Backend {
            async fn list_page(
                &self,
                container: &str,
                continuation_token: Option<String>,
            ) -> BridgeResult<ListPage>;

            async fn read_object(&self, container: &str, key: &str) -> BridgeResult<ObjectRead>;

            async fn write_object(
                &self,
                container: &str,
                key: &str,
                body: ByteStream,
                metadata: ObjectMetadata,
                access_policy: AccessPolicy,
            ) -> BridgeResult<u64>;
        }
    }

    fn record(key: &str, size: u64) -> Arc<ObjectRecord> {
        Arc::new(ObjectRecord::new("src", key, size))
    }

    fn pool(backend: impl StorageBackend + 'static, parallelism: usize) -> TransferWorkerPool {
        TransferWorkerPool::new(
            Arc::new(backend),
            "src",
            "dst",
            parallelism,
            AccessPolicy::PublicRead,
            Arc::new(SyncCounters::new()),
        )
    }

    #[tokio::test]
    async fn test_successful_round_updates_counters() {
        let mut backend = MockBackend::new();
        backend.expect_read_object().returning(|container, key| {
            assert_eq!(container, "src");
            Ok(ObjectRead {
                body: byte_stream_from(Bytes::from(key.repeat(3))),
                metadata: ObjectMetadata::default().with_content_type("text/plain"),
            })
        });
        backend
            .expect_write_object()
            .times(2)
            .returning(|container, _, _, metadata, policy| {
                assert_eq!(container, "dst");
                assert_eq!(metadata.content_type.as_deref(), Some("text/plain"));
                assert_eq!(policy, AccessPolicy::PublicRead);
                Ok(3)
            });

        let pool = pool(backend, 4);
        let outcomes = pool.run_round(vec![record("a", 3), record("b", 3)]).await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(TransferOutcome::is_success));
        assert_eq!(outcomes[0].key(), "a");
        assert_eq!(outcomes[1].key(), "b");
        assert_eq!(pool.counters.items_copied(), 2);
        assert_eq!(pool.counters.bytes_sent(), 6);
    }

    #[tokio::test]
    async fn test_failures_are_classified() {
        let mut backend = MockBackend::new();
        backend.expect_read_object().returning(|_, key| match key {
            "bad" => Err(BridgeError::InvalidArgument("malformed key".to_string())),
            "flaky" => Err(BridgeError::OperationFailed("timeout".to_string())),
            _ => Ok(ObjectRead {
                body: byte_stream_from(Bytes::from_static(b"ok")),
                metadata: ObjectMetadata::default(),
            }),
        });
        backend.expect_write_object().returning(|_, _, _, _, _| Ok(2));

        let bus = EventBus::new(8);
        let mut events = bus.subscribe();
        let pool = pool(backend, 2).with_events(bus, "session");

        let outcomes = pool
            .run_round(vec![record("bad", 1), record("flaky", 1), record("fine", 2)])
            .await;

        assert!(matches!(
            &outcomes[0],
            TransferOutcome::PermanentFailure { key, .. } if key == "bad"
        ));
        assert!(matches!(
            &outcomes[1],
            TransferOutcome::RetryableFailure { record, reason }
                if record.key == "flaky" && reason.contains("timeout")
        ));
        assert!(outcomes[2].is_success());
        assert_eq!(pool.counters.items_copied(), 1);

        let mut permanent_flags = Vec::new();
        while let Ok(CoreEvent::Transfer(TransferEvent::Failed { permanent, .. })) =
            events.try_recv()
        {
            permanent_flags.push(permanent);
        }
        assert_eq!(permanent_flags, vec![true, false]);
    }

    #[tokio::test]
    async fn test_write_failure_is_retryable() {
        let mut backend = MockBackend::new();
        backend.expect_read_object().returning(|_, _| {
            Ok(ObjectRead {
                body: byte_stream_from(Bytes::from_static(b"data")),
                metadata: ObjectMetadata::default(),
            })
        });
        backend
            .expect_write_object()
            .returning(|_, _, _, _, _| Err(BridgeError::NotAvailable("throttled".to_string())));

        let outcomes = pool(backend, 1).run_round(vec![record("x", 4)]).await;
        assert!(matches!(outcomes[0], TransferOutcome::RetryableFailure { .. }));
    }

    #[tokio::test]
    async fn test_closed_semaphore_leaves_every_record_retryable() {
        let semaphore = Arc::new(Semaphore::new(2));
        semaphore.close();

        let pool = pool(MockBackend::new(), 2);
        let records = vec![record("a", 1), record("b", 2), record("c", 3)];
        let outcomes = pool.run_with_permits(records, semaphore).await;

        assert_eq!(outcomes.len(), 3);
        let keys: Vec<_> = outcomes.iter().map(TransferOutcome::key).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert!(outcomes
            .iter()
            .all(|o| matches!(o, TransferOutcome::RetryableFailure { .. })));
        assert_eq!(pool.counters.items_copied(), 0);
    }

    #[tokio::test]
    async fn test_empty_round() {
        let outcomes = pool(MockBackend::new(), 3).run_round(Vec::new()).await;
        assert!(outcomes.is_empty());
    }

    /// Panics while reading one key and tracks peak concurrency.
    struct PanickyBackend {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl StorageBackend for PanickyBackend {
        async fn list_page(&self, _: &str, _: Option<String>) -> BridgeResult<ListPage> {
            Ok(ListPage::default())
        }

        async fn read_object(&self, _: &str, key: &str) -> BridgeResult<ObjectRead> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if key == "boom" {
                panic!("reader exploded");
            }
            Ok(ObjectRead {
                body: byte_stream_from(Bytes::from(key.to_string())),
                metadata: ObjectMetadata::default(),
            })
        }

        async fn write_object(
            &self,
            _: &str,
            _: &str,
            body: ByteStream,
            _: ObjectMetadata,
            _: AccessPolicy,
        ) -> BridgeResult<u64> {
            Ok(collect_stream(body).await?.len() as u64)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_panic_becomes_retryable_and_concurrency_is_bounded() {
        let backend = Arc::new(PanickyBackend {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let pool = TransferWorkerPool::new(
            backend.clone(),
            "src",
            "dst",
            2,
            AccessPolicy::Private,
            Arc::new(SyncCounters::new()),
        );

        let mut records: Vec<_> = (0..8).map(|i| record(&format!("k{}", i), 2)).collect();
        records.insert(3, record("boom", 4));

        let outcomes = pool.run_round(records).await;

        assert_eq!(outcomes.len(), 9);
        assert!(matches!(
            &outcomes[3],
            TransferOutcome::RetryableFailure { record, .. } if record.key == "boom"
        ));
        assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 8);
        assert!(backend.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.counters.bytes_sent(), 16);
    }
}
