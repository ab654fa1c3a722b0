//! Integration tests for end-to-end sync sessions
//!
//! These tests drive `SyncSession::run` against in-memory and on-disk
//! backends and verify:
//! - Mixed success / transient / permanent outcomes converging over rounds
//! - Re-running a sync copies everything again
//! - Exhaustion when a transient fault never clears
//! - Listing failures aborting the session
//! - The accounting invariant on every terminal state

use async_trait::async_trait;
use bridge_local::{DirectoryObjectStore, MemoryObjectStore};
use bridge_traits::{
    error::{BridgeError, Result as BridgeResult},
    storage::{
        byte_stream_from, AccessPolicy, ByteStream, ListPage, ObjectMetadata, ObjectRead,
        ObjectRecord, StorageBackend,
    },
};
use bytes::Bytes;
use core_async::sync::Mutex as AsyncMutex;
use core_async::time::Duration;
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use core_runtime::SyncConfig;
use core_sync::{CollectingSink, RetryState, SyncError, SyncOutcome, SyncReport, SyncSession};
use mockall::mock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

// ============================================================================
// Mock Implementations
// ============================================================================

/// Wraps a memory store and injects faults.
struct FaultyBackend {
    inner: MemoryObjectStore,
    /// Remaining transient read failures per key
    transient: AsyncMutex<HashMap<String, u32>>,
    /// Keys whose reads are rejected as invalid
    invalid: HashSet<String>,
    /// Fail the listing page with this 1-based index
    fail_list_page: Option<u32>,
    pages_listed: AtomicU32,
}

impl FaultyBackend {
    fn new(inner: MemoryObjectStore) -> Self {
        Self {
            inner,
            transient: AsyncMutex::new(HashMap::new()),
            invalid: HashSet::new(),
            fail_list_page: None,
            pages_listed: AtomicU32::new(0),
        }
    }

    async fn fail_reads(self, key: &str, times: u32) -> Self {
        self.transient.lock().await.insert(key.to_string(), times);
        self
    }

    fn reject(mut self, key: &str) -> Self {
        self.invalid.insert(key.to_string());
        self
    }

    fn fail_listing_at(mut self, page: u32) -> Self {
        self.fail_list_page = Some(page);
        self
    }
}

#[async_trait]
impl StorageBackend for FaultyBackend {
    async fn list_page(
        &self,
        container: &str,
        continuation_token: Option<String>,
    ) -> BridgeResult<ListPage> {
        let page = self.pages_listed.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_list_page == Some(page) {
            return Err(BridgeError::OperationFailed(
                "listing service unavailable".to_string(),
            ));
        }
        self.inner.list_page(container, continuation_token).await
    }

    async fn read_object(&self, container: &str, key: &str) -> BridgeResult<ObjectRead> {
        if self.invalid.contains(key) {
            return Err(BridgeError::InvalidArgument(format!(
                "key {} is not allowed",
                key
            )));
        }
        {
            let mut transient = self.transient.lock().await;
            if let Some(remaining) = transient.get_mut(key) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(BridgeError::OperationFailed("503 Slow Down".to_string()));
                }
            }
        }
        self.inner.read_object(container, key).await
    }

    async fn write_object(
        &self,
        container: &str,
        key: &str,
        body: ByteStream,
        metadata: ObjectMetadata,
        access_policy: AccessPolicy,
    ) -> BridgeResult<u64> {
        self.inner
            .write_object(container, key, body, metadata, access_policy)
            .await
    }
}

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

// ============================================================================
// Helpers
// ============================================================================

fn config() -> SyncConfig {
    SyncConfig::builder()
        .source_container("src")
        .dest_container("dst")
        .parallelism(4)
        .progress_interval(Duration::from_secs(60))
        .build()
        .unwrap()
}

async fn seeded_store(page_size: usize, objects: &[(&str, &'static [u8])]) -> MemoryObjectStore {
    let store = MemoryObjectStore::with_page_size(page_size);
    store.create_container("dst").await;
    for (key, data) in objects {
        store
            .put_object(
                "src",
                key,
                Bytes::from_static(data),
                ObjectMetadata::new().with_content_type("application/octet-stream"),
            )
            .await;
    }
    store
}

fn assert_balanced(report: &SyncReport) {
    assert_eq!(
        report.items_copied + report.permanent_failures.len() as u64 + report.exhausted.len() as u64,
        report.total_count,
        "accounting invariant violated: {:?}",
        report
    );
}

fn temp_root(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "core-sync-{}-{}-{}",
        label,
        std::process::id(),
        uuid::Uuid::new_v4()
    ))
}

// ============================================================================
// Tests
// ============================================================================

#[core_async::test]
async fn test_transient_and_permanent_failures_converge() {
    let store = seeded_store(1000, &[("A", b"aaaa"), ("B", b"bb"), ("C", b"c")]).await;
    let backend = Arc::new(FaultyBackend::new(store).fail_reads("B", 1).await.reject("C"));

    let bus = EventBus::new(64);
    let mut events = bus.subscribe();
    let sink = Arc::new(CollectingSink::new());

    let report = SyncSession::new(config(), backend.clone())
        .unwrap()
        .with_sink(sink.clone())
        .with_event_bus(bus)
        .run()
        .await
        .unwrap();

    assert_eq!(report.final_state, RetryState::Converged);
    assert_eq!(report.rounds, 2);
    assert_eq!(report.items_copied, 2);
    assert_eq!(report.bytes_sent, 6);
    assert_eq!(report.total_bytes, 7);
    assert_eq!(
        report
            .permanent_failures
            .iter()
            .map(|f| f.key.as_str())
            .collect::<Vec<_>>(),
        vec!["C"]
    );
    assert!(report.exhausted.is_empty());
    assert_eq!(report.outcome(), SyncOutcome::PartialFailure);
    assert_balanced(&report);

    let copied = backend.inner.get_object("dst", "A").await.unwrap();
    assert_eq!(copied.data, Bytes::from_static(b"aaaa"));
    assert_eq!(copied.access_policy, AccessPolicy::PublicRead);
    assert_eq!(
        copied.metadata.content_type.as_deref(),
        Some("application/octet-stream")
    );
    assert!(backend.inner.get_object("dst", "C").await.is_none());

    let lines = sink.lines();
    assert_eq!(lines[0], "Building Object List...");
    assert!(lines.contains(&"3\t\tobjects found with a total size of 7 B".to_string()));
    assert!(lines.contains(&"BAD KEYS:\n\tC\nEND BAD KEYS".to_string()));
    assert!(lines.last().unwrap().contains("[ 2/3 ]"));

    let mut rounds = Vec::new();
    let mut completed = false;
    while let Ok(event) = events.try_recv() {
        match event {
            CoreEvent::Sync(SyncEvent::RoundCompleted {
                succeeded,
                retryable,
                permanent,
                ..
            }) => rounds.push((succeeded, retryable, permanent)),
            CoreEvent::Sync(SyncEvent::Completed { converged, .. }) => completed = converged,
            _ => {}
        }
    }
    assert_eq!(rounds, vec![(1, 1, 1), (1, 0, 0)]);
    assert!(completed);
}

#[core_async::test]
async fn test_clean_sync_is_success() {
    let store = seeded_store(2, &[("a", b"1"), ("b/c", b"22"), ("d", b"333")]).await;
    let backend = Arc::new(store);

    let report = SyncSession::new(config(), backend.clone())
        .unwrap()
        .with_sink(Arc::new(CollectingSink::new()))
        .run()
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.rounds, 1);
    assert_eq!(report.items_copied, 3);
    assert_eq!(backend.keys("dst").await, vec!["a", "b/c", "d"]);
    assert_balanced(&report);
}

#[core_async::test]
async fn test_rerun_recopies_everything() {
    let store = seeded_store(1000, &[("x", b"x"), ("y", b"yy")]).await;
    let backend = Arc::new(store);

    for _ in 0..2 {
        backend.reset_counters();
        let report = SyncSession::new(config(), backend.clone())
            .unwrap()
            .with_sink(Arc::new(CollectingSink::new()))
            .run()
            .await
            .unwrap();

        assert_eq!(report.items_copied, 2);
        assert_eq!(backend.read_count(), 2);
        assert_eq!(backend.write_count(), 2);
    }
    assert_eq!(backend.object_count("dst").await, 2);
}

#[core_async::test]
async fn test_persistent_transient_failure_exhausts() {
    let store = seeded_store(1000, &[("ok", b"fine"), ("stuck", b"never")]).await;
    let backend = Arc::new(FaultyBackend::new(store).fail_reads("stuck", u32::MAX).await);

    let report = SyncSession::new(config(), backend)
        .unwrap()
        .with_sink(Arc::new(CollectingSink::new()))
        .run()
        .await
        .unwrap();

    assert_eq!(report.final_state, RetryState::Exhausted);
    assert_eq!(report.rounds, 2);
    assert_eq!(report.exhausted.len(), 1);
    assert_eq!(report.exhausted[0].key, "stuck");
    assert!(report.exhausted[0].reason.contains("503"));
    assert!(report.to_string().contains("RETRY EXHAUSTED:\n\tstuck\nEND RETRY EXHAUSTED"));
    assert_balanced(&report);
}

#[core_async::test]
async fn test_round_limit_stops_early() {
    let store = seeded_store(1000, &[("a", b"a"), ("b", b"b"), ("c", b"c")]).await;
    let backend = Arc::new(FaultyBackend::new(store).fail_reads("c", 3).await);

    let config = SyncConfig::builder()
        .source_container("src")
        .dest_container("dst")
        .max_rounds(1)
        .progress_interval(Duration::from_secs(60))
        .build()
        .unwrap();

    let report = SyncSession::new(config, backend)
        .unwrap()
        .with_sink(Arc::new(CollectingSink::new()))
        .run()
        .await
        .unwrap();

    assert_eq!(report.final_state, RetryState::Exhausted);
    assert_eq!(report.rounds, 1);
    assert_eq!(report.items_copied, 2);
    assert_balanced(&report);
}

#[core_async::test]
async fn test_listing_failure_on_second_page_is_fatal() {
    let store = seeded_store(1, &[("a", b"a"), ("b", b"b")]).await;
    let backend = Arc::new(FaultyBackend::new(store).fail_listing_at(2));

    let bus = EventBus::new(16);
    let mut events = bus.subscribe();

    let err = SyncSession::new(config(), backend.clone())
        .unwrap()
        .with_sink(Arc::new(CollectingSink::new()))
        .with_event_bus(bus)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::BackendUnavailable { .. }));
    assert_eq!(backend.inner.object_count("dst").await, 0);
    assert_eq!(backend.inner.write_count(), 0);

    let mut failed = false;
    while let Ok(event) = events.try_recv() {
        if let CoreEvent::Sync(SyncEvent::Failed { message, .. }) = event {
            assert!(message.contains("listing service unavailable"));
            failed = true;
        }
    }
    assert!(failed);
}

#[core_async::test]
async fn test_missing_source_container_is_fatal() {
    let store = MemoryObjectStore::new();
    store.create_container("dst").await;

    let err = SyncSession::new(config(), Arc::new(store))
        .unwrap()
        .with_sink(Arc::new(CollectingSink::new()))
        .run()
        .await
        .unwrap_err();

    assert!(err.to_string().contains("src"));
}

#[core_async::test]
async fn test_seeded_invalid_key_is_rejected_by_write_path() {
    let store = seeded_store(1000, &[("good", b"g"), ("bad//key", b"b")]).await;

    let report = SyncSession::new(config(), Arc::new(store))
        .unwrap()
        .with_sink(Arc::new(CollectingSink::new()))
        .run()
        .await
        .unwrap();

    assert_eq!(report.final_state, RetryState::Converged);
    assert_eq!(report.permanent_failures.len(), 1);
    assert_eq!(report.permanent_failures[0].key, "bad//key");
}

#[core_async::test]
async fn test_empty_source_converges() {
    let store = MemoryObjectStore::new();
    store.create_container("src").await;
    store.create_container("dst").await;

    let report = SyncSession::new(config(), Arc::new(store))
        .unwrap()
        .with_sink(Arc::new(CollectingSink::new()))
        .run()
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.total_count, 0);
    assert_eq!(report.rounds, 1);
}

#[core_async::test]
async fn test_invalid_config_is_rejected() {
    let mut config = config();
    config.parallelism = 0;

    let result = SyncSession::new(config, Arc::new(MemoryObjectStore::new()));
    assert!(matches!(result, Err(SyncError::Config(_))));
}

#[core_async::test]
async fn test_mocked_backend_round_trip() {
    let mut backend = MockBackend::new();
    backend.expect_list_page().times(1).returning(|_, _| {
        Ok(ListPage::new(
            vec![ObjectRecord::new("src", "only", 5)],
            None,
        ))
    });
    backend
        .expect_read_object()
        .withf(|container, key| container == "src" && key == "only")
        .times(1)
        .returning(|_, _| {
            Ok(ObjectRead {
                body: byte_stream_from(Bytes::from_static(b"hello")),
                metadata: ObjectMetadata::new(),
            })
        });
    backend
        .expect_write_object()
        .withf(|container, key, _, _, policy| {
            container == "dst" && key == "only" && *policy == AccessPolicy::PublicRead
        })
        .times(1)
        .returning(|_, _, _, _, _| Ok(5));

    let report = SyncSession::new(config(), Arc::new(backend))
        .unwrap()
        .with_sink(Arc::new(CollectingSink::new()))
        .run()
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.bytes_sent, 5);
}

#[core_async::test]
async fn test_directory_store_end_to_end() {
    let root = temp_root("e2e");
    let store = DirectoryObjectStore::new(&root).with_page_size(2);
    store.create_container("src").await.unwrap();
    store.create_container("dst").await.unwrap();

    for (key, data) in [("a.txt", "alpha"), ("nested/b.txt", "beta"), ("nested/deep/c", "gamma")] {
        store
            .write_object(
                "src",
                key,
                byte_stream_from(Bytes::from(data)),
                ObjectMetadata::new().with_user_metadata("origin", "test"),
                AccessPolicy::Private,
            )
            .await
            .unwrap();
    }

    let backend = Arc::new(store);
    let report = SyncSession::new(config(), backend.clone())
        .unwrap()
        .with_sink(Arc::new(CollectingSink::new()))
        .run()
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.items_copied, 3);
    assert_eq!(report.bytes_sent, 14);

    let copied = std::fs::read_to_string(root.join("dst/nested/deep/c")).unwrap();
    assert_eq!(copied, "gamma");
    assert_eq!(
        backend.access_policy("dst", "nested/b.txt").await.unwrap(),
        Some(AccessPolicy::PublicRead)
    );

    let _ = std::fs::remove_dir_all(&root);
}
