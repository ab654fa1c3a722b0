//! In-memory object store.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{
        byte_stream_from, collect_stream, AccessPolicy, ByteStream, ListPage, ObjectMetadata,
        ObjectRead, ObjectRecord, StorageBackend,
    },
};
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use crate::key::validate_key;

/// Default listing page size, matching common object-store defaults.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// An object held by [`MemoryObjectStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Bytes,
    pub metadata: ObjectMetadata,
    pub access_policy: AccessPolicy,
}

/// Object store kept entirely in memory.
///
/// Containers are created explicitly; listing is key-ordered and paginated
/// with the last returned key as continuation token. Reads and writes issued
/// through [`StorageBackend`] are counted so tests can assert how much work a
/// sync actually performed.
///
/// Objects seeded with [`put_object`](Self::put_object) bypass key
/// validation, which lets tests plant keys the write path will reject.
pub struct MemoryObjectStore {
    containers: RwLock<HashMap<String, BTreeMap<String, StoredObject>>>,
    page_size: usize,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create a store whose listings return at most `page_size` records per page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            containers: RwLock::new(HashMap::new()),
            page_size: page_size.max(1),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    pub async fn create_container(&self, container: &str) {
        self.containers
            .write()
            .await
            .entry(container.to_string())
            .or_default();
    }

    /// Seed an object directly, creating the container if needed.
    pub async fn put_object(
        &self,
        container: &str,
        key: &str,
        data: impl Into<Bytes>,
        metadata: ObjectMetadata,
    ) {
        self.containers
            .write()
            .await
            .entry(container.to_string())
            .or_default()
            .insert(
                key.to_string(),
                StoredObject {
                    data: data.into(),
                    metadata,
                    access_policy: AccessPolicy::Private,
                },
            );
    }

    pub async fn get_object(&self, container: &str, key: &str) -> Option<StoredObject> {
        self.containers
            .read()
            .await
            .get(container)
            .and_then(|objects| objects.get(key))
            .cloned()
    }

    pub async fn object_count(&self, container: &str) -> usize {
        self.containers
            .read()
            .await
            .get(container)
            .map_or(0, BTreeMap::len)
    }

    pub async fn keys(&self, container: &str) -> Vec<String> {
        self.containers
            .read()
            .await
            .get(container)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of `read_object` calls that reached an existing object.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `write_object` calls that stored an object.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.reads.store(0, Ordering::SeqCst);
        self.writes.store(0, Ordering::SeqCst);
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryObjectStore {
    async fn list_page(
        &self,
        container: &str,
        continuation_token: Option<String>,
    ) -> Result<ListPage> {
        let containers = self.containers.read().await;
        let objects = containers
            .get(container)
            .ok_or_else(|| BridgeError::ContainerNotFound(container.to_string()))?;

        let lower = match continuation_token.as_deref() {
            Some(token) => Bound::Excluded(token),
            None => Bound::Unbounded,
        };

        let mut remaining = objects.range::<str, _>((lower, Bound::Unbounded));
        let records: Vec<ObjectRecord> = remaining
            .by_ref()
            .take(self.page_size)
            .map(|(key, object)| {
                ObjectRecord::new(container, key.clone(), object.data.len() as u64)
                    .with_metadata(object.metadata.clone())
            })
            .collect();

        let next_token = if remaining.next().is_some() {
            records.last().map(|record| record.key.clone())
        } else {
            None
        };

        debug!(
            container,
            count = records.len(),
            has_more = next_token.is_some(),
            "Listed memory page"
        );
        Ok(ListPage::new(records, next_token))
    }

    async fn read_object(&self, container: &str, key: &str) -> Result<ObjectRead> {
        let object = self
            .containers
            .read()
            .await
            .get(container)
            .ok_or_else(|| BridgeError::ContainerNotFound(container.to_string()))?
            .get(key)
            .cloned()
            .ok_or_else(|| BridgeError::ObjectNotFound {
                container: container.to_string(),
                key: key.to_string(),
            })?;

        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(ObjectRead {
            body: byte_stream_from(object.data),
            metadata: object.metadata,
        })
    }

    async fn write_object(
        &self,
        container: &str,
        key: &str,
        body: ByteStream,
        metadata: ObjectMetadata,
        access_policy: AccessPolicy,
    ) -> Result<u64> {
        validate_key(key)?;

        if !self.containers.read().await.contains_key(container) {
            return Err(BridgeError::ContainerNotFound(container.to_string()));
        }

        let data = collect_stream(body).await?;
        let written = data.len() as u64;

        self.containers
            .write()
            .await
            .get_mut(container)
            .ok_or_else(|| BridgeError::ContainerNotFound(container.to_string()))?
            .insert(
                key.to_string(),
                StoredObject {
                    data,
                    metadata,
                    access_policy,
                },
            );

        self.writes.fetch_add(1, Ordering::SeqCst);
        debug!(container, key, bytes = written, "Stored memory object");
        Ok(written)
    }
}
