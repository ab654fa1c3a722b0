//! Object Storage Abstractions
//!
//! Defines the capability the sync engine consumes from an object store:
//! paginated listing, streaming reads and streaming writes with an access
//! policy. Wire protocols (S3, GCS, a local directory, ...) live behind
//! [`StorageBackend`] implementations.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::pin::Pin;
use std::str::FromStr;

use crate::error::{BridgeError, Result};

/// Streamed object body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Wrap an in-memory buffer as a single-chunk [`ByteStream`].
pub fn byte_stream_from(bytes: Bytes) -> ByteStream {
    Box::pin(stream::once(async move { Ok(bytes) }))
}

/// Drain a [`ByteStream`] into one contiguous buffer.
///
/// Stops at the first chunk error and returns it.
pub async fn collect_stream(mut body: ByteStream) -> Result<Bytes> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = body.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    Ok(buffer.freeze())
}

/// Canned access policy applied to a written object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessPolicy {
    /// Only the owner can read or write
    #[default]
    Private,
    /// Anyone can read, only the owner can write
    PublicRead,
    /// Anyone can read and write
    PublicReadWrite,
    /// Any authenticated principal can read
    AuthenticatedRead,
}

impl AccessPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessPolicy::Private => "private",
            AccessPolicy::PublicRead => "public-read",
            AccessPolicy::PublicReadWrite => "public-read-write",
            AccessPolicy::AuthenticatedRead => "authenticated-read",
        }
    }
}

impl FromStr for AccessPolicy {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "private" => Ok(AccessPolicy::Private),
            "public-read" => Ok(AccessPolicy::PublicRead),
            "public-read-write" => Ok(AccessPolicy::PublicReadWrite),
            "authenticated-read" => Ok(AccessPolicy::AuthenticatedRead),
            other => Err(BridgeError::InvalidArgument(format!(
                "unknown access policy: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for AccessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata carried alongside an object's bytes.
///
/// The sync engine treats this as opaque and copies it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    #[serde(default)]
    pub user_metadata: BTreeMap<String, String>,
}

impl ObjectMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_user_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_metadata.insert(key.into(), value.into());
        self
    }
}

/// One listed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    /// Container the object was listed from
    pub container: String,
    /// Key, unique within the container
    pub key: String,
    /// Size in bytes as reported by the listing
    pub size: u64,
    /// Metadata reported by the listing
    pub metadata: ObjectMetadata,
}

impl ObjectRecord {
    pub fn new(container: impl Into<String>, key: impl Into<String>, size: u64) -> Self {
        Self {
            container: container.into(),
            key: key.into(),
            size,
            metadata: ObjectMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: ObjectMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// One page of a container listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub records: Vec<ObjectRecord>,
    /// Token to pass to the next `list_page` call; `None` on the last page
    pub next_token: Option<String>,
}

impl ListPage {
    pub fn new(records: Vec<ObjectRecord>, next_token: Option<String>) -> Self {
        Self {
            records,
            next_token,
        }
    }

    pub fn is_last(&self) -> bool {
        self.next_token.is_none()
    }
}

/// An object opened for reading.
pub struct ObjectRead {
    pub body: ByteStream,
    pub metadata: ObjectMetadata,
}

impl fmt::Debug for ObjectRead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRead")
            .field("body", &"ByteStream { ... }")
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// Object storage capability
///
/// Implementations must be safe to call concurrently from many tasks: the
/// transfer pool issues reads and writes for different keys in parallel.
///
/// # Errors
///
/// Implementations report malformed requests (invalid key, invalid container
/// name) as [`BridgeError::InvalidArgument`]. Every other variant is treated
/// by callers as a transient backend fault.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::{AccessPolicy, StorageBackend};
///
/// async fn copy_one(backend: &dyn StorageBackend, key: &str) -> Result<u64> {
///     let object = backend.read_object("source", key).await?;
///     backend
///         .write_object("dest", key, object.body, object.metadata, AccessPolicy::PublicRead)
///         .await
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// List one page of `container`.
    ///
    /// Pass `None` for the first page and the previous page's `next_token`
    /// afterwards.
    async fn list_page(
        &self,
        container: &str,
        continuation_token: Option<String>,
    ) -> Result<ListPage>;

    /// Open an object for streaming reads.
    async fn read_object(&self, container: &str, key: &str) -> Result<ObjectRead>;

    /// Write an object from a byte stream, returning the number of bytes stored.
    async fn write_object(
        &self,
        container: &str,
        key: &str,
        body: ByteStream,
        metadata: ObjectMetadata,
        access_policy: AccessPolicy,
    ) -> Result<u64>;
}
