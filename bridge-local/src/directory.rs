//! Object store backed by a local directory tree, using Tokio file I/O.
//!
//! Layout under the root:
//!
//! ```text
//! <root>/<container>/<key>                          object bytes
//! <root>/.bucket-sync-meta/<container>/<uuid>.json  metadata + access policy
//! <root>/.bucket-sync-tmp/<uuid>                    in-flight writes
//! ```
//!
//! Sidecars are named by the v5 UUID of their key, so the metadata tree is
//! flat and no key can shadow another key's sidecar.
//!
//! Writes land in the temp directory first and are renamed into place, so a
//! listing never observes a partially written object.
//!
//! Listing walks the container depth first with each directory's entries
//! sorted, which yields keys in byte order. Subtrees that lie entirely at or
//! before the continuation token are skipped without being read.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{
        AccessPolicy, ByteStream, ListPage, ObjectMetadata, ObjectRead, ObjectRecord,
        StorageBackend,
    },
};
use futures_util::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::key::{validate_container, validate_key};
use crate::memory::DEFAULT_PAGE_SIZE;

const META_DIR: &str = ".bucket-sync-meta";
const TMP_DIR: &str = ".bucket-sync-tmp";

/// Sidecar persisted next to every object.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Sidecar {
    metadata: ObjectMetadata,
    access_policy: AccessPolicy,
}

/// Directory-backed object store.
///
/// Each container is a directory directly under the root and each key a
/// relative path inside it.
#[derive(Debug, Clone)]
pub struct DirectoryObjectStore {
    root: PathBuf,
    page_size: usize,
}

impl DirectoryObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Create the directory for `container` if it does not exist yet.
    pub async fn create_container(&self, container: &str) -> Result<()> {
        validate_container(container)?;
        let path = self.root.join(container);
        fs::create_dir_all(&path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, "Created container directory");
        Ok(())
    }

    /// Read the access policy recorded for an object, if any.
    pub async fn access_policy(&self, container: &str, key: &str) -> Result<Option<AccessPolicy>> {
        validate_container(container)?;
        validate_key(key)?;
        Ok(self
            .read_sidecar(container, key)
            .await?
            .map(|sidecar| sidecar.access_policy))
    }

    fn map_io_error(e: std::io::Error) -> BridgeError {
        BridgeError::Io(e)
    }

    fn container_path(&self, container: &str) -> PathBuf {
        self.root.join(container)
    }

    fn object_path(&self, container: &str, key: &str) -> PathBuf {
        key.split('/')
            .fold(self.container_path(container), |path, segment| path.join(segment))
    }

    fn sidecar_path(&self, container: &str, key: &str) -> PathBuf {
        let name = Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes());
        self.root
            .join(META_DIR)
            .join(container)
            .join(format!("{}.json", name))
    }

    async fn ensure_container(&self, container: &str) -> Result<PathBuf> {
        let path = self.container_path(container);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => Ok(path),
            Ok(_) => Err(BridgeError::ContainerNotFound(container.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(BridgeError::ContainerNotFound(container.to_string()))
            }
            Err(e) => Err(Self::map_io_error(e)),
        }
    }

    async fn read_sidecar(&self, container: &str, key: &str) -> Result<Option<Sidecar>> {
        let path = self.sidecar_path(container, key);
        match fs::read(&path).await {
            Ok(raw) => match serde_json::from_slice(&raw) {
                Ok(sidecar) => Ok(Some(sidecar)),
                Err(e) => {
                    warn!(path = ?path, error = %e, "Ignoring unreadable metadata sidecar");
                    Ok(None)
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::map_io_error(e)),
        }
    }

    async fn write_sidecar(&self, container: &str, key: &str, sidecar: &Sidecar) -> Result<()> {
        let path = self.sidecar_path(container, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(Self::map_io_error)?;
        }
        let raw = serde_json::to_vec_pretty(sidecar)
            .map_err(|e| BridgeError::OperationFailed(format!("encode metadata: {}", e)))?;
        fs::write(&path, raw).await.map_err(Self::map_io_error)?;
        Ok(())
    }

    async fn metadata_for(&self, container: &str, key: &str, size: u64) -> Result<ObjectMetadata> {
        let mut metadata = self
            .read_sidecar(container, key)
            .await?
            .map(|sidecar| sidecar.metadata)
            .unwrap_or_default();
        metadata.content_length = Some(size);
        Ok(metadata)
    }

    /// Children of `dir`, sorted so that popping from the end yields them in
    /// key order. A directory sorts as its name followed by `/`.
    async fn sorted_children(&self, dir: &Path, prefix: &str) -> Result<Vec<ScanEntry>> {
        let mut children = Vec::new();
        let mut read_dir = fs::read_dir(dir).await.map_err(Self::map_io_error)?;
        while let Some(entry) = read_dir.next_entry().await.map_err(Self::map_io_error)? {
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                warn!(path = ?entry.path(), "Skipping non UTF-8 file name");
                continue;
            };
            let file_type = entry.file_type().await.map_err(Self::map_io_error)?;
            let (key, is_dir) = if file_type.is_dir() {
                (format!("{}{}/", prefix, name), true)
            } else if file_type.is_file() {
                (format!("{}{}", prefix, name), false)
            } else {
                continue;
            };
            children.push(ScanEntry {
                key,
                path: entry.path(),
                is_dir,
            });
        }
        children.sort_by(|a, b| b.key.cmp(&a.key));
        Ok(children)
    }

    /// Up to `limit` `(key, size)` pairs after `start_after`, in key order.
    async fn scan_page(
        &self,
        container_path: &Path,
        start_after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<(String, u64)>> {
        let mut entries = Vec::with_capacity(limit);
        let mut pending = self.sorted_children(container_path, "").await?;

        while let Some(entry) = pending.pop() {
            if entries.len() >= limit {
                break;
            }
            if entry.is_dir {
                // Every key below `entry.key` sorts before the token unless the
                // token itself lies inside this directory.
                let already_listed = start_after.is_some_and(|token| {
                    entry.key.as_str() < token && !token.starts_with(entry.key.as_str())
                });
                if !already_listed {
                    let mut children = self.sorted_children(&entry.path, &entry.key).await?;
                    pending.append(&mut children);
                }
            } else if start_after.map_or(true, |token| entry.key.as_str() > token) {
                let size = fs::metadata(&entry.path)
                    .await
                    .map_err(Self::map_io_error)?
                    .len();
                entries.push((entry.key, size));
            }
        }

        Ok(entries)
    }
}

struct ScanEntry {
    /// Object key, or directory prefix ending in `/`
    key: String,
    path: PathBuf,
    is_dir: bool,
}

#[async_trait]
impl StorageBackend for DirectoryObjectStore {
    async fn list_page(
        &self,
        container: &str,
        continuation_token: Option<String>,
    ) -> Result<ListPage> {
        validate_container(container)?;
        let container_path = self.ensure_container(container).await?;
        let mut entries = self
            .scan_page(
                &container_path,
                continuation_token.as_deref(),
                self.page_size + 1,
            )
            .await?;
        let has_more = entries.len() > self.page_size;
        entries.truncate(self.page_size);

        let mut records = Vec::with_capacity(entries.len());
        for (key, size) in entries {
            let metadata = self.metadata_for(container, &key, size).await?;
            records.push(ObjectRecord::new(container, key, size).with_metadata(metadata));
        }

        let next_token = if has_more {
            records.last().map(|record| record.key.clone())
        } else {
            None
        };

        debug!(
            container,
            count = records.len(),
            has_more = next_token.is_some(),
            "Listed directory page"
        );
        Ok(ListPage::new(records, next_token))
    }

    async fn read_object(&self, container: &str, key: &str) -> Result<ObjectRead> {
        validate_container(container)?;
        validate_key(key)?;

        let path = self.object_path(container, key);
        let file = fs::File::open(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => BridgeError::ObjectNotFound {
                container: container.to_string(),
                key: key.to_string(),
            },
            _ => Self::map_io_error(e),
        })?;
        let size = file.metadata().await.map_err(Self::map_io_error)?.len();
        let metadata = self.metadata_for(container, key, size).await?;

        debug!(path = ?path, size, "Opened object for reading");
        Ok(ObjectRead {
            body: Box::pin(ReaderStream::new(file).map_err(Self::map_io_error)),
            metadata,
        })
    }

    async fn write_object(
        &self,
        container: &str,
        key: &str,
        mut body: ByteStream,
        metadata: ObjectMetadata,
        access_policy: AccessPolicy,
    ) -> Result<u64> {
        validate_container(container)?;
        validate_key(key)?;
        self.ensure_container(container).await?;

        let tmp_dir = self.root.join(TMP_DIR);
        fs::create_dir_all(&tmp_dir).await.map_err(Self::map_io_error)?;
        let tmp_path = tmp_dir.join(Uuid::new_v4().to_string());

        let mut file = fs::File::create(&tmp_path).await.map_err(Self::map_io_error)?;
        let mut written = 0u64;
        let streamed: Result<()> = async {
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await.map_err(Self::map_io_error)?;
                written += chunk.len() as u64;
            }
            file.flush().await.map_err(Self::map_io_error)?;
            Ok(())
        }
        .await;
        drop(file);

        if let Err(e) = streamed {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e);
        }

        let path = self.object_path(container, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(Self::map_io_error)?;
        }
        if let Err(e) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(Self::map_io_error(e));
        }

        self.write_sidecar(
            container,
            key,
            &Sidecar {
                metadata,
                access_policy,
            },
        )
        .await?;

        debug!(path = ?path, size = written, policy = %access_policy, "Wrote object");
        Ok(written)
    }
}
