//! # Local Bridge Implementations
//!
//! [`StorageBackend`](bridge_traits::StorageBackend) implementations that need
//! no network:
//! - [`MemoryObjectStore`] keeps containers in memory (tests, dry runs)
//! - [`DirectoryObjectStore`] maps containers to directories under a root
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_local::DirectoryObjectStore;
//! use std::sync::Arc;
//!
//! let backend = Arc::new(DirectoryObjectStore::new("/srv/buckets"));
//! // Hand `backend` to a SyncSession
//! ```

mod directory;
mod key;
mod memory;

pub use directory::DirectoryObjectStore;
pub use key::{validate_container, validate_key};
pub use memory::{MemoryObjectStore, StoredObject, DEFAULT_PAGE_SIZE};
