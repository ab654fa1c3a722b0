//! # Host Bridge Traits
//!
//! Capability traits the sync engine requires from its environment.
//!
//! ## Overview
//!
//! This crate defines the contract between the core engine and concrete
//! object-store adapters. The engine never speaks a wire protocol itself; it
//! only consumes [`StorageBackend`](storage::StorageBackend).
//!
//! ## Traits
//!
//! - [`StorageBackend`](storage::StorageBackend) - Paginated listing, streaming
//!   reads, streaming writes with an access policy
//!
//! ## Adapters
//!
//! | Backend | Implementation Crate |
//! |---------|---------------------|
//! | In-memory | `bridge-local` (`MemoryObjectStore`) |
//! | Local directory | `bridge-local` (`DirectoryObjectStore`) |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Implementations should:
//!
//! - Report malformed input as `BridgeError::InvalidArgument` (never retried)
//! - Report everything else (timeouts, 5xx, I/O) with the remaining variants
//!   (retried by the sync engine)
//! - Include context such as container and key in messages
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single backend can be shared
//! across the transfer pool's tasks.

pub mod error;
pub mod storage;

pub use error::BridgeError;

pub use storage::{
    byte_stream_from, collect_stream, AccessPolicy, ByteStream, ListPage, ObjectMetadata,
    ObjectRead, ObjectRecord, StorageBackend,
};
