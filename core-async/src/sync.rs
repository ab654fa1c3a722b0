//! Synchronization primitives.
//!
//! Async-aware locks, channels and semaphores from `tokio::sync`, and the
//! `CancellationToken` from `tokio-util` used to stop background tasks
//! cooperatively.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{CancellationToken, Semaphore};
//! use std::sync::Arc;
//!
//! async fn example() {
//!     let permits = Arc::new(Semaphore::new(2));
//!     let _permit = permits.clone().acquire_owned().await.unwrap();
//!     assert_eq!(permits.available_permits(), 1);
//!
//!     let token = CancellationToken::new();
//!     token.cancel();
//!     token.cancelled().await;
//! }
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, AcquireError, Barrier, Mutex, MutexGuard, Notify,
    OwnedSemaphorePermit, RwLock, RwLockReadGuard, RwLockWriteGuard, Semaphore, SemaphorePermit,
};

pub use tokio_util::sync::{CancellationToken, DropGuard};
