//! Runtime abstraction layer for bucket-sync.
//!
//! The engine crates reach Tokio through this crate rather than depending on
//! it directly, so the executor choice lives in one place. Only the local
//! storage adapters, which need Tokio's file I/O, depend on Tokio themselves.
//!
//! # Modules
//!
//! - `runtime`: building a runtime and blocking on a future
//! - `task`: task spawning and the abort-on-drop [`task::ScopedTask`] guard
//! - `time`: sleeps, intervals, instants and timeouts
//! - `sync`: async-aware locks, semaphores and cancellation tokens
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_millis(10)).await;
//!         42
//!     });
//!     assert_eq!(handle.await.unwrap(), 42);
//! }
//! ```

// Re-export the async entry-point/test macros so downstream crates never need
// direct Tokio dependencies.
pub use core_async_macros::{main, test};

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use tokio::select;
pub use time::{sleep, Duration, Instant};
