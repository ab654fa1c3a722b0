//! Task spawning and scoped task ownership.
//!
//! `spawn` hands a future to the Tokio scheduler and returns a plain
//! `JoinHandle`. [`ScopedTask`] wraps such a handle and aborts the task when
//! the wrapper is dropped, which ties the lifetime of a background task (for
//! example a progress ticker) to the scope that started it.
//!
//! # Examples
//!
//! ```rust
//! use core_async::task::{self, ScopedTask};
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let ticker = ScopedTask::spawn(async {
//!         loop {
//!             sleep(Duration::from_millis(5)).await;
//!         }
//!     });
//!     // Leaving the scope aborts the loop above.
//!     drop(ticker);
//!
//!     let handle = task::spawn(async { 42 });
//!     assert_eq!(handle.await.unwrap(), 42);
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

pub use tokio::task::{spawn_blocking, yield_now, JoinError, JoinHandle, JoinSet};

/// Spawns a new asynchronous task on the current Tokio runtime.
///
/// The spawned task may run on a different worker thread.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

/// Result type for task operations.
pub type Result<T> = std::result::Result<T, JoinError>;

/// A spawned task that is aborted when this handle is dropped.
///
/// Awaiting a `ScopedTask` yields the task's output exactly like a
/// `JoinHandle`. Dropping it without awaiting aborts the task at its next
/// suspension point.
#[derive(Debug)]
pub struct ScopedTask<T> {
    handle: Option<JoinHandle<T>>,
}

impl<T> ScopedTask<T>
where
    T: Send + 'static,
{
    /// Spawn `future` and tie its lifetime to the returned guard.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            handle: Some(tokio::task::spawn(future)),
        }
    }
}

impl<T> ScopedTask<T> {
    /// Abort the task now. Awaiting afterwards yields a cancelled `JoinError`
    /// unless the task had already finished.
    pub fn abort(&self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }

    /// Whether the underlying task has finished (normally or by abort).
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Release the task from the guard; it keeps running after this returns.
    pub fn detach(mut self) -> JoinHandle<T> {
        self.handle
            .take()
            .expect("ScopedTask handle is only taken by detach")
    }
}

impl<T> Future for ScopedTask<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.handle.as_mut() {
            Some(handle) => Pin::new(handle).poll(cx),
            None => panic!("ScopedTask polled after detach"),
        }
    }
}

impl<T> Drop for ScopedTask<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
