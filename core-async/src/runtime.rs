//! Runtime utilities that abstract over the underlying async executor.
//!
//! Downstream crates (and the `#[core_async::main]` / `#[core_async::test]`
//! macros) build their runtime through these helpers instead of reaching for
//! Tokio's builder directly.

pub use tokio::runtime::{Builder, Handle, Runtime};

/// Runs the provided future to completion on a fresh multi-threaded runtime.
///
/// # Panics
///
/// Panics if the runtime cannot be constructed (for example when the process
/// is out of file descriptors for the I/O driver).
pub fn block_on<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("core_async::runtime::block_on: failed to build Tokio runtime")
        .block_on(future)
}

/// Runs the provided future on a multi-threaded runtime with a fixed number
/// of worker threads.
///
/// # Panics
///
/// Panics if `workers` is zero or the runtime cannot be constructed.
pub fn block_on_with_workers<F>(workers: usize, future: F) -> F::Output
where
    F: std::future::Future,
{
    Builder::new_multi_thread()
        .worker_threads(workers)
        .enable_all()
        .build()
        .expect("core_async::runtime::block_on_with_workers: failed to build Tokio runtime")
        .block_on(future)
}

/// Number of processing units available to this process, falling back to 1
/// when the platform cannot report it.
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
