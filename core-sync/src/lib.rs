//! # Bucket Sync Engine
//!
//! Copies every object of a source container into a destination container
//! through the [`StorageBackend`](bridge_traits::StorageBackend) abstraction.
//!
//! ## Overview
//!
//! A [`SyncSession`] runs the whole pipeline:
//! - Listing the source page by page into an [`Inventory`]
//! - Copying records concurrently through a bounded [`TransferWorkerPool`]
//! - Sorting failures into retryable and permanent ones
//! - Re-running retryable failures until the [`RetryCoordinator`] converges
//!   or gives up
//! - Printing a progress bar with an ETA while copies are in flight
//!
//! ## Components
//!
//! - **Inventory Builder** (`inventory`): Paginated, all-or-nothing listing
//! - **Transfer Worker Pool** (`worker_pool`): Semaphore-bounded copy tasks
//! - **Retry Coordinator** (`retry`): Round state machine with validated transitions
//! - **Progress Reporter** (`progress`): Periodic progress line and events
//! - **Sync Session** (`session`): Orchestrates one end-to-end sync
//! - **Report** (`report`): Final summary and exit outcome

pub mod counters;
pub mod error;
pub mod format;
pub mod inventory;
pub mod model;
pub mod progress;
pub mod report;
pub mod retry;
pub mod session;
pub mod worker_pool;

pub use counters::{CounterSnapshot, SyncCounters};
pub use error::{Result, SyncError};
pub use inventory::InventoryBuilder;
pub use model::{FailedKey, Inventory, SyncSessionId, TransferOutcome};
pub use progress::{
    CollectingSink, ProgressEvents, ProgressReporter, ProgressSink, ReporterSettings, StdoutSink,
};
pub use report::{SyncOutcome, SyncReport};
pub use retry::{RetryCoordinator, RetryState, RoundSummary};
pub use session::SyncSession;
pub use worker_pool::TransferWorkerPool;
