//! Shared progress counters.
//!
//! Workers increment, the progress reporter and the session read. Both values
//! only ever grow during a session.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct SyncCounters {
    items_copied: AtomicU64,
    bytes_sent: AtomicU64,
}

/// Point-in-time copy of [`SyncCounters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterSnapshot {
    pub items_copied: u64,
    pub bytes_sent: u64,
}

impl SyncCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one successfully copied object.
    pub fn record_success(&self, bytes_written: u64) {
        self.bytes_sent.fetch_add(bytes_written, Ordering::Relaxed);
        self.items_copied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn items_copied(&self) -> u64 {
        self.items_copied.load(Ordering::Relaxed)
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    /// The two reads are not taken atomically together; a concurrent success
    /// may be half-visible. Good enough for display.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            items_copied: self.items_copied(),
            bytes_sent: self.bytes_sent(),
        }
    }
}
