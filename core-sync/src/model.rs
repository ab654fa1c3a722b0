//! # Sync Data Model
//!
//! Value types shared by the inventory, the transfer pool and the retry
//! coordinator.
//!
//! Records are listed once and then shared: the inventory owns them behind
//! `Arc`, and every round, worker and outcome holds a reference rather than a
//! copy.

use bridge_traits::ObjectRecord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a sync session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncSessionId(Uuid);

impl SyncSessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for SyncSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SyncSessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Inventory
// ============================================================================

/// The complete set of objects listed from a container.
///
/// Never mutated after construction. A retry round builds a new, smaller
/// inventory from the previous round's retryable failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    records: Vec<Arc<ObjectRecord>>,
    total_bytes: u64,
}

impl Inventory {
    pub fn new(records: Vec<ObjectRecord>) -> Self {
        Self::from_shared(records.into_iter().map(Arc::new).collect())
    }

    /// Build an inventory from records that are already shared.
    pub fn from_shared(records: Vec<Arc<ObjectRecord>>) -> Self {
        let total_bytes = records.iter().map(|record| record.size).sum();
        Self {
            records,
            total_bytes,
        }
    }

    pub fn records(&self) -> &[Arc<ObjectRecord>] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Arc<ObjectRecord>> {
        self.records
    }

    pub fn total_count(&self) -> u64 {
        self.records.len() as u64
    }

    /// Sum of every record's listed size.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|record| record.key.as_str())
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Result of one copy attempt for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Object copied; counters have already been updated.
    Success { key: String, bytes_written: u64 },
    /// Transient backend fault; the record goes into the next round.
    RetryableFailure {
        record: Arc<ObjectRecord>,
        reason: String,
    },
    /// The object can never be copied as named.
    PermanentFailure { key: String, reason: String },
}

impl TransferOutcome {
    pub fn key(&self) -> &str {
        match self {
            TransferOutcome::Success { key, .. } => key,
            TransferOutcome::RetryableFailure { record, .. } => &record.key,
            TransferOutcome::PermanentFailure { key, .. } => key,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Success { .. })
    }
}

/// A key that was not copied, with the last reason observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedKey {
    pub key: String,
    pub reason: String,
}

impl FailedKey {
    pub fn new(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
