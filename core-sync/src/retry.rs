//! # Retry Coordinator
//!
//! Drives copy rounds to a terminal state.
//!
//! ## State Machine
//!
//! ```text
//! Running ──(retry set shrank, still non-empty)──> Running
//! Running ──(retry set empty)────────────────────> Converged
//! Running ──(retry set did not shrink)───────────> Exhausted
//! Running ──(round limit reached, non-empty)─────> Exhausted
//! ```
//!
//! `Converged` and `Exhausted` are terminal. Requiring the retry set to
//! strictly shrink bounds the number of rounds by the inventory size even
//! without a round limit.
//!
//! The coordinator does no I/O. The session hands it each round's outcomes
//! and asks it for the next retry set.

use crate::model::{FailedKey, Inventory, TransferOutcome};
use crate::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

/// Where the coordinator is in its round loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryState {
    /// More rounds are needed
    Running,
    /// Every record was either copied or permanently rejected
    Converged,
    /// Retryable failures stopped shrinking (or the round limit was hit)
    Exhausted,
}

impl RetryState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RetryState::Converged | RetryState::Exhausted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RetryState::Running => "running",
            RetryState::Converged => "converged",
            RetryState::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for RetryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tally of one recorded round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSummary {
    /// 1-based round number
    pub round: u32,
    pub submitted: u64,
    pub succeeded: u64,
    pub retryable: u64,
    pub permanent: u64,
    /// Keys rejected permanently in this round
    pub new_permanent: Vec<FailedKey>,
    /// State after the round
    pub state: RetryState,
}

#[derive(Debug)]
pub struct RetryCoordinator {
    state: RetryState,
    total_count: u64,
    retry_set: Inventory,
    last_reasons: HashMap<String, String>,
    permanent_failures: Vec<FailedKey>,
    succeeded: u64,
    rounds: u32,
    max_rounds: Option<u32>,
}

impl RetryCoordinator {
    /// Start in `Running` with the whole inventory as the first retry set.
    pub fn new(inventory: &Inventory, max_rounds: Option<u32>) -> Self {
        Self {
            state: RetryState::Running,
            total_count: inventory.total_count(),
            retry_set: inventory.clone(),
            last_reasons: HashMap::new(),
            permanent_failures: Vec::new(),
            succeeded: 0,
            rounds: 0,
            max_rounds,
        }
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn retry_set(&self) -> &Inventory {
        &self.retry_set
    }

    pub fn permanent_failures(&self) -> &[FailedKey] {
        &self.permanent_failures
    }

    /// Records copied across all recorded rounds.
    pub fn succeeded(&self) -> u64 {
        self.succeeded
    }

    /// `succeeded + permanent + pending == total`, checked between rounds.
    pub fn is_balanced(&self) -> bool {
        self.succeeded + self.permanent_failures.len() as u64 + self.retry_set.total_count()
            == self.total_count
    }

    /// Records that never copied, with the last failure reason seen for each.
    /// Empty unless the coordinator is `Exhausted`.
    pub fn exhausted(&self) -> Vec<FailedKey> {
        if self.state != RetryState::Exhausted {
            return Vec::new();
        }
        self.retry_set
            .records()
            .iter()
            .map(|record| {
                let reason = self
                    .last_reasons
                    .get(&record.key)
                    .cloned()
                    .unwrap_or_default();
                FailedKey::new(record.key.clone(), reason)
            })
            .collect()
    }

    /// Records to submit for the next round.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` once the coordinator is terminal.
    pub fn next_round(&self) -> Result<Inventory> {
        if self.state.is_terminal() {
            return Err(self.transition_error(RetryState::Running));
        }
        Ok(self.retry_set.clone())
    }

    /// Fold one round's outcomes into the coordinator and advance its state.
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` if the coordinator is already terminal
    /// - `InvalidState` if the outcome count differs from the retry set size
    pub fn record_round(&mut self, outcomes: Vec<TransferOutcome>) -> Result<RoundSummary> {
        if self.state.is_terminal() {
            return Err(self.transition_error(RetryState::Running));
        }

        let submitted = self.retry_set.records().len();
        if outcomes.len() != submitted {
            return Err(SyncError::InvalidState(format!(
                "round {} returned {} outcomes for {} records",
                self.rounds + 1,
                outcomes.len(),
                submitted
            )));
        }

        let mut next_set = Vec::new();
        let mut new_permanent = Vec::new();
        let mut succeeded = 0u64;

        for outcome in outcomes {
            match outcome {
                TransferOutcome::Success { .. } => succeeded += 1,
                TransferOutcome::RetryableFailure { record, reason } => {
                    self.last_reasons.insert(record.key.clone(), reason);
                    next_set.push(record);
                }
                TransferOutcome::PermanentFailure { key, reason } => {
                    new_permanent.push(FailedKey::new(key, reason));
                }
            }
        }

        self.rounds += 1;
        let next_state = self.next_state(submitted, next_set.len());
        self.validate_transition(next_state)?;

        let summary = RoundSummary {
            round: self.rounds,
            submitted: submitted as u64,
            succeeded,
            retryable: next_set.len() as u64,
            permanent: new_permanent.len() as u64,
            new_permanent: new_permanent.clone(),
            state: next_state,
        };

        self.succeeded += succeeded;
        self.permanent_failures.extend(new_permanent);
        self.retry_set = Inventory::from_shared(next_set);
        self.state = next_state;

        debug!(
            round = summary.round,
            succeeded = summary.succeeded,
            retryable = summary.retryable,
            permanent = summary.permanent,
            "Round recorded"
        );
        if next_state.is_terminal() {
            info!(rounds = self.rounds, state = %next_state, "Retry loop finished");
        }

        Ok(summary)
    }

    fn next_state(&self, submitted: usize, remaining: usize) -> RetryState {
        if remaining == 0 {
            RetryState::Converged
        } else if remaining >= submitted {
            RetryState::Exhausted
        } else if self.max_rounds.is_some_and(|max| self.rounds >= max) {
            RetryState::Exhausted
        } else {
            RetryState::Running
        }
    }

    fn validate_transition(&self, to: RetryState) -> Result<()> {
        let valid = match (self.state, to) {
            (RetryState::Running, _) => true,
            (RetryState::Converged, _) => false,
            (RetryState::Exhausted, _) => false,
        };

        if !valid {
            return Err(self.transition_error(to));
        }
        Ok(())
    }

    fn transition_error(&self, to: RetryState) -> SyncError {
        SyncError::InvalidStateTransition {
            from: self.state.as_str().to_string(),
            to: to.as_str().to_string(),
            reason: format!(
                "Cannot transition from {} to {}",
                self.state.as_str(),
                to.as_str()
            ),
        }
    }
}
