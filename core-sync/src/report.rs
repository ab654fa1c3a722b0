//! Final summary of a sync session.

use crate::format::{format_hms, human_readable_bytes};
use crate::model::FailedKey;
use crate::retry::RetryState;
use core_async::time::Duration;
use std::fmt;

/// How a finished session should be reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Converged with nothing rejected
    Success,
    /// Some keys were rejected or never copied
    PartialFailure,
}

/// Immutable result of [`SyncSession::run`](crate::SyncSession::run).
///
/// The `Display` impl prints the runtime and both failure lists:
///
/// ```text
/// Total runtime 00:01:12
/// BAD KEYS:
/// 	bad/key
/// END BAD KEYS
/// RETRY EXHAUSTED:
/// END RETRY EXHAUSTED
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub session_id: String,
    pub source: String,
    pub destination: String,
    pub total_count: u64,
    pub total_bytes: u64,
    pub items_copied: u64,
    pub bytes_sent: u64,
    pub elapsed: Duration,
    pub rounds: u32,
    pub final_state: RetryState,
    pub permanent_failures: Vec<FailedKey>,
    pub exhausted: Vec<FailedKey>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.final_state == RetryState::Converged
            && self.permanent_failures.is_empty()
            && self.exhausted.is_empty()
    }

    pub fn outcome(&self) -> SyncOutcome {
        if self.is_success() {
            SyncOutcome::Success
        } else {
            SyncOutcome::PartialFailure
        }
    }

    /// One-line summary suitable for a log message.
    pub fn summary(&self) -> String {
        format!(
            "{} of {} objects copied ({}) in {} round(s); {} rejected, {} exhausted",
            self.items_copied,
            self.total_count,
            human_readable_bytes(self.bytes_sent),
            self.rounds,
            self.permanent_failures.len(),
            self.exhausted.len()
        )
    }
}

/// Write a `<title>:` / `END <title>` block with one tab-indented key per line.
pub(crate) fn write_key_block(
    f: &mut impl fmt::Write,
    title: &str,
    keys: &[FailedKey],
) -> fmt::Result {
    writeln!(f, "{}:", title)?;
    for failed in keys {
        writeln!(f, "\t{}", failed.key)?;
    }
    write!(f, "END {}", title)
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total runtime {}", format_hms(self.elapsed))?;
        write_key_block(f, "BAD KEYS", &self.permanent_failures)?;
        writeln!(f)?;
        write_key_block(f, "RETRY EXHAUSTED", &self.exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(state: RetryState, bad: &[&str], exhausted: &[&str]) -> SyncReport {
        SyncReport {
            session_id: "s".to_string(),
            source: "src".to_string(),
            destination: "dst".to_string(),
            total_count: 3,
            total_bytes: 30,
            items_copied: 3 - bad.len() as u64 - exhausted.len() as u64,
            bytes_sent: 10,
            elapsed: Duration::from_secs(72),
            rounds: 2,
            final_state: state,
            permanent_failures: bad.iter().map(|k| FailedKey::new(*k, "bad")).collect(),
            exhausted: exhausted.iter().map(|k| FailedKey::new(*k, "503")).collect(),
        }
    }

    #[test]
    fn test_display() {
        let text = report(RetryState::Converged, &["bad/key"], &[]).to_string();
        assert_eq!(
            text,
            "Total runtime 00:01:12\nBAD KEYS:\n\tbad/key\nEND BAD KEYS\nRETRY EXHAUSTED:\nEND RETRY EXHAUSTED"
        );
    }

    #[test]
    fn test_outcome() {
        assert_eq!(
            report(RetryState::Converged, &[], &[]).outcome(),
            SyncOutcome::Success
        );
        assert_eq!(
            report(RetryState::Converged, &["x"], &[]).outcome(),
            SyncOutcome::PartialFailure
        );
        assert_eq!(
            report(RetryState::Exhausted, &[], &["y"]).outcome(),
            SyncOutcome::PartialFailure
        );
    }

    #[test]
    fn test_summary() {
        let summary = report(RetryState::Exhausted, &[], &["y"]).summary();
        assert_eq!(
            summary,
            "2 of 3 objects copied (10 B) in 2 round(s); 0 rejected, 1 exhausted"
        );
    }
}
