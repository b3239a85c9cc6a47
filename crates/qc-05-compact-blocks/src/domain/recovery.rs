//! Recovery statistics recorded once per reconciliation call.

use std::time::Duration;

use super::ContentKey;

/// Outcome of one keys→transactions reconciliation call.
///
/// Recorded once by every call that probed the local store, whether it
/// completed, was cancelled, or was dropped while waiting.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecoveryStats {
    /// Transactions not in the local store when the call started.
    pub missing_at_start: usize,
    /// Of those, how many had arrived when the call returned.
    pub resolved: usize,
    /// Number of keys in the compact block.
    pub total_keys: usize,
    /// Time until the request reached a terminal state; zero on the fast path.
    pub elapsed: Duration,
    /// Hex encoded keys that were missing at start.
    pub missing_keys: Vec<String>,
}

impl RecoveryStats {
    /// Stats for a call that found every transaction locally.
    pub fn all_present(total_keys: usize) -> Self {
        Self {
            total_keys,
            ..Self::default()
        }
    }

    pub fn new(missing: &[ContentKey], total_keys: usize) -> Self {
        Self {
            missing_at_start: missing.len(),
            total_keys,
            missing_keys: missing.iter().map(ContentKey::to_hex).collect(),
            ..Self::default()
        }
    }

    /// Builder method: record how far the request got.
    pub fn with_outcome(mut self, still_missing: usize, elapsed: Duration) -> Self {
        self.resolved = self.missing_at_start.saturating_sub(still_missing);
        self.elapsed = elapsed;
        self
    }

    /// Elapsed time in whole milliseconds, saturating at `u64::MAX`.
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX)
    }

    /// Fraction of the initially missing transactions that were recovered.
    pub fn recovery_rate(&self) -> f64 {
        if self.missing_at_start == 0 {
            return 1.0;
        }
        self.resolved as f64 / self.missing_at_start as f64
    }
}
