//! Recovery stats sinks.

use parking_lot::Mutex;
use tracing::info;

use crate::domain::RecoveryStats;
use crate::metrics;
use crate::ports::outbound::RecoveryStatsSink;

/// Logs each [`RecoveryStats`] as a structured event and feeds the
/// Prometheus recovery-rate histogram.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingStatsSink;

impl RecoveryStatsSink for TracingStatsSink {
    fn record(&self, stats: &RecoveryStats) {
        info!(
            missing_at_start = stats.missing_at_start,
            resolved = stats.resolved,
            total_keys = stats.total_keys,
            elapsed_ms = stats.elapsed_ms(),
            "[qc-05] Mempool recovery stats"
        );
        if stats.missing_at_start > 0 {
            metrics::observe_recovery_rate(stats.recovery_rate());
        }
    }
}

/// Sink that keeps every record in memory.
#[derive(Default)]
pub struct MockStatsSink {
    records: Mutex<Vec<RecoveryStats>>,
}

impl MockStatsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<RecoveryStats> {
        self.records.lock().clone()
    }
}

impl RecoveryStatsSink for MockStatsSink {
    fn record(&self, stats: &RecoveryStats) {
        self.records.lock().push(stats.clone());
    }
}
