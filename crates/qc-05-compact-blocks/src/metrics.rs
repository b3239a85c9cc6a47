//! # Compact Block Metrics
//!
//! Prometheus metrics for compact block reconciliation.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! qc-05-compact-blocks = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `compact_blocks_missing_txs_total` - Transactions missing locally when a compact block arrived
//! - `compact_blocks_requests_total` - Block requests created (blocks that needed peer retrieval)
//! - `compact_blocks_foreign_txs_total` - Block transactions the pool had never seen
//! - `compact_blocks_recovery_rate` - Fraction of missing transactions recovered per call

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_histogram, register_int_counter, Histogram, IntCounter};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Transactions missing from the local store on arrival of a compact block
    pub static ref MISSING_TXS: IntCounter = register_int_counter!(
        "compact_blocks_missing_txs_total",
        "Total number of compact block transactions missing from the local store"
    )
    .expect("Failed to create MISSING_TXS metric");

    /// Block requests created
    pub static ref BLOCK_REQUESTS: IntCounter = register_int_counter!(
        "compact_blocks_requests_total",
        "Total number of block requests that needed peer retrieval"
    )
    .expect("Failed to create BLOCK_REQUESTS metric");

    /// Foreign transactions stored while building compact keys
    pub static ref FOREIGN_TXS: IntCounter = register_int_counter!(
        "compact_blocks_foreign_txs_total",
        "Total number of block transactions unknown to the local pool"
    )
    .expect("Failed to create FOREIGN_TXS metric");

    /// Recovery rate per reconciliation call
    pub static ref RECOVERY_RATE: Histogram = register_histogram!(
        "compact_blocks_recovery_rate",
        "Fraction of missing transactions recovered per reconciliation call",
        vec![0.0, 0.25, 0.5, 0.75, 0.9, 0.99, 1.0]
    )
    .expect("Failed to create RECOVERY_RATE metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

/// Record transactions missing on arrival
#[cfg(feature = "metrics")]
pub fn record_missing_txs(count: usize) {
    MISSING_TXS.inc_by(count as u64);
}

/// Record a block request created
#[cfg(feature = "metrics")]
pub fn record_block_request() {
    BLOCK_REQUESTS.inc();
}

/// Record a foreign transaction stored
#[cfg(feature = "metrics")]
pub fn record_foreign_tx() {
    FOREIGN_TXS.inc();
}

/// Record the recovery rate of one call
#[cfg(feature = "metrics")]
pub fn observe_recovery_rate(rate: f64) {
    RECOVERY_RATE.observe(rate);
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_missing_txs(_count: usize) {}

#[cfg(not(feature = "metrics"))]
pub fn record_block_request() {}

#[cfg(not(feature = "metrics"))]
pub fn record_foreign_tx() {}

#[cfg(not(feature = "metrics"))]
pub fn observe_recovery_rate(_rate: f64) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_callable() {
        // Must not panic with or without the metrics feature
        record_missing_txs(3);
        record_block_request();
        record_foreign_tx();
        observe_recovery_rate(0.5);
    }
}
