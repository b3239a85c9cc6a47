//! Outbound (Driven) ports for compact block reconciliation.
//!
//! All three collaborators are owned and synchronised outside this crate.
//! None of their methods may block on network I/O.

use crate::domain::{ContentKey, RecoveryStats, StoredTx};

/// Local transaction store (the mempool's own storage).
///
/// Shared with the mempool's admission path; implementations must be safe
/// for concurrent use.
pub trait TxStore: Send + Sync {
    /// Returns the stored transaction for `key`, if any.
    fn get(&self, key: &ContentKey) -> Option<StoredTx>;

    /// Whether a transaction with `key` is stored.
    fn has(&self, key: &ContentKey) -> bool;

    /// Inserts a transaction, ignoring size limits.
    fn set(&self, tx: StoredTx);

    /// Protects the entry for `key` from eviction.
    fn mark_as_unevictable(&self, key: &ContentKey);

    /// Current height of the pool; new block requests are created at it.
    fn height(&self) -> u64;
}

/// Peer-facing gossip operations.
///
/// Both calls are fire-and-forget. Retrieved transactions come back later
/// through [`CompactBlockApi::handle_received_tx`](crate::CompactBlockApi::handle_received_tx).
pub trait TxGossip: Send + Sync {
    /// Ask up to `fanout` peers that are known to have `key` to send it.
    fn find_peer_to_request_tx(&self, key: ContentKey, fanout: usize);

    /// Send `tx` to every connected peer.
    fn broadcast_new_tx(&self, tx: &StoredTx);
}

/// Receives one [`RecoveryStats`] per keys→transactions call.
///
/// Purely observational.
pub trait RecoveryStatsSink: Send + Sync {
    fn record(&self, stats: &RecoveryStats);
}
