//! # Inbound Port - CompactBlockApi
//!
//! Driving port used by consensus (receiving compact blocks) and block
//! production (building them).
//!
//! | Method | Caller |
//! |--------|--------|
//! | `fetch_txs_from_keys` | Consensus, on a complete compact block |
//! | `fetch_txs_from_keys_sync` | Call sites that cannot suspend |
//! | `fetch_keys_from_txs` | Block production, after execution |
//! | `handle_received_tx` | Mempool reactor, on a transaction from a peer |

use async_trait::async_trait;
use std::future::Future;

use crate::domain::{BlockId, ContentKey};
use crate::error::ReconciliationResult;

/// Primary API for compact block reconciliation.
///
/// # Example
///
/// ```rust,ignore
/// use qc_05_compact_blocks::{BlockId, CompactBlockApi};
///
/// async fn on_compact_block(api: &impl CompactBlockApi, id: BlockId, keys: Vec<Vec<u8>>) {
///     let deadline = tokio::time::sleep(std::time::Duration::from_secs(5));
///     let txs = api.fetch_txs_from_keys(id, &keys, deadline).await?;
///     // hand `txs` to block execution
/// }
/// ```
#[async_trait]
pub trait CompactBlockApi: Send + Sync {
    /// Resolves compact keys into full transactions, fetching the missing
    /// ones from peers and waiting for them until `cancel` resolves.
    ///
    /// Concurrent calls for the same block share one request.
    ///
    /// # Errors
    /// - `MalformedKey`: a key is not 32 bytes
    /// - `Cancelled`: `cancel` resolved first
    async fn fetch_txs_from_keys<C>(
        &self,
        block_id: BlockId,
        compact_keys: &[Vec<u8>],
        cancel: C,
    ) -> ReconciliationResult<Vec<Vec<u8>>>
    where
        C: Future<Output = ()> + Send;

    /// Resolves compact keys from the local store only.
    ///
    /// # Errors
    /// - `MalformedKey`: a key is not 32 bytes
    /// - `MissingTransactions`: some keys are not stored locally
    fn fetch_txs_from_keys_sync(&self, compact_keys: &[Vec<u8>])
        -> ReconciliationResult<Vec<Vec<u8>>>;

    /// Reduces a block's transactions to their compact keys, storing and
    /// broadcasting any transaction the pool did not know about.
    ///
    /// # Errors
    /// - `Cancelled`: `cancel` resolved before every transaction was processed
    async fn fetch_keys_from_txs<C>(
        &self,
        txs: &[Vec<u8>],
        cancel: C,
    ) -> ReconciliationResult<Vec<Vec<u8>>>
    where
        C: Future<Output = ()> + Send;

    /// Feeds a transaction received from a peer to every waiting block.
    ///
    /// Returns true if at least one block was waiting for it.
    fn handle_received_tx(&self, tx: &[u8]) -> bool;

    /// Whether any in-flight block is waiting for `key`.
    fn is_missing_tx(&self, key: &ContentKey) -> bool;
}
