//! # Compact Block Service
//!
//! Reconciliation driver sitting between consensus and the mempool.
//!
//! ## Architecture
//!
//! Implements the inbound port [`CompactBlockApi`] on top of three outbound
//! ports (implemented by adapters in node-runtime):
//! - [`TxStore`]: local transaction store lookups and pinning
//! - [`TxGossip`]: fire-and-forget peer requests and broadcasts
//! - [`RecoveryStatsSink`]: per-call recovery statistics
//!
//! ## Keys → Transactions
//!
//! ```text
//! compact keys ──decode──→ probe store ──all found──→ return (no request)
//!                              │
//!                              └─ missing ─→ BlockFetcher::new_request
//!                                               │
//!                                 TxGossip::find_peer_to_request_tx (per key)
//!                                               │
//!        peer response ─→ handle_received_tx ─→ BlockRequest::try_add_missing_tx
//!                                               │
//!                                      wait_for_block ──→ return
//! ```
//!
//! A second call for a block that already has a request simply waits on it.

use async_trait::async_trait;
use futures::FutureExt;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::CompactBlockConfig;
use crate::domain::{
    BlockFetcher, BlockId, BlockRequest, ContentKey, RecoveryStats, StoredTx, WrappedTx,
};
use crate::error::{ReconciliationError, ReconciliationResult};
use crate::metrics;
use crate::ports::inbound::CompactBlockApi;
use crate::ports::outbound::{RecoveryStatsSink, TxGossip, TxStore};

/// Slots and missing positions produced by probing the local store.
type LocalLookup = (Vec<Option<Vec<u8>>>, HashMap<usize, ContentKey>);

/// Compact block reconciliation service.
///
/// ## Thread Safety
///
/// Shareable across tasks via `Arc`. The block fetcher and each block request
/// carry their own locks; the store is synchronised by its owner.
pub struct CompactBlockService<S, G, R>
where
    S: TxStore,
    G: TxGossip,
    R: RecoveryStatsSink,
{
    /// Service configuration.
    config: CompactBlockConfig,
    /// Registry of in-flight block requests.
    fetcher: Arc<BlockFetcher>,
    /// Local transaction store.
    store: Arc<S>,
    /// Peer gossip adapter.
    gossip: Arc<G>,
    /// Recovery stats sink.
    stats: Arc<R>,
}

impl<S, G, R> CompactBlockService<S, G, R>
where
    S: TxStore,
    G: TxGossip,
    R: RecoveryStatsSink,
{
    pub fn new(config: CompactBlockConfig, store: Arc<S>, gossip: Arc<G>, stats: Arc<R>) -> Self {
        Self {
            config,
            fetcher: Arc::new(BlockFetcher::new()),
            store,
            gossip,
            stats,
        }
    }

    /// Registry shared with the peer-response handler.
    pub fn fetcher(&self) -> &Arc<BlockFetcher> {
        &self.fetcher
    }

    pub fn config(&self) -> &CompactBlockConfig {
        &self.config
    }

    /// [`fetch_txs_from_keys`](CompactBlockApi::fetch_txs_from_keys) bounded
    /// by the configured reconstruction timeout.
    pub async fn fetch_txs_from_keys_with_timeout(
        &self,
        block_id: BlockId,
        compact_keys: &[Vec<u8>],
    ) -> ReconciliationResult<Vec<Vec<u8>>> {
        let timeout = self.config.reconstruction_timeout();
        self.fetch_txs_from_keys(block_id, compact_keys, tokio::time::sleep(timeout))
            .await
            .map_err(|e| match e {
                ReconciliationError::Cancelled => ReconciliationError::Timeout(timeout),
                other => other,
            })
    }

    /// Decodes every compact key; the first malformed key fails the call.
    fn decode_keys(compact_keys: &[Vec<u8>]) -> ReconciliationResult<Vec<ContentKey>> {
        compact_keys
            .iter()
            .enumerate()
            .map(|(index, bytes)| {
                ContentKey::from_slice(bytes).ok_or(ReconciliationError::MalformedKey {
                    index,
                    len: bytes.len(),
                })
            })
            .collect()
    }

    /// Fills slots from the store, pinning every hit.
    fn lookup_local(&self, keys: &[ContentKey]) -> LocalLookup {
        let mut slots = Vec::with_capacity(keys.len());
        let mut missing = HashMap::new();
        for (index, key) in keys.iter().enumerate() {
            match self.store.get(key) {
                Some(stored) => {
                    slots.push(Some(stored.tx));
                    self.store.mark_as_unevictable(key);
                }
                None => {
                    slots.push(None);
                    missing.insert(index, *key);
                }
            }
        }
        (slots, missing)
    }

    /// Decode and probe shared by the async and sync paths.
    fn resolve_keys(&self, compact_keys: &[Vec<u8>]) -> ReconciliationResult<LocalLookup> {
        let keys = Self::decode_keys(compact_keys)?;
        let (slots, missing) = self.lookup_local(&keys);

        info!(
            num_txs = keys.len(),
            num_missing = missing.len(),
            "[qc-05] Fetching transactions from peers"
        );
        metrics::record_missing_txs(missing.len());

        Ok((slots, missing))
    }
}

/// Records the call's [`RecoveryStats`] when dropped, so a caller that gives
/// up on the future is still accounted for.
struct RecoveryRecorder<R: RecoveryStatsSink> {
    sink: Arc<R>,
    request: Arc<BlockRequest>,
    stats: Option<RecoveryStats>,
}

impl<R: RecoveryStatsSink> Drop for RecoveryRecorder<R> {
    fn drop(&mut self) {
        let Some(stats) = self.stats.take() else {
            return;
        };
        let stats = stats.with_outcome(self.request.num_missing(), self.request.time_taken());
        info!(
            time_taken_ms = stats.elapsed_ms(),
            num_retrieved = stats.resolved,
            num_missing = stats.missing_at_start - stats.resolved,
            "[qc-05] Fetched txs"
        );
        self.sink.record(&stats);
    }
}

/// Distinct missing keys, ordered by the first position each occupies.
fn unique_missing_keys(missing: &HashMap<usize, ContentKey>) -> Vec<ContentKey> {
    let mut by_index: Vec<(usize, ContentKey)> =
        missing.iter().map(|(index, key)| (*index, *key)).collect();
    by_index.sort_unstable_by_key(|(index, _)| *index);

    let mut seen = HashSet::with_capacity(by_index.len());
    by_index
        .into_iter()
        .map(|(_, key)| key)
        .filter(|key| seen.insert(*key))
        .collect()
}

/// Stats listing each missing key once while counting missing slots.
fn recovery_stats(
    missing: &HashMap<usize, ContentKey>,
    unique_keys: &[ContentKey],
    total_keys: usize,
) -> RecoveryStats {
    RecoveryStats {
        missing_at_start: missing.len(),
        ..RecoveryStats::new(unique_keys, total_keys)
    }
}

fn assemble(slots: Vec<Option<Vec<u8>>>) -> Vec<Vec<u8>> {
    slots.into_iter().map(Option::unwrap_or_default).collect()
}

#[async_trait]
impl<S, G, R> CompactBlockApi for CompactBlockService<S, G, R>
where
    S: TxStore,
    G: TxGossip,
    R: RecoveryStatsSink,
{
    async fn fetch_txs_from_keys<C>(
        &self,
        block_id: BlockId,
        compact_keys: &[Vec<u8>],
        cancel: C,
    ) -> ReconciliationResult<Vec<Vec<u8>>>
    where
        C: Future<Output = ()> + Send,
    {
        if let Some(request) = self.fetcher.get_request(&block_id) {
            debug!(
                block_id = ?block_id,
                "[qc-05] Tracking existing request for block transactions"
            );
            return request.wait_for_block(cancel).await;
        }

        let (slots, missing) = self.resolve_keys(compact_keys)?;
        if missing.is_empty() {
            self.stats.record(&RecoveryStats::all_present(compact_keys.len()));
            return Ok(assemble(slots));
        }

        let missing_keys = unique_missing_keys(&missing);
        let stats = recovery_stats(&missing, &missing_keys, compact_keys.len());

        let request = self
            .fetcher
            .new_request(block_id, self.store.height(), missing, slots);
        metrics::record_block_request();

        let _recorder = RecoveryRecorder {
            sink: Arc::clone(&self.stats),
            request: Arc::clone(&request),
            stats: Some(stats),
        };

        for key in &missing_keys {
            debug!(key = %key, "[qc-05] Searching for missing tx");
            self.gossip
                .find_peer_to_request_tx(*key, self.config.peer_request_fanout);
        }

        let result = request.wait_for_block(cancel).await;
        if let Err(e) = &result {
            warn!(
                error = %e,
                num_missing = request.num_missing(),
                "[qc-05] Stopped waiting for block transactions"
            );
        }
        result
    }

    fn fetch_txs_from_keys_sync(
        &self,
        compact_keys: &[Vec<u8>],
    ) -> ReconciliationResult<Vec<Vec<u8>>> {
        let (slots, missing) = self.resolve_keys(compact_keys)?;
        if missing.is_empty() {
            self.stats.record(&RecoveryStats::all_present(compact_keys.len()));
            return Ok(assemble(slots));
        }

        // Nothing is retrieved on this path, so every missing key stays missing.
        let missing_keys = unique_missing_keys(&missing);
        self.stats
            .record(&recovery_stats(&missing, &missing_keys, compact_keys.len()));

        Err(ReconciliationError::MissingTransactions {
            count: missing.len(),
        })
    }

    async fn fetch_keys_from_txs<C>(
        &self,
        txs: &[Vec<u8>],
        cancel: C,
    ) -> ReconciliationResult<Vec<Vec<u8>>>
    where
        C: Future<Output = ()> + Send,
    {
        futures::pin_mut!(cancel);
        let mut keys = Vec::with_capacity(txs.len());

        for tx in txs {
            if cancel.as_mut().now_or_never().is_some() {
                return Err(ReconciliationError::Cancelled);
            }

            let wrapped = WrappedTx::decode(tx);
            let key = match &wrapped {
                Some(wrapped) => ContentKey::of_raw(&wrapped.tx),
                None => ContentKey::of_raw(tx),
            };
            keys.push(key.to_vec());

            if self.store.has(&key) {
                continue;
            }

            // A block transaction the pool never admitted was mutated or
            // injected by the application, so other pools are unlikely to
            // have it either.
            let stored = StoredTx::foreign(tx.clone(), key, self.store.height(), wrapped.is_some());
            debug!(key = %key, "[qc-05] Broadcasting unknown block transaction");
            self.gossip.broadcast_new_tx(&stored);
            self.store.set(stored);
            metrics::record_foreign_tx();
        }

        Ok(keys)
    }

    fn handle_received_tx(&self, tx: &[u8]) -> bool {
        let key = ContentKey::of_tx(tx);
        let applied = self.fetcher.try_add_missing_tx(&key, tx);
        if applied > 0 {
            debug!(key = %key, requests = applied, "[qc-05] Added missing tx to block requests");
        }
        applied > 0
    }

    fn is_missing_tx(&self, key: &ContentKey) -> bool {
        self.fetcher.is_missing_tx(key)
    }
}
