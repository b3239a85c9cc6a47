//! In-memory transaction store.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::{ContentKey, StoredTx, WrappedTx};
use crate::ports::outbound::TxStore;

/// `TxStore` backed by a `HashMap` behind a `RwLock`.
///
/// Has no eviction policy of its own; [`evict_all_evictable`](Self::evict_all_evictable)
/// stands in for one so callers can observe which entries are pinned.
#[derive(Default)]
pub struct InMemoryTxStore {
    txs: RwLock<HashMap<ContentKey, StoredTx>>,
    height: AtomicU64,
}

impl InMemoryTxStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the pool height.
    pub fn with_height(self, height: u64) -> Self {
        self.set_height(height);
        self
    }

    pub fn set_height(&self, height: u64) {
        self.height.store(height, Ordering::SeqCst);
    }

    /// Stores raw transaction bytes as an ordinary evictable entry and
    /// returns their key.
    pub fn insert_raw(&self, tx: &[u8]) -> ContentKey {
        let key = ContentKey::of_tx(tx);
        let stored = StoredTx::new(
            tx.to_vec(),
            key,
            self.height(),
            WrappedTx::is_wrapped(tx),
        );
        self.set(stored);
        key
    }

    /// `None` if the key is not stored.
    pub fn is_evictable(&self, key: &ContentKey) -> Option<bool> {
        self.txs.read().get(key).map(|tx| tx.evictable)
    }

    /// Drops every entry not marked unevictable; returns how many were dropped.
    pub fn evict_all_evictable(&self) -> usize {
        let mut txs = self.txs.write();
        let before = txs.len();
        txs.retain(|_, tx| !tx.evictable);
        before - txs.len()
    }

    pub fn len(&self) -> usize {
        self.txs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.read().is_empty()
    }
}

impl TxStore for InMemoryTxStore {
    fn get(&self, key: &ContentKey) -> Option<StoredTx> {
        self.txs.read().get(key).cloned()
    }

    fn has(&self, key: &ContentKey) -> bool {
        self.txs.read().contains_key(key)
    }

    fn set(&self, tx: StoredTx) {
        self.txs.write().insert(tx.key, tx);
    }

    fn mark_as_unevictable(&self, key: &ContentKey) {
        if let Some(tx) = self.txs.write().get_mut(key) {
            tx.evictable = false;
        }
    }

    fn height(&self) -> u64 {
        self.height.load(Ordering::SeqCst)
    }
}
