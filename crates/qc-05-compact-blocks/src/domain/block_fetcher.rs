//! # Block Fetcher
//!
//! Registry of in-flight [`BlockRequest`]s, at most one per [`BlockId`].
//!
//! The registry lock guards the map and nothing else. Operations that need
//! to reach into requests clone the `Arc`s out first and release the lock
//! before taking any request lock, so the two are never held together.
//!
//! Requests are only ever removed by pruning: creating a request at height
//! `h` drops every registered request below `h`.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::{BlockId, BlockRequest, ContentKey};

/// Registry of block requests keyed by block identifier.
#[derive(Default)]
pub struct BlockFetcher {
    requests: Mutex<HashMap<BlockId, Arc<BlockRequest>>>,
}

impl BlockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the live request for `block_id`.
    pub fn get_request(&self, block_id: &BlockId) -> Option<Arc<BlockRequest>> {
        self.requests.lock().get(block_id).cloned()
    }

    /// Registers a request for `block_id`, or returns the one already there.
    ///
    /// When a request already exists it is returned unchanged and `missing`
    /// and `slots` are discarded. A newly registered request prunes every
    /// request with a lower height.
    pub fn new_request(
        &self,
        block_id: BlockId,
        height: u64,
        missing: HashMap<usize, ContentKey>,
        slots: Vec<Option<Vec<u8>>>,
    ) -> Arc<BlockRequest> {
        let mut requests = self.requests.lock();
        if let Some(request) = requests.get(&block_id) {
            return Arc::clone(request);
        }

        let request = Arc::new(BlockRequest::new(height, missing, slots));
        requests.insert(block_id, Arc::clone(&request));
        Self::prune_old_requests(&mut requests, height);
        request
    }

    /// Offers a transaction to every registered request.
    ///
    /// Returns how many requests were waiting for it.
    pub fn try_add_missing_tx(&self, key: &ContentKey, tx: &[u8]) -> usize {
        self.snapshot()
            .iter()
            .filter(|request| request.try_add_missing_tx(key, tx))
            .count()
    }

    /// Whether any registered request is still waiting for `key`.
    pub fn is_missing_tx(&self, key: &ContentKey) -> bool {
        self.snapshot().iter().any(|request| request.is_missing(key))
    }

    /// Number of registered requests.
    pub fn len(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.lock().is_empty()
    }

    fn snapshot(&self) -> Vec<Arc<BlockRequest>> {
        self.requests.lock().values().cloned().collect()
    }

    fn prune_old_requests(requests: &mut HashMap<BlockId, Arc<BlockRequest>>, height: u64) {
        requests.retain(|_, request| request.height() >= height);
    }
}

impl std::fmt::Debug for BlockFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockFetcher")
            .field("requests", &self.len())
            .finish()
    }
}
