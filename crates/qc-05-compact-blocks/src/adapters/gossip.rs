//! Recording gossip adapter.

use parking_lot::Mutex;

use crate::domain::{ContentKey, StoredTx};
use crate::ports::outbound::TxGossip;

/// `TxGossip` that records every call instead of talking to peers.
#[derive(Default)]
pub struct MockTxGossip {
    requested: Mutex<Vec<(ContentKey, usize)>>,
    broadcast: Mutex<Vec<StoredTx>>,
}

impl MockTxGossip {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys requested from peers with the fanout used, in call order.
    pub fn requested(&self) -> Vec<(ContentKey, usize)> {
        self.requested.lock().clone()
    }

    /// Transactions broadcast to all peers, in call order.
    pub fn broadcast(&self) -> Vec<StoredTx> {
        self.broadcast.lock().clone()
    }
}

impl TxGossip for MockTxGossip {
    fn find_peer_to_request_tx(&self, key: ContentKey, fanout: usize) {
        self.requested.lock().push((key, fanout));
    }

    fn broadcast_new_tx(&self, tx: &StoredTx) {
        self.broadcast.lock().push(tx.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_calls() {
        let gossip = MockTxGossip::new();
        let key = ContentKey::of_tx(b"tx");
        gossip.find_peer_to_request_tx(key, 5);
        gossip.broadcast_new_tx(&StoredTx::foreign(b"tx".to_vec(), key, 1, false));

        assert_eq!(gossip.requested(), vec![(key, 5)]);
        assert_eq!(gossip.broadcast()[0].key, key);
    }
}
