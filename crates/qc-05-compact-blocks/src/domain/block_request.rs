//! # Block Request
//!
//! Tracks the transactions of one compact block that were not in the local
//! store when reconciliation started.
//!
//! ```text
//! [PENDING] ──try_add_missing_tx (last key)──→ [COMPLETE]
//!     │                                            │
//!     └── wait_for_block: suspends                 └── wait_for_block: returns slots
//! ```
//!
//! The completion signal is a `watch` channel latched to `true` exactly once,
//! under the request lock, by the call that empties the missing set. Waiters
//! subscribe independently, so any number of them observe the transition no
//! matter whether they started waiting before or after it happened.
//!
//! Cancellation belongs to a single waiter. A cancelled wait leaves the
//! request, its slots and every other waiter untouched.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use super::ContentKey;
use crate::error::{ReconciliationError, ReconciliationResult};

/// Mutable part of a request, guarded by the request lock.
///
/// Missing entries are counted per slot: `missing_by_index` has one entry per
/// missing position, so with duplicate keys it outnumbers `missing_by_key`.
struct RequestState {
    /// Missing key → slot indices. A key listed twice in a block owns two slots.
    missing_by_key: HashMap<ContentKey, Vec<usize>>,
    /// Missing slot index → key. Mirror of `missing_by_key`.
    missing_by_index: HashMap<usize, ContentKey>,
    /// Block transactions in positional order; `None` until retrieved.
    slots: Vec<Option<Vec<u8>>>,
    /// First terminal observation (completion or a cancelled wait).
    ended_at: Option<Instant>,
}

impl RequestState {
    fn is_done(&self) -> bool {
        self.missing_by_index.is_empty()
    }
}

/// Per-block reconciliation state shared by every waiter for that block.
pub struct BlockRequest {
    height: u64,
    started_at: Instant,
    done_tx: watch::Sender<bool>,
    state: Mutex<RequestState>,
}

impl BlockRequest {
    /// Creates a request.
    ///
    /// `slots` holds the transactions already found locally; every index in
    /// `missing` is expected to be `None` there and is cleared if it is not.
    pub fn new(
        height: u64,
        missing: HashMap<usize, ContentKey>,
        mut slots: Vec<Option<Vec<u8>>>,
    ) -> Self {
        let mut missing_by_key: HashMap<ContentKey, Vec<usize>> =
            HashMap::with_capacity(missing.len());
        let mut missing_by_index = HashMap::with_capacity(missing.len());
        for (index, key) in missing {
            if index >= slots.len() {
                continue;
            }
            slots[index] = None;
            missing_by_key.entry(key).or_default().push(index);
            missing_by_index.insert(index, key);
        }

        let state = RequestState {
            missing_by_key,
            missing_by_index,
            slots,
            ended_at: None,
        };
        let (done_tx, _) = watch::channel(state.is_done());

        Self {
            height,
            started_at: Instant::now(),
            done_tx,
            state: Mutex::new(state),
        }
    }

    /// Chain height this request was created at.
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Total number of transactions in the block.
    pub fn len(&self) -> usize {
        self.state.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fills the slot(s) for `key` if this request is still waiting for it.
    ///
    /// Returns `false` when the key is unknown to this request or was already
    /// supplied; such calls change nothing.
    pub fn try_add_missing_tx(&self, key: &ContentKey, tx: &[u8]) -> bool {
        let mut state = self.state.lock();
        let Some(indices) = state.missing_by_key.remove(key) else {
            return false;
        };
        for index in indices {
            state.missing_by_index.remove(&index);
            state.slots[index] = Some(tx.to_vec());
        }

        if state.is_done() {
            state.ended_at.get_or_insert_with(Instant::now);
            self.done_tx.send_replace(true);
        }
        true
    }

    /// Waits until every missing transaction has been supplied or `cancel`
    /// resolves, whichever comes first.
    ///
    /// Returns immediately if the block is already complete, even when
    /// `cancel` is already resolved.
    pub async fn wait_for_block<C>(&self, cancel: C) -> ReconciliationResult<Vec<Vec<u8>>>
    where
        C: Future<Output = ()>,
    {
        let mut done_rx = self.done_tx.subscribe();
        let completed = tokio::select! {
            biased;
            completed = async { done_rx.wait_for(|done| *done).await.is_ok() } => completed,
            _ = cancel => false,
        };
        self.set_end_time();

        if completed {
            Ok(self.assembled())
        } else {
            Err(ReconciliationError::Cancelled)
        }
    }

    /// [`wait_for_block`](Self::wait_for_block) with a deadline.
    pub async fn wait_for_block_timeout(
        &self,
        timeout: Duration,
    ) -> ReconciliationResult<Vec<Vec<u8>>> {
        self.wait_for_block(tokio::time::sleep(timeout))
            .await
            .map_err(|_| ReconciliationError::Timeout(timeout))
    }

    /// Whether every transaction has been received.
    pub fn is_done(&self) -> bool {
        self.state.lock().is_done()
    }

    /// Number of transactions still missing.
    pub fn num_missing(&self) -> usize {
        self.state.lock().missing_by_index.len()
    }

    /// Whether `key` is still missing from this block.
    pub fn is_missing(&self, key: &ContentKey) -> bool {
        self.state.lock().missing_by_key.contains_key(key)
    }

    /// Time from creation to the first terminal observation; zero before that.
    pub fn time_taken(&self) -> Duration {
        match self.state.lock().ended_at {
            Some(ended_at) => ended_at.saturating_duration_since(self.started_at),
            None => Duration::ZERO,
        }
    }

    fn set_end_time(&self) {
        self.state.lock().ended_at.get_or_insert_with(Instant::now);
    }

    fn assembled(&self) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .slots
            .iter()
            .map(|slot| slot.clone().unwrap_or_default())
            .collect()
    }
}

impl std::fmt::Debug for BlockRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BlockRequest")
            .field("height", &self.height)
            .field("slots", &state.slots.len())
            .field("missing", &state.missing_by_index.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use std::sync::Arc;

    fn tx(i: usize) -> Vec<u8> {
        format!("tx-{}", i).into_bytes()
    }

    /// Block of `n` transactions where the indices in `missing` are unknown.
    fn request_with_missing(n: usize, missing: &[usize]) -> BlockRequest {
        let mut slots = Vec::with_capacity(n);
        let mut missing_keys = HashMap::new();
        for i in 0..n {
            if missing.contains(&i) {
                slots.push(None);
                missing_keys.insert(i, ContentKey::of_tx(&tx(i)));
            } else {
                slots.push(Some(tx(i)));
            }
        }
        BlockRequest::new(10, missing_keys, slots)
    }

    fn expected(n: usize) -> Vec<Vec<u8>> {
        (0..n).map(tx).collect()
    }

    #[test]
    fn test_try_add_missing_tx_fills_slot() {
        let request = request_with_missing(3, &[1]);
        assert!(!request.is_done());
        assert_eq!(request.num_missing(), 1);

        assert!(request.try_add_missing_tx(&ContentKey::of_tx(&tx(1)), &tx(1)));
        assert!(request.is_done());
        assert_eq!(request.assembled(), expected(3));
    }

    #[test]
    fn test_try_add_missing_tx_is_idempotent() {
        let request = request_with_missing(3, &[0, 2]);
        let key = ContentKey::of_tx(&tx(0));

        assert!(request.try_add_missing_tx(&key, &tx(0)));
        assert!(!request.try_add_missing_tx(&key, &tx(0)));
        assert!(!request.try_add_missing_tx(&ContentKey::of_tx(b"other"), b"other"));
        assert_eq!(request.num_missing(), 1);
        assert!(!request.is_done());
    }

    #[test]
    fn test_duplicate_key_fills_every_position() {
        let key = ContentKey::of_tx(b"dup");
        let mut missing = HashMap::new();
        missing.insert(0, key);
        missing.insert(2, key);
        let request = BlockRequest::new(1, missing, vec![None, Some(b"mid".to_vec()), None]);

        assert_eq!(request.num_missing(), 2);
        {
            let state = request.state.lock();
            assert_eq!(state.missing_by_key.len(), 1);
            assert_eq!(state.missing_by_index.len(), 2);
        }
        assert!(request.try_add_missing_tx(&key, b"dup"));
        assert!(request.is_done());
        assert_eq!(
            request.assembled(),
            vec![b"dup".to_vec(), b"mid".to_vec(), b"dup".to_vec()]
        );
    }

    #[test]
    fn test_time_taken_zero_until_terminal() {
        let request = request_with_missing(2, &[0]);
        assert_eq!(request.time_taken(), Duration::ZERO);

        request.try_add_missing_tx(&ContentKey::of_tx(&tx(0)), &tx(0));
        let first = request.time_taken();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(request.time_taken(), first);
    }

    #[tokio::test]
    async fn test_wait_returns_immediately_when_complete() {
        let request = request_with_missing(2, &[1]);
        request.try_add_missing_tx(&ContentKey::of_tx(&tx(1)), &tx(1));

        // An already-fired cancellation loses against a completed block.
        let result = request.wait_for_block(std::future::ready(())).await;
        assert_eq!(result.unwrap(), expected(2));
    }

    #[tokio::test]
    async fn test_wait_cancelled() {
        let request = request_with_missing(2, &[1]);
        let result = request.wait_for_block(std::future::ready(())).await;

        assert_eq!(result, Err(ReconciliationError::Cancelled));
        assert!(request.state.lock().ended_at.is_some());
        assert!(!request.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_timeout() {
        let request = request_with_missing(2, &[0]);
        let result = request.wait_for_block_timeout(Duration::from_secs(5)).await;
        assert_eq!(result, Err(ReconciliationError::Timeout(Duration::from_secs(5))));
    }

    #[tokio::test]
    async fn test_fan_out_completion() {
        let request = Arc::new(request_with_missing(4, &[0, 3]));

        let waiters: Vec<_> = (0..16)
            .map(|_| {
                let request = Arc::clone(&request);
                tokio::spawn(async move { request.wait_for_block(std::future::pending()).await })
            })
            .collect();
        tokio::task::yield_now().await;

        request.try_add_missing_tx(&ContentKey::of_tx(&tx(3)), &tx(3));
        request.try_add_missing_tx(&ContentKey::of_tx(&tx(0)), &tx(0));

        for waiter in waiters {
            assert_eq!(waiter.await.unwrap().unwrap(), expected(4));
        }

        // Late arrivals see the latched completion too.
        let late = request.wait_for_block(std::future::pending()).await;
        assert_eq!(late.unwrap(), expected(4));
    }

    #[tokio::test]
    async fn test_cancellation_is_isolated() {
        let request = Arc::new(request_with_missing(3, &[1]));
        let (cancel_tx, cancel_rx) = tokio::sync::oneshot::channel::<()>();

        let cancelled = {
            let request = Arc::clone(&request);
            tokio::spawn(async move {
                request
                    .wait_for_block(async {
                        let _ = cancel_rx.await;
                    })
                    .await
            })
        };
        let patient = {
            let request = Arc::clone(&request);
            tokio::spawn(async move { request.wait_for_block(std::future::pending()).await })
        };
        tokio::task::yield_now().await;

        cancel_tx.send(()).unwrap();
        assert_eq!(cancelled.await.unwrap(), Err(ReconciliationError::Cancelled));
        assert!(!request.is_done());

        request.try_add_missing_tx(&ContentKey::of_tx(&tx(1)), &tx(1));
        assert_eq!(patient.await.unwrap().unwrap(), expected(3));
    }

    #[tokio::test]
    async fn test_order_preserved_for_any_arrival_order() {
        let n = 32;
        let mut missing: Vec<usize> = (0..n).filter(|i| i % 3 != 0).collect();
        let request = request_with_missing(n, &missing);

        missing.shuffle(&mut rand::thread_rng());
        for i in missing {
            assert!(request.try_add_missing_tx(&ContentKey::of_tx(&tx(i)), &tx(i)));
        }

        let result = request.wait_for_block(std::future::pending()).await;
        assert_eq!(result.unwrap(), expected(n));
    }

    #[tokio::test]
    async fn test_concurrent_suppliers_fire_once() {
        let n = 64;
        let missing: Vec<usize> = (0..n).collect();
        let request = Arc::new(request_with_missing(n, &missing));

        let suppliers: Vec<_> = (0..n)
            .map(|i| {
                let request = Arc::clone(&request);
                tokio::spawn(async move {
                    // Each key delivered twice by racing peers.
                    let key = ContentKey::of_tx(&tx(i));
                    let a = request.try_add_missing_tx(&key, &tx(i));
                    let b = request.try_add_missing_tx(&key, &tx(i));
                    usize::from(a) + usize::from(b)
                })
            })
            .collect();

        let mut applied = 0;
        for supplier in suppliers {
            applied += supplier.await.unwrap();
        }
        assert_eq!(applied, n);
        assert_eq!(
            request.wait_for_block(std::future::pending()).await.unwrap(),
            expected(n)
        );
    }
}
