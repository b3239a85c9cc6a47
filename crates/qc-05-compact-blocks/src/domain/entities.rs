//! # Core Domain Entities
//!
//! - [`BlockId`]: opaque block identifier used as a registry key
//! - [`StoredTx`]: a transaction as held by the local transaction store

use std::fmt;

use super::ContentKey;

/// Opaque identifier of a block (usually a header hash).
///
/// Never interpreted; only compared and hashed.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BlockId(Vec<u8>);

impl BlockId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for BlockId {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<Vec<u8>> for BlockId {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = hex::encode(&self.0);
        let short = hex.get(..16).unwrap_or(&hex);
        write!(f, "BlockId({})", short)
    }
}

/// Transaction entry in the local transaction store.
///
/// Transactions recovered from a block that the pool never admitted carry no
/// priority, gas or sender information; see [`StoredTx::foreign`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredTx {
    /// Content key of `tx`.
    pub key: ContentKey,
    /// Raw transaction bytes, wrapped form included.
    pub tx: Vec<u8>,
    /// Store height at insertion.
    pub height: u64,
    /// Fee priority; zero when unknown.
    pub priority: i64,
    /// Gas requested; zero when unknown.
    pub gas_wanted: u64,
    /// Sender identifier; empty when unknown.
    pub sender: String,
    /// Whether the store's eviction policy may drop this entry.
    pub evictable: bool,
    /// Whether `tx` is a wrapped transaction envelope.
    pub is_wrapped: bool,
}

impl StoredTx {
    /// Creates an evictable entry with no priority or sender metadata.
    pub fn new(tx: Vec<u8>, key: ContentKey, height: u64, is_wrapped: bool) -> Self {
        Self {
            key,
            tx,
            height,
            priority: 0,
            gas_wanted: 0,
            sender: String::new(),
            evictable: true,
            is_wrapped,
        }
    }

    /// Entry for a transaction that showed up in a block but never went
    /// through admission. Pinned in the store.
    pub fn foreign(tx: Vec<u8>, key: ContentKey, height: u64, is_wrapped: bool) -> Self {
        Self {
            evictable: false,
            ..Self::new(tx, key, height, is_wrapped)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_tx_is_pinned_without_metadata() {
        let tx = b"unknown".to_vec();
        let key = ContentKey::of_tx(&tx);
        let stored = StoredTx::foreign(tx, key, 7, false);

        assert!(!stored.evictable);
        assert_eq!(stored.priority, 0);
        assert_eq!(stored.gas_wanted, 0);
        assert!(stored.sender.is_empty());
        assert_eq!(stored.height, 7);
    }

    #[test]
    fn test_block_id_debug_is_short_hex() {
        let id = BlockId::new(vec![0xAB; 32]);
        assert_eq!(format!("{:?}", id), "BlockId(abababababababab)");
        assert_eq!(format!("{:?}", BlockId::new(vec![1])), "BlockId(01)");
    }
}
