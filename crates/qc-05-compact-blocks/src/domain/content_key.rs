//! # Content Keys
//!
//! A [`ContentKey`] is the SHA-256 fingerprint of a transaction and the only
//! thing a compact block carries per transaction.
//!
//! ## Wrapped Transactions
//!
//! Some transactions travel inside a [`WrappedTx`] envelope that carries
//! auxiliary blobs next to the canonical transaction. The key is always
//! computed over the inner transaction, so two nodes that hold the same
//! transaction in wrapped and unwrapped form agree on its key.
//!
//! ```text
//! WrappedTx (fixint bincode)
//! [type_id: 4 = "BLOB"][tx_len: 8][tx: tx_len][blob_count: 8][(len: 8, blob)...]
//!                       └──────── hashed ───────┘
//! ```

use bincode::Options;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of a content key in bytes.
pub const CONTENT_KEY_LEN: usize = 32;

/// Type identifier carried by every wrapped transaction envelope.
pub const WRAPPED_TX_TYPE_ID: [u8; 4] = *b"BLOB";

/// 32-byte content fingerprint of a transaction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentKey(pub [u8; CONTENT_KEY_LEN]);

impl ContentKey {
    /// Creates a key from a 32-byte array.
    pub fn new(bytes: [u8; CONTENT_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Decodes a key received inside a compact block.
    ///
    /// Returns `None` unless the slice is exactly 32 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; CONTENT_KEY_LEN] = bytes.try_into().ok()?;
        Some(Self(array))
    }

    /// Derives the key of a raw transaction, unwrapping it first if needed.
    pub fn of_tx(tx: &[u8]) -> Self {
        match WrappedTx::decode(tx) {
            Some(wrapped) => Self::of_raw(&wrapped.tx),
            None => Self::of_raw(tx),
        }
    }

    /// SHA-256 of the given bytes, without unwrapping.
    pub fn of_raw(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    pub fn as_bytes(&self) -> &[u8; CONTENT_KEY_LEN] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Lowercase hex encoding, used in logs and recovery stats.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; CONTENT_KEY_LEN]> for ContentKey {
    fn from(bytes: [u8; CONTENT_KEY_LEN]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for ContentKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentKey({})", &self.to_hex()[..16])
    }
}

/// Transaction envelope carrying detachable auxiliary blobs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedTx {
    type_id: [u8; 4],
    /// The canonical transaction; the only part that is hashed.
    pub tx: Vec<u8>,
    /// Auxiliary payloads transported outside the canonical encoding.
    pub blobs: Vec<Vec<u8>>,
}

impl WrappedTx {
    pub fn new(tx: Vec<u8>, blobs: Vec<Vec<u8>>) -> Self {
        Self {
            type_id: WRAPPED_TX_TYPE_ID,
            tx,
            blobs,
        }
    }

    /// Encodes the envelope.
    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .serialize(self)
    }

    /// Attempts to decode `bytes` as a wrapped transaction.
    ///
    /// Returns `None` for anything that is not a complete envelope with the
    /// expected type id, which is how plain transactions are told apart.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if !bytes.starts_with(&WRAPPED_TX_TYPE_ID) {
            return None;
        }
        let wrapped: Self = bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .with_limit(bytes.len() as u64)
            .deserialize(bytes)
            .ok()?;
        (wrapped.type_id == WRAPPED_TX_TYPE_ID).then_some(wrapped)
    }

    /// Returns true if `bytes` decode as a wrapped transaction.
    pub fn is_wrapped(bytes: &[u8]) -> bool {
        Self::decode(bytes).is_some()
    }
}
