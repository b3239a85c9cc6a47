//! # Domain Layer for Compact Block Reconciliation
//!
//! Pure state with no I/O dependencies. This is the innermost layer of the
//! hexagonal architecture.
//!
//! ## Contents
//!
//! - **content_key**: `ContentKey` derivation and the `WrappedTx` envelope
//! - **entities**: `BlockId`, `StoredTx`
//! - **block_request**: per-block state machine with broadcast completion
//! - **block_fetcher**: registry of in-flight block requests
//! - **recovery**: per-call `RecoveryStats`

mod block_fetcher;
mod block_request;
mod content_key;
mod entities;
mod recovery;

pub use block_fetcher::*;
pub use block_request::*;
pub use content_key::*;
pub use entities::*;
pub use recovery::*;
