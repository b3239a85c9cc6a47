//! # Compact Block Reconciliation Subsystem (qc-05)
//!
//! Turns a block's transactions into 32-byte content keys and back. A node
//! receiving a compact block resolves the keys against its local transaction
//! pool and asks peers only for what it is missing.
//!
//! ## Architecture Role
//!
//! ```text
//! [Consensus (8)] ──compact keys──→ [Compact Blocks (5)] ──get/has──→ [Mempool (6)]
//!                                          │    ↑
//!                       request missing tx ↓    │ handle_received_tx
//!                                       [Peer A] [Peer B] ...
//! ```
//!
//! ## Guarantees
//!
//! - At most one in-flight request per block; late callers join it
//! - A request completes exactly once and wakes every waiter
//! - Cancelling one waiter never affects the others
//! - Output order always matches the order of the compact keys

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod ports;
pub mod service;

pub use config::{CompactBlockConfig, ConfigFile, LoggingConfig};
pub use domain::*;
pub use error::{ConfigError, ReconciliationError, ReconciliationResult};
pub use logging::init_logging;
pub use ports::inbound::CompactBlockApi;
pub use ports::outbound::{RecoveryStatsSink, TxGossip, TxStore};
pub use service::CompactBlockService;
