//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implementations of the outbound ports. The in-memory store and the mock
//! gossip are used by tests and by local tooling that runs the reconciliation
//! path without a network.

mod gossip;
mod stats_sink;
mod tx_store;

pub use gossip::MockTxGossip;
pub use stats_sink::{MockStatsSink, TracingStatsSink};
pub use tx_store::InMemoryTxStore;
