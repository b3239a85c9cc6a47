//! Ports layer for compact block reconciliation.
//!
//! - Inbound (Driving) ports: API exposed to consensus and block production
//! - Outbound (Driven) ports: the transaction store, peer gossip and the stats sink

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
