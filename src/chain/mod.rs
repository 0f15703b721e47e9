//! Chain gateway: RPC access plus the pure transaction-construction core.
//!
//! ```text
//! abi (encode call data) ──▶ tx (assemble, sign) ──▶ client (broadcast)
//!                                                      │
//!                                 client (logs, calls) ◀┘ event side
//! ```

pub mod abi;
pub mod client;
pub mod tx;
pub mod types;

pub use client::ChainClient;
pub use types::{ChainError, ChainParams, ChainResult};
