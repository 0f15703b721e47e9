//! Multi-Signature Custody Gateway
//!
//! Issues and tracks multi-signature custody wallets on a single configured
//! network: deploys wallets through a factory contract, submits
//! fund-transfer proposals, and reconciles every broadcast operation with
//! the contract event that later confirms it.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────┐
//!                  │                  CUSTODY GATEWAY                      │
//!                  │                                                       │
//!   HTTP Request   │  ┌──────┐   ┌─────────┐   ┌───────────────────────┐  │
//!   ───────────────┼─▶│ http │──▶│ custody │──▶│ chain                 │  │
//!                  │  └──────┘   │ service │   │ abi ▸ tx ▸ client ────┼──┼──▶ Node RPC
//!                  │             └────┬────┘   └───────────┬───────────┘  │
//!                  │                  │ upsert             │ logs          │
//!                  │                  ▼                    ▼               │
//!                  │           ┌─────────────┐   ┌──────────────────┐     │
//!                  │           │ custody     │◀──│ custody events + │     │
//!                  │           │ store       │   │ correlator task  │     │
//!                  │           └─────────────┘   └──────────────────┘     │
//!                  │                                                       │
//!                  │  Cross-cutting: config ▪ observability ▪ lifecycle    │
//!                  └──────────────────────────────────────────────────────┘
//! ```
//!
//! The broadcast path and the event path complete independently and in
//! either order; the store's idempotent per-key upsert is the single point
//! where they meet.

pub mod chain;
pub mod config;
pub mod custody;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::ServiceConfig;
pub use custody::{CustodyService, MemoryStore};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
