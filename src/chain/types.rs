//! Chain-facing types and error definitions.

use thiserror::Error;

pub use crate::config::schema::ChainConfig;

/// Parameters read from the node immediately before assembling a
/// transaction. Never cached: a stale nonce or fee shows up as a broadcast
/// rejection, not an assembly failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainParams {
    /// Next nonce for the operator account.
    pub nonce: u64,
    /// Current gas price in wei.
    pub gas_price: u128,
    /// Gas limit for the transaction.
    pub gas_limit: u64,
    /// Chain ID for replay protection.
    pub chain_id: u64,
}

/// Errors that can occur while talking to the node.
#[derive(Debug, Error)]
pub enum ChainError {
    /// RPC connection or request failed.
    #[error("rpc {operation} failed: {message}")]
    Rpc {
        operation: &'static str,
        message: String,
    },

    /// RPC request timed out.
    #[error("rpc {operation} timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },

    /// The node rejected a signed transaction (stale nonce, low fee, ...).
    /// Retryable by the caller with freshly read chain parameters.
    #[error("broadcast rejected: {0}")]
    BroadcastRejected(String),

    /// Chain configuration mismatch.
    #[error("chain id mismatch: expected {expected}, node reports {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// Configured RPC endpoint could not be parsed.
    #[error("invalid rpc url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Contract state read returned data the decoder could not interpret.
    #[error("contract state decode failed: {0}")]
    StateDecode(#[from] crate::chain::abi::AbiError),
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;
