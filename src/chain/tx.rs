//! Transaction assembly and signing.
//!
//! # Responsibilities
//! - Build an immutable unsigned transaction from call data and chain params
//! - Produce the EIP-155 signature and canonical RLP serialization
//! - Load the operator key from the environment
//!
//! # Design Decisions
//! - Signing is deterministic (RFC 6979 nonce derivation under alloy), so
//!   signing the same transaction twice yields byte-identical output
//! - The transaction hash is computed from the serialized bytes and nothing
//!   else (content addressing)

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, Bytes, Signature, TxHash, U256};
use alloy::signers::local::PrivateKeySigner;
use thiserror::Error;

use crate::chain::types::ChainParams;

/// Environment variable holding the operator's hex-encoded private key.
/// The key is never read from the config file and never logged.
pub const OPERATOR_KEY_ENV: &str = "CUSTODY_OPERATOR_KEY";

/// Errors from key loading or signing.
#[derive(Debug, Error)]
pub enum SignError {
    /// The operator key is missing or not a valid secp256k1 scalar.
    #[error("invalid operator key: {0}")]
    InvalidKey(String),

    /// The signer rejected the transaction.
    #[error("signing failed: {0}")]
    Signer(String),
}

/// A signed, serialized transaction ready for broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedTransaction {
    /// Canonical RLP serialization (what goes on the wire).
    pub raw: Bytes,
    /// keccak-256 of `raw`.
    pub hash: TxHash,
    /// The recoverable ECDSA signature over the chain-id-bound digest.
    pub signature: Signature,
}

impl SignedTransaction {
    /// Hex form of the raw bytes as the node expects them.
    pub fn raw_hex(&self) -> String {
        format!("0x{}", alloy::hex::encode(&self.raw))
    }
}

/// Build an unsigned legacy transaction.
///
/// Structural only: destination format and value sanity are the caller's
/// responsibility, and `params` must have been read from the node
/// immediately beforehand.
pub fn assemble(to: Address, value: U256, data: Bytes, params: ChainParams) -> TxLegacy {
    TxLegacy {
        chain_id: Some(params.chain_id),
        nonce: params.nonce,
        gas_price: params.gas_price,
        gas_limit: params.gas_limit,
        to: to.into(),
        value,
        input: data,
    }
}

/// Sign an unsigned transaction and serialize it for broadcast.
///
/// The digest is bound to the chain id per EIP-155, so a signed transaction
/// cannot be replayed on another network.
pub fn sign(unsigned: TxLegacy, signer: &PrivateKeySigner) -> Result<SignedTransaction, SignError> {
    let mut tx = unsigned;
    let signature = signer
        .sign_transaction_sync(&mut tx)
        .map_err(|e| SignError::Signer(e.to_string()))?;

    let signed = tx.into_signed(signature);
    let hash = *signed.hash();
    let envelope = TxEnvelope::from(signed);

    Ok(SignedTransaction {
        raw: envelope.encoded_2718().into(),
        hash,
        signature,
    })
}

/// Parse a hex private key (with or without `0x` prefix) into a signer.
pub fn signer_from_hex(private_key_hex: &str) -> Result<PrivateKeySigner, SignError> {
    let key_hex = private_key_hex
        .strip_prefix("0x")
        .unwrap_or(private_key_hex);
    key_hex
        .parse()
        .map_err(|e| SignError::InvalidKey(format!("{e}")))
}

/// Load the operator signer from `CUSTODY_OPERATOR_KEY`.
pub fn operator_signer_from_env() -> Result<PrivateKeySigner, SignError> {
    let private_key = std::env::var(OPERATOR_KEY_ENV)
        .map_err(|_| SignError::InvalidKey(format!("environment variable {OPERATOR_KEY_ENV} not set")))?;
    signer_from_hex(&private_key)
}
