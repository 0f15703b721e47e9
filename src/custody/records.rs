//! The persisted unit of work and its merge semantics.
//!
//! A record is created by whichever completion path wins the race: the
//! broadcast path (Pending, keyed by transaction hash) or the event path
//! (directly Enriched). The two paths write disjoint fields, so applying
//! their patches in either order converges to the same record.

use alloy::primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};

/// What kind of wallet operation a record tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// A factory call deploying a new multi-signature wallet.
    WalletCreation,
    /// A fund-transfer proposal submitted to an existing wallet.
    FundTransfer,
}

/// Record lifecycle state. Records are never deleted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    /// Broadcast succeeded; the on-chain confirmation has not been seen.
    Pending,
    /// The matching contract event has been correlated.
    Enriched,
}

/// A durable wallet operation record, keyed by transaction hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletOperationRecord {
    /// Content-derived transaction identifier (the record key).
    pub transaction_hash: TxHash,
    pub state: OperationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<OperationKind>,
    /// Broadcast timestamp, epoch milliseconds. Absent if the event path
    /// created the record and the broadcast patch has not landed yet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,
    /// Instantiated wallet address; absent until enrichment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<Address>,
    /// Owner set of the wallet; absent until enrichment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owners: Option<Vec<Address>>,
    /// Confirmation threshold of the wallet; absent until enrichment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_confirmations: Option<u64>,
    /// Identifier the wallet assigned to a submitted transfer proposal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<U256>,
}

impl WalletOperationRecord {
    /// A fresh record with nothing but its key.
    pub fn new(transaction_hash: TxHash) -> Self {
        Self {
            transaction_hash,
            state: OperationState::Pending,
            kind: None,
            created_at: None,
            wallet_address: None,
            owners: None,
            required_confirmations: None,
            submission_id: None,
        }
    }

    /// Merge a patch, last writer wins per field.
    pub fn apply(&mut self, patch: RecordPatch) {
        if let Some(state) = patch.state {
            self.state = state;
        }
        if let Some(kind) = patch.kind {
            self.kind = Some(kind);
        }
        if let Some(created_at) = patch.created_at {
            self.created_at = Some(created_at);
        }
        if let Some(wallet_address) = patch.wallet_address {
            self.wallet_address = Some(wallet_address);
        }
        if let Some(owners) = patch.owners {
            self.owners = Some(owners);
        }
        if let Some(required) = patch.required_confirmations {
            self.required_confirmations = Some(required);
        }
        if let Some(submission_id) = patch.submission_id {
            self.submission_id = Some(submission_id);
        }
    }
}

/// The fields one completion path wants to merge into a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub state: Option<OperationState>,
    pub kind: Option<OperationKind>,
    pub created_at: Option<u64>,
    pub wallet_address: Option<Address>,
    pub owners: Option<Vec<Address>>,
    pub required_confirmations: Option<u64>,
    pub submission_id: Option<U256>,
}

impl RecordPatch {
    /// The patch the broadcast path applies the instant broadcast succeeds.
    pub fn broadcast(kind: OperationKind, created_at: u64) -> Self {
        Self {
            kind: Some(kind),
            created_at: Some(created_at),
            ..Self::default()
        }
    }

    /// The patch the event path applies for a wallet-creation event.
    pub fn wallet_created(wallet: Address, owners: Vec<Address>, required: u64) -> Self {
        Self {
            state: Some(OperationState::Enriched),
            kind: Some(OperationKind::WalletCreation),
            wallet_address: Some(wallet),
            owners: Some(owners),
            required_confirmations: Some(required),
            ..Self::default()
        }
    }

    /// The patch the event path applies for a transfer-submission event.
    pub fn transfer_submitted(submission_id: U256) -> Self {
        Self {
            state: Some(OperationState::Enriched),
            kind: Some(OperationKind::FundTransfer),
            submission_id: Some(submission_id),
            ..Self::default()
        }
    }
}
