//! Wallet operations: the encode → assemble → sign → broadcast → record
//! pipeline and the read paths over the reconciliation store.
//!
//! # Responsibilities
//! - Deploy wallets through the factory contract
//! - Submit fund-transfer proposals to existing wallets
//! - Serve records enriched with freshly read balances
//!
//! Encoding and signing failures abort before any network call; a failed
//! broadcast creates zero records.

use alloy::primitives::{
    utils::format_ether,
    Address, Bytes, TxHash, U256,
};
use alloy::signers::local::PrivateKeySigner;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::chain::abi::{self, AbiError, AbiValue};
use crate::chain::tx::{self, SignError};
use crate::chain::{ChainClient, ChainError};
use crate::custody::records::{OperationKind, RecordPatch, WalletOperationRecord};
use crate::custody::store::{RecordStore, StoreError};
use crate::observability::metrics;

/// Convert base units to display units (fixed 10^18 divisor).
pub fn to_display_units(wei: U256) -> f64 {
    format_ether(wei).parse().unwrap_or(f64::NAN)
}

/// Failure taxonomy for wallet operations, surfaced to HTTP with its code.
#[derive(Debug, Error)]
pub enum OperationError {
    /// Malformed or unsupported ABI arguments. Fatal to the request.
    #[error("call data encoding failed: {0}")]
    Encoding(#[from] AbiError),

    /// Operator key problem. Indicates misconfiguration.
    #[error("transaction signing failed: {0}")]
    Signing(#[from] SignError),

    /// Node rejected the signed transaction. Retryable with fresh params.
    #[error("broadcast failed: {0}")]
    Broadcast(#[source] ChainError),

    /// Chain state read failed.
    #[error("chain read failed: {0}")]
    Chain(#[from] ChainError),

    /// Persistence failed on the synchronous path.
    #[error("record store failed: {0}")]
    Store(#[from] StoreError),
}

impl OperationError {
    /// Stable taxonomy code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Encoding(_) => "encoding_error",
            Self::Signing(_) => "signing_error",
            Self::Broadcast(_) => "broadcast_error",
            Self::Chain(_) => "chain_error",
            Self::Store(_) => "store_error",
        }
    }
}

/// What a synchronous wallet operation returns: enrichment arrives later.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationReceipt {
    pub transaction_hash: TxHash,
    /// Epoch milliseconds at broadcast time.
    pub created_at: u64,
}

/// A record plus its freshly read wallet balance (display units).
#[derive(Debug, Clone)]
pub struct EnrichedRecord {
    pub record: WalletOperationRecord,
    pub balance: Option<f64>,
}

/// Custody policy: which factory to deploy through and with what shape.
#[derive(Debug, Clone, Copy)]
pub struct CustodyPolicy {
    pub factory: Address,
    pub owners_per_wallet: usize,
    pub required_signatures: u64,
}

/// The custody engine's synchronous surface.
pub struct CustodyService {
    client: ChainClient,
    store: Arc<dyn RecordStore>,
    signer: PrivateKeySigner,
    policy: CustodyPolicy,
}

impl CustodyService {
    pub fn new(
        client: ChainClient,
        store: Arc<dyn RecordStore>,
        signer: PrivateKeySigner,
        policy: CustodyPolicy,
    ) -> Self {
        tracing::info!(
            operator = %signer.address(),
            factory = %policy.factory,
            owners = policy.owners_per_wallet,
            required = policy.required_signatures,
            "Custody service initialized"
        );
        Self {
            client,
            store,
            signer,
            policy,
        }
    }

    /// The operator account all transactions are signed with.
    pub fn operator(&self) -> Address {
        self.signer.address()
    }

    /// The chain gateway, for health checks.
    pub fn chain(&self) -> &ChainClient {
        &self.client
    }

    /// Deploy a new multi-signature wallet through the factory.
    ///
    /// Owner accounts are generated fresh; only their addresses leave this
    /// function. Returns as soon as the broadcast is acknowledged;
    /// enrichment happens asynchronously when the factory event arrives.
    pub async fn create_wallet(&self) -> Result<OperationReceipt, OperationError> {
        let owners: Vec<Address> = (0..self.policy.owners_per_wallet)
            .map(|_| PrivateKeySigner::random().address())
            .collect();
        tracing::debug!(?owners, "Generated wallet owner accounts");

        let data = abi::encode_call(
            "create(address[],uint256)",
            &[
                AbiValue::AddressArray(owners),
                AbiValue::Uint(U256::from(self.policy.required_signatures)),
            ],
        )?;

        self.broadcast_operation(
            self.policy.factory,
            U256::ZERO,
            data,
            OperationKind::WalletCreation,
        )
        .await
    }

    /// Submit a fund-transfer proposal to an existing wallet.
    ///
    /// `amount` is already scaled to base units; destination validity is the
    /// caller's responsibility.
    pub async fn send_funds(
        &self,
        wallet: Address,
        destination: Address,
        amount: U256,
    ) -> Result<OperationReceipt, OperationError> {
        let data = abi::encode_call(
            "submitTransaction(address,uint256,bytes)",
            &[
                AbiValue::Address(destination),
                AbiValue::Uint(amount),
                AbiValue::Bytes(Vec::new()),
            ],
        )?;

        self.broadcast_operation(wallet, U256::ZERO, data, OperationKind::FundTransfer)
            .await
    }

    /// All records, newest first, each with a freshly read balance.
    pub async fn list_wallets(&self) -> Result<Vec<EnrichedRecord>, OperationError> {
        let records = self.store.list_all()?;
        let mut out = Vec::with_capacity(records.len());
        for record in records {
            let balance = self.read_balance(&record).await;
            out.push(EnrichedRecord { record, balance });
        }
        Ok(out)
    }

    /// A single record by its transaction hash.
    pub async fn get_wallet(
        &self,
        transaction_hash: TxHash,
    ) -> Result<Option<EnrichedRecord>, OperationError> {
        let Some(record) = self.store.get(&transaction_hash)? else {
            return Ok(None);
        };
        let balance = self.read_balance(&record).await;
        Ok(Some(EnrichedRecord { record, balance }))
    }

    /// Operator address and balance in display units.
    pub async fn operator_status(&self) -> Result<(Address, f64), OperationError> {
        let operator = self.operator();
        let wei = self.client.get_balance(operator).await?;
        Ok((operator, to_display_units(wei)))
    }

    async fn read_balance(&self, record: &WalletOperationRecord) -> Option<f64> {
        let wallet = record.wallet_address?;
        match self.client.get_balance(wallet).await {
            Ok(wei) => Some(to_display_units(wei)),
            Err(e) => {
                // Balance is a read-time decoration; a node hiccup must not
                // hide the record itself.
                tracing::warn!(wallet = %wallet, error = %e, "Balance read failed");
                None
            }
        }
    }

    async fn broadcast_operation(
        &self,
        to: Address,
        value: U256,
        data: Bytes,
        kind: OperationKind,
    ) -> Result<OperationReceipt, OperationError> {
        let params = self.client.read_params(self.operator()).await?;
        let unsigned = tx::assemble(to, value, data, params);
        let signed = tx::sign(unsigned, &self.signer)?;

        let transaction_hash = self
            .client
            .broadcast(&signed.raw)
            .await
            .map_err(OperationError::Broadcast)?;
        if transaction_hash != signed.hash {
            tracing::warn!(
                local = %signed.hash,
                node = %transaction_hash,
                "Node reported a different transaction hash than the serialized bytes imply"
            );
        }

        let created_at = epoch_millis();
        let record = self
            .store
            .upsert(transaction_hash, RecordPatch::broadcast(kind, created_at))?;
        metrics::record_broadcast(kind_label(kind));
        tracing::info!(
            tx = %transaction_hash,
            to = %to,
            nonce = params.nonce,
            state = ?record.state,
            "Operation broadcast"
        );

        Ok(OperationReceipt {
            transaction_hash,
            created_at,
        })
    }
}

fn kind_label(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::WalletCreation => "wallet_creation",
        OperationKind::FundTransfer => "fund_transfer",
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
