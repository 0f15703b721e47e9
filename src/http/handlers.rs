//! HTTP handlers for the custody API.

use alloy::primitives::{utils::parse_ether, Address, TxHash, U256};
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::custody::records::{OperationKind, OperationState};
use crate::custody::service::{EnrichedRecord, OperationReceipt};
use crate::http::response::ApiError;
use crate::http::server::AppState;

/// Record shape served to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletView {
    pub transaction_hash: TxHash,
    pub state: OperationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<OperationKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owners: Option<Vec<Address>>,
    #[serde(
        rename = "numberOfConfirmationsRequired",
        skip_serializing_if = "Option::is_none"
    )]
    pub required_confirmations: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<U256>,
    /// Freshly read, display units. Never persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
}

impl From<EnrichedRecord> for WalletView {
    fn from(enriched: EnrichedRecord) -> Self {
        let record = enriched.record;
        Self {
            transaction_hash: record.transaction_hash,
            state: record.state,
            kind: record.kind,
            created_at: record.created_at,
            wallet_address: record.wallet_address,
            owners: record.owners,
            required_confirmations: record.required_confirmations,
            submission_id: record.submission_id,
            balance: enriched.balance,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    /// Destination address for the proposed transfer.
    pub destination: String,
    /// Amount in display units; scaled to base units before encoding.
    pub amount: f64,
}

#[derive(Debug, Serialize)]
pub struct OperatorStatus {
    pub address: Address,
    pub balance: f64,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub chain_reachable: bool,
}

/// POST /wallet — deploy a new multi-signature wallet.
pub async fn create_wallet(
    State(state): State<AppState>,
) -> Result<Json<OperationReceipt>, ApiError> {
    let receipt = state.service.create_wallet().await?;
    Ok(Json(receipt))
}

/// POST /wallet/{address}/transfer — propose a fund transfer.
pub async fn send_funds(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<OperationReceipt>, ApiError> {
    let wallet: Address = address
        .parse()
        .map_err(|_| ApiError::bad_request(format!("'{address}' is not a wallet address")))?;
    let destination: Address = request.destination.parse().map_err(|_| {
        ApiError::bad_request(format!(
            "'{}' is not a destination address",
            request.destination
        ))
    })?;
    if !request.amount.is_finite() || request.amount < 0.0 {
        return Err(ApiError::bad_request("amount must be a non-negative number"));
    }
    let amount: U256 = parse_ether(&request.amount.to_string())
        .map_err(|e| ApiError::bad_request(format!("unrepresentable amount: {e}")))?;

    let receipt = state.service.send_funds(wallet, destination, amount).await?;
    Ok(Json(receipt))
}

/// GET /wallets — all records, newest first, with fresh balances.
pub async fn list_wallets(
    State(state): State<AppState>,
) -> Result<Json<Vec<WalletView>>, ApiError> {
    let records = state.service.list_wallets().await?;
    Ok(Json(records.into_iter().map(WalletView::from).collect()))
}

/// GET /wallets/{hash} — a single record by transaction hash.
pub async fn get_wallet(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<WalletView>, ApiError> {
    let transaction_hash: TxHash = hash
        .parse()
        .map_err(|_| ApiError::bad_request(format!("'{hash}' is not a transaction hash")))?;
    let record = state
        .service
        .get_wallet(transaction_hash)
        .await?
        .ok_or_else(ApiError::not_found)?;
    Ok(Json(record.into()))
}

/// GET /operator — operator address and balance in display units.
pub async fn operator_status(
    State(state): State<AppState>,
) -> Result<Json<OperatorStatus>, ApiError> {
    let (address, balance) = state.service.operator_status().await?;
    Ok(Json(OperatorStatus { address, balance }))
}

/// GET /health — liveness plus chain reachability.
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    let chain_reachable = state.service.chain().is_healthy().await;
    Json(Health {
        status: "operational",
        chain_reachable,
    })
}
