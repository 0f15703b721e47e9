//! Contract event decoding and the restartable event stream.
//!
//! # Responsibilities
//! - Decode factory and wallet logs into `EventLogEntry` values
//! - Derive enrichment fields (owner set, confirmation threshold) via
//!   read-only contract calls
//! - Expose an unbounded, lazy stream over confirmed blocks
//!
//! The stream is a polling cursor: a restart resets it to the current head,
//! so deliveries may duplicate or gap. Correctness never depends on
//! exactly-once delivery; the correlator's upserts are idempotent.

use alloy::primitives::{Address, TxHash, U256};
use alloy::rpc::types::eth::Filter;
use alloy::sol;
use alloy::sol_types::SolEvent;
use futures_util::stream::{self, Stream};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::chain::abi::{self, AbiType, AbiValue};
use crate::chain::{ChainClient, ChainResult};
use crate::custody::store::RecordStore;

sol! {
    /// Emitted by the wallet factory for every deployed wallet.
    #[derive(Debug)]
    event ContractInstantiation(address sender, address instantiation);

    /// Emitted by a wallet when a transfer proposal is submitted.
    #[derive(Debug)]
    event Submission(uint256 indexed transactionId);
}

/// What a decoded log means to the custody engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    WalletCreated {
        wallet: Address,
        owners: Vec<Address>,
        required: u64,
    },
    TransferSubmitted {
        submission_id: U256,
    },
}

/// A decoded, attributed contract event. Ephemeral: only its derived fields
/// are folded into a record, the entry itself is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLogEntry {
    /// Hash of the transaction that emitted the event.
    pub transaction_hash: TxHash,
    /// The emitting contract.
    pub contract: Address,
    /// The account the event is attributed to.
    pub sender: Address,
    pub kind: EventKind,
}

/// Read a wallet's owner set and confirmation threshold.
pub async fn read_wallet_config(
    client: &ChainClient,
    wallet: Address,
) -> ChainResult<(Vec<Address>, u64)> {
    let data = abi::encode_call("getOwners()", &[])?;
    let ret = client.call(wallet, data).await?;
    let owners = match abi::decode(&[AbiType::AddressArray], &ret)?.pop() {
        Some(AbiValue::AddressArray(owners)) => owners,
        // decode returns the declared types; this arm cannot be reached
        _ => Vec::new(),
    };

    let data = abi::encode_call("required()", &[])?;
    let ret = client.call(wallet, data).await?;
    let required = match abi::decode(&[AbiType::Uint256], &ret)?.pop() {
        Some(AbiValue::Uint(value)) => u64::try_from(value).unwrap_or(u64::MAX),
        _ => 0,
    };

    Ok((owners, required))
}

/// An unbounded stream of decoded events from confirmed blocks.
///
/// Lazy (nothing is fetched until polled), restartable (a new call starts a
/// fresh cursor at the current head), and tolerant of node errors: a failed
/// poll leaves the cursor in place so the range is re-fetched next tick.
pub fn event_stream(
    client: ChainClient,
    store: Arc<dyn RecordStore>,
    factory: Address,
    poll_interval: Duration,
) -> impl Stream<Item = EventLogEntry> {
    let state = StreamState {
        client,
        store,
        factory,
        poll_interval,
        cursor: 0,
        buffered: VecDeque::new(),
    };
    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(entry) = state.buffered.pop_front() {
                return Some((entry, state));
            }
            state.poll_once().await;
        }
    })
}

struct StreamState {
    client: ChainClient,
    store: Arc<dyn RecordStore>,
    factory: Address,
    poll_interval: Duration,
    cursor: u64,
    buffered: VecDeque<EventLogEntry>,
}

impl StreamState {
    async fn poll_once(&mut self) {
        sleep(self.poll_interval).await;

        let head = match self.client.get_block_number().await {
            Ok(head) => head,
            Err(e) => {
                tracing::warn!(error = %e, "Event poll could not read chain head");
                return;
            }
        };
        let target = head.saturating_sub(self.client.confirmation_blocks());

        if self.cursor == 0 {
            self.cursor = target;
            tracing::info!(block = target, "Event cursor initialized");
            return;
        }
        if target <= self.cursor {
            return;
        }
        let from = self.cursor + 1;

        let creations = match self.collect_creations(from, target).await {
            Ok(entries) => entries,
            Err(e) => {
                // Leave the cursor so the whole range is retried; duplicates
                // are absorbed downstream.
                tracing::warn!(error = %e, from, to = target, "Factory event poll failed");
                return;
            }
        };
        let submissions = match self.collect_submissions(from, target).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, from, to = target, "Submission event poll failed");
                return;
            }
        };

        self.buffered.extend(creations);
        self.buffered.extend(submissions);
        self.cursor = target;
    }

    async fn collect_creations(&self, from: u64, to: u64) -> ChainResult<Vec<EventLogEntry>> {
        let filter = Filter::new()
            .address(self.factory)
            .from_block(from)
            .to_block(to)
            .event(ContractInstantiation::SIGNATURE);
        let logs = self.client.get_logs(&filter).await?;

        let mut entries = Vec::new();
        for log in logs {
            let Ok(decoded) = log.log_decode::<ContractInstantiation>() else {
                tracing::warn!(contract = %self.factory, "Skipping undecodable factory log");
                continue;
            };
            let Some(transaction_hash) = log.transaction_hash else {
                continue;
            };
            let event = decoded.inner.data;
            let (owners, required) = read_wallet_config(&self.client, event.instantiation).await?;
            entries.push(EventLogEntry {
                transaction_hash,
                contract: self.factory,
                sender: event.sender,
                kind: EventKind::WalletCreated {
                    wallet: event.instantiation,
                    owners,
                    required,
                },
            });
        }
        Ok(entries)
    }

    async fn collect_submissions(&self, from: u64, to: u64) -> ChainResult<Vec<EventLogEntry>> {
        let wallets: Vec<Address> = match self.store.list_all() {
            Ok(records) => records
                .into_iter()
                .filter_map(|record| record.wallet_address)
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not list wallets for submission poll");
                Vec::new()
            }
        };
        if wallets.is_empty() {
            return Ok(Vec::new());
        }

        let filter = Filter::new()
            .address(wallets)
            .from_block(from)
            .to_block(to)
            .event(Submission::SIGNATURE);
        let logs = self.client.get_logs(&filter).await?;

        let mut entries = Vec::new();
        for log in logs {
            let Ok(decoded) = log.log_decode::<Submission>() else {
                tracing::warn!("Skipping undecodable wallet log");
                continue;
            };
            let Some(transaction_hash) = log.transaction_hash else {
                continue;
            };
            // Submission carries no sender argument; attribute it from the
            // emitting transaction so the operator filter can run.
            let Some(sender) = self.client.get_transaction_sender(transaction_hash).await? else {
                tracing::warn!(tx = %transaction_hash, "Submission with no retrievable sender");
                continue;
            };
            entries.push(EventLogEntry {
                transaction_hash,
                contract: log.address(),
                sender,
                kind: EventKind::TransferSubmitted {
                    submission_id: decoded.inner.data.transactionId,
                },
            });
        }
        Ok(entries)
    }
}
