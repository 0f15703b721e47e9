//! The single correlation task.
//!
//! # Responsibilities
//! - Consume the event stream and filter for operator-issued transactions
//! - Fold derived fields into records via idempotent upserts
//! - Keep going across duplicate deliveries and store hiccups
//!
//! Matching is strictly sender equality then transaction-hash equality; the
//! store is never addressed by "most recent pending record" or any other
//! heuristic. If the event arrives before the broadcast path has recorded
//! anything, the upsert creates the record directly in Enriched state, which
//! makes the two completion paths order-independent.

use alloy::primitives::Address;
use futures_util::StreamExt;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::custody::events::{EventKind, EventLogEntry};
use crate::custody::records::RecordPatch;
use crate::custody::store::RecordStore;
use crate::observability::metrics;

/// Store retry policy for the asynchronous path: no caller is waiting, so
/// failures are retried with backoff instead of being surfaced.
const STORE_RETRY_ATTEMPTS: u32 = 5;
const STORE_RETRY_BASE_MS: u64 = 200;
const STORE_RETRY_MAX_MS: u64 = 5_000;

/// Correlates contract events with broadcast wallet operations.
pub struct EventCorrelator {
    store: Arc<dyn RecordStore>,
    operator: Address,
}

impl EventCorrelator {
    pub fn new(store: Arc<dyn RecordStore>, operator: Address) -> Self {
        Self { store, operator }
    }

    /// Consume the event stream until it ends or shutdown is signalled.
    pub async fn run<S>(self, events: S, mut shutdown: broadcast::Receiver<()>)
    where
        S: futures_util::Stream<Item = EventLogEntry>,
    {
        tracing::info!(operator = %self.operator, "Event correlator started");
        let mut events = std::pin::pin!(events);
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Event correlator shutting down");
                    break;
                }
                next = events.next() => match next {
                    Some(entry) => self.process(entry).await,
                    None => {
                        tracing::warn!("Event stream ended");
                        break;
                    }
                },
            }
        }
    }

    /// Apply one event. Idempotent: a duplicate delivery merges an identical
    /// patch and leaves the record unchanged.
    pub async fn process(&self, entry: EventLogEntry) {
        // Addresses compare as parsed bytes, so hex casing on the wire is
        // irrelevant here.
        if entry.sender != self.operator {
            tracing::trace!(
                sender = %entry.sender,
                tx = %entry.transaction_hash,
                "Discarding event from foreign sender"
            );
            return;
        }

        let patch = match &entry.kind {
            EventKind::WalletCreated {
                wallet,
                owners,
                required,
            } => RecordPatch::wallet_created(*wallet, owners.clone(), *required),
            EventKind::TransferSubmitted { submission_id } => {
                RecordPatch::transfer_submitted(*submission_id)
            }
        };

        for attempt in 0..=STORE_RETRY_ATTEMPTS {
            match self.store.upsert(entry.transaction_hash, patch.clone()) {
                Ok(record) => {
                    metrics::record_event_correlated(match entry.kind {
                        EventKind::WalletCreated { .. } => "wallet_created",
                        EventKind::TransferSubmitted { .. } => "transfer_submitted",
                    });
                    tracing::info!(
                        tx = %entry.transaction_hash,
                        contract = %entry.contract,
                        state = ?record.state,
                        "Event correlated"
                    );
                    return;
                }
                Err(e) if attempt < STORE_RETRY_ATTEMPTS => {
                    let delay = calculate_backoff(attempt + 1, STORE_RETRY_BASE_MS, STORE_RETRY_MAX_MS);
                    tracing::warn!(
                        error = %e,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Store upsert failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        tx = %entry.transaction_hash,
                        "Giving up on event after repeated store failures"
                    );
                    return;
                }
            }
        }
    }
}

/// Exponential backoff with jitter.
fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let capped_delay = base_ms.saturating_mul(exponential_base).min(max_ms);

    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
