//! Reconciliation properties that span the store, the correlator, and the
//! broadcast pipeline.

use std::sync::Arc;

use alloy::primitives::{address, b256, Address, U256};
use custody_gateway::chain::{tx, ChainClient};
use custody_gateway::config::ChainConfig;
use custody_gateway::custody::correlator::EventCorrelator;
use custody_gateway::custody::events::{EventKind, EventLogEntry};
use custody_gateway::custody::records::{OperationKind, OperationState, RecordPatch};
use custody_gateway::custody::service::{CustodyPolicy, CustodyService, OperationError};
use custody_gateway::custody::store::{MemoryStore, RecordStore};

const OPERATOR_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const OPERATOR: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
const FACTORY: Address = address!("d18df206913b8e04371c543b631b7121a5c09c14");

fn creation_event() -> EventLogEntry {
    EventLogEntry {
        transaction_hash: b256!(
            "1111111111111111111111111111111111111111111111111111111111111111"
        ),
        contract: FACTORY,
        sender: OPERATOR,
        kind: EventKind::WalletCreated {
            wallet: address!("2222222222222222222222222222222222222222"),
            owners: vec![
                address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
                address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"),
                address!("cccccccccccccccccccccccccccccccccccccccc"),
            ],
            required: 2,
        },
    }
}

/// Service wired to an endpoint nothing listens on: chain calls fail fast,
/// the store stays real.
async fn dead_chain_service(store: Arc<MemoryStore>) -> CustodyService {
    let client = ChainClient::new(&ChainConfig {
        rpc_url: "http://127.0.0.1:1".to_string(),
        chain_id: 31337,
        rpc_timeout_secs: 1,
        confirmation_blocks: 1,
    })
    .await
    .unwrap();
    let signer = tx::signer_from_hex(OPERATOR_KEY).unwrap();
    CustodyService::new(
        client,
        store as Arc<dyn RecordStore>,
        signer,
        CustodyPolicy {
            factory: FACTORY,
            owners_per_wallet: 3,
            required_signatures: 2,
        },
    )
}

#[tokio::test]
async fn broadcast_then_event_converges_with_event_then_broadcast() {
    let entry = creation_event();
    let broadcast = RecordPatch::broadcast(OperationKind::WalletCreation, 1_600_000_000_000);

    let store_a = Arc::new(MemoryStore::new(None));
    store_a
        .upsert(entry.transaction_hash, broadcast.clone())
        .unwrap();
    EventCorrelator::new(store_a.clone(), OPERATOR)
        .process(entry.clone())
        .await;

    let store_b = Arc::new(MemoryStore::new(None));
    EventCorrelator::new(store_b.clone(), OPERATOR)
        .process(entry.clone())
        .await;
    store_b.upsert(entry.transaction_hash, broadcast).unwrap();

    let a = store_a.get(&entry.transaction_hash).unwrap().unwrap();
    let b = store_b.get(&entry.transaction_hash).unwrap().unwrap();

    assert_eq!(a, b);
    assert_eq!(a.state, OperationState::Enriched);
    assert_eq!(a.created_at, Some(1_600_000_000_000));
    assert!(a.wallet_address.is_some());
    assert_eq!(a.owners.as_ref().map(Vec::len), Some(3));
    assert_eq!(a.required_confirmations, Some(2));
}

#[tokio::test]
async fn duplicate_event_delivery_changes_nothing() {
    let entry = creation_event();
    let store = Arc::new(MemoryStore::new(None));
    let correlator = EventCorrelator::new(store.clone(), OPERATOR);

    correlator.process(entry.clone()).await;
    let first = store.get(&entry.transaction_hash).unwrap().unwrap();

    // Re-delivery after a subscription reconnect.
    correlator.process(entry.clone()).await;
    correlator.process(entry.clone()).await;
    let last = store.get(&entry.transaction_hash).unwrap().unwrap();

    assert_eq!(first, last);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn event_without_broadcast_record_is_enriched_not_dropped() {
    let entry = creation_event();
    let store = Arc::new(MemoryStore::new(None));

    // The broadcast path has not written anything for this hash.
    EventCorrelator::new(store.clone(), OPERATOR)
        .process(entry.clone())
        .await;

    let record = store.get(&entry.transaction_hash).unwrap().unwrap();
    assert_eq!(record.state, OperationState::Enriched);
    assert!(record.created_at.is_none());
}

#[tokio::test]
async fn failed_broadcast_leaves_zero_records() {
    let store = Arc::new(MemoryStore::new(None));
    let service = dead_chain_service(store.clone()).await;

    let err = service.create_wallet().await.unwrap_err();
    assert!(matches!(
        err,
        OperationError::Chain(_) | OperationError::Broadcast(_)
    ));
    assert!(store.is_empty());

    let err = service
        .send_funds(
            address!("2222222222222222222222222222222222222222"),
            address!("3333333333333333333333333333333333333333"),
            U256::from(1_000_000u64),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OperationError::Chain(_) | OperationError::Broadcast(_)
    ));
    assert!(store.is_empty());
}

#[tokio::test]
async fn reads_work_while_chain_is_down() {
    let store = Arc::new(MemoryStore::new(None));
    store
        .upsert(
            creation_event().transaction_hash,
            RecordPatch::broadcast(OperationKind::WalletCreation, 42),
        )
        .unwrap();
    let service = dead_chain_service(store.clone()).await;

    // Listing still serves records; the unreadable balance is simply absent.
    let listed = service.list_wallets().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].balance.is_none());

    let fetched = service
        .get_wallet(creation_event().transaction_hash)
        .await
        .unwrap();
    assert!(fetched.is_some());
}
