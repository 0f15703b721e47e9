//! HTTP API tests against a live server with an unreachable chain node.

use std::sync::Arc;

use alloy::primitives::{address, Address};
use custody_gateway::chain::{tx, ChainClient};
use custody_gateway::config::ServiceConfig;
use custody_gateway::custody::records::{OperationKind, RecordPatch};
use custody_gateway::custody::service::{CustodyPolicy, CustodyService};
use custody_gateway::custody::store::{MemoryStore, RecordStore};
use custody_gateway::http::HttpServer;
use custody_gateway::lifecycle::Shutdown;

const OPERATOR_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const FACTORY: Address = address!("d18df206913b8e04371c543b631b7121a5c09c14");

async fn start_server(store: Arc<MemoryStore>) -> (String, Arc<Shutdown>) {
    let mut config = ServiceConfig::default();
    config.chain.rpc_url = "http://127.0.0.1:1".to_string();
    config.chain.rpc_timeout_secs = 1;
    config.custody.factory_address = format!("{FACTORY}");

    let client = ChainClient::new(&config.chain).await.unwrap();
    let signer = tx::signer_from_hex(OPERATOR_KEY).unwrap();
    let service = Arc::new(CustodyService::new(
        client,
        store as Arc<dyn RecordStore>,
        signer,
        CustodyPolicy {
            factory: FACTORY,
            owners_per_wallet: 3,
            required_signatures: 2,
        },
    ));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let shutdown = Arc::new(Shutdown::new());
    let server = HttpServer::new(service, &config);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (base_url, shutdown)
}

#[tokio::test]
async fn health_reports_unreachable_chain() {
    let (base_url, shutdown) = start_server(Arc::new(MemoryStore::new(None))).await;

    let body: serde_json::Value = reqwest::get(format!("{base_url}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "operational");
    assert_eq!(body["chain_reachable"], false);

    shutdown.trigger();
}

#[tokio::test]
async fn list_and_get_serve_recorded_operations() {
    let store = Arc::new(MemoryStore::new(None));
    let hash = alloy::primitives::b256!(
        "abababababababababababababababababababababababababababababababab"
    );
    store
        .upsert(hash, RecordPatch::broadcast(OperationKind::WalletCreation, 77))
        .unwrap();

    let (base_url, shutdown) = start_server(store).await;

    let listed: serde_json::Value = reqwest::get(format!("{base_url}/wallets"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["state"], "pending");
    assert_eq!(listed[0]["createdAt"], 77);
    assert!(listed[0].get("walletAddress").is_none());

    let fetched = reqwest::get(format!("{base_url}/wallets/{hash}"))
        .await
        .unwrap();
    assert_eq!(fetched.status(), 200);

    let missing = reqwest::get(format!(
        "{base_url}/wallets/0x0000000000000000000000000000000000000000000000000000000000000000"
    ))
    .await
    .unwrap();
    assert_eq!(missing.status(), 404);
    let body: serde_json::Value = missing.json().await.unwrap();
    assert_eq!(body["error"], "not_found");

    let malformed = reqwest::get(format!("{base_url}/wallets/not-a-hash"))
        .await
        .unwrap();
    assert_eq!(malformed.status(), 400);

    shutdown.trigger();
}

#[tokio::test]
async fn create_wallet_with_dead_node_fails_and_records_nothing() {
    let store = Arc::new(MemoryStore::new(None));
    let (base_url, shutdown) = start_server(store.clone()).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base_url}/wallet"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 502);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(
        body["error"] == "chain_error" || body["error"] == "broadcast_error",
        "unexpected taxonomy code: {body}"
    );
    assert!(store.is_empty());

    shutdown.trigger();
}

#[tokio::test]
async fn transfer_request_validation() {
    let (base_url, shutdown) = start_server(Arc::new(MemoryStore::new(None))).await;
    let client = reqwest::Client::new();

    // Bad wallet address in the path.
    let response = client
        .post(format!("{base_url}/wallet/nonsense/transfer"))
        .json(&serde_json::json!({ "destination": format!("{FACTORY}"), "amount": 0.5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Bad destination in the body.
    let response = client
        .post(format!("{base_url}/wallet/{FACTORY}/transfer"))
        .json(&serde_json::json!({ "destination": "0x123", "amount": 0.5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Negative amount.
    let response = client
        .post(format!("{base_url}/wallet/{FACTORY}/transfer"))
        .json(&serde_json::json!({ "destination": format!("{FACTORY}"), "amount": -1.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "invalid_request");

    shutdown.trigger();
}
