//! Blockchain RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Connect to the JSON-RPC endpoint
//! - Read chain state (nonce, gas price, block gas limit, balances)
//! - Broadcast signed transactions and fetch contract event logs
//! - Provide a health check for chain connectivity
//!
//! This is the only suspension point in the engine: everything above it
//! (encoding, assembly, signing) is pure computation.

use alloy::eips::BlockNumberOrTag;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::eth::{Filter, Log, TransactionRequest};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::chain::types::{ChainConfig, ChainError, ChainParams, ChainResult};
use crate::observability::metrics;

/// RPC client wrapper exposing exactly the capability set the engine needs.
#[derive(Clone)]
pub struct ChainClient {
    provider: Arc<dyn Provider + Send + Sync>,
    chain_id: u64,
    timeout_duration: Duration,
    confirmation_blocks: u64,
}

impl ChainClient {
    /// Create a new chain client from configuration.
    ///
    /// Initialization succeeds even if the node is unreachable; the chain id
    /// check is advisory so the service can start before its node does.
    pub async fn new(config: &ChainConfig) -> ChainResult<Self> {
        let rpc_url: url::Url = config.rpc_url.parse().map_err(|e| ChainError::InvalidUrl {
            url: config.rpc_url.clone(),
            reason: format!("{e}"),
        })?;

        let provider = Arc::new(ProviderBuilder::new().connect_http(rpc_url))
            as Arc<dyn Provider + Send + Sync>;
        let client = Self {
            provider,
            chain_id: config.chain_id,
            timeout_duration: Duration::from_secs(config.rpc_timeout_secs),
            confirmation_blocks: config.confirmation_blocks,
        };

        match client.verify_chain_id().await {
            Ok(()) => {
                tracing::info!(
                    rpc_url = %config.rpc_url,
                    chain_id = config.chain_id,
                    "Chain client initialized"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Chain client initialized but chain verification failed"
                );
            }
        }

        Ok(client)
    }

    /// Verify the connected chain id matches configuration.
    pub async fn verify_chain_id(&self) -> ChainResult<()> {
        let actual = self
            .with_timeout("eth_chainId", self.provider.get_chain_id())
            .await?;
        if actual != self.chain_id {
            return Err(ChainError::ChainMismatch {
                expected: self.chain_id,
                actual,
            });
        }
        Ok(())
    }

    /// The configured chain id.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Block depth required before an event is considered settled.
    pub fn confirmation_blocks(&self) -> u64 {
        self.confirmation_blocks
    }

    /// Get the latest block number.
    pub async fn get_block_number(&self) -> ChainResult<u64> {
        self.with_timeout("eth_blockNumber", self.provider.get_block_number())
            .await
    }

    /// Get the next nonce for an address.
    pub async fn get_transaction_count(&self, address: Address) -> ChainResult<u64> {
        self.with_timeout(
            "eth_getTransactionCount",
            self.provider.get_transaction_count(address),
        )
        .await
    }

    /// Get the current gas price in wei.
    pub async fn get_gas_price(&self) -> ChainResult<u128> {
        self.with_timeout("eth_gasPrice", self.provider.get_gas_price())
            .await
    }

    /// Get the gas limit of the latest block.
    pub async fn get_latest_block_gas_limit(&self) -> ChainResult<u64> {
        let block = self
            .with_timeout(
                "eth_getBlockByNumber",
                self.provider.get_block_by_number(BlockNumberOrTag::Latest),
            )
            .await?;
        block
            .map(|b| b.header.gas_limit)
            .ok_or_else(|| ChainError::Rpc {
                operation: "eth_getBlockByNumber",
                message: "node returned no latest block".to_string(),
            })
    }

    /// Get the balance of an address in wei.
    pub async fn get_balance(&self, address: Address) -> ChainResult<U256> {
        self.with_timeout("eth_getBalance", self.provider.get_balance(address))
            .await
    }

    /// Read the chain parameters needed to assemble a transaction.
    ///
    /// Always fresh reads; the engine never caches these.
    pub async fn read_params(&self, operator: Address) -> ChainResult<ChainParams> {
        let nonce = self.get_transaction_count(operator).await?;
        let gas_price = self.get_gas_price().await?;
        let gas_limit = self.get_latest_block_gas_limit().await?;
        Ok(ChainParams {
            nonce,
            gas_price,
            gas_limit,
            chain_id: self.chain_id,
        })
    }

    /// Broadcast raw signed transaction bytes.
    ///
    /// The provider hex-encodes the bytes with a `0x` prefix on the wire.
    /// A node rejection surfaces as `BroadcastRejected` and is retryable
    /// with freshly read chain parameters.
    pub async fn broadcast(&self, raw: &[u8]) -> ChainResult<TxHash> {
        let fut = self.provider.send_raw_transaction(raw);
        match timeout(self.timeout_duration, fut).await {
            Ok(Ok(pending)) => Ok(*pending.tx_hash()),
            Ok(Err(e)) => Err(ChainError::BroadcastRejected(e.to_string())),
            Err(_) => Err(ChainError::Timeout {
                operation: "eth_sendRawTransaction",
                seconds: self.timeout_duration.as_secs(),
            }),
        }
    }

    /// Fetch event logs matching a filter.
    pub async fn get_logs(&self, filter: &Filter) -> ChainResult<Vec<Log>> {
        self.with_timeout("eth_getLogs", self.provider.get_logs(filter))
            .await
    }

    /// Execute a read-only contract call and return its raw output.
    pub async fn call(&self, to: Address, data: Bytes) -> ChainResult<Bytes> {
        let request = TransactionRequest::default().with_to(to).with_input(data);
        self.with_timeout("eth_call", self.provider.call(request))
            .await
    }

    /// Recover the sender of a mined transaction from its receipt.
    ///
    /// Used to attribute events whose arguments carry no sender.
    pub async fn get_transaction_sender(&self, hash: TxHash) -> ChainResult<Option<Address>> {
        let receipt = self
            .with_timeout(
                "eth_getTransactionReceipt",
                self.provider.get_transaction_receipt(hash),
            )
            .await?;
        Ok(receipt.map(|receipt| receipt.from))
    }

    /// Check if the chain is reachable.
    pub async fn is_healthy(&self) -> bool {
        let healthy = self.get_block_number().await.is_ok();
        metrics::record_chain_health(healthy);
        healthy
    }

    async fn with_timeout<F, T, E>(&self, operation: &'static str, fut: F) -> ChainResult<T>
    where
        F: IntoFuture<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        match timeout(self.timeout_duration, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!(operation, error = %e, "RPC error");
                Err(ChainError::Rpc {
                    operation,
                    message: e.to_string(),
                })
            }
            Err(_) => {
                tracing::warn!(operation, "RPC timeout");
                Err(ChainError::Timeout {
                    operation,
                    seconds: self.timeout_duration.as_secs(),
                })
            }
        }
    }
}

impl std::fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainClient")
            .field("chain_id", &self.chain_id)
            .field("timeout_secs", &self.timeout_duration.as_secs())
            .field("confirmation_blocks", &self.confirmation_blocks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ChainConfig;

    fn test_config() -> ChainConfig {
        ChainConfig {
            rpc_url: "http://127.0.0.1:1".to_string(), // nothing listens here
            chain_id: 31337,
            rpc_timeout_secs: 1,
            confirmation_blocks: 1,
        }
    }

    #[tokio::test]
    async fn test_client_creation_without_node() {
        // Creation should succeed even when the RPC endpoint is unreachable.
        let client = ChainClient::new(&test_config()).await;
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let mut config = test_config();
        config.rpc_url = "not a url".to_string();
        assert!(matches!(
            ChainClient::new(&config).await,
            Err(ChainError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_node_surfaces_rpc_error() {
        let client = ChainClient::new(&test_config()).await.unwrap();
        let result = client.get_block_number().await;
        assert!(matches!(
            result,
            Err(ChainError::Rpc { .. }) | Err(ChainError::Timeout { .. })
        ));
        assert!(!client.is_healthy().await);
    }
}
