//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from the TOML config
//! file. The operator private key is deliberately absent: it is read only
//! from the environment (`CUSTODY_OPERATOR_KEY`).

use serde::{Deserialize, Serialize};

/// Root configuration for the custody gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP listener settings.
    pub listener: ListenerConfig,

    /// Blockchain node connection.
    pub chain: ChainConfig,

    /// Wallet factory and custody policy.
    pub custody: CustodyConfig,

    /// Record persistence.
    pub store: StoreConfig,

    /// Request handling limits.
    pub timeouts: TimeoutConfig,

    /// Metrics exposition.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Blockchain node configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Chain ID used for replay-protected signing; verified against the
    /// node at startup.
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Block depth before an event is treated as settled.
    pub confirmation_blocks: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            chain_id: 31337, // Anvil default
            rpc_timeout_secs: 10,
            confirmation_blocks: 3,
        }
    }
}

/// Custody policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CustodyConfig {
    /// Address of the wallet factory contract.
    pub factory_address: String,

    /// Owner accounts generated for each new wallet.
    pub owners_per_wallet: usize,

    /// Signatures a wallet requires to confirm a transfer.
    pub required_signatures: u64,

    /// Event poll interval in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for CustodyConfig {
    fn default() -> Self {
        Self {
            factory_address: String::new(),
            owners_per_wallet: 3,
            required_signatures: 2,
            poll_interval_ms: 10_000,
        }
    }
}

/// Record persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the JSON record file. In-memory only when unset.
    pub persistence_path: Option<String>,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// End-to-end request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.chain.rpc_timeout_secs, 10);
        assert_eq!(config.chain.confirmation_blocks, 3);
        assert_eq!(config.custody.owners_per_wallet, 3);
        assert_eq!(config.custody.required_signatures, 2);
        assert!(config.store.persistence_path.is_none());
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [chain]
            rpc_url = "https://ropsten.example/rpc"
            chain_id = 3

            [custody]
            factory_address = "0xd18df206913b8e04371c543b631b7121a5c09c14"
            "#,
        )
        .unwrap();
        assert_eq!(config.chain.chain_id, 3);
        assert_eq!(config.chain.rpc_timeout_secs, 10);
        assert_eq!(config.custody.required_signatures, 2);
        assert_eq!(
            config.custody.factory_address,
            "0xd18df206913b8e04371c543b631b7121a5c09c14"
        );
    }
}
