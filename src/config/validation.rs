//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and address/url formats
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before the config is accepted into the system

use alloy::primitives::Address;

use crate::config::schema::ServiceConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Validate a loaded configuration, collecting every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "listener.bind_address",
            reason: format!("'{}' is not a socket address", config.listener.bind_address),
        });
    }

    if config.chain.rpc_url.parse::<url::Url>().is_err() {
        errors.push(ValidationError {
            field: "chain.rpc_url",
            reason: format!("'{}' is not a valid URL", config.chain.rpc_url),
        });
    }
    if config.chain.chain_id == 0 {
        errors.push(ValidationError {
            field: "chain.chain_id",
            reason: "must be non-zero".to_string(),
        });
    }
    if config.chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError {
            field: "chain.rpc_timeout_secs",
            reason: "must be positive".to_string(),
        });
    }

    if config.custody.factory_address.parse::<Address>().is_err() {
        errors.push(ValidationError {
            field: "custody.factory_address",
            reason: format!(
                "'{}' is not a 20-byte hex address",
                config.custody.factory_address
            ),
        });
    }
    if config.custody.owners_per_wallet == 0 {
        errors.push(ValidationError {
            field: "custody.owners_per_wallet",
            reason: "must be positive".to_string(),
        });
    }
    if config.custody.required_signatures == 0
        || config.custody.required_signatures > config.custody.owners_per_wallet as u64
    {
        errors.push(ValidationError {
            field: "custody.required_signatures",
            reason: format!(
                "must be between 1 and owners_per_wallet ({})",
                config.custody.owners_per_wallet
            ),
        });
    }
    if config.custody.poll_interval_ms == 0 {
        errors.push(ValidationError {
            field: "custody.poll_interval_ms",
            reason: "must be positive".to_string(),
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError {
            field: "timeouts.request_secs",
            reason: "must be positive".to_string(),
        });
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError {
            field: "observability.metrics_address",
            reason: format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
