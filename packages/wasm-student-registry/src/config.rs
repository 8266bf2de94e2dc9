//! Network configuration
//!
//! Everything the registry needs to know about the chain it talks to:
//! where to read from, which contract to call, how to build explorer
//! links and how often to poll for receipts.

use crate::address::normalize_address;
use crate::error::RegistryError;
use crate::messages::Locale;
use serde::{Deserialize, Serialize};

/// Sepolia chain id
pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;
/// Public Sepolia JSON-RPC endpoint used for reads
pub const SEPOLIA_RPC_URL: &str = "https://sepolia.drpc.org";
/// Sepolia block explorer
pub const SEPOLIA_EXPLORER_BASE: &str = "https://sepolia.etherscan.io";
/// Receipt polling interval
pub const DEFAULT_POLL_INTERVAL_MS: u32 = 4_000;

/// Chain and contract configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// Chain id the wallet must be on before submitting
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// Human readable chain name (e.g., "Sepolia")
    #[serde(default = "default_chain_name")]
    pub chain_name: String,
    /// JSON-RPC endpoint for the read client
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Block explorer base URL (no trailing `/tx`)
    #[serde(default = "default_explorer_base")]
    pub explorer_base: String,
    /// Student registry contract address
    pub contract_address: String,
    /// Delay between receipt polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u32,
    /// Give up confirming after this many empty polls (None = wait indefinitely)
    #[serde(default)]
    pub max_confirmation_polls: Option<u32>,
    /// Language of user-facing messages
    #[serde(default)]
    pub locale: Locale,
}

fn default_chain_id() -> u64 {
    SEPOLIA_CHAIN_ID
}

fn default_chain_name() -> String {
    "Sepolia".to_string()
}

fn default_rpc_url() -> String {
    SEPOLIA_RPC_URL.to_string()
}

fn default_explorer_base() -> String {
    SEPOLIA_EXPLORER_BASE.to_string()
}

fn default_poll_interval_ms() -> u32 {
    DEFAULT_POLL_INTERVAL_MS
}

impl NetworkConfig {
    /// Sepolia preset for the given contract
    pub fn sepolia(contract_address: &str) -> Self {
        Self {
            chain_id: default_chain_id(),
            chain_name: default_chain_name(),
            rpc_url: default_rpc_url(),
            explorer_base: default_explorer_base(),
            contract_address: contract_address.to_string(),
            poll_interval_ms: default_poll_interval_ms(),
            max_confirmation_polls: None,
            locale: Locale::default(),
        }
    }

    /// Check the configuration and normalize the contract address in place
    pub fn validate(mut self) -> Result<Self, RegistryError> {
        self.contract_address = normalize_address(&self.contract_address)?;
        if self.rpc_url.trim().is_empty() {
            return Err(RegistryError::InvalidInput(
                "rpcUrl must not be empty".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(RegistryError::InvalidInput(
                "pollIntervalMs must be greater than zero".to_string(),
            ));
        }
        if self.max_confirmation_polls == Some(0) {
            return Err(RegistryError::InvalidInput(
                "maxConfirmationPolls must be greater than zero".to_string(),
            ));
        }
        Ok(self)
    }
}
