//! Network configuration and the registry of known networks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

/// Name of the network used when none is requested.
pub const DEFAULT_NETWORK: &str = "devnet";

/// Public devnet RPC endpoint.
pub const DEVNET_RPC_URL: &str = "https://devnet.uminetwork.com";
/// Devnet chain ID.
pub const DEVNET_CHAIN_ID: u64 = 42069;

/// Connection settings for one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Name the network is registered under.
    pub name: String,
    /// JSON-RPC endpoint of the node.
    pub rpc_url: Url,
    /// EIP-155 chain ID used when signing.
    pub chain_id: u64,
}

/// Network entry as written in a configuration file (the name is the table key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEntry {
    pub rpc_url: Url,
    pub chain_id: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unsupported network: {name}. Supported: {}", .supported.join(", "))]
    UnknownNetwork { name: String, supported: Vec<String> },
}

/// Maps network names to their configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRegistry {
    networks: BTreeMap<String, NetworkConfig>,
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.insert(
            DEFAULT_NETWORK,
            NetworkEntry {
                rpc_url: Url::parse(DEVNET_RPC_URL).expect("devnet URL is valid"),
                chain_id: DEVNET_CHAIN_ID,
            },
        );
        registry
    }
}

impl NetworkRegistry {
    /// A registry without any network, not even the built-in devnet.
    pub fn empty() -> Self {
        Self {
            networks: BTreeMap::new(),
        }
    }

    /// Register a network, replacing any existing entry with the same name.
    pub fn insert(&mut self, name: &str, entry: NetworkEntry) {
        self.networks.insert(
            name.to_string(),
            NetworkConfig {
                name: name.to_string(),
                rpc_url: entry.rpc_url,
                chain_id: entry.chain_id,
            },
        );
    }

    /// Extend the built-in networks with user-declared ones.
    pub fn with_entries(entries: impl IntoIterator<Item = (String, NetworkEntry)>) -> Self {
        let mut registry = Self::default();
        for (name, entry) in entries {
            registry.insert(&name, entry);
        }
        registry
    }

    /// Look up a network by name.
    pub fn lookup(&self, name: &str) -> Result<NetworkConfig, ConfigError> {
        self.networks
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownNetwork {
                name: name.to_string(),
                supported: self.names(),
            })
    }

    pub fn names(&self) -> Vec<String> {
        self.networks.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkConfig> {
        self.networks.values()
    }
}
