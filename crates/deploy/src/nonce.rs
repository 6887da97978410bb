//! Sender nonce lookup.

use alloy_core::primitives::Address;
use serde_json::json;

use crate::rpc::{self, JsonRpcTransport, RpcError};

const METHOD: &str = "eth_getTransactionCount";

/// Outcome of a nonce lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonceLookup {
    pub nonce: u64,
    /// Set when the node could not be queried and `0` was used instead.
    pub fell_back: bool,
}

/// Fetches the next usable nonce of an account from the node.
///
/// A failed query never fails the deployment: the oracle falls back to `0`
/// and emits a warning so the substitution stays visible.
#[derive(Debug, Clone, Copy)]
pub struct NonceOracle<'a, T> {
    transport: &'a T,
}

impl<'a, T: JsonRpcTransport> NonceOracle<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    pub async fn next_nonce(&self, address: Address) -> u64 {
        self.lookup(address).await.nonce
    }

    pub async fn lookup(&self, address: Address) -> NonceLookup {
        match self.query(address).await {
            Ok(nonce) => {
                tracing::debug!(address = %address, nonce, "Fetched pending nonce");
                NonceLookup {
                    nonce,
                    fell_back: false,
                }
            }
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "Failed to get nonce, using 0");
                NonceLookup {
                    nonce: 0,
                    fell_back: true,
                }
            }
        }
    }

    async fn query(&self, address: Address) -> Result<u64, RpcError> {
        let count: String = rpc::call(
            self.transport,
            METHOD,
            vec![json!(address.to_string()), json!("pending")],
        )
        .await?;

        rpc::parse_quantity(METHOD, &count)
    }
}
