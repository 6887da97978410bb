//! Raw transaction submission.

use alloy_core::primitives::TxHash;
use serde_json::json;

use crate::{
    rpc::{self, JsonRpcTransport, RpcError},
    wallet::SignedTransaction,
};

const METHOD: &str = "eth_sendRawTransaction";

#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    /// The node refused the transaction. The message is the node's, unaltered.
    #[error("Transaction broadcast failed: {message}")]
    Rejected { code: Option<i64>, message: String },
    #[error("Transaction broadcast failed: {0}")]
    Rpc(RpcError),
    #[error("node returned an invalid transaction hash: {0}")]
    InvalidHash(String),
}

impl From<RpcError> for BroadcastError {
    fn from(error: RpcError) -> Self {
        match error {
            RpcError::Node { code, message, .. } => Self::Rejected { code, message },
            other => Self::Rpc(other),
        }
    }
}

/// Submits signed transactions to the node.
#[derive(Debug, Clone, Copy)]
pub struct Broadcaster<'a, T> {
    transport: &'a T,
}

impl<'a, T: JsonRpcTransport> Broadcaster<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Submit a signed transaction and return the hash reported by the node.
    pub async fn broadcast(&self, signed: SignedTransaction) -> Result<TxHash, BroadcastError> {
        let local_hash = signed.hash();
        tracing::debug!(tx_hash = %local_hash, "Broadcasting transaction...");

        let reported: String =
            rpc::call(self.transport, METHOD, vec![json!(signed.into_raw())]).await?;
        let tx_hash: TxHash = reported
            .parse()
            .map_err(|_| BroadcastError::InvalidHash(reported.clone()))?;

        if tx_hash != local_hash {
            tracing::warn!(
                reported = %tx_hash,
                expected = %local_hash,
                "Node reported a different transaction hash than the one signed"
            );
        }

        tracing::info!(tx_hash = %tx_hash, "Transaction broadcasted");
        Ok(tx_hash)
    }
}
