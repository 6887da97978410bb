//! Receipt polling until a deployment is confirmed or its deadline passes.
//!
//! The target network inverts the usual EVM receipt status: `"0x0"` means the
//! transaction succeeded. A receipt carrying `"0x1"` is not treated as a
//! failure, the poller simply keeps waiting for the success value.

use std::time::Duration;

use alloy_core::primitives::{Address, TxHash};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::time::{Instant, sleep, timeout_at};

use crate::rpc::{self, JsonRpcTransport, RpcError};

const METHOD: &str = "eth_getTransactionReceipt";

/// Receipt status value this network uses for success.
pub const SUCCESS_STATUS: &str = "0x0";

/// Default budget for the whole confirmation wait.
pub const DEFAULT_CONFIRMATION_TIMEOUT_MS: u64 = 60_000;

/// Default pause between two receipt queries.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_CONFIRMATION_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl PollSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Transaction receipt as returned by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    #[serde(default)]
    pub transaction_hash: Option<TxHash>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub logs: Vec<Value>,
    #[serde(default)]
    pub contract_address: Option<Address>,
    #[serde(default)]
    pub from: Option<Address>,
}

impl TransactionReceipt {
    /// `true` when the status carries this network's success value.
    pub fn is_success(&self) -> bool {
        self.status
            .as_deref()
            .and_then(|status| rpc::parse_quantity(METHOD, status).ok())
            == Some(0)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error(
    "Transaction confirmation timeout after {}ms ({attempts} receipt queries for {tx_hash})",
    .elapsed.as_millis()
)]
pub struct ConfirmationTimeoutError {
    pub tx_hash: TxHash,
    pub elapsed: Duration,
    pub attempts: u32,
}

/// Result of a single receipt query.
#[derive(Debug)]
enum Poll {
    Confirmed(TransactionReceipt),
    Pending,
}

/// Polls `eth_getTransactionReceipt` under a single deadline.
///
/// The deadline is fixed when the wait starts and bounds both the sleeps and
/// the in-flight queries. Transient RPC failures consume a poll cycle like a
/// missing receipt would.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmationPoller<'a, T> {
    transport: &'a T,
    settings: PollSettings,
}

impl<'a, T: JsonRpcTransport> ConfirmationPoller<'a, T> {
    pub fn new(transport: &'a T, settings: PollSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub async fn wait(
        &self,
        tx_hash: TxHash,
    ) -> Result<TransactionReceipt, ConfirmationTimeoutError> {
        tracing::info!(
            tx_hash = %tx_hash,
            timeout_ms = self.settings.timeout_ms,
            "Waiting for transaction confirmation..."
        );

        let started = Instant::now();
        let deadline = started + self.settings.timeout();
        let mut attempts = 0u32;

        loop {
            if Instant::now() >= deadline {
                return Err(ConfirmationTimeoutError {
                    tx_hash,
                    elapsed: started.elapsed(),
                    attempts,
                });
            }

            attempts += 1;
            match timeout_at(deadline, self.poll(tx_hash)).await {
                Ok(Ok(Poll::Confirmed(receipt))) => {
                    tracing::info!(tx_hash = %tx_hash, attempts, "Transaction confirmed");
                    return Ok(receipt);
                }
                Ok(Ok(Poll::Pending)) => {
                    tracing::trace!(
                        tx_hash = %tx_hash,
                        attempt = attempts,
                        "Transaction not confirmed yet"
                    );
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        tx_hash = %tx_hash,
                        attempt = attempts,
                        error = %e,
                        "Error checking transaction status"
                    );
                }
                Err(_) => continue,
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            sleep(self.settings.poll_interval().min(remaining)).await;
        }
    }

    async fn poll(&self, tx_hash: TxHash) -> Result<Poll, RpcError> {
        let receipt: Option<TransactionReceipt> =
            rpc::call(self.transport, METHOD, vec![json!(tx_hash.to_string())]).await?;

        Ok(match receipt {
            Some(receipt) if receipt.is_success() => Poll::Confirmed(receipt),
            Some(receipt) => {
                tracing::debug!(
                    tx_hash = %tx_hash,
                    status = ?receipt.status,
                    expected = SUCCESS_STATUS,
                    "Receipt does not carry the success status yet"
                );
                Poll::Pending
            }
            None => Poll::Pending,
        })
    }
}
