//! Shared RPC utilities for interacting with the node's JSON-RPC endpoint.

use std::{future::Future, sync::Arc, time::Duration};

use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

/// Default timeout for a single RPC request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised while talking to a JSON-RPC node.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The request never produced a readable HTTP response.
    #[error("failed to send {method} request: {source}")]
    Transport {
        method: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The node answered with a JSON-RPC `error` object.
    #[error("RPC error: {message}")]
    Node {
        method: String,
        code: Option<i64>,
        message: String,
    },
    /// The node answered, but not with something we could interpret.
    #[error("malformed {method} response: {reason}")]
    Malformed { method: String, reason: String },
}

impl RpcError {
    pub fn malformed(method: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            method: method.to_string(),
            reason: reason.into(),
        }
    }
}

/// A JSON-RPC 2.0 endpoint.
///
/// Implementations return the raw `result` member of the response, which may be
/// `null` (for example a receipt that does not exist yet). A JSON-RPC `error`
/// member must be surfaced as [`RpcError::Node`] with the node's message intact.
pub trait JsonRpcTransport: Send + Sync {
    fn request(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> impl Future<Output = Result<Value, RpcError>> + Send;
}

impl<T: JsonRpcTransport> JsonRpcTransport for &T {
    fn request(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> impl Future<Output = Result<Value, RpcError>> + Send {
        (**self).request(method, params)
    }
}

impl<T: JsonRpcTransport> JsonRpcTransport for Arc<T> {
    fn request(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> impl Future<Output = Result<Value, RpcError>> + Send {
        self.as_ref().request(method, params)
    }
}

/// HTTP transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: Url,
}

impl HttpTransport {
    /// Create a transport with a client configured for JSON-RPC requests.
    pub fn new(url: Url) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| RpcError::Transport {
                method: "client".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self::with_client(client, url))
    }

    pub fn with_client(client: reqwest::Client, url: Url) -> Self {
        Self { client, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl JsonRpcTransport for HttpTransport {
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&serde_json::json!({
                "jsonrpc": "2.0",
                "method": method,
                "params": params,
                "id": 1
            }))
            .send()
            .await
            .map_err(|e| RpcError::Transport {
                method: method.to_string(),
                source: Box::new(e),
            })?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| RpcError::malformed(method, e.to_string()))?;

        tracing::trace!(method = %method, response = %body, "RPC response");

        parse_response(method, body)
    }
}

/// Split a JSON-RPC response body into its `result` or its `error`.
pub(crate) fn parse_response(method: &str, mut body: Value) -> Result<Value, RpcError> {
    if let Some(error) = body.get("error") {
        return Err(RpcError::Node {
            method: method.to_string(),
            code: error.get("code").and_then(Value::as_i64),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
        });
    }

    body.get_mut("result")
        .map(Value::take)
        .ok_or_else(|| RpcError::malformed(method, "no result in response"))
}

/// Make a JSON-RPC call and deserialize the result.
pub async fn call<T: DeserializeOwned>(
    transport: &impl JsonRpcTransport,
    method: &str,
    params: Vec<Value>,
) -> Result<T, RpcError> {
    let result = transport.request(method, params).await?;

    serde_json::from_value(result)
        .map_err(|e| RpcError::malformed(method, format!("failed to deserialize result: {e}")))
}

/// Parse a hex-encoded JSON-RPC quantity such as `"0x1a"`.
pub fn parse_quantity(method: &str, quantity: &str) -> Result<u64, RpcError> {
    let digits = quantity.strip_prefix("0x").ok_or_else(|| {
        RpcError::malformed(method, format!("quantity without 0x prefix: {quantity}"))
    })?;

    u64::from_str_radix(digits, 16)
        .map_err(|e| RpcError::malformed(method, format!("invalid quantity {quantity}: {e}")))
}
