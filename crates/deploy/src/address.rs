//! Contract address resolution for confirmed deployments.

use alloy_core::primitives::{Address, TxHash};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::json;

use crate::{
    confirm::TransactionReceipt,
    rpc::{self, JsonRpcTransport, RpcError},
};

const METHOD: &str = "eth_getTransactionByHash";

/// Compute the address of a contract created by `sender` at `nonce`.
///
/// `keccak256(rlp([sender, nonce]))[12..]`
pub fn create_address(sender: Address, nonce: u64) -> Address {
    sender.create(nonce)
}

/// Where a deployed contract's address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedAddress {
    /// The receipt carried a `contractAddress`.
    Reported(Address),
    /// Computed from the creating transaction's sender and nonce.
    Derived(Address),
    /// Not enough information to compute the address.
    Unresolved,
}

impl ResolvedAddress {
    pub fn address(&self) -> Option<Address> {
        match self {
            Self::Reported(address) | Self::Derived(address) => Some(*address),
            Self::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved)
    }
}

/// Serialized as the address itself, or `null` when unresolved.
impl Serialize for ResolvedAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.address().serialize(serializer)
    }
}

/// Sender and nonce the engine used when submitting a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeploymentOrigin {
    pub sender: Address,
    pub nonce: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct OnchainTransaction {
    #[serde(default)]
    from: Option<Address>,
    #[serde(default)]
    nonce: Option<String>,
    #[serde(default)]
    to: Option<Address>,
}

/// Resolves the address of the contract created by a confirmed transaction.
#[derive(Debug, Clone, Copy)]
pub struct AddressResolver<'a, T> {
    transport: &'a T,
}

impl<'a, T: JsonRpcTransport> AddressResolver<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Resolve the created contract's address.
    ///
    /// A node-reported `contractAddress` is used as is. Otherwise the sender
    /// and nonce are read from the node's view of the transaction, falling back
    /// to `origin`, and the CREATE address is derived from them. A transaction
    /// with a recipient did not create a contract and stays unresolved.
    pub async fn resolve(
        &self,
        receipt: &TransactionReceipt,
        tx_hash: TxHash,
        origin: Option<DeploymentOrigin>,
    ) -> ResolvedAddress {
        if let Some(address) = receipt.contract_address {
            tracing::debug!(address = %address, "Receipt reports the contract address");
            return ResolvedAddress::Reported(address);
        }

        let onchain = match self.query(tx_hash).await {
            Ok(tx) => tx,
            Err(e) => {
                tracing::warn!(
                    tx_hash = %tx_hash,
                    error = %e,
                    "Failed to fetch deployment transaction"
                );
                None
            }
        };

        if let Some(to) = onchain.as_ref().and_then(|tx| tx.to) {
            tracing::warn!(
                tx_hash = %tx_hash,
                to = %to,
                "Transaction has a recipient, no contract was created"
            );
            return ResolvedAddress::Unresolved;
        }

        let sender = onchain
            .as_ref()
            .and_then(|tx| tx.from)
            .or(receipt.from)
            .or(origin.map(|o| o.sender));
        let nonce = onchain
            .as_ref()
            .and_then(|tx| tx.nonce.as_deref())
            .and_then(|nonce| rpc::parse_quantity(METHOD, nonce).ok())
            .or(origin.map(|o| o.nonce));

        if let (Some(onchain_nonce), Some(origin)) = (nonce, origin) {
            if onchain_nonce != origin.nonce {
                tracing::warn!(
                    submitted = origin.nonce,
                    onchain = onchain_nonce,
                    "Node recorded a different nonce than the one submitted"
                );
            }
        }

        match (sender, nonce) {
            (Some(sender), Some(nonce)) => {
                let address = create_address(sender, nonce);
                tracing::debug!(
                    sender = %sender,
                    nonce,
                    address = %address,
                    "Derived contract address"
                );
                ResolvedAddress::Derived(address)
            }
            _ => {
                tracing::warn!(
                    tx_hash = %tx_hash,
                    "Cannot derive contract address: sender or nonce unknown"
                );
                ResolvedAddress::Unresolved
            }
        }
    }

    async fn query(&self, tx_hash: TxHash) -> Result<Option<OnchainTransaction>, RpcError> {
        rpc::call(self.transport, METHOD, vec![json!(tx_hash.to_string())]).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    const SENDER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn sender() -> Address {
        SENDER.parse().unwrap()
    }

    struct TxNode(Result<Value, fn() -> RpcError>);

    impl JsonRpcTransport for TxNode {
        async fn request(&self, method: &str, _params: Vec<Value>) -> Result<Value, RpcError> {
            assert_eq!(method, METHOD);
            match &self.0 {
                Ok(value) => Ok(value.clone()),
                Err(error) => Err(error()),
            }
        }
    }

    fn receipt() -> TransactionReceipt {
        TransactionReceipt {
            transaction_hash: Some(TxHash::repeat_byte(1)),
            status: Some("0x0".to_string()),
            logs: vec![],
            contract_address: None,
            from: None,
        }
    }

    #[test]
    fn test_create_address_known_vectors() {
        assert_eq!(
            create_address(sender(), 0),
            "0x5FbDB2315678afecb367f032d93F642f64180aa3".parse::<Address>().unwrap()
        );
        assert_eq!(
            create_address(sender(), 1),
            "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512".parse::<Address>().unwrap()
        );
    }

    #[test]
    fn test_create_address_varies_with_nonce() {
        let nonces = [0u64, 1, 127, 128, 255, 256, 1 << 32, u64::MAX];
        let addresses: std::collections::HashSet<_> =
            nonces.iter().map(|&nonce| create_address(sender(), nonce)).collect();

        assert_eq!(addresses.len(), nonces.len());
        assert_eq!(create_address(sender(), 128), create_address(sender(), 128));
    }

    #[tokio::test]
    async fn test_reported_address_wins() {
        let node = TxNode(Err(|| panic!("node must not be queried")));
        let reported = Address::repeat_byte(0x42);
        let receipt = TransactionReceipt {
            contract_address: Some(reported),
            ..receipt()
        };

        let resolved = AddressResolver::new(&node)
            .resolve(&receipt, TxHash::ZERO, None)
            .await;
        assert_eq!(resolved, ResolvedAddress::Reported(reported));
    }

    #[tokio::test]
    async fn test_derives_from_onchain_transaction() {
        let node = TxNode(Ok(json!({"from": SENDER, "nonce": "0x1", "to": null})));
        let origin = DeploymentOrigin {
            sender: sender(),
            nonce: 0,
        };

        let resolved = AddressResolver::new(&node)
            .resolve(&receipt(), TxHash::ZERO, Some(origin))
            .await;
        assert_eq!(resolved, ResolvedAddress::Derived(create_address(sender(), 1)));
    }

    #[tokio::test]
    async fn test_falls_back_to_origin() {
        let node = TxNode(Err(|| RpcError::malformed(METHOD, "gateway timeout")));
        let origin = DeploymentOrigin {
            sender: sender(),
            nonce: 0,
        };

        let resolved = AddressResolver::new(&node)
            .resolve(&receipt(), TxHash::ZERO, Some(origin))
            .await;
        assert_eq!(resolved.address(), Some(create_address(sender(), 0)));
    }

    #[tokio::test]
    async fn test_call_transaction_is_unresolved() {
        let node = TxNode(Ok(json!({
            "from": SENDER,
            "nonce": "0x1",
            "to": "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
        })));
        let origin = DeploymentOrigin {
            sender: sender(),
            nonce: 1,
        };

        let resolved = AddressResolver::new(&node)
            .resolve(&receipt(), TxHash::ZERO, Some(origin))
            .await;
        assert_eq!(resolved, ResolvedAddress::Unresolved);
    }

    #[tokio::test]
    async fn test_unknown_origin_is_unresolved() {
        let node = TxNode(Ok(Value::Null));

        let resolved = AddressResolver::new(&node)
            .resolve(&receipt(), TxHash::ZERO, None)
            .await;
        assert_eq!(resolved, ResolvedAddress::Unresolved);
        assert_eq!(serde_json::to_value(resolved).unwrap(), Value::Null);
    }
}
