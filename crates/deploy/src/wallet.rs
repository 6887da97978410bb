//! Wallet key material and transaction signing.

use std::fmt;

use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_core::primitives::{Address, TxHash, TxKind, U256};
use alloy_eips::eip2718::Encodable2718;
use alloy_network::TxSigner;
use alloy_signer_local::PrivateKeySigner;
use derive_more::Deref;
use k256::ecdsa::SigningKey;

use crate::{envelope::strip_hex_prefix, transaction::DeploymentTransaction};

/// Source of signing key material.
///
/// Wallets either offer an export function or carry the raw key as a field.
/// When both are present the exported key wins.
pub trait Wallet {
    /// Key returned by the wallet's export function.
    fn export_private_key(&self) -> Option<String> {
        None
    }

    /// Key stored directly on the wallet.
    fn private_key(&self) -> Option<String> {
        None
    }

    /// Address the wallet claims to control.
    fn address(&self) -> Option<String> {
        None
    }
}

/// A wallet holding a raw private key in memory.
#[derive(Clone)]
pub struct LocalWallet {
    private_key: String,
    address: Option<String>,
}

impl LocalWallet {
    pub fn new(private_key: impl Into<String>) -> Self {
        Self {
            private_key: private_key.into(),
            address: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

impl fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalWallet")
            .field("private_key", &"<redacted>")
            .field("address", &self.address)
            .finish()
    }
}

impl Wallet for LocalWallet {
    fn private_key(&self) -> Option<String> {
        Some(self.private_key.clone())
    }

    fn address(&self) -> Option<String> {
        self.address.clone()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("Invalid wallet format - cannot extract private key")]
    NoKeyMaterial,
    #[error("invalid private key: {0}")]
    InvalidKey(String),
    #[error("invalid wallet address {0}")]
    InvalidAddress(String),
    #[error("wallet address {declared} does not match the address of its key {derived}")]
    AddressMismatch { declared: Address, derived: Address },
    #[error("failed to sign transaction: {0}")]
    Signing(String),
}

/// Normalize a private key to `0x`-prefixed lowercase hex of 32 bytes.
pub fn normalize_private_key(raw: &str) -> Result<String, WalletError> {
    let raw = raw.trim();
    let digits = strip_hex_prefix(raw);

    if digits.len() != 64 {
        return Err(WalletError::InvalidKey(format!(
            "expected 64 hex characters, got {}",
            digits.len()
        )));
    }
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(WalletError::InvalidKey(
            "contains non-hex characters".to_string(),
        ));
    }

    Ok(format!("0x{}", digits.to_ascii_lowercase()))
}

/// Raw signed transaction, `0x`-prefixed hex ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Deref)]
pub struct SignedTransaction {
    #[deref]
    raw: String,
    hash: TxHash,
    nonce: u64,
}

impl SignedTransaction {
    /// Hash of the signed transaction as computed locally.
    pub fn hash(&self) -> TxHash {
        self.hash
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn into_raw(self) -> String {
        self.raw
    }
}

/// Signs deployment transactions with a wallet's key.
#[derive(Debug, Clone)]
pub struct TransactionSigner {
    signer: PrivateKeySigner,
}

impl TransactionSigner {
    /// Extract and validate key material from a wallet.
    pub fn from_wallet<W: Wallet + ?Sized>(wallet: &W) -> Result<Self, WalletError> {
        let raw = wallet
            .export_private_key()
            .or_else(|| wallet.private_key())
            .filter(|key| !key.trim().is_empty())
            .ok_or(WalletError::NoKeyMaterial)?;

        let signer = Self::from_private_key(&raw)?;

        if let Some(declared) = wallet.address().filter(|a| !a.trim().is_empty()) {
            let declared: Address = declared
                .trim()
                .parse()
                .map_err(|_| WalletError::InvalidAddress(declared.clone()))?;
            if declared != signer.address() {
                return Err(WalletError::AddressMismatch {
                    declared,
                    derived: signer.address(),
                });
            }
        }

        Ok(signer)
    }

    pub fn from_private_key(private_key: &str) -> Result<Self, WalletError> {
        let key = normalize_private_key(private_key)?;

        let key_bytes: [u8; 32] = hex::decode(&key[2..])
            .map_err(|e| WalletError::InvalidKey(e.to_string()))?
            .try_into()
            .map_err(|_| {
                WalletError::InvalidKey("private key must be exactly 32 bytes".to_string())
            })?;

        let signing_key = SigningKey::from_bytes(&key_bytes.into())
            .map_err(|e| WalletError::InvalidKey(format!("invalid secp256k1 private key: {e}")))?;

        Ok(Self {
            signer: PrivateKeySigner::from_signing_key(signing_key),
        })
    }

    /// Address derived from the signing key.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Sign a deployment as an EIP-155 legacy creation transaction.
    pub async fn sign(&self, tx: &DeploymentTransaction) -> Result<SignedTransaction, WalletError> {
        let mut legacy = TxLegacy {
            chain_id: Some(tx.chain_id()),
            nonce: tx.nonce(),
            gas_price: tx.gas_price_wei(),
            gas_limit: tx.gas_limit(),
            to: TxKind::Create,
            value: U256::ZERO,
            input: tx.data().clone(),
        };

        let signature = self
            .signer
            .sign_transaction(&mut legacy)
            .await
            .map_err(|e| WalletError::Signing(e.to_string()))?;

        let signed = legacy.into_signed(signature);
        let hash = *signed.hash();
        let envelope = TxEnvelope::from(signed);

        Ok(SignedTransaction {
            raw: format!("0x{}", hex::encode(envelope.encoded_2718())),
            hash,
            nonce: tx.nonce(),
        })
    }
}
