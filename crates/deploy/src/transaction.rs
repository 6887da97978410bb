//! Unsigned deployment transaction assembly.

use alloy_core::primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};

use crate::envelope::BytecodeEnvelope;

/// Gas limit attached to every deployment transaction.
pub const DEFAULT_GAS_LIMIT: u64 = 3_000_000;

/// Gas price attached to every deployment transaction (1 gwei).
pub const DEFAULT_GAS_PRICE_WEI: u64 = 1_000_000_000;

/// Static gas parameters. No estimation is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasSettings {
    pub gas_limit: u64,
    pub gas_price_wei: u64,
}

impl Default for GasSettings {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
            gas_price_wei: DEFAULT_GAS_PRICE_WEI,
        }
    }
}

/// A contract creation transaction that has not been signed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTransaction {
    data: Bytes,
    gas_limit: u64,
    gas_price_wei: u128,
    nonce: u64,
    chain_id: u64,
}

impl DeploymentTransaction {
    pub fn new(envelope: &BytecodeEnvelope, gas: &GasSettings, nonce: u64, chain_id: u64) -> Self {
        Self {
            data: Bytes::from(envelope.encode()),
            gas_limit: gas.gas_limit,
            gas_price_wei: u128::from(gas.gas_price_wei),
            nonce,
            chain_id,
        }
    }

    /// Always `None`: a missing recipient is what makes this a deployment.
    pub fn to(&self) -> Option<Address> {
        None
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    pub fn gas_price_wei(&self) -> u128 {
        self.gas_price_wei
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
}
