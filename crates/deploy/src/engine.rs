use std::collections::BTreeMap;

use alloy_core::primitives::TxHash;
use chrono::{SecondsFormat, Utc};
use derive_more::Deref;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    address::{AddressResolver, DeploymentOrigin, ResolvedAddress},
    broadcast::Broadcaster,
    compiler::Compiler,
    confirm::{ConfirmationPoller, PollSettings},
    contract::{ContractKind, ContractSource},
    envelope::BytecodeEnvelope,
    error::{DeployError, DeploymentError, Stage},
    network::NetworkConfig,
    nonce::NonceOracle,
    rpc::{HttpTransport, JsonRpcTransport, RpcError},
    transaction::{DeploymentTransaction, GasSettings},
    wallet::{TransactionSigner, Wallet},
};

/// Tunables applied to every deployment of an engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub gas: GasSettings,
    pub confirmation: PollSettings,
}

/// A successfully deployed contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentResult {
    /// Contract address, `null` when it could not be resolved.
    pub address: ResolvedAddress,
    pub hash: TxHash,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ContractKind,
    pub initialized: bool,
    /// ISO-8601 UTC time the deployment was confirmed.
    pub timestamp: String,
    pub abi: Value,
}

/// Per-contract entry of a batch deployment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DeploymentOutcome {
    Deployed(DeploymentResult),
    Failed { error: String },
}

impl DeploymentOutcome {
    pub fn failed(error: impl ToString) -> Self {
        Self::Failed {
            error: error.to_string(),
        }
    }

    pub fn result(&self) -> Option<&DeploymentResult> {
        match self {
            Self::Deployed(result) => Some(result),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Deployed(_) => None,
            Self::Failed { error } => Some(error),
        }
    }
}

/// Outcomes of a batch deployment keyed by contract name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deref)]
#[serde(transparent)]
pub struct BatchResults(BTreeMap<String, DeploymentOutcome>);

impl BatchResults {
    fn insert(&mut self, name: &str, outcome: DeploymentOutcome) {
        if self.0.insert(name.to_string(), outcome).is_some() {
            tracing::warn!(
                contract = %name,
                "Contract name appears twice in batch, keeping the last outcome"
            );
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter_map(|(name, outcome)| outcome.error().map(|error| (name.as_str(), error)))
    }

    pub fn all_deployed(&self) -> bool {
        self.failures().next().is_none()
    }
}

impl FromIterator<(String, DeploymentOutcome)> for BatchResults {
    fn from_iter<I: IntoIterator<Item = (String, DeploymentOutcome)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Drives contracts through the deployment pipeline against one network.
///
/// Stages run strictly in order: compile, encode, nonce lookup, build, sign,
/// broadcast, confirm, resolve. The engine holds no state between deployments
/// besides its configuration.
#[derive(Debug)]
pub struct DeploymentEngine<C, T = HttpTransport> {
    network: NetworkConfig,
    settings: EngineSettings,
    compiler: C,
    transport: T,
}

impl<C: Compiler> DeploymentEngine<C, HttpTransport> {
    /// Create an engine talking to the network's RPC endpoint over HTTP.
    pub fn new(network: NetworkConfig, compiler: C) -> Result<Self, RpcError> {
        let transport = HttpTransport::new(network.rpc_url.clone())?;
        Ok(Self::with_transport(network, compiler, transport))
    }
}

impl<C: Compiler, T: JsonRpcTransport> DeploymentEngine<C, T> {
    pub fn with_transport(network: NetworkConfig, compiler: C, transport: T) -> Self {
        tracing::info!(
            network = %network.name,
            rpc_url = %network.rpc_url,
            chain_id = network.chain_id,
            "Deployment engine initialized"
        );

        Self {
            network,
            settings: EngineSettings::default(),
            compiler,
            transport,
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Deploy a single contract.
    pub async fn deploy_one<W: Wallet + ?Sized>(
        &self,
        contract: &ContractSource,
        wallet: &W,
    ) -> Result<DeploymentResult, DeploymentError> {
        let name = contract.name.as_str();
        tracing::info!(contract = %name, network = %self.network.name, "Deploying contract...");

        let kind = contract.kind();
        if kind != ContractKind::Solidity {
            return Err(DeploymentError::new(
                name,
                Stage::Classify,
                DeployError::UnsupportedBytecodeKind { kind },
            ));
        }

        let compiled = self
            .compiler
            .compile(contract)
            .await
            .map_err(|e| DeploymentError::new(name, Stage::Compile, e))?;
        for warning in &compiled.warnings {
            tracing::warn!(contract = %name, warning = %warning.message, "Compiler warning");
        }

        let envelope = BytecodeEnvelope::evm_from_hex(&compiled.bytecode)
            .map_err(|e| DeploymentError::new(name, Stage::Encode, e))?;
        tracing::debug!(contract = %name, bytes = envelope.payload().len(), "Bytecode wrapped");

        let signer = TransactionSigner::from_wallet(wallet)
            .map_err(|e| DeploymentError::new(name, Stage::Sign, e))?;
        let sender = signer.address();

        let nonce = NonceOracle::new(&self.transport).lookup(sender).await;
        if nonce.fell_back {
            tracing::warn!(contract = %name, sender = %sender, "Deploying with fallback nonce 0");
        }

        let tx = DeploymentTransaction::new(
            &envelope,
            &self.settings.gas,
            nonce.nonce,
            self.network.chain_id,
        );
        let signed = signer
            .sign(&tx)
            .await
            .map_err(|e| DeploymentError::new(name, Stage::Sign, e))?;

        let tx_hash = Broadcaster::new(&self.transport)
            .broadcast(signed)
            .await
            .map_err(|e| DeploymentError::new(name, Stage::Broadcast, e))?;

        let receipt = ConfirmationPoller::new(&self.transport, self.settings.confirmation)
            .wait(tx_hash)
            .await
            .map_err(|e| DeploymentError::new(name, Stage::Confirm, e))?;

        let origin = DeploymentOrigin {
            sender,
            nonce: nonce.nonce,
        };
        let address = AddressResolver::new(&self.transport)
            .resolve(&receipt, tx_hash, Some(origin))
            .await;

        tracing::info!(
            contract = %name,
            address = ?address.address(),
            tx_hash = %tx_hash,
            "Contract deployed successfully"
        );

        Ok(DeploymentResult {
            address,
            hash: tx_hash,
            name: name.to_string(),
            kind,
            initialized: true,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            abi: compiled.abi,
        })
    }

    /// Deploy contracts one after another.
    ///
    /// Every contract gets an entry in the result, a failure never stops the
    /// contracts after it. Move sources are rejected before compilation.
    pub async fn deploy_many<W: Wallet + ?Sized>(
        &self,
        contracts: &[ContractSource],
        wallet: &W,
    ) -> BatchResults {
        let mut results = BatchResults::default();

        for contract in contracts {
            let kind = contract.kind();
            let outcome = if kind == ContractKind::Move {
                tracing::warn!(
                    contract = %contract.name,
                    "Skipping Move contract - not yet supported"
                );
                DeploymentOutcome::failed(DeployError::UnsupportedBytecodeKind { kind })
            } else {
                match self.deploy_one(contract, wallet).await {
                    Ok(result) => DeploymentOutcome::Deployed(result),
                    Err(e) => {
                        tracing::error!(
                            contract = %contract.name,
                            stage = %e.stage,
                            error = %e.source,
                            "Failed to deploy contract"
                        );
                        DeploymentOutcome::failed(e)
                    }
                }
            };

            results.insert(&contract.name, outcome);
        }

        results
    }
}
