//! Errors surfaced by the deployment pipeline.

use strum::Display;

use crate::{
    broadcast::BroadcastError, compiler::CompilationError, confirm::ConfirmationTimeoutError,
    contract::ContractKind, envelope::EncodingError, network::ConfigError, wallet::WalletError,
};

/// Pipeline stage a deployment failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
    Classify,
    Compile,
    Encode,
    Sign,
    Broadcast,
    Confirm,
}

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Compilation(#[from] CompilationError),
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Broadcast(#[from] BroadcastError),
    #[error(transparent)]
    ConfirmationTimeout(#[from] ConfirmationTimeoutError),
    #[error("{kind} contracts are not supported")]
    UnsupportedBytecodeKind { kind: ContractKind },
}

/// A failed deployment, naming the contract and the stage that failed.
#[derive(Debug, thiserror::Error)]
#[error("deployment of {contract} failed at {stage} stage: {source}")]
pub struct DeploymentError {
    pub contract: String,
    pub stage: Stage,
    pub source: DeployError,
}

impl DeploymentError {
    pub fn new(contract: &str, stage: Stage, source: impl Into<DeployError>) -> Self {
        Self {
            contract: contract.to_string(),
            stage,
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_names_contract_and_stage() {
        let err = DeploymentError::new(
            "SimpleToken",
            Stage::Compile,
            CompilationError::new("Undeclared identifier."),
        );

        assert_eq!(
            err.to_string(),
            "deployment of SimpleToken failed at compile stage: Compilation failed: Undeclared identifier."
        );
    }

    #[test]
    fn test_unsupported_kind_message() {
        let err = DeployError::UnsupportedBytecodeKind {
            kind: ContractKind::Move,
        };
        assert_eq!(err.to_string(), "move contracts are not supported");
    }
}
