//! umikit-deploy - Contract deployment library for the Umi network.
//!
//! This crate compiles contracts, wraps their bytecode in the network's
//! transaction envelope and submits them over JSON-RPC as signed legacy
//! contract-creation transactions.

mod address;
pub use address::{AddressResolver, DeploymentOrigin, ResolvedAddress, create_address};

mod broadcast;
pub use broadcast::{BroadcastError, Broadcaster};

mod compiler;
pub use compiler::{
    CompilationError, CompiledContract, Compiler, Diagnostic, Severity, SolcCompiler,
};

mod confirm;
pub use confirm::{
    ConfirmationPoller, ConfirmationTimeoutError, DEFAULT_CONFIRMATION_TIMEOUT_MS,
    DEFAULT_POLL_INTERVAL_MS, PollSettings, SUCCESS_STATUS, TransactionReceipt,
};

mod contract;
pub use contract::{ContractKind, ContractSource, SOURCE_EXTENSIONS};

mod engine;
pub use engine::{
    BatchResults, DeploymentEngine, DeploymentOutcome, DeploymentResult, EngineSettings,
};

mod envelope;
pub use envelope::{BytecodeEnvelope, EncodingError, PayloadKind};

mod error;
pub use error::{DeployError, DeploymentError, Stage};

mod network;
pub use network::{
    ConfigError, DEFAULT_NETWORK, DEVNET_CHAIN_ID, DEVNET_RPC_URL, NetworkConfig, NetworkEntry,
    NetworkRegistry,
};

mod nonce;
pub use nonce::{NonceLookup, NonceOracle};

pub mod rpc;
pub use rpc::{HttpTransport, JsonRpcTransport, RpcError};

mod transaction;
pub use transaction::{DEFAULT_GAS_LIMIT, DEFAULT_GAS_PRICE_WEI, DeploymentTransaction, GasSettings};

mod wallet;
pub use wallet::{
    LocalWallet, SignedTransaction, TransactionSigner, Wallet, WalletError, normalize_private_key,
};
