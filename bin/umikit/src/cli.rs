use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "umikit")]
#[command(
    author,
    version,
    about = "Deploy contracts to the Umi network over JSON-RPC"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(
        short,
        long,
        global = true,
        env = "UMIKIT_VERBOSITY",
        default_value_t = LevelFilter::INFO
    )]
    pub verbosity: LevelFilter,

    /// Path to a umikit.toml configuration file.
    ///
    /// If not provided, umikit.toml is read from the user configuration directory
    /// and then from the working directory. Missing files are skipped.
    #[arg(long, alias = "conf", global = true, env = "UMIKIT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compile and deploy contracts.
    Deploy(DeployArgs),
    /// List the known networks.
    Networks,
}

#[derive(Debug, Clone, Args)]
pub struct DeployArgs {
    /// Contract source files, or directories containing `.sol` and `.move` files.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// The network to deploy to.
    #[arg(short, long, env = "UMIKIT_NETWORK")]
    pub network: Option<String>,

    /// Private key of the deploying account.
    #[arg(long, env = "UMIKIT_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,

    /// Address the private key is expected to control.
    ///
    /// When provided, the deployment is refused if the key derives a different address.
    #[arg(long, env = "UMIKIT_ADDRESS")]
    pub address: Option<String>,

    /// Gas limit of each deployment transaction.
    #[arg(long)]
    pub gas_limit: Option<u64>,

    /// Gas price in wei.
    #[arg(long)]
    pub gas_price_wei: Option<u64>,

    /// How long to wait for each deployment to be confirmed, in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Delay between receipt queries, in milliseconds.
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Write the deployment results to this file as JSON.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
