//! umikit is a CLI tool to deploy contracts to the Umi network in a single command.

mod cli;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Command, DeployArgs};
use config::Settings;
use umikit_deploy::{ContractSource, DeploymentEngine, LocalWallet};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let mut settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Command::Deploy(args) => {
            settings.apply_overrides(&args);
            deploy(settings, args).await
        }
        Command::Networks => {
            println!("{}", output::networks_table(&settings.registry(), &settings.network));
            Ok(())
        }
    }
}

async fn deploy(settings: Settings, args: DeployArgs) -> Result<()> {
    let network = settings.registry().lookup(&settings.network)?;
    let contracts = ContractSource::from_paths(&args.paths)?;
    if contracts.is_empty() {
        anyhow::bail!("No contract sources found in the given paths");
    }

    tracing::info!(
        network = %network.name,
        contracts = contracts.len(),
        gas_limit = settings.deploy.gas.gas_limit,
        "Starting deployment..."
    );

    let mut wallet = LocalWallet::new(args.private_key);
    if let Some(address) = args.address {
        wallet = wallet.with_address(address);
    }

    let engine = DeploymentEngine::new(network, settings.compiler)
        .context("Failed to create the RPC client")?
        .with_settings(settings.deploy);
    let results = engine.deploy_many(&contracts, &wallet).await;

    println!("{}", output::results_table(&results));

    if let Some(path) = &args.output {
        let content = serde_json::to_string_pretty(&results)
            .context("Failed to serialize deployment results")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write results to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Deployment results saved");
    }

    let failed = results.failures().count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} contracts failed to deploy", results.len());
    }

    tracing::info!(contracts = results.len(), "All contracts deployed");
    Ok(())
}
