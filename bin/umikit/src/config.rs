//! Layered configuration for the CLI.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use umikit_deploy::{
    DEFAULT_NETWORK, EngineSettings, NetworkEntry, NetworkRegistry, SolcCompiler,
};

use crate::cli::DeployArgs;

/// Name of the configuration file looked up by default.
pub const CONFIG_FILENAME: &str = "umikit.toml";

/// Prefix of the environment variables read as configuration.
const ENV_PREFIX: &str = "UMIKIT_";

/// CLI-only variables that share the prefix but are not configuration.
const ENV_IGNORED: [&str; 4] = ["config", "verbosity", "private_key", "address"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Network used when `--network` is not given.
    pub network: String,
    pub deploy: EngineSettings,
    /// Networks declared in addition to the built-in ones.
    pub networks: BTreeMap<String, NetworkEntry>,
    pub compiler: SolcCompiler,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            network: DEFAULT_NETWORK.to_string(),
            deploy: EngineSettings::default(),
            networks: BTreeMap::new(),
            compiler: SolcCompiler::default(),
        }
    }
}

impl Settings {
    /// Load settings from defaults, the configuration file and the environment.
    ///
    /// An explicitly requested file must exist.
    pub fn load(config: Option<&Path>) -> Result<Self> {
        let files = match config {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Configuration file not found: {}", path.display());
                }
                vec![path.to_path_buf()]
            }
            None => default_config_files(),
        };

        let settings: Self = Self::figment(&files)
            .extract()
            .context("Failed to load configuration")?;

        tracing::debug!(
            files = ?files.iter().filter(|f| f.exists()).collect::<Vec<_>>(),
            network = %settings.network,
            "Configuration loaded"
        );

        Ok(settings)
    }

    /// Later files override earlier ones. The environment overrides every file.
    fn figment(files: &[PathBuf]) -> Figment {
        let figment = files.iter().fold(
            Figment::from(Serialized::defaults(Self::default())),
            |figment, file| figment.merge(Toml::file(file)),
        );

        figment.merge(Env::prefixed(ENV_PREFIX).split("__").ignore(&ENV_IGNORED))
    }

    /// Built-in networks plus the ones declared in configuration.
    pub fn registry(&self) -> NetworkRegistry {
        NetworkRegistry::with_entries(self.networks.clone())
    }

    /// Apply the command line flags, which take precedence over everything else.
    pub fn apply_overrides(&mut self, args: &DeployArgs) {
        if let Some(network) = &args.network {
            self.network = network.clone();
        }
        if let Some(gas_limit) = args.gas_limit {
            self.deploy.gas.gas_limit = gas_limit;
        }
        if let Some(gas_price_wei) = args.gas_price_wei {
            self.deploy.gas.gas_price_wei = gas_price_wei;
        }
        if let Some(timeout_ms) = args.timeout_ms {
            self.deploy.confirmation.timeout_ms = timeout_ms;
        }
        if let Some(poll_interval_ms) = args.poll_interval_ms {
            self.deploy.confirmation.poll_interval_ms = poll_interval_ms;
        }
    }
}

/// The user configuration file, then the one in the working directory.
fn default_config_files() -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        files.push(dir.join("umikit").join(CONFIG_FILENAME));
    }
    files.push(PathBuf::from(CONFIG_FILENAME));
    files
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;
    use umikit_deploy::{DEFAULT_GAS_LIMIT, DEVNET_CHAIN_ID};

    use super::*;

    fn deploy_args() -> DeployArgs {
        DeployArgs {
            paths: vec![PathBuf::from("contracts")],
            network: None,
            private_key: String::new(),
            address: None,
            gas_limit: None,
            gas_price_wei: None,
            timeout_ms: None,
            poll_interval_ms: None,
            output: None,
        }
    }

    #[test]
    fn test_defaults_without_files() {
        let settings: Settings = Settings::figment(&[]).extract().unwrap();

        assert_eq!(settings.network, "devnet");
        assert_eq!(settings.deploy.gas.gas_limit, DEFAULT_GAS_LIMIT);
        assert_eq!(settings.compiler.solc_path, PathBuf::from("solc"));
        assert_eq!(
            settings.registry().lookup("devnet").unwrap().chain_id,
            DEVNET_CHAIN_ID
        );
    }

    #[test]
    fn test_file_declares_networks_and_overrides() {
        let dir = TempDir::new("umikit-config").unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            r#"
network = "local"

[deploy.gas]
gas_limit = 5000000

[deploy.confirmation]
timeout_ms = 10000

[networks.local]
rpc_url = "http://127.0.0.1:8545"
chain_id = 1337

[compiler]
solc_path = "/opt/solc/0.8.26/solc"
"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.network, "local");
        assert_eq!(settings.deploy.gas.gas_limit, 5_000_000);
        assert_eq!(settings.deploy.gas.gas_price_wei, 1_000_000_000);
        assert_eq!(settings.deploy.confirmation.timeout_ms, 10_000);
        assert_eq!(settings.deploy.confirmation.poll_interval_ms, 2_000);
        assert_eq!(
            settings.compiler.solc_path,
            PathBuf::from("/opt/solc/0.8.26/solc")
        );

        let registry = settings.registry();
        assert_eq!(registry.names(), vec!["devnet", "local"]);
        let local = registry.lookup("local").unwrap();
        assert_eq!(local.chain_id, 1337);
        assert_eq!(local.rpc_url, url::Url::parse("http://127.0.0.1:8545").unwrap());
    }

    #[test]
    fn test_later_files_win() {
        let dir = TempDir::new("umikit-config").unwrap();
        let user = dir.path().join("user.toml");
        let project = dir.path().join("project.toml");
        std::fs::write(&user, "network = \"staging\"\n[deploy.gas]\ngas_limit = 1\n").unwrap();
        std::fs::write(&project, "network = \"local\"\n").unwrap();

        let settings: Settings = Settings::figment(&[user, project]).extract().unwrap();
        assert_eq!(settings.network, "local");
        assert_eq!(settings.deploy.gas.gas_limit, 1);
    }

    #[test]
    fn test_gas_price_from_file() {
        let dir = TempDir::new("umikit-config").unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[deploy.gas]\ngas_price_wei = 2500000000\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.deploy.gas.gas_price_wei, 2_500_000_000);
        assert_eq!(settings.deploy.gas.gas_limit, DEFAULT_GAS_LIMIT);
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = Settings::load(Some(Path::new("/nonexistent/umikit.toml"))).unwrap_err();
        assert!(err.to_string().contains("Configuration file not found"));
    }

    #[test]
    fn test_cli_overrides() {
        let mut settings = Settings::default();
        let args = DeployArgs {
            network: Some("local".to_string()),
            gas_price_wei: Some(7),
            poll_interval_ms: Some(500),
            ..deploy_args()
        };

        settings.apply_overrides(&args);

        assert_eq!(settings.network, "local");
        assert_eq!(settings.deploy.gas.gas_price_wei, 7);
        assert_eq!(settings.deploy.gas.gas_limit, DEFAULT_GAS_LIMIT);
        assert_eq!(settings.deploy.confirmation.poll_interval_ms, 500);
    }
}
