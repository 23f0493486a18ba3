use anyhow::{Context, Result};
use chain_registry::NetworkVariant;
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default path to the chain registry JSON file
const DEFAULT_REGISTRY_PATH: &str = "registry.json";

/// Registry symbol used when none is configured
const DEFAULT_SYMBOL: &str = "ION";

/// CLI arguments for the ionflux tool
#[derive(Parser, Debug)]
#[command(name = "ionflux")]
#[command(
    about = "IonFlux - chain registration, signer resolution and fee helpers for Cosmos chains",
    long_about = None
)]
pub struct CliArgs {
    #[clap(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Optional TOML file with defaults for the flags below
    #[arg(long, env = "IONFLUX_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Chain registry JSON file
    #[arg(long, env = "IONFLUX_REGISTRY", global = true)]
    pub registry: Option<PathBuf>,

    /// Network variant to target (main or test)
    #[arg(long, env = "IONFLUX_NETWORK", global = true)]
    pub network: Option<NetworkVariant>,

    /// Registry symbol of the chain to operate on
    #[arg(long, env = "IONFLUX_SYMBOL", global = true)]
    pub symbol: Option<String>,

    /// RPC endpoint, overriding the registry's first RPC address
    #[arg(long, env = "IONFLUX_RPC_URL", global = true)]
    pub rpc_url: Option<String>,

    /// Mnemonic used for signing
    #[arg(long, env = "IONFLUX_MNEMONIC", hide_env_values = true, global = true)]
    pub mnemonic: Option<String>,

    /// Custom HD derivation path
    #[arg(long, env = "IONFLUX_HD_PATH", global = true)]
    pub hd_path: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the wallet chain descriptor for the selected chain
    ChainInfo,

    /// Print the gas price resolved from the registry
    GasPrice,

    /// Re-encode an address under another bech32 prefix
    ConvertAddress { address: String, prefix: String },

    /// Print the account address derived from the mnemonic
    Account,

    /// Register and authorize every registry chain with a local keyring
    WalletInit,

    /// Send native tokens
    Send {
        #[arg(long)]
        to: String,
        /// Amount in base units of the native denom
        #[arg(long)]
        amount: u128,
        #[arg(long, default_value = "")]
        memo: String,
    },

    /// Execute a CosmWasm contract message
    Execute {
        #[arg(long)]
        contract: String,
        /// JSON message
        #[arg(long)]
        msg: String,
        /// Native funds to attach, in base units
        #[arg(long)]
        funds: Option<u128>,
        #[arg(long, default_value = "")]
        memo: String,
    },

    /// Run a CosmWasm smart query
    Query {
        #[arg(long)]
        contract: String,
        /// JSON query
        #[arg(long)]
        msg: String,
    },
}

/// Values accepted from the TOML config file
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub registry: Option<PathBuf>,
    pub network: Option<NetworkVariant>,
    pub symbol: Option<String>,
    pub rpc_url: Option<String>,
    pub mnemonic: Option<String>,
    pub hd_path: Option<String>,
}

/// Load a [`FileConfig`] from a TOML file.
pub fn load_file_config<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
    let path = path.as_ref();
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let cfg: FileConfig = toml::from_str(&s)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(cfg)
}

/// CLI configuration with all values resolved
#[derive(Clone)]
pub struct CliConfig {
    pub registry_path: PathBuf,
    pub variant: NetworkVariant,
    pub symbol: String,
    pub rpc_url: Option<String>,
    pub mnemonic: Option<String>,
    pub hd_path: Option<String>,
}

impl CliConfig {
    /// Load configuration with priority: CLI/env -> config file -> defaults
    pub fn load(args: &GlobalArgs) -> Result<Self> {
        let file = args
            .config
            .as_ref()
            .map(load_file_config)
            .transpose()?
            .unwrap_or_default();

        let registry_path = args
            .registry
            .clone()
            .or(file.registry)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REGISTRY_PATH));
        let variant = args.network.or(file.network).unwrap_or_default();
        let symbol = args
            .symbol
            .clone()
            .or(file.symbol)
            .unwrap_or_else(|| DEFAULT_SYMBOL.to_string());
        let rpc_url = args.rpc_url.clone().or(file.rpc_url);
        let mnemonic = args.mnemonic.clone().or(file.mnemonic);
        let hd_path = args.hd_path.clone().or(file.hd_path);

        info!(
            "Loaded CliConfig: registry={}, network={variant}, symbol={symbol}, rpc_url={}, mnemonic_set={}",
            registry_path.display(),
            rpc_url.as_deref().unwrap_or("<registry>"),
            mnemonic.is_some()
        );

        Ok(CliConfig {
            registry_path,
            variant,
            symbol,
            rpc_url,
            mnemonic,
            hd_path,
        })
    }

    pub fn require_mnemonic(&self) -> Result<&str> {
        self.mnemonic
            .as_deref()
            .context("A mnemonic is required (--mnemonic or IONFLUX_MNEMONIC)")
    }
}
