use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

pub mod chain_info;
pub mod error;
pub mod gas;

// ============================================================================
// Re-exports
// ============================================================================

pub use chain_info::{BIP44_COIN_TYPE, Bech32Config, ChainDescriptor, Currency, build_chain_info};
pub use error::RegistryError;
pub use gas::{
    DEFAULT_GAS_PRICE_AMOUNT, FeeCoin, GasPrice, StdFee, calculate_fee, default_fee,
    gas_price_from_registry_entry,
};

// ============================================================================
// Network Variant
// ============================================================================

/// Which deployment of a network family to target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkVariant {
    #[default]
    Main,
    Test,
}

impl NetworkVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkVariant::Main => "main",
            NetworkVariant::Test => "test",
        }
    }
}

impl fmt::Display for NetworkVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkVariant {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "main" | "mainnet" => Ok(NetworkVariant::Main),
            "test" | "testnet" => Ok(NetworkVariant::Test),
            other => Err(RegistryError::UnknownVariant(other.to_string())),
        }
    }
}

// ============================================================================
// Registry Entries
// ============================================================================

/// Static description of a network family with optional main and test deployments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRegistryEntry {
    pub symbol: String,
    pub denom_native: String,
    pub exponent: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coin_gecko_id: Option<String>,
    pub prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<ChainNetwork>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<ChainNetwork>,
}

impl NetworkRegistryEntry {
    /// The deployment block for `variant`, if the registry declares one.
    pub fn network(&self, variant: NetworkVariant) -> Option<&ChainNetwork> {
        match variant {
            NetworkVariant::Main => self.main.as_ref(),
            NetworkVariant::Test => self.test.as_ref(),
        }
    }

    pub fn chain_id(&self, variant: NetworkVariant) -> Option<&str> {
        self.network(variant).map(|network| network.chain_id.as_str())
    }
}

/// One deployment of a network, in the chain-registry `chain.json` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainNetwork {
    pub chain_id: String,
    pub chain_name: String,
    pub bech32_prefix: String,
    #[serde(default)]
    pub apis: ChainApis,
    #[serde(default)]
    pub fees: ChainFees,
}

impl ChainNetwork {
    pub fn first_rpc(&self) -> Option<&str> {
        self.apis.rpc.first().map(|endpoint| endpoint.address.as_str())
    }

    pub fn first_rest(&self) -> Option<&str> {
        self.apis.rest.first().map(|endpoint| endpoint.address.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainApis {
    #[serde(default)]
    pub rpc: Vec<Endpoint>,
    #[serde(default)]
    pub rest: Vec<Endpoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainFees {
    #[serde(default)]
    pub fee_tokens: Vec<FeeToken>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeToken {
    pub denom: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_min_gas_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_gas_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_gas_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_gas_price: Option<f64>,
}

// ============================================================================
// Loading and Lookup
// ============================================================================

/// Parse a registry list from its JSON text.
pub fn parse_registry(json: &str) -> Result<Vec<NetworkRegistryEntry>, RegistryError> {
    Ok(serde_json::from_str(json)?)
}

/// Load a registry list from a JSON file.
pub fn load_registry<P: AsRef<Path>>(path: P) -> Result<Vec<NetworkRegistryEntry>, RegistryError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    let registry = parse_registry(&contents)?;
    debug!(path = %path.display(), entries = registry.len(), "Loaded chain registry");
    Ok(registry)
}

pub fn find_by_prefix<'a>(
    registry: &'a [NetworkRegistryEntry],
    prefix: &str,
) -> Option<&'a NetworkRegistryEntry> {
    registry.iter().find(|entry| entry.prefix == prefix)
}

pub fn find_by_symbol<'a>(
    registry: &'a [NetworkRegistryEntry],
    symbol: &str,
) -> Option<&'a NetworkRegistryEntry> {
    registry
        .iter()
        .find(|entry| entry.symbol.eq_ignore_ascii_case(symbol))
}

// ============================================================================
// Test Fixtures
// ============================================================================

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures {
    use super::*;

    /// A registry entry with both deployments and an optional fixed minimum gas price.
    pub fn entry(symbol: &str, prefix: &str, fixed_min_gas_price: Option<f64>) -> NetworkRegistryEntry {
        let denom = format!("u{}", symbol.to_ascii_lowercase());
        let network = |suffix: &str| ChainNetwork {
            chain_id: format!("{}-{suffix}", symbol.to_ascii_lowercase()),
            chain_name: format!("{symbol} {suffix}"),
            bech32_prefix: prefix.to_string(),
            apis: ChainApis {
                rpc: vec![Endpoint {
                    address: format!("https://rpc.{suffix}.{prefix}.example"),
                    provider: None,
                }],
                rest: vec![Endpoint {
                    address: format!("https://rest.{suffix}.{prefix}.example"),
                    provider: None,
                }],
            },
            fees: ChainFees {
                fee_tokens: vec![FeeToken {
                    denom: denom.clone(),
                    fixed_min_gas_price,
                    low_gas_price: None,
                    average_gas_price: None,
                    high_gas_price: None,
                }],
            },
        };

        NetworkRegistryEntry {
            symbol: symbol.to_string(),
            denom_native: denom.clone(),
            exponent: 6,
            coin_gecko_id: Some(symbol.to_ascii_lowercase()),
            prefix: prefix.to_string(),
            main: Some(network("1")),
            test: Some(network("testnet")),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
