//! Projection of registry entries into the chain descriptor shape wallet extensions accept
//! when a new network is suggested to them.

use crate::{NetworkRegistryEntry, NetworkVariant, RegistryError};
use serde::{Deserialize, Serialize};

/// BIP-44 coin type announced for every suggested chain.
pub const BIP44_COIN_TYPE: u32 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDescriptor {
    pub chain_id: String,
    pub chain_name: String,
    pub rpc: String,
    pub rest: String,
    pub stake_currency: Currency,
    pub bip44: Bip44,
    pub bech32_config: Bech32Config,
    pub currencies: Vec<Currency>,
    pub fee_currencies: Vec<Currency>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Currency {
    pub coin_denom: String,
    pub coin_minimal_denom: String,
    pub coin_decimals: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coin_gecko_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bip44 {
    pub coin_type: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bech32Config {
    pub bech32_prefix_acc_addr: String,
    pub bech32_prefix_acc_pub: String,
    pub bech32_prefix_val_addr: String,
    pub bech32_prefix_val_pub: String,
    pub bech32_prefix_cons_addr: String,
    pub bech32_prefix_cons_pub: String,
}

impl Bech32Config {
    /// Derive every sub-prefix from the account prefix using the Cosmos SDK suffixes.
    pub fn from_prefix(prefix: &str) -> Self {
        Self {
            bech32_prefix_acc_addr: prefix.to_string(),
            bech32_prefix_acc_pub: format!("{prefix}pub"),
            bech32_prefix_val_addr: format!("{prefix}valoper"),
            bech32_prefix_val_pub: format!("{prefix}valoperpub"),
            bech32_prefix_cons_addr: format!("{prefix}valcons"),
            bech32_prefix_cons_pub: format!("{prefix}valconspub"),
        }
    }
}

impl Currency {
    fn native(entry: &NetworkRegistryEntry) -> Self {
        Self {
            coin_denom: entry.symbol.clone(),
            coin_minimal_denom: entry.denom_native.clone(),
            coin_decimals: entry.exponent,
            coin_gecko_id: entry.coin_gecko_id.clone(),
        }
    }
}

/// Build the wallet-facing descriptor for one deployment of `entry`.
///
/// The entry must be present and must declare the requested variant with at least one
/// RPC and one REST endpoint. The first endpoint of each list is used.
pub fn build_chain_info(
    entry: Option<&NetworkRegistryEntry>,
    variant: NetworkVariant,
) -> Result<ChainDescriptor, RegistryError> {
    let entry = entry.ok_or(RegistryError::MissingRegistryInput)?;
    let network = entry
        .network(variant)
        .ok_or_else(|| RegistryError::MissingVariant {
            symbol: entry.symbol.clone(),
            variant,
        })?;

    let rpc = network
        .first_rpc()
        .ok_or_else(|| RegistryError::MissingEndpoint {
            chain_id: network.chain_id.clone(),
            kind: "rpc",
        })?;
    let rest = network
        .first_rest()
        .ok_or_else(|| RegistryError::MissingEndpoint {
            chain_id: network.chain_id.clone(),
            kind: "rest",
        })?;

    let currency = Currency::native(entry);

    Ok(ChainDescriptor {
        chain_id: network.chain_id.clone(),
        chain_name: network.chain_name.clone(),
        rpc: rpc.to_string(),
        rest: rest.to_string(),
        stake_currency: currency.clone(),
        bip44: Bip44 {
            coin_type: BIP44_COIN_TYPE,
        },
        bech32_config: Bech32Config::from_prefix(&network.bech32_prefix),
        currencies: vec![currency.clone()],
        fee_currencies: vec![currency],
    })
}
