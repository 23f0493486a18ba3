use crate::NetworkVariant;
use thiserror::Error;

/// Failures raised while reading the chain registry or projecting it for a wallet.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("chain registry info is not provided")]
    MissingRegistryInput,

    #[error("chain info for {symbol} ({variant}) is not found")]
    MissingVariant {
        symbol: String,
        variant: NetworkVariant,
    },

    #[error("chain {chain_id} has no {kind} endpoint")]
    MissingEndpoint {
        chain_id: String,
        kind: &'static str,
    },

    #[error("unknown network variant '{0}', expected 'main' or 'test'")]
    UnknownVariant(String),

    #[error("invalid gas price '{0}'")]
    InvalidGasPrice(String),

    #[error("fee for {gas_limit} gas at {gas_price} does not fit in a coin amount")]
    FeeOverflow { gas_limit: u64, gas_price: String },

    #[error("failed to read chain registry: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse chain registry: {0}")]
    Json(#[from] serde_json::Error),
}
