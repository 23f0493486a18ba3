use chain_registry::RegistryError;
use thiserror::Error;

/// Failures surfaced by the wallet gateway, signer resolver and client factory.
#[derive(Debug, Error)]
pub enum SignerError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("wallet extension is not installed")]
    WalletNotDetected,

    #[error("credential source must describe either a wallet or a seed: {0}")]
    InvalidCredentialSource(String),

    #[error("gas margin must be a positive finite number, got {0}")]
    InvalidGasMargin(f64),

    #[error("signer is unavailable for {0}")]
    SignerUnavailable(String),

    #[error("failed to derive signing key: {0:#}")]
    KeyDerivation(anyhow::Error),

    #[error("invalid bech32 address: {0}")]
    Bech32Decode(#[from] bech32::DecodeError),

    #[error("invalid bech32 prefix: {0}")]
    Bech32Hrp(#[from] bech32::primitives::hrp::Error),

    #[error("bech32 encoding failed: {0}")]
    Bech32Encode(#[from] bech32::EncodeError),

    #[error("wallet request failed: {0:#}")]
    Wallet(anyhow::Error),

    #[error("rpc request failed: {0:#}")]
    Rpc(anyhow::Error),
}
