//! Wallet extension capability and the gateway that registers networks with it.
//!
//! The extension is never read from ambient state: callers hand in a [`WalletHost`],
//! which either yields an extension handle or reports that none is installed.

use crate::SignerError;
use crate::signer::OfflineSigner;
use async_trait::async_trait;
use chain_registry::{ChainDescriptor, NetworkRegistryEntry, NetworkVariant, build_chain_info};
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Key material the wallet exposes for one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletKey {
    pub name: String,
    pub bech32_address: String,
    pub pub_key: Vec<u8>,
}

/// Capabilities of an injected wallet extension.
#[async_trait]
pub trait WalletExtension: Send + Sync {
    /// Ask the wallet to add a chain it may not know about yet.
    async fn suggest_chain(&self, descriptor: &ChainDescriptor) -> anyhow::Result<()>;

    /// Request permission to use the wallet for `chain_id`.
    async fn enable(&self, chain_id: &str) -> anyhow::Result<()>;

    async fn get_key(&self, chain_id: &str) -> anyhow::Result<WalletKey>;

    /// Signing handle for `chain_id`, if the wallet is willing to provide one.
    async fn offline_signer(&self, chain_id: &str) -> Option<Arc<dyn OfflineSigner>>;
}

/// Environment that may or may not carry a wallet extension.
pub trait WalletHost: Send + Sync {
    fn wallet(&self) -> Option<Arc<dyn WalletExtension>>;
}

impl WalletHost for Option<Arc<dyn WalletExtension>> {
    fn wallet(&self) -> Option<Arc<dyn WalletExtension>> {
        self.clone()
    }
}

pub fn detect_wallet(host: &dyn WalletHost) -> Result<Arc<dyn WalletExtension>, SignerError> {
    host.wallet().ok_or(SignerError::WalletNotDetected)
}

/// Outcome of [`init_wallet_list`], one result per registry entry for each phase.
pub struct WalletSession {
    pub wallet: Arc<dyn WalletExtension>,
    pub registered: Vec<Result<(), SignerError>>,
    pub authorized: Vec<Result<(), SignerError>>,
}

impl WalletSession {
    pub fn is_complete(&self) -> bool {
        self.registered.iter().chain(&self.authorized).all(Result::is_ok)
    }
}

/// Suggest every registry entry to the wallet, one after another.
///
/// A failing entry is logged and recorded; the remaining entries are still attempted.
pub async fn register_chains(
    wallet: &dyn WalletExtension,
    registry: &[NetworkRegistryEntry],
    variant: NetworkVariant,
) -> Vec<Result<(), SignerError>> {
    let mut results = Vec::with_capacity(registry.len());

    for entry in registry {
        let result = suggest_entry(wallet, entry, variant).await;
        if let Err(e) = &result {
            warn!(
                symbol = %entry.symbol,
                variant = %variant,
                error = %e,
                "Failed to register chain with wallet"
            );
        }
        results.push(result);
    }

    results
}

async fn suggest_entry(
    wallet: &dyn WalletExtension,
    entry: &NetworkRegistryEntry,
    variant: NetworkVariant,
) -> Result<(), SignerError> {
    let descriptor = build_chain_info(Some(entry), variant)?;
    wallet
        .suggest_chain(&descriptor)
        .await
        .map_err(SignerError::Wallet)?;
    debug!(chain_id = %descriptor.chain_id, "Chain suggested to wallet");
    Ok(())
}

/// Request wallet access for every registry entry at once.
///
/// Completes only after every request has settled. Results keep the input order.
pub async fn authorize_chains(
    wallet: &dyn WalletExtension,
    registry: &[NetworkRegistryEntry],
    variant: NetworkVariant,
) -> Vec<Result<(), SignerError>> {
    let requests = registry.iter().map(|entry| async move {
        let result = enable_entry(wallet, entry, variant).await;
        if let Err(e) = &result {
            warn!(
                symbol = %entry.symbol,
                variant = %variant,
                error = %e,
                "Failed to authorize chain"
            );
        }
        result
    });

    join_all(requests).await
}

async fn enable_entry(
    wallet: &dyn WalletExtension,
    entry: &NetworkRegistryEntry,
    variant: NetworkVariant,
) -> Result<(), SignerError> {
    let descriptor = build_chain_info(Some(entry), variant)?;
    wallet
        .enable(&descriptor.chain_id)
        .await
        .map_err(SignerError::Wallet)?;
    debug!(chain_id = %descriptor.chain_id, "Chain authorized");
    Ok(())
}

/// Register and then authorize `registry` with the wallet provided by `host`.
///
/// Returns `Ok(None)` when there is nothing to register.
pub async fn init_wallet_list(
    host: &dyn WalletHost,
    registry: Option<&[NetworkRegistryEntry]>,
    variant: NetworkVariant,
) -> Result<Option<WalletSession>, SignerError> {
    let wallet = detect_wallet(host)?;
    let Some(registry) = registry.filter(|registry| !registry.is_empty()) else {
        return Ok(None);
    };

    let registered = register_chains(wallet.as_ref(), registry, variant).await;
    let authorized = authorize_chains(wallet.as_ref(), registry, variant).await;

    let session = WalletSession {
        wallet,
        registered,
        authorized,
    };
    info!(
        chains = registry.len(),
        variant = %variant,
        complete = session.is_complete(),
        "Wallet initialized"
    );

    Ok(Some(session))
}
