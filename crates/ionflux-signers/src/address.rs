use crate::SignerError;
use crate::wallet::{WalletHost, authorize_chains, detect_wallet};
use bech32::{Bech32, Hrp};
use chain_registry::{NetworkRegistryEntry, NetworkVariant, find_by_prefix};
use tracing::debug;

/// Re-encode a bech32 address under `prefix`, keeping its payload bytes.
pub fn get_addr_by_prefix(address: &str, prefix: &str) -> Result<String, SignerError> {
    let (_, data) = bech32::decode(address)?;
    let hrp = Hrp::parse(prefix)?;
    Ok(bech32::encode::<Bech32>(hrp, &data)?)
}

/// Look up the wallet address of the registry chain using `prefix`.
///
/// Authorizes only the matching entry. Returns `Ok(None)` when no entry uses `prefix`
/// or the entry has no chain for `variant`.
pub async fn get_addr_by_chain_prefix(
    host: &dyn WalletHost,
    registry: &[NetworkRegistryEntry],
    variant: NetworkVariant,
    prefix: &str,
) -> Result<Option<String>, SignerError> {
    let wallet = detect_wallet(host)?;

    let Some(entry) = find_by_prefix(registry, prefix) else {
        debug!(prefix, "No registry entry for prefix");
        return Ok(None);
    };
    let Some(chain_id) = entry.chain_id(variant) else {
        debug!(prefix, variant = %variant, "Registry entry has no chain for variant");
        return Ok(None);
    };

    // Authorization failures are logged inside; the key lookup decides the outcome
    authorize_chains(wallet.as_ref(), std::slice::from_ref(entry), variant).await;

    let key = wallet.get_key(chain_id).await.map_err(SignerError::Wallet)?;
    Ok(Some(key.bech32_address))
}
