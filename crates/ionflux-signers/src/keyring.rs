//! In-process wallet backed by a single mnemonic.
//!
//! Behaves like a browser extension from the gateway's point of view: chains must be
//! suggested before they can be enabled, and keys are only handed out for enabled chains.

use crate::signer::{MnemonicSigner, OfflineSigner, parse_hd_path};
use crate::wallet::{WalletExtension, WalletHost, WalletKey};
use anyhow::{Context, bail};
use async_trait::async_trait;
use chain_registry::ChainDescriptor;
use cosmrs::bip32::DerivationPath;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

pub struct LocalKeyring {
    name: String,
    mnemonic: String,
    hd_path: Option<DerivationPath>,
    suggested: Mutex<HashMap<String, ChainDescriptor>>,
    enabled: Mutex<HashSet<String>>,
}

impl LocalKeyring {
    pub fn new(name: impl Into<String>, mnemonic: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mnemonic: mnemonic.into(),
            hd_path: None,
            suggested: Mutex::new(HashMap::new()),
            enabled: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_hd_path(mut self, hd_path: &str) -> anyhow::Result<Self> {
        self.hd_path = Some(parse_hd_path(hd_path)?);
        Ok(self)
    }

    pub async fn suggested_chains(&self) -> Vec<String> {
        let mut chains: Vec<_> = self.suggested.lock().await.keys().cloned().collect();
        chains.sort();
        chains
    }

    pub async fn is_enabled(&self, chain_id: &str) -> bool {
        self.enabled.lock().await.contains(chain_id)
    }

    async fn enabled_prefix(&self, chain_id: &str) -> anyhow::Result<String> {
        if !self.is_enabled(chain_id).await {
            bail!("chain {chain_id} is not enabled");
        }
        let suggested = self.suggested.lock().await;
        let descriptor = suggested
            .get(chain_id)
            .with_context(|| format!("chain {chain_id} was never suggested"))?;
        Ok(descriptor.bech32_config.bech32_prefix_acc_addr.clone())
    }

    fn signer(&self, prefix: &str) -> anyhow::Result<MnemonicSigner> {
        MnemonicSigner::from_mnemonic(&self.mnemonic, prefix, self.hd_path.clone().map(|p| vec![p]))
    }
}

impl fmt::Debug for LocalKeyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalKeyring")
            .field("name", &self.name)
            .field("hd_path", &self.hd_path.as_ref().map(ToString::to_string))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl WalletExtension for LocalKeyring {
    async fn suggest_chain(&self, descriptor: &ChainDescriptor) -> anyhow::Result<()> {
        self.suggested
            .lock()
            .await
            .insert(descriptor.chain_id.clone(), descriptor.clone());
        info!(chain_id = %descriptor.chain_id, name = %descriptor.chain_name, "Chain added to keyring");
        Ok(())
    }

    async fn enable(&self, chain_id: &str) -> anyhow::Result<()> {
        if !self.suggested.lock().await.contains_key(chain_id) {
            bail!("There is no chain info for {chain_id}");
        }
        self.enabled.lock().await.insert(chain_id.to_string());
        Ok(())
    }

    async fn get_key(&self, chain_id: &str) -> anyhow::Result<WalletKey> {
        let prefix = self.enabled_prefix(chain_id).await?;
        let signer = self.signer(&prefix)?;
        let account = signer
            .get_accounts()
            .await?
            .into_iter()
            .next()
            .context("keyring has no accounts")?;

        Ok(WalletKey {
            name: self.name.clone(),
            bech32_address: account.address,
            pub_key: account.public_key.to_bytes(),
        })
    }

    async fn offline_signer(&self, chain_id: &str) -> Option<Arc<dyn OfflineSigner>> {
        let prefix = self.enabled_prefix(chain_id).await.ok()?;
        let signer = self.signer(&prefix).ok()?;
        Some(Arc::new(signer))
    }
}

impl WalletHost for Arc<LocalKeyring> {
    fn wallet(&self) -> Option<Arc<dyn WalletExtension>> {
        Some(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::tests::MNEMONIC;
    use crate::wallet::init_wallet_list;
    use chain_registry::{NetworkVariant, build_chain_info, fixtures};

    fn descriptor(symbol: &str, prefix: &str) -> ChainDescriptor {
        build_chain_info(Some(&fixtures::entry(symbol, prefix, None)), NetworkVariant::Main).unwrap()
    }

    #[tokio::test]
    async fn test_enable_requires_suggestion() {
        let keyring = LocalKeyring::new("local", MNEMONIC);
        assert!(keyring.enable("ion-1").await.is_err());

        keyring.suggest_chain(&descriptor("ION", "ion")).await.unwrap();
        keyring.enable("ion-1").await.unwrap();
        assert!(keyring.is_enabled("ion-1").await);
    }

    #[tokio::test]
    async fn test_keys_only_for_enabled_chains() {
        let keyring = LocalKeyring::new("local", MNEMONIC);
        keyring.suggest_chain(&descriptor("ION", "ion")).await.unwrap();

        assert!(keyring.get_key("ion-1").await.is_err());
        assert!(keyring.offline_signer("ion-1").await.is_none());

        keyring.enable("ion-1").await.unwrap();
        let key = keyring.get_key("ion-1").await.unwrap();
        assert!(key.bech32_address.starts_with("ion1"));
        assert_eq!(key.pub_key.len(), 33);

        let signer = keyring.offline_signer("ion-1").await.unwrap();
        let accounts = signer.get_accounts().await.unwrap();
        assert_eq!(accounts[0].address, key.bech32_address);
    }

    #[tokio::test]
    async fn test_same_key_under_each_chain_prefix() {
        let keyring = LocalKeyring::new("local", MNEMONIC);
        for (symbol, prefix) in [("ION", "ion"), ("JUNO", "juno")] {
            let descriptor = descriptor(symbol, prefix);
            keyring.suggest_chain(&descriptor).await.unwrap();
            keyring.enable(&descriptor.chain_id).await.unwrap();
        }

        let ion = keyring.get_key("ion-1").await.unwrap();
        let juno = keyring.get_key("juno-1").await.unwrap();
        assert_eq!(ion.pub_key, juno.pub_key);
        assert_eq!(
            crate::get_addr_by_prefix(&ion.bech32_address, "juno").unwrap(),
            juno.bech32_address
        );
    }

    #[tokio::test]
    async fn test_custom_hd_path_changes_key() {
        let default = LocalKeyring::new("local", MNEMONIC);
        let custom = LocalKeyring::new("local", MNEMONIC)
            .with_hd_path("m/44'/118'/0'/0/7")
            .unwrap();
        for keyring in [&default, &custom] {
            keyring.suggest_chain(&descriptor("ION", "ion")).await.unwrap();
            keyring.enable("ion-1").await.unwrap();
        }

        assert_ne!(
            default.get_key("ion-1").await.unwrap().bech32_address,
            custom.get_key("ion-1").await.unwrap().bech32_address
        );
        assert!(LocalKeyring::new("local", MNEMONIC).with_hd_path("nope").is_err());
    }

    #[tokio::test]
    async fn test_wallet_list_against_keyring() {
        let keyring = Arc::new(LocalKeyring::new("local", MNEMONIC));
        let registry = vec![
            fixtures::entry("ION", "ion", Some(0.01)),
            fixtures::entry("JUNO", "juno", None),
        ];

        let session = init_wallet_list(&keyring, Some(registry.as_slice()), NetworkVariant::Test)
            .await
            .unwrap()
            .unwrap();

        assert!(session.is_complete());
        assert_eq!(keyring.suggested_chains().await, vec!["ion-testnet", "juno-testnet"]);
        assert!(keyring.is_enabled("juno-testnet").await);
    }

    #[test]
    fn test_debug_hides_mnemonic() {
        let keyring = LocalKeyring::new("local", MNEMONIC);
        let debug = format!("{keyring:?}");
        assert!(debug.contains("local"));
        assert!(!debug.contains("abandon"));
    }
}
