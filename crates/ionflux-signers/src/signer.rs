use crate::SignerError;
use crate::wallet::{WalletExtension, WalletHost, detect_wallet};
use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use bip39::{Language, Mnemonic};
use cosmrs::bip32::{DerivationPath, XPrv};
use cosmrs::crypto::PublicKey;
use cosmrs::crypto::secp256k1::SigningKey;
use cosmrs::tx::{Raw, SignDoc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Cosmos Hub derivation path used when no custom path is given.
pub const DEFAULT_HD_PATH: &str = "m/44'/118'/0'/0/0";

/// Public data of one account a signer can sign for.
#[derive(Debug, Clone)]
pub struct AccountData {
    pub address: String,
    pub public_key: PublicKey,
}

/// Signing handle, regardless of whether the keys live in a wallet or in memory.
#[async_trait]
pub trait OfflineSigner: Send + Sync {
    async fn get_accounts(&self) -> anyhow::Result<Vec<AccountData>>;

    /// Sign `sign_doc` in direct (protobuf) mode with the key behind `signer_address`.
    async fn sign_direct(&self, signer_address: &str, sign_doc: SignDoc) -> anyhow::Result<Raw>;
}

// ============================================================================
// Mnemonic Signer
// ============================================================================

struct DerivedAccount {
    private_key: Vec<u8>,
    data: AccountData,
}

/// Deterministic secp256k1 signer derived from a BIP-39 mnemonic.
pub struct MnemonicSigner {
    accounts: Vec<DerivedAccount>,
}

impl MnemonicSigner {
    /// Derive one account per path (only [`DEFAULT_HD_PATH`] when `hd_paths` is empty),
    /// encoding addresses under `prefix`.
    pub fn from_mnemonic(
        mnemonic: &str,
        prefix: &str,
        hd_paths: Option<Vec<DerivationPath>>,
    ) -> anyhow::Result<Self> {
        let mnemonic =
            Mnemonic::parse_in(Language::English, mnemonic.trim()).context("Invalid mnemonic")?;
        let seed = mnemonic.to_seed("");

        let paths = match hd_paths {
            Some(paths) if !paths.is_empty() => paths,
            _ => vec![parse_hd_path(DEFAULT_HD_PATH)?],
        };

        let accounts = paths
            .iter()
            .map(|path| derive_account(&seed, path, prefix))
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self { accounts })
    }

    pub fn first_address(&self) -> Option<&str> {
        self.accounts
            .first()
            .map(|account| account.data.address.as_str())
    }
}

impl fmt::Debug for MnemonicSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let addresses: Vec<_> = self
            .accounts
            .iter()
            .map(|account| account.data.address.as_str())
            .collect();
        f.debug_struct("MnemonicSigner")
            .field("accounts", &addresses)
            .finish()
    }
}

pub fn parse_hd_path(path: &str) -> anyhow::Result<DerivationPath> {
    path.parse::<DerivationPath>()
        .map_err(|e| anyhow!("Invalid derivation path '{path}': {e}"))
}

fn derive_account(seed: &[u8], path: &DerivationPath, prefix: &str) -> anyhow::Result<DerivedAccount> {
    let xprv = XPrv::derive_from_path(seed, path)
        .map_err(|e| anyhow!("Failed to derive key at {path}: {e}"))?;
    let private_key = xprv.to_bytes().to_vec();

    let signing_key = SigningKey::from_slice(&private_key)
        .map_err(|e| anyhow!("Failed to parse signing key: {e}"))?;
    let public_key = signing_key.public_key();
    let account_id = public_key
        .account_id(prefix)
        .map_err(|e| anyhow!("Failed to generate account ID with prefix '{prefix}': {e}"))?;

    Ok(DerivedAccount {
        private_key,
        data: AccountData {
            address: account_id.to_string(),
            public_key,
        },
    })
}

#[async_trait]
impl OfflineSigner for MnemonicSigner {
    async fn get_accounts(&self) -> anyhow::Result<Vec<AccountData>> {
        Ok(self
            .accounts
            .iter()
            .map(|account| account.data.clone())
            .collect())
    }

    async fn sign_direct(&self, signer_address: &str, sign_doc: SignDoc) -> anyhow::Result<Raw> {
        let Some(account) = self
            .accounts
            .iter()
            .find(|account| account.data.address == signer_address)
        else {
            bail!("Address {signer_address} not found in wallet");
        };

        let signing_key = SigningKey::from_slice(&account.private_key)
            .map_err(|e| anyhow!("Failed to parse signing key: {e}"))?;

        sign_doc
            .sign(&signing_key)
            .map_err(|e| anyhow!("Failed to sign transaction: {e}"))
    }
}

// ============================================================================
// Credential Sources
// ============================================================================

/// Where the signing capability for a client comes from.
#[derive(Clone)]
pub enum CredentialSource {
    /// An already unlocked wallet extension, scoped to one chain.
    Wallet {
        wallet: Arc<dyn WalletExtension>,
        chain_id: String,
        rpc: String,
    },
    /// A raw mnemonic held by the caller.
    Seed {
        seed: String,
        prefix: String,
        rpc: String,
    },
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Wallet { chain_id, rpc, .. } => f
                .debug_struct("Wallet")
                .field("chain_id", chain_id)
                .field("rpc", rpc)
                .finish_non_exhaustive(),
            CredentialSource::Seed { prefix, rpc, .. } => f
                .debug_struct("Seed")
                .field("prefix", prefix)
                .field("rpc", rpc)
                .finish_non_exhaustive(),
        }
    }
}

/// Serializable form of a [`CredentialSource`], tagged by `kind`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CredentialSpec {
    Wallet { chain_id: String, rpc: String },
    Seed { seed: String, prefix: String, rpc: String },
}

impl CredentialSource {
    pub fn rpc(&self) -> &str {
        match self {
            CredentialSource::Wallet { rpc, .. } | CredentialSource::Seed { rpc, .. } => rpc,
        }
    }

    /// Human-readable scope of the credentials, used in errors and logs.
    pub fn scope(&self) -> String {
        match self {
            CredentialSource::Wallet { chain_id, .. } => format!("chain {chain_id}"),
            CredentialSource::Seed { prefix, .. } => format!("seed with prefix {prefix}"),
        }
    }

    /// Bind a [`CredentialSpec`] to the host wallet when it names one.
    pub fn from_spec(spec: CredentialSpec, host: &dyn WalletHost) -> Result<Self, SignerError> {
        let source = match spec {
            CredentialSpec::Wallet { chain_id, rpc } => CredentialSource::Wallet {
                wallet: detect_wallet(host)?,
                chain_id,
                rpc,
            },
            CredentialSpec::Seed { seed, prefix, rpc } => {
                CredentialSource::Seed { seed, prefix, rpc }
            }
        };
        source.validate()?;
        Ok(source)
    }

    /// Parse untyped input such as a JSON config block.
    pub fn from_value(value: serde_json::Value, host: &dyn WalletHost) -> Result<Self, SignerError> {
        let spec: CredentialSpec = serde_json::from_value(value)
            .map_err(|e| SignerError::InvalidCredentialSource(e.to_string()))?;
        Self::from_spec(spec, host)
    }

    fn validate(&self) -> Result<(), SignerError> {
        let fields: Vec<(&str, &str)> = match self {
            CredentialSource::Wallet { chain_id, rpc, .. } => {
                vec![("chain_id", chain_id.as_str()), ("rpc", rpc.as_str())]
            }
            CredentialSource::Seed { seed, prefix, rpc } => {
                vec![
                    ("seed", seed.as_str()),
                    ("prefix", prefix.as_str()),
                    ("rpc", rpc.as_str()),
                ]
            }
        };

        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(SignerError::InvalidCredentialSource(format!(
                "missing field `{field}`"
            ))),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// A freshly resolved signer. The signer is absent when a wallet declines to provide one.
pub struct ResolvedSigner {
    pub signer: Option<Arc<dyn OfflineSigner>>,
    pub owner: String,
    pub rpc: String,
}

/// Produce a signing handle and owner address from `source`.
///
/// `hd_path` overrides the derivation path for seed sources. Nothing is cached: each call
/// derives keys or asks the wallet again.
pub async fn resolve_signer(
    source: &CredentialSource,
    hd_path: Option<&str>,
) -> Result<ResolvedSigner, SignerError> {
    source.validate()?;

    match source {
        CredentialSource::Wallet {
            wallet,
            chain_id,
            rpc,
        } => {
            let signer = wallet.offline_signer(chain_id).await;
            let owner = wallet
                .get_key(chain_id)
                .await
                .map_err(SignerError::Wallet)?
                .bech32_address;
            debug!(chain_id = %chain_id, owner = %owner, "Resolved wallet signer");

            Ok(ResolvedSigner {
                signer,
                owner,
                rpc: rpc.clone(),
            })
        }
        CredentialSource::Seed { seed, prefix, rpc } => {
            let hd_paths = hd_path
                .map(parse_hd_path)
                .transpose()
                .map_err(|e| SignerError::InvalidCredentialSource(format!("{e:#}")))?
                .map(|path| vec![path]);

            let signer = MnemonicSigner::from_mnemonic(seed, prefix, hd_paths)
                .map_err(SignerError::KeyDerivation)?;
            let owner = signer
                .first_address()
                .ok_or_else(|| SignerError::SignerUnavailable(source.scope()))?
                .to_string();
            debug!(prefix = %prefix, owner = %owner, "Resolved mnemonic signer");

            Ok(ResolvedSigner {
                signer: Some(Arc::new(signer)),
                owner,
                rpc: rpc.clone(),
            })
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::wallet::tests::FakeWallet;
    use serde_json::json;

    pub(crate) const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn seed_source(prefix: &str) -> CredentialSource {
        CredentialSource::Seed {
            seed: MNEMONIC.to_string(),
            prefix: prefix.to_string(),
            rpc: "http://localhost:26657".to_string(),
        }
    }

    #[test]
    fn test_mnemonic_signer_is_deterministic() {
        let first = MnemonicSigner::from_mnemonic(MNEMONIC, "ion", None).unwrap();
        let second = MnemonicSigner::from_mnemonic(MNEMONIC, "ion", None).unwrap();

        let address = first.first_address().unwrap();
        assert!(address.starts_with("ion1"));
        assert_eq!(Some(address), second.first_address());
    }

    #[test]
    fn test_mnemonic_signer_custom_paths() {
        let paths = vec![
            parse_hd_path("m/44'/118'/0'/0/0").unwrap(),
            parse_hd_path("m/44'/118'/0'/0/1").unwrap(),
        ];
        let signer = MnemonicSigner::from_mnemonic(MNEMONIC, "cosmos", Some(paths)).unwrap();
        let default = MnemonicSigner::from_mnemonic(MNEMONIC, "cosmos", None).unwrap();

        assert_eq!(signer.accounts.len(), 2);
        assert_eq!(signer.first_address(), default.first_address());
        assert_ne!(signer.accounts[0].data.address, signer.accounts[1].data.address);
    }

    #[test]
    fn test_mnemonic_signer_rejects_bad_input() {
        assert!(MnemonicSigner::from_mnemonic("not a real mnemonic", "ion", None).is_err());
        assert!(parse_hd_path("m/44'/not/a/path").is_err());
    }

    #[tokio::test]
    async fn test_resolve_seed_signer() {
        let resolved = resolve_signer(&seed_source("ion"), None).await.unwrap();
        let signer = resolved.signer.unwrap();
        let accounts = signer.get_accounts().await.unwrap();

        assert_eq!(accounts[0].address, resolved.owner);
        assert_eq!(resolved.rpc, "http://localhost:26657");
    }

    #[tokio::test]
    async fn test_resolve_seed_signer_with_hd_path_override() {
        let default = resolve_signer(&seed_source("ion"), None).await.unwrap();
        let custom = resolve_signer(&seed_source("ion"), Some("m/44'/60'/0'/0/0"))
            .await
            .unwrap();
        assert_ne!(default.owner, custom.owner);

        let invalid = resolve_signer(&seed_source("ion"), Some("not-a-path")).await;
        assert!(matches!(invalid, Err(SignerError::InvalidCredentialSource(_))));
    }

    #[tokio::test]
    async fn test_resolve_wallet_signer_may_lack_signer() {
        let wallet = FakeWallet {
            address: "ion1owner".to_string(),
            ..Default::default()
        };
        let source = CredentialSource::Wallet {
            wallet: Arc::new(wallet),
            chain_id: "ionflux-1".to_string(),
            rpc: "http://localhost:26657".to_string(),
        };

        let resolved = resolve_signer(&source, None).await.unwrap();
        assert_eq!(resolved.owner, "ion1owner");
        assert!(resolved.signer.is_none());
    }

    #[tokio::test]
    async fn test_resolve_rejects_blank_fields() {
        let source = CredentialSource::Seed {
            seed: String::new(),
            prefix: "ion".to_string(),
            rpc: "http://localhost:26657".to_string(),
        };
        assert!(matches!(
            resolve_signer(&source, None).await,
            Err(SignerError::InvalidCredentialSource(_))
        ));
    }

    #[test]
    fn test_credential_spec_requires_known_kind() {
        let host: Option<Arc<dyn WalletExtension>> = None;

        let untagged = CredentialSource::from_value(json!({ "rpc": "http://localhost:26657" }), &host);
        assert!(matches!(untagged, Err(SignerError::InvalidCredentialSource(_))));

        let unknown = CredentialSource::from_value(
            json!({ "kind": "ledger", "rpc": "http://localhost:26657" }),
            &host,
        );
        assert!(matches!(unknown, Err(SignerError::InvalidCredentialSource(_))));

        let seed = CredentialSource::from_value(
            json!({ "kind": "seed", "seed": MNEMONIC, "prefix": "ion", "rpc": "http://localhost:26657" }),
            &host,
        )
        .unwrap();
        assert!(matches!(seed, CredentialSource::Seed { .. }));
    }

    #[test]
    fn test_wallet_spec_requires_detected_wallet() {
        let spec = CredentialSpec::Wallet {
            chain_id: "ionflux-1".to_string(),
            rpc: "http://localhost:26657".to_string(),
        };

        let missing: Option<Arc<dyn WalletExtension>> = None;
        assert!(matches!(
            CredentialSource::from_spec(spec.clone(), &missing),
            Err(SignerError::WalletNotDetected)
        ));

        let present: Option<Arc<dyn WalletExtension>> = Some(Arc::new(FakeWallet::default()));
        let source = CredentialSource::from_spec(spec, &present).unwrap();
        assert_eq!(source.scope(), "chain ionflux-1");
    }
}
