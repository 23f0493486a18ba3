use crate::SignerError;
use crate::signer::{CredentialSource, OfflineSigner, resolve_signer};
use anyhow::anyhow;
use async_trait::async_trait;
use chain_registry::{FeeCoin, StdFee};
use cosmrs::tx::Fee;
use cosmrs::{Any, Coin, Denom};
use std::sync::Arc;
use tracing::{error, info};

pub mod contract;
pub mod ledger;
pub mod poll;

pub use contract::SigningContractClient;
pub use ledger::SigningLedgerClient;
pub use poll::PollConfig;

// ============================================================================
// Transaction Client
// ============================================================================

/// Result of a transaction that made it into a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverTxResponse {
    pub tx_hash: String,
    pub height: u64,
    pub code: u32,
    pub raw_log: String,
    pub gas_wanted: u64,
    pub gas_used: u64,
}

impl DeliverTxResponse {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// A client that can simulate and submit transactions for an address it signs for.
#[async_trait]
pub trait TxClient: Send + Sync {
    /// Gas units the chain reports the messages would consume.
    async fn simulate(&self, signer_address: &str, messages: &[Any], memo: &str)
    -> anyhow::Result<u64>;

    async fn sign_and_broadcast(
        &self,
        signer_address: &str,
        messages: &[Any],
        fee: &StdFee,
        memo: &str,
    ) -> anyhow::Result<DeliverTxResponse>;
}

/// Opens a signing client against an RPC endpoint.
#[async_trait]
pub trait RpcConnector: Send + Sync {
    type Client: Send;

    async fn connect_with_signer(
        &self,
        rpc: &str,
        signer: Arc<dyn OfflineSigner>,
    ) -> anyhow::Result<Self::Client>;
}

/// A signing client together with the address it acts for.
#[derive(Debug)]
pub struct ConnectedClient<C> {
    pub client: C,
    pub owner: String,
}

// ============================================================================
// Client Factory
// ============================================================================

/// Resolve `source` and connect a client for it.
pub async fn try_connect_client<K: RpcConnector>(
    connector: &K,
    source: &CredentialSource,
    hd_path: Option<&str>,
) -> Result<ConnectedClient<K::Client>, SignerError> {
    let resolved = resolve_signer(source, hd_path).await?;
    let signer = resolved
        .signer
        .ok_or_else(|| SignerError::SignerUnavailable(source.scope()))?;

    let client = connector
        .connect_with_signer(&resolved.rpc, signer)
        .await
        .map_err(SignerError::Rpc)?;
    info!(rpc = %resolved.rpc, owner = %resolved.owner, "Signing client connected");

    Ok(ConnectedClient {
        client,
        owner: resolved.owner,
    })
}

/// Like [`try_connect_client`], but logs the failure and returns `None`.
pub async fn connect_client<K: RpcConnector>(
    connector: &K,
    source: &CredentialSource,
    hd_path: Option<&str>,
) -> Option<ConnectedClient<K::Client>> {
    match try_connect_client(connector, source, hd_path).await {
        Ok(connected) => Some(connected),
        Err(e) => {
            error!(source = ?source, error = %e, "Failed to connect signing client");
            None
        }
    }
}

/// Connects [`SigningLedgerClient`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerConnector {
    pub poll: PollConfig,
}

#[async_trait]
impl RpcConnector for LedgerConnector {
    type Client = SigningLedgerClient;

    async fn connect_with_signer(
        &self,
        rpc: &str,
        signer: Arc<dyn OfflineSigner>,
    ) -> anyhow::Result<SigningLedgerClient> {
        SigningLedgerClient::connect(rpc, signer, self.poll).await
    }
}

/// Connects [`SigningContractClient`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContractConnector {
    pub poll: PollConfig,
}

#[async_trait]
impl RpcConnector for ContractConnector {
    type Client = SigningContractClient;

    async fn connect_with_signer(
        &self,
        rpc: &str,
        signer: Arc<dyn OfflineSigner>,
    ) -> anyhow::Result<SigningContractClient> {
        let ledger = SigningLedgerClient::connect(rpc, signer, self.poll).await?;
        Ok(SigningContractClient::new(ledger))
    }
}

pub async fn get_ledger_client(
    source: &CredentialSource,
    hd_path: Option<&str>,
) -> Option<ConnectedClient<SigningLedgerClient>> {
    connect_client(&LedgerConnector::default(), source, hd_path).await
}

pub async fn get_contract_client(
    source: &CredentialSource,
    hd_path: Option<&str>,
) -> Option<ConnectedClient<SigningContractClient>> {
    connect_client(&ContractConnector::default(), source, hd_path).await
}

// ============================================================================
// Coin Conversion
// ============================================================================

pub(crate) fn to_coin(coin: &FeeCoin) -> anyhow::Result<Coin> {
    let denom: Denom = coin
        .denom
        .parse()
        .map_err(|e| anyhow!("Invalid denom '{}': {e}", coin.denom))?;
    Ok(Coin {
        denom,
        amount: coin.amount,
    })
}

pub(crate) fn to_coins(coins: &[FeeCoin]) -> anyhow::Result<Vec<Coin>> {
    coins.iter().map(to_coin).collect()
}

pub(crate) fn to_fee(fee: &StdFee) -> anyhow::Result<Fee> {
    Ok(Fee {
        amount: to_coins(&fee.amount)?,
        gas_limit: fee.gas,
        payer: None,
        granter: None,
    })
}
