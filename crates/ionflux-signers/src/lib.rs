//! Wallet registration, signer resolution and signing clients for Cosmos SDK chains.

pub mod address;
pub mod broadcast;
pub mod client;
pub mod error;
pub mod keyring;
pub mod signer;
pub mod wallet;

// ============================================================================
// Re-exports
// ============================================================================

pub use address::{get_addr_by_chain_prefix, get_addr_by_prefix};
pub use broadcast::{
    BroadcastWrapper, DEFAULT_GAS_MARGIN, gas_with_margin, sign_and_broadcast_wrapper,
};
pub use client::{
    ConnectedClient, ContractConnector, DeliverTxResponse, LedgerConnector, PollConfig,
    RpcConnector, SigningContractClient, SigningLedgerClient, TxClient, connect_client,
    get_contract_client, get_ledger_client, try_connect_client,
};
pub use error::SignerError;
pub use keyring::LocalKeyring;
pub use signer::{
    AccountData, CredentialSource, CredentialSpec, DEFAULT_HD_PATH, MnemonicSigner,
    OfflineSigner, ResolvedSigner, resolve_signer,
};
pub use wallet::{
    WalletExtension, WalletHost, WalletKey, WalletSession, authorize_chains, detect_wallet,
    init_wallet_list, register_chains,
};
