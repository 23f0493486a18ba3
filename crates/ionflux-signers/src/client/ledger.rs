use super::poll::{PollConfig, poll_until};
use super::{DeliverTxResponse, TxClient, to_coins, to_fee};
use crate::broadcast::sign_and_broadcast_wrapper;
use crate::signer::OfflineSigner;
use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use chain_registry::{FeeCoin, GasPrice, StdFee};
use cosmrs::bank::MsgSend;
use cosmrs::proto::cosmos::auth::v1beta1::{
    BaseAccount, ModuleAccount, QueryAccountRequest, QueryAccountResponse,
};
use cosmrs::proto::cosmos::tx::v1beta1::{SimulateRequest, SimulateResponse, TxRaw};
use cosmrs::proto::cosmos::vesting::v1beta1::{
    BaseVestingAccount, ContinuousVestingAccount, DelayedVestingAccount, PeriodicVestingAccount,
    PermanentLockedAccount,
};
use cosmrs::proto::traits::Message;
use cosmrs::rpc::endpoint::tx;
use cosmrs::rpc::{Client, HttpClient};
use cosmrs::tendermint::abci::Code;
use cosmrs::tendermint::chain;
use cosmrs::tx::{AuthInfo, Body, Fee, Msg, Raw, SignDoc, SignerInfo};
use cosmrs::{AccountId, Any, crypto::PublicKey};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

const ACCOUNT_QUERY_PATH: &str = "/cosmos.auth.v1beta1.Query/Account";
const SIMULATE_PATH: &str = "/cosmos.tx.v1beta1.Service/Simulate";

// Account types that wrap a `BaseAccount`
const BASE_ACCOUNT_TYPE_URL: &str = "/cosmos.auth.v1beta1.BaseAccount";
const MODULE_ACCOUNT_TYPE_URL: &str = "/cosmos.auth.v1beta1.ModuleAccount";
const BASE_VESTING_ACCOUNT_TYPE_URL: &str = "/cosmos.vesting.v1beta1.BaseVestingAccount";
const CONTINUOUS_VESTING_ACCOUNT_TYPE_URL: &str = "/cosmos.vesting.v1beta1.ContinuousVestingAccount";
const DELAYED_VESTING_ACCOUNT_TYPE_URL: &str = "/cosmos.vesting.v1beta1.DelayedVestingAccount";
const PERIODIC_VESTING_ACCOUNT_TYPE_URL: &str = "/cosmos.vesting.v1beta1.PeriodicVestingAccount";
const PERMANENT_LOCKED_ACCOUNT_TYPE_URL: &str = "/cosmos.vesting.v1beta1.PermanentLockedAccount";

/// Signing client for bank-level operations over Tendermint RPC.
pub struct SigningLedgerClient {
    rpc: HttpClient,
    signer: Arc<dyn OfflineSigner>,
    chain_id: chain::Id,
    poll: PollConfig,
}

impl fmt::Debug for SigningLedgerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningLedgerClient")
            .field("chain_id", &self.chain_id.as_str())
            .field("poll", &self.poll)
            .finish_non_exhaustive()
    }
}

impl SigningLedgerClient {
    /// Connect to `rpc_url` and learn the chain id from the node status.
    pub async fn connect(
        rpc_url: &str,
        signer: Arc<dyn OfflineSigner>,
        poll: PollConfig,
    ) -> anyhow::Result<Self> {
        let rpc = HttpClient::new(rpc_url)
            .map_err(|e| anyhow!("Invalid RPC endpoint '{rpc_url}': {e}"))?;
        let status = rpc
            .status()
            .await
            .map_err(|e| anyhow!("Failed to query node status at {rpc_url}: {e}"))?;
        let chain_id = status.node_info.network;
        debug!(rpc = rpc_url, chain_id = %chain_id, "Connected to node");

        Ok(Self {
            rpc,
            signer,
            chain_id,
            poll,
        })
    }

    pub fn chain_id(&self) -> &str {
        self.chain_id.as_str()
    }

    /// Run a protobuf ABCI query and decode its response.
    pub(crate) async fn query<Req, Resp>(&self, path: &str, request: Req) -> anyhow::Result<Resp>
    where
        Req: Message,
        Resp: Message + Default,
    {
        let response = self
            .rpc
            .abci_query(Some(path.to_string()), request.encode_to_vec(), None, false)
            .await
            .map_err(|e| anyhow!("ABCI query {path} failed: {e}"))?;

        if response.code.is_err() {
            bail!(
                "ABCI query {path} returned code {}: {}",
                response.code.value(),
                response.log
            );
        }

        Resp::decode(response.value.as_slice())
            .with_context(|| format!("Failed to decode response of {path}"))
    }

    /// Account number and sequence for `address`.
    pub async fn account(&self, address: &str) -> anyhow::Result<BaseAccount> {
        let response: QueryAccountResponse = self
            .query(
                ACCOUNT_QUERY_PATH,
                QueryAccountRequest {
                    address: address.to_string(),
                },
            )
            .await?;

        account_from_response(address, response)
    }

    async fn public_key(&self, signer_address: &str) -> anyhow::Result<PublicKey> {
        self.signer
            .get_accounts()
            .await?
            .into_iter()
            .find(|account| account.address == signer_address)
            .map(|account| account.public_key)
            .with_context(|| format!("Signer has no account {signer_address}"))
    }

    async fn auth_info(&self, signer_address: &str, fee: Fee) -> anyhow::Result<(BaseAccount, AuthInfo)> {
        let account = self.account(signer_address).await?;
        let public_key = self.public_key(signer_address).await?;
        let auth_info = SignerInfo::single_direct(Some(public_key), account.sequence).auth_info(fee);
        Ok((account, auth_info))
    }

    pub async fn sign(
        &self,
        signer_address: &str,
        messages: &[Any],
        fee: &StdFee,
        memo: &str,
    ) -> anyhow::Result<Raw> {
        let body = Body::new(messages.to_vec(), memo, 0u32);
        let (account, auth_info) = self.auth_info(signer_address, to_fee(fee)?).await?;

        let sign_doc = SignDoc::new(&body, &auth_info, &self.chain_id, account.account_number)
            .map_err(|e| anyhow!("Failed to build sign doc: {e}"))?;
        self.signer.sign_direct(signer_address, sign_doc).await
    }

    async fn wait_for_inclusion(&self, hash: cosmrs::tendermint::Hash) -> anyhow::Result<DeliverTxResponse> {
        poll_until(self.poll, "wait_for_tx", || async move {
            let response = self
                .rpc
                .tx(hash, false)
                .await
                .map_err(|e| anyhow!("{e}"))?;

            Ok(Some(delivered_from(response)))
        })
        .await
    }

    /// Send `amount` from `from` to `to`, paying a simulated fee at `gas_price`.
    pub async fn send_tokens(
        &self,
        from: &str,
        to: &str,
        amount: &[FeeCoin],
        gas_price: &GasPrice,
        memo: &str,
    ) -> anyhow::Result<DeliverTxResponse> {
        let message = MsgSend {
            from_address: parse_account(from)?,
            to_address: parse_account(to)?,
            amount: to_coins(amount)?,
        }
        .to_any()
        .map_err(|e| anyhow!("Failed to encode MsgSend: {e}"))?;

        sign_and_broadcast_wrapper(self, from, None)
            .call(&[message], gas_price, memo)
            .await
    }
}

pub(crate) fn parse_account(address: &str) -> anyhow::Result<AccountId> {
    address
        .parse()
        .map_err(|e| anyhow!("Invalid account address '{address}': {e}"))
}

fn account_from_response(address: &str, response: QueryAccountResponse) -> anyhow::Result<BaseAccount> {
    let account = response
        .account
        .with_context(|| format!("Account {address} not found"))?;
    base_account_from_any(&account).with_context(|| format!("Failed to read account {address}"))
}

/// Unwrap the `BaseAccount` carried by a base, module or vesting account.
fn base_account_from_any(account: &Any) -> anyhow::Result<BaseAccount> {
    fn decode<M: Message + Default>(type_url: &str, bytes: &[u8]) -> anyhow::Result<M> {
        M::decode(bytes).with_context(|| format!("Failed to decode {type_url}"))
    }

    fn vesting(account: Option<BaseVestingAccount>) -> Option<BaseAccount> {
        account.and_then(|vesting| vesting.base_account)
    }

    let type_url = account.type_url.as_str();
    let bytes = account.value.as_slice();

    let base = match type_url {
        BASE_ACCOUNT_TYPE_URL => Some(decode::<BaseAccount>(type_url, bytes)?),
        MODULE_ACCOUNT_TYPE_URL => decode::<ModuleAccount>(type_url, bytes)?.base_account,
        BASE_VESTING_ACCOUNT_TYPE_URL => decode::<BaseVestingAccount>(type_url, bytes)?.base_account,
        CONTINUOUS_VESTING_ACCOUNT_TYPE_URL => {
            vesting(decode::<ContinuousVestingAccount>(type_url, bytes)?.base_vesting_account)
        }
        DELAYED_VESTING_ACCOUNT_TYPE_URL => {
            vesting(decode::<DelayedVestingAccount>(type_url, bytes)?.base_vesting_account)
        }
        PERIODIC_VESTING_ACCOUNT_TYPE_URL => {
            vesting(decode::<PeriodicVestingAccount>(type_url, bytes)?.base_vesting_account)
        }
        PERMANENT_LOCKED_ACCOUNT_TYPE_URL => {
            vesting(decode::<PermanentLockedAccount>(type_url, bytes)?.base_vesting_account)
        }
        other => bail!("Unsupported account type {other}"),
    };

    base.with_context(|| format!("{type_url} carries no base account"))
}

/// Encode an unsigned transaction for simulation.
///
/// Simulation does not check signatures, so one empty signature stands in for the signer.
fn simulate_tx_bytes(body: Body, auth_info: AuthInfo) -> anyhow::Result<Vec<u8>> {
    Ok(TxRaw {
        body_bytes: body
            .into_bytes()
            .map_err(|e| anyhow!("Failed to encode tx body: {e}"))?,
        auth_info_bytes: auth_info
            .into_bytes()
            .map_err(|e| anyhow!("Failed to encode auth info: {e}"))?,
        signatures: vec![Vec::new()],
    }
    .encode_to_vec())
}

fn gas_used_from_simulation(response: SimulateResponse) -> anyhow::Result<u64> {
    response
        .gas_info
        .map(|info| info.gas_used)
        .context("Simulation returned no gas info")
}

fn ensure_accepted(code: Code, log: &str) -> anyhow::Result<()> {
    if code.is_err() {
        bail!("Transaction rejected by mempool (code {}): {log}", code.value());
    }
    Ok(())
}

// Negative gas counters from the node are clamped to zero
fn delivered_from(response: tx::Response) -> DeliverTxResponse {
    DeliverTxResponse {
        tx_hash: response.hash.to_string(),
        height: response.height.value(),
        code: response.tx_result.code.value(),
        raw_log: response.tx_result.log,
        gas_wanted: u64::try_from(response.tx_result.gas_wanted).unwrap_or_default(),
        gas_used: u64::try_from(response.tx_result.gas_used).unwrap_or_default(),
    }
}

#[async_trait]
impl TxClient for SigningLedgerClient {
    async fn simulate(&self, signer_address: &str, messages: &[Any], memo: &str) -> anyhow::Result<u64> {
        let body = Body::new(messages.to_vec(), memo, 0u32);
        let fee = Fee {
            amount: Vec::new(),
            gas_limit: 0,
            payer: None,
            granter: None,
        };
        let (_, auth_info) = self.auth_info(signer_address, fee).await?;
        let tx_bytes = simulate_tx_bytes(body, auth_info)?;

        let response: SimulateResponse = self
            .query(
                SIMULATE_PATH,
                SimulateRequest {
                    tx_bytes,
                    ..Default::default()
                },
            )
            .await?;

        let gas_used = gas_used_from_simulation(response)?;
        debug!(signer = signer_address, gas_used, "Simulated transaction");
        Ok(gas_used)
    }

    async fn sign_and_broadcast(
        &self,
        signer_address: &str,
        messages: &[Any],
        fee: &StdFee,
        memo: &str,
    ) -> anyhow::Result<DeliverTxResponse> {
        let raw = self.sign(signer_address, messages, fee, memo).await?;
        let tx_bytes = raw
            .to_bytes()
            .map_err(|e| anyhow!("Failed to encode signed tx: {e}"))?;

        let response = self
            .rpc
            .broadcast_tx_sync(tx_bytes)
            .await
            .map_err(|e| anyhow!("Broadcast failed: {e}"))?;
        ensure_accepted(response.code, &response.log)?;

        let delivered = self.wait_for_inclusion(response.hash).await?;
        info!(
            tx_hash = %delivered.tx_hash,
            height = delivered.height,
            code = delivered.code,
            gas_wanted = delivered.gas_wanted,
            gas_used = delivered.gas_used,
            "Transaction included"
        );
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_account() {
        let address = crate::get_addr_by_prefix(
            &bech32::encode::<bech32::Bech32>(bech32::Hrp::parse("cosmos").unwrap(), &[3u8; 20])
                .unwrap(),
            "ion",
        )
        .unwrap();

        let account = parse_account(&address).unwrap();
        assert_eq!(account.prefix(), "ion");
        assert!(parse_account("ion1invalid").is_err());
    }

    #[test]
    fn test_bank_send_encodes_to_any() {
        let from = bech32::encode::<bech32::Bech32>(bech32::Hrp::parse("ion").unwrap(), &[1u8; 20]).unwrap();
        let to = bech32::encode::<bech32::Bech32>(bech32::Hrp::parse("ion").unwrap(), &[2u8; 20]).unwrap();
        let message = MsgSend {
            from_address: parse_account(&from).unwrap(),
            to_address: parse_account(&to).unwrap(),
            amount: to_coins(&[FeeCoin {
                denom: "uion".to_string(),
                amount: 5,
            }])
            .unwrap(),
        }
        .to_any()
        .unwrap();

        assert_eq!(message.type_url, "/cosmos.bank.v1beta1.MsgSend");
    }

    fn base(account_number: u64, sequence: u64) -> BaseAccount {
        BaseAccount {
            address: "ion1owner".to_string(),
            account_number,
            sequence,
            ..Default::default()
        }
    }

    fn any(type_url: &str, message: impl Message) -> Any {
        Any {
            type_url: type_url.to_string(),
            value: message.encode_to_vec(),
        }
    }

    fn base_vesting(account_number: u64, sequence: u64) -> Option<BaseVestingAccount> {
        Some(BaseVestingAccount {
            base_account: Some(base(account_number, sequence)),
            ..Default::default()
        })
    }

    #[test]
    fn test_base_account_from_any_unwraps_known_types() {
        let accounts = [
            any(BASE_ACCOUNT_TYPE_URL, base(1, 10)),
            any(
                MODULE_ACCOUNT_TYPE_URL,
                ModuleAccount {
                    base_account: Some(base(2, 20)),
                    name: "distribution".to_string(),
                    permissions: Vec::new(),
                },
            ),
            any(BASE_VESTING_ACCOUNT_TYPE_URL, base_vesting(3, 30).unwrap()),
            any(
                CONTINUOUS_VESTING_ACCOUNT_TYPE_URL,
                ContinuousVestingAccount {
                    base_vesting_account: base_vesting(4, 40),
                    start_time: 1_700_000_000,
                },
            ),
            any(
                DELAYED_VESTING_ACCOUNT_TYPE_URL,
                DelayedVestingAccount {
                    base_vesting_account: base_vesting(5, 50),
                },
            ),
            any(
                PERIODIC_VESTING_ACCOUNT_TYPE_URL,
                PeriodicVestingAccount {
                    base_vesting_account: base_vesting(6, 60),
                    ..Default::default()
                },
            ),
            any(
                PERMANENT_LOCKED_ACCOUNT_TYPE_URL,
                PermanentLockedAccount {
                    base_vesting_account: base_vesting(7, 70),
                },
            ),
        ];

        for (i, account) in accounts.iter().enumerate() {
            let unwrapped = base_account_from_any(account).unwrap();
            let expected = i as u64 + 1;
            assert_eq!(unwrapped.account_number, expected, "{}", account.type_url);
            assert_eq!(unwrapped.sequence, expected * 10, "{}", account.type_url);
        }
    }

    #[test]
    fn test_base_account_from_any_rejects_unknown_or_empty() {
        let unknown = any("/ethermint.types.v1.EthAccount", base(1, 1));
        let err = base_account_from_any(&unknown).unwrap_err();
        assert!(err.to_string().contains("Unsupported account type"));

        let hollow = any(
            DELAYED_VESTING_ACCOUNT_TYPE_URL,
            DelayedVestingAccount {
                base_vesting_account: None,
            },
        );
        let err = base_account_from_any(&hollow).unwrap_err();
        assert!(err.to_string().contains("carries no base account"));

        let garbage = Any {
            type_url: BASE_ACCOUNT_TYPE_URL.to_string(),
            value: vec![0xff, 0xff, 0xff],
        };
        assert!(base_account_from_any(&garbage).is_err());
    }

    #[test]
    fn test_account_from_response() {
        let vesting = ContinuousVestingAccount {
            base_vesting_account: base_vesting(12, 3),
            start_time: 0,
        };
        let response = QueryAccountResponse {
            account: Some(any(CONTINUOUS_VESTING_ACCOUNT_TYPE_URL, vesting)),
        };
        let account = account_from_response("ion1owner", response).unwrap();
        assert_eq!((account.account_number, account.sequence), (12, 3));

        let err = account_from_response("ion1missing", QueryAccountResponse { account: None })
            .unwrap_err();
        assert!(err.to_string().contains("Account ion1missing not found"));
    }

    #[test]
    fn test_simulate_tx_bytes_carries_empty_signature() {
        use cosmrs::proto::cosmos::tx::v1beta1::{AuthInfo as ProtoAuthInfo, TxBody};

        let public_key = cosmrs::crypto::secp256k1::SigningKey::from_slice(&[7u8; 32])
            .unwrap()
            .public_key();
        let fee = Fee {
            amount: Vec::new(),
            gas_limit: 0,
            payer: None,
            granter: None,
        };
        let auth_info = SignerInfo::single_direct(Some(public_key), 9).auth_info(fee);
        let body = Body::new(Vec::<Any>::new(), "simulated", 0u32);

        let bytes = simulate_tx_bytes(body, auth_info).unwrap();
        let raw = TxRaw::decode(bytes.as_slice()).unwrap();

        assert_eq!(raw.signatures, vec![Vec::<u8>::new()]);
        let body = TxBody::decode(raw.body_bytes.as_slice()).unwrap();
        assert_eq!(body.memo, "simulated");
        let auth_info = ProtoAuthInfo::decode(raw.auth_info_bytes.as_slice()).unwrap();
        assert_eq!(auth_info.signer_infos.len(), 1);
        assert_eq!(auth_info.signer_infos[0].sequence, 9);
        assert_eq!(auth_info.fee.unwrap().gas_limit, 0);
    }

    #[test]
    fn test_gas_used_from_simulation() {
        use cosmrs::proto::cosmos::base::abci::v1beta1::GasInfo;

        let response = SimulateResponse {
            gas_info: Some(GasInfo {
                gas_wanted: 0,
                gas_used: 83_412,
            }),
            result: None,
        };
        assert_eq!(gas_used_from_simulation(response).unwrap(), 83_412);

        let err = gas_used_from_simulation(SimulateResponse::default()).unwrap_err();
        assert!(err.to_string().contains("no gas info"));
    }

    #[test]
    fn test_ensure_accepted() {
        assert!(ensure_accepted(Code::Ok, "").is_ok());

        let err = ensure_accepted(Code::from(13), "insufficient fee").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Transaction rejected by mempool (code 13): insufficient fee"
        );
    }

    #[test]
    fn test_delivered_from_tx_response() {
        use cosmrs::tendermint::abci::types::ExecTxResult;
        use cosmrs::tendermint::{Hash, block};

        let response = tx::Response {
            hash: Hash::Sha256([0xab; 32]),
            height: block::Height::from(42u32),
            index: 0,
            tx_result: ExecTxResult {
                code: Code::from(5),
                log: "out of gas".to_string(),
                gas_wanted: 120_000,
                gas_used: -1,
                ..Default::default()
            },
            tx: Vec::new(),
            proof: None,
        };

        let delivered = delivered_from(response);
        assert_eq!(delivered.tx_hash, "AB".repeat(32));
        assert_eq!(delivered.height, 42);
        assert_eq!(delivered.code, 5);
        assert!(!delivered.is_success());
        assert_eq!(delivered.raw_log, "out of gas");
        assert_eq!(delivered.gas_wanted, 120_000);
        assert_eq!(delivered.gas_used, 0);
    }
}
