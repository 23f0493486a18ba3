use super::ledger::{SigningLedgerClient, parse_account};
use super::{DeliverTxResponse, TxClient, to_coins};
use crate::broadcast::sign_and_broadcast_wrapper;
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chain_registry::{FeeCoin, GasPrice, StdFee};
use cosmrs::Any;
use cosmrs::cosmwasm::MsgExecuteContract;
use cosmrs::proto::cosmwasm::wasm::v1::{
    QuerySmartContractStateRequest, QuerySmartContractStateResponse,
};
use cosmrs::tx::Msg;
use serde::Serialize;
use serde::de::DeserializeOwned;

const SMART_QUERY_PATH: &str = "/cosmwasm.wasm.v1.Query/SmartContractState";

/// Signing client with CosmWasm execute and query support.
#[derive(Debug)]
pub struct SigningContractClient {
    ledger: SigningLedgerClient,
}

impl SigningContractClient {
    pub fn new(ledger: SigningLedgerClient) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &SigningLedgerClient {
        &self.ledger
    }

    /// Execute `msg` on `contract` as `sender`, attaching `funds`.
    pub async fn execute<M: Serialize + ?Sized>(
        &self,
        sender: &str,
        contract: &str,
        msg: &M,
        funds: &[FeeCoin],
        gas_price: &GasPrice,
        memo: &str,
    ) -> anyhow::Result<DeliverTxResponse> {
        let message = execute_message(sender, contract, msg, funds)?;

        sign_and_broadcast_wrapper(self, sender, None)
            .call(&[message], gas_price, memo)
            .await
    }

    /// Run a smart query against `contract` and decode the JSON answer.
    pub async fn query_contract_smart<Q, R>(&self, contract: &str, query: &Q) -> anyhow::Result<R>
    where
        Q: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response: QuerySmartContractStateResponse = self
            .ledger
            .query(
                SMART_QUERY_PATH,
                QuerySmartContractStateRequest {
                    address: contract.to_string(),
                    query_data: serde_json::to_vec(query)?,
                },
            )
            .await?;

        serde_json::from_slice(&response.data)
            .with_context(|| format!("Failed to decode smart query response from {contract}"))
    }
}

fn execute_message<M: Serialize + ?Sized>(
    sender: &str,
    contract: &str,
    msg: &M,
    funds: &[FeeCoin],
) -> anyhow::Result<Any> {
    MsgExecuteContract {
        sender: parse_account(sender)?,
        contract: parse_account(contract)?,
        msg: serde_json::to_vec(msg)?,
        funds: to_coins(funds)?,
    }
    .to_any()
    .map_err(|e| anyhow!("Failed to encode MsgExecuteContract: {e}"))
}

#[async_trait]
impl TxClient for SigningContractClient {
    async fn simulate(&self, signer_address: &str, messages: &[Any], memo: &str) -> anyhow::Result<u64> {
        self.ledger.simulate(signer_address, messages, memo).await
    }

    async fn sign_and_broadcast(
        &self,
        signer_address: &str,
        messages: &[Any],
        fee: &StdFee,
        memo: &str,
    ) -> anyhow::Result<DeliverTxResponse> {
        self.ledger
            .sign_and_broadcast(signer_address, messages, fee, memo)
            .await
    }
}
