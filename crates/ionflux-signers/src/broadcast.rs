use crate::SignerError;
use crate::client::{DeliverTxResponse, TxClient};
use chain_registry::{GasPrice, calculate_fee};
use cosmrs::Any;
use tracing::debug;

/// Multiplier applied to simulated gas when the caller gives none.
pub const DEFAULT_GAS_MARGIN: f64 = 1.2;

/// Scale `simulated` gas by `margin`, rounding up.
pub fn gas_with_margin(simulated: u64, margin: f64) -> Result<u64, SignerError> {
    if !margin.is_finite() || margin <= 0.0 {
        return Err(SignerError::InvalidGasMargin(margin));
    }
    Ok((simulated as f64 * margin).ceil() as u64)
}

/// Submits message batches through `client`, sizing gas from a simulation first.
pub struct BroadcastWrapper<'a, C: ?Sized> {
    client: &'a C,
    signer_address: String,
    margin: f64,
}

/// Bind `client` and `signer_address` into a simulate-then-broadcast submitter.
///
/// `margin` defaults to [`DEFAULT_GAS_MARGIN`]. Broadcast failures are returned as-is.
pub fn sign_and_broadcast_wrapper<'a, C: TxClient + ?Sized>(
    client: &'a C,
    signer_address: &str,
    margin: Option<f64>,
) -> BroadcastWrapper<'a, C> {
    BroadcastWrapper {
        client,
        signer_address: signer_address.to_string(),
        margin: margin.unwrap_or(DEFAULT_GAS_MARGIN),
    }
}

impl<C: TxClient + ?Sized> BroadcastWrapper<'_, C> {
    pub fn margin(&self) -> f64 {
        self.margin
    }

    pub async fn call(
        &self,
        messages: &[Any],
        gas_price: &GasPrice,
        memo: &str,
    ) -> anyhow::Result<DeliverTxResponse> {
        let simulated = self
            .client
            .simulate(&self.signer_address, messages, memo)
            .await?;
        let gas_wanted = gas_with_margin(simulated, self.margin)?;
        let fee = calculate_fee(gas_wanted, gas_price)?;
        debug!(
            signer = %self.signer_address,
            simulated,
            gas_wanted,
            gas_price = %gas_price,
            "Fee computed from simulation"
        );

        self.client
            .sign_and_broadcast(&self.signer_address, messages, &fee, memo)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use async_trait::async_trait;
    use chain_registry::{FeeCoin, StdFee};
    use tokio::sync::Mutex;

    struct FakeTxClient {
        simulated_gas: u64,
        fail_broadcast: bool,
        fees: Mutex<Vec<StdFee>>,
    }

    impl FakeTxClient {
        fn new(simulated_gas: u64) -> Self {
            Self {
                simulated_gas,
                fail_broadcast: false,
                fees: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TxClient for FakeTxClient {
        async fn simulate(&self, _: &str, _: &[Any], _: &str) -> anyhow::Result<u64> {
            Ok(self.simulated_gas)
        }

        async fn sign_and_broadcast(
            &self,
            _: &str,
            _: &[Any],
            fee: &StdFee,
            memo: &str,
        ) -> anyhow::Result<DeliverTxResponse> {
            self.fees.lock().await.push(fee.clone());
            if self.fail_broadcast {
                bail!("out of gas");
            }
            Ok(DeliverTxResponse {
                tx_hash: "HASH".to_string(),
                height: 1,
                code: 0,
                raw_log: memo.to_string(),
                gas_wanted: fee.gas,
                gas_used: self.simulated_gas,
            })
        }
    }

    #[test]
    fn test_gas_with_margin_rounds_up() {
        assert_eq!(gas_with_margin(100_000, 1.2).unwrap(), 120_000);
        assert_eq!(gas_with_margin(100_001, 1.2).unwrap(), 120_002);
        assert_eq!(gas_with_margin(0, 1.2).unwrap(), 0);
        assert_eq!(gas_with_margin(85_000, 1.0).unwrap(), 85_000);
        // 10 * 1.1 is 11.000000000000002 in f64
        assert_eq!(gas_with_margin(10, 1.1).unwrap(), 12);
    }

    #[test]
    fn test_gas_with_margin_rejects_bad_margin() {
        for margin in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(gas_with_margin(100_000, margin), Err(SignerError::InvalidGasMargin(_))),
                "expected margin {margin} to be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_wrapper_applies_default_margin() {
        let client = FakeTxClient::new(100_000);
        let price: GasPrice = "0.005uion".parse().unwrap();

        let wrapper = sign_and_broadcast_wrapper(&client, "ion1sender", None);
        assert_eq!(wrapper.margin(), DEFAULT_GAS_MARGIN);
        let response = wrapper.call(&[], &price, "hello").await.unwrap();

        assert_eq!(response.gas_wanted, 120_000);
        assert_eq!(response.raw_log, "hello");
        let fees = client.fees.lock().await;
        assert_eq!(fees[0].gas, 120_000);
        assert_eq!(fees[0].amount, vec![FeeCoin { denom: "uion".into(), amount: 600 }]);
    }

    #[tokio::test]
    async fn test_wrapper_custom_margin() {
        let client = FakeTxClient::new(100_000);
        let price: GasPrice = "0.025uatom".parse().unwrap();

        sign_and_broadcast_wrapper(&client, "cosmos1sender", Some(1.5))
            .call(&[], &price, "")
            .await
            .unwrap();

        let fees = client.fees.lock().await;
        assert_eq!(fees[0].gas, 150_000);
        assert_eq!(fees[0].amount[0].amount, 3750);
    }

    #[tokio::test]
    async fn test_wrapper_does_not_retry_failed_broadcast() {
        let client = FakeTxClient {
            fail_broadcast: true,
            ..FakeTxClient::new(50_000)
        };
        let price: GasPrice = "0.005uion".parse().unwrap();

        let result = sign_and_broadcast_wrapper(&client, "ion1sender", None)
            .call(&[], &price, "")
            .await;

        assert!(result.unwrap_err().to_string().contains("out of gas"));
        assert_eq!(client.fees.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_wrapper_rejects_bad_fee_before_broadcast() {
        let client = FakeTxClient::new(100_000);
        let price: GasPrice = "0.005uion".parse().unwrap();

        let result = sign_and_broadcast_wrapper(&client, "ion1sender", Some(-1.0))
            .call(&[], &price, "")
            .await;
        assert!(result.unwrap_err().to_string().contains("gas margin"));

        let negative = GasPrice::new(rust_decimal::Decimal::from(-1), "uion");
        let result = sign_and_broadcast_wrapper(&client, "ion1sender", None)
            .call(&[], &negative, "")
            .await;
        assert!(result.unwrap_err().to_string().contains("invalid gas price"));

        assert!(client.fees.lock().await.is_empty());
    }
}
