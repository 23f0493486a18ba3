use crate::{NetworkRegistryEntry, NetworkVariant, RegistryError};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Floor applied to every gas price resolved from the registry.
pub const DEFAULT_GAS_PRICE_AMOUNT: f64 = 0.005;

/// Static fallback fee, in base units of `inj`.
const FALLBACK_FEE_DENOM: &str = "inj";
const FALLBACK_FEE_AMOUNT: u128 = 500_000_000;
const FALLBACK_GAS_LIMIT: u64 = 400_000;

/// Resolve the gas price string (`<amount><denom>`) for one deployment of `entry`.
///
/// The amount is the larger of [`DEFAULT_GAS_PRICE_AMOUNT`] and the first fee token's
/// fixed minimum gas price. A missing variant or fee token falls back to the floor.
pub fn gas_price_from_registry_entry(entry: &NetworkRegistryEntry, variant: NetworkVariant) -> String {
    let fixed_min = entry
        .network(variant)
        .and_then(|network| network.fees.fee_tokens.first())
        .and_then(|token| token.fixed_min_gas_price)
        .unwrap_or(0.0);

    let amount = DEFAULT_GAS_PRICE_AMOUNT.max(fixed_min);
    format!("{amount}{}", entry.denom_native)
}

/// A price per unit of gas, e.g. `0.025uatom`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasPrice {
    pub amount: Decimal,
    pub denom: String,
}

impl GasPrice {
    pub fn new(amount: Decimal, denom: impl Into<String>) -> Self {
        Self {
            amount,
            denom: denom.into(),
        }
    }
}

impl FromStr for GasPrice {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RegistryError::InvalidGasPrice(s.to_string());

        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        let (amount, denom) = s.split_at(split);
        if amount.is_empty() || !is_valid_denom(denom) {
            return Err(invalid());
        }

        let amount = Decimal::from_str(amount).map_err(|_| invalid())?;
        Ok(Self::new(amount, denom))
    }
}

impl fmt::Display for GasPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount.normalize(), self.denom)
    }
}

// Cosmos SDK denom rule: a letter followed by 2..=127 of [a-zA-Z0-9/:._-].
// Same rule as `cosmrs::Denom`, which this crate does not depend on; keep the two in sync.
fn is_valid_denom(denom: &str) -> bool {
    let mut chars = denom.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_alphabetic()
        && (3..=128).contains(&denom.len())
        && chars.all(|c| c.is_ascii_alphanumeric() || "/:._-".contains(c))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeCoin {
    pub denom: String,
    pub amount: u128,
}

/// Fee attached to a transaction: coins paid plus the gas limit they cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdFee {
    pub amount: Vec<FeeCoin>,
    pub gas: u64,
}

/// Compute the fee for `gas_limit` units at `gas_price`, rounding the amount up.
///
/// A negative price, or a product that does not fit in `u128`, is an error.
pub fn calculate_fee(gas_limit: u64, gas_price: &GasPrice) -> Result<StdFee, RegistryError> {
    if gas_price.amount < Decimal::ZERO {
        return Err(RegistryError::InvalidGasPrice(gas_price.to_string()));
    }

    let amount = gas_price
        .amount
        .checked_mul(Decimal::from(gas_limit))
        .map(|total| total.ceil())
        .and_then(|total| total.to_u128())
        .ok_or_else(|| RegistryError::FeeOverflow {
            gas_limit,
            gas_price: gas_price.to_string(),
        })?;

    Ok(StdFee {
        amount: vec![FeeCoin {
            denom: gas_price.denom.clone(),
            amount,
        }],
        gas: gas_limit,
    })
}

/// Fixed fee used when no simulation is possible.
pub fn default_fee() -> StdFee {
    StdFee {
        amount: vec![FeeCoin {
            denom: FALLBACK_FEE_DENOM.to_string(),
            amount: FALLBACK_FEE_AMOUNT,
        }],
        gas: FALLBACK_GAS_LIMIT,
    }
}
