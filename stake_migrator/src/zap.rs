//! Zap migration amounts
//!
//! A zap migration pulls liquidity out of an old pair and adds it to the new
//! one in a single transaction. The user types into one field (a percent of
//! their LP balance, an LP amount, or an amount of either underlying token)
//! and everything else is derived from it, including the minimum token
//! amounts accepted on removal and on the add that follows.

use ethereum_types::{Address, U256, U512};
use serde::{Deserialize, Serialize};

use crate::units::to_base_units;

const BPS_DENOMINATOR: u64 = 10_000;

/// Which input the user last typed into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZapField {
    LiquidityPercent,
    Liquidity,
    CurrencyA,
    CurrencyB,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZapInput {
    pub field: ZapField,
    pub typed_value: String,
}

/// On-chain state of the pair being migrated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairReserves {
    pub reserve_a: U256,
    pub reserve_b: U256,
    pub total_supply: U256,
    pub decimals_a: u32,
    pub decimals_b: u32,
    pub lp_decimals: u32,
}

impl PairReserves {
    /// Underlying amounts backing `liquidity`, or `None` while the supply
    /// snapshot lags behind the balance.
    fn liquidity_values(&self, liquidity: U256) -> Option<(U256, U256)> {
        if self.total_supply.is_zero() || self.total_supply < liquidity {
            return None;
        }
        Some((
            mul_div(liquidity, self.reserve_a, self.total_supply),
            mul_div(liquidity, self.reserve_b, self.total_supply),
        ))
    }
}

/// Share of the user's liquidity to remove
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemoveShare {
    pub numerator: U256,
    pub denominator: U256,
}

impl RemoveShare {
    pub fn zero() -> Self {
        Self {
            numerator: U256::zero(),
            denominator: U256::from(100u64),
        }
    }

    pub fn is_positive(&self) -> bool {
        !self.numerator.is_zero() && !self.denominator.is_zero()
    }

    /// `value * share`, rounded down
    pub fn of(&self, value: U256) -> U256 {
        mul_div(value, self.numerator, self.denominator)
    }
}

/// Amounts derived from the typed field; `None` where they cannot be known yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedZapAmounts {
    pub share: RemoveShare,
    pub liquidity: Option<U256>,
    pub currency_a: Option<U256>,
    pub currency_b: Option<U256>,
}

/// Arguments for the migrator's zap call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZapMigrate {
    pub amount: Option<U256>,
    pub amount_a_min_remove: U256,
    pub amount_b_min_remove: U256,
    pub amount_a_min_add: U256,
    pub amount_b_min_add: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ZapInputError {
    #[error("Connect Wallet")]
    ConnectWallet,

    #[error("Enter an amount")]
    EnterAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedZapInfo {
    pub parsed: ParsedZapAmounts,
    pub zap: ZapMigrate,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<ZapInputError>,
}

fn serialize_error<S: serde::Serializer>(error: &Option<ZapInputError>, serializer: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(error) => serializer.serialize_some(&error.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Lower and upper bound of `value` under `slippage_bps` basis points.
///
/// Slippage above 100% is treated as 100%.
pub fn calculate_slippage_amount(value: U256, slippage_bps: u64) -> (U256, U256) {
    let slippage = slippage_bps.min(BPS_DENOMINATOR);
    let denominator = U256::from(BPS_DENOMINATOR);

    (
        mul_div(value, U256::from(BPS_DENOMINATOR - slippage), denominator),
        mul_div(value, U256::from(BPS_DENOMINATOR + slippage), denominator),
    )
}

/// Derives the zap call arguments from what the user typed.
///
/// Typed amounts above the user's balance, zero amounts and percentages
/// outside `1..=100` leave the share at zero, which surfaces as
/// [`ZapInputError::EnterAmount`].
pub fn derive_zap_migration(
    input: &ZapInput,
    pair: &PairReserves,
    user_liquidity: U256,
    account: Option<Address>,
    slippage_bps: u64,
) -> DerivedZapInfo {
    let values = pair.liquidity_values(user_liquidity);
    let share = remove_share(input, pair, user_liquidity, values);

    let positive = |amount: U256| Some(amount).filter(|a| !a.is_zero());
    let (currency_a, currency_b) = match values {
        Some((value_a, value_b)) if share.is_positive() => (positive(share.of(value_a)), positive(share.of(value_b))),
        _ => (None, None),
    };
    let parsed = ParsedZapAmounts {
        share,
        liquidity: if share.is_positive() {
            positive(share.of(user_liquidity))
        } else {
            None
        },
        currency_a,
        currency_b,
    };

    // Removal slippage first, then the add into the new pair slips again
    let min_remove = |amount: Option<U256>| amount.map_or_else(U256::zero, |a| calculate_slippage_amount(a, slippage_bps).0);
    let amount_a_min_remove = min_remove(parsed.currency_a);
    let amount_b_min_remove = min_remove(parsed.currency_b);
    let min_add = |amount: Option<U256>, removed: U256| {
        amount.map_or_else(U256::zero, |_| calculate_slippage_amount(removed, slippage_bps).0)
    };

    let zap = ZapMigrate {
        amount: parsed.liquidity,
        amount_a_min_remove,
        amount_b_min_remove,
        amount_a_min_add: min_add(parsed.currency_a, amount_a_min_remove),
        amount_b_min_add: min_add(parsed.currency_b, amount_b_min_remove),
    };

    let error = if account.is_none() {
        Some(ZapInputError::ConnectWallet)
    } else if parsed.liquidity.is_none() || parsed.currency_a.is_none() || parsed.currency_b.is_none() {
        Some(ZapInputError::EnterAmount)
    } else {
        None
    };

    DerivedZapInfo { parsed, zap, error }
}

fn remove_share(
    input: &ZapInput,
    pair: &PairReserves,
    user_liquidity: U256,
    values: Option<(U256, U256)>,
) -> RemoveShare {
    let share_of = |typed: Option<U256>, available: Option<U256>| match (typed, available) {
        (Some(amount), Some(available)) if amount <= available => RemoveShare {
            numerator: amount,
            denominator: available,
        },
        _ => RemoveShare::zero(),
    };

    match input.field {
        ZapField::LiquidityPercent => match U256::from_dec_str(input.typed_value.trim()) {
            Ok(percent) if percent <= U256::from(100u64) => RemoveShare {
                numerator: percent,
                denominator: U256::from(100u64),
            },
            _ => RemoveShare::zero(),
        },
        ZapField::Liquidity => share_of(parse_amount(&input.typed_value, pair.lp_decimals), Some(user_liquidity)),
        ZapField::CurrencyA => share_of(
            parse_amount(&input.typed_value, pair.decimals_a),
            values.map(|(value_a, _)| value_a),
        ),
        ZapField::CurrencyB => share_of(
            parse_amount(&input.typed_value, pair.decimals_b),
            values.map(|(_, value_b)| value_b),
        ),
    }
}

/// Typed amount in base units; unparsable and zero input read as nothing typed
fn parse_amount(typed: &str, decimals: u32) -> Option<U256> {
    to_base_units(typed, decimals).ok().filter(|amount| !amount.is_zero())
}

/// `a * b / denominator` without intermediate overflow, saturating the result
fn mul_div(a: U256, b: U256, denominator: U256) -> U256 {
    if denominator.is_zero() {
        return U256::zero();
    }
    let quotient = a.full_mul(b) / U512::from(denominator);
    U256::try_from(quotient).unwrap_or(U256::MAX)
}
