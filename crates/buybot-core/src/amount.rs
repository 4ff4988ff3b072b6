//! Decimal-aware conversion of raw on-chain amounts.
//!
//! Raw token amounts are `U256` integers scaled by the token's decimals.
//! `rust_decimal` holds at most 28 significant digits, so conversions keep
//! the integer part exactly and truncate excess fractional digits.

use alloy::primitives::U256;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Decimals of every EVM native asset.
pub const NATIVE_DECIMALS: u8 = 18;

/// Assumed when the market-data provider does not report token decimals.
pub const DEFAULT_TOKEN_DECIMALS: u8 = 18;

/// Total supply assumed for the estimated market cap when the provider
/// reports none. The result is only an estimate and is rendered as such.
pub const ESTIMATED_TOTAL_SUPPLY: u64 = 1_000_000_000_000_000;

const MAX_SIGNIFICANT_DIGITS: usize = 28;

/// Convert a raw integer amount into a decimal quantity.
pub fn raw_to_decimal(raw: U256, decimals: u8) -> Decimal {
    if raw.is_zero() {
        return Decimal::ZERO;
    }

    let digits = raw.to_string();
    let decimals = decimals as usize;

    let (int_part, frac_part) = if digits.len() > decimals {
        let split = digits.len() - decimals;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        ("0".to_string(), format!("{digits:0>decimals$}"))
    };

    if int_part.len() > MAX_SIGNIFICANT_DIGITS {
        return Decimal::MAX;
    }

    let int_digits = if int_part == "0" { 0 } else { int_part.len() };
    let frac_budget = MAX_SIGNIFICANT_DIGITS - int_digits;
    let frac = &frac_part[..frac_part.len().min(frac_budget)];

    let text = if frac.is_empty() {
        int_part
    } else {
        format!("{int_part}.{frac}")
    };

    Decimal::from_str(&text)
        .map(|d| d.normalize())
        .unwrap_or(Decimal::ZERO)
}

/// Change of the buyer's position caused by one trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionChange {
    /// Buyer held none of the token before the trade.
    NoPriorPosition,
    /// Percentage growth of the buyer's balance, one decimal precision.
    Increase { pct: Decimal },
    /// Pre-trade balance could not be read.
    Unknown,
}

impl PositionChange {
    /// Derive the change from the pre-trade balance and the bought amount.
    ///
    /// `pct = round(1000 * (post - pre) / pre) / 10` where `post = pre + bought`.
    pub fn from_balances(pre: U256, bought: U256) -> Self {
        if pre.is_zero() {
            return Self::NoPriorPosition;
        }

        let numerator = bought.saturating_mul(U256::from(1000u64));
        let two = U256::from(2u64);
        // Half-up rounding of numerator / pre.
        let tenths = numerator
            .saturating_mul(two)
            .saturating_add(pre)
            .checked_div(pre.saturating_mul(two))
            .unwrap_or(U256::ZERO);

        let cap = U256::from(10u128.pow(27));
        let tenths: u128 = tenths.min(cap).to::<u128>();
        let pct = Decimal::try_from_i128_with_scale(tenths as i128, 1).unwrap_or(Decimal::MAX);

        Self::Increase { pct }
    }

    /// Whole-percent value for display.
    pub fn display_pct(&self) -> Option<Decimal> {
        match self {
            Self::Increase { pct } => {
                Some(pct.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            }
            _ => None,
        }
    }
}
