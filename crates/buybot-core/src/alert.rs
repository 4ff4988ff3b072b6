//! Enriched alert values.

use crate::amount::PositionChange;
use crate::swap::BuySignal;
use rust_decimal::Decimal;

/// Market capitalisation as known at alert time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketCap {
    /// Reported by the market-data provider.
    Reported(Decimal),
    /// Derived from price and an assumed total supply.
    Estimated(Decimal),
    Unknown,
}

impl MarketCap {
    pub fn value(&self) -> Option<Decimal> {
        match self {
            Self::Reported(v) | Self::Estimated(v) => Some(*v),
            Self::Unknown => None,
        }
    }

    pub fn is_estimated(&self) -> bool {
        matches!(self, Self::Estimated(_))
    }
}

/// A buy signal with every derived figure needed to render an alert.
#[derive(Debug, Clone, PartialEq)]
pub struct PremiumAlert {
    pub signal: BuySignal,
    /// Base asset paid, in whole units.
    pub base_amount: Decimal,
    pub native_symbol: String,
    pub native_usd: Decimal,
    pub usd_value: Decimal,
    /// Tracked token received, in whole units.
    pub token_amount: Decimal,
    pub token_symbol: String,
    pub price_usd: Option<Decimal>,
    pub market_cap: MarketCap,
    pub volume_24h_usd: Option<Decimal>,
    pub position: PositionChange,
}
