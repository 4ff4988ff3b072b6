//! Core domain types for the token buy alert bot.
//!
//! This crate provides fundamental types used throughout the pipeline:
//! - `ChainId`, `ChainInfo`: chain identifiers and per-chain display/pricing data
//! - `GroupConfig`: a destination group's tracked token, pools and thresholds
//! - `SwapEvent`, `PoolSwap`, `BuySignal`: raw and classified trade events
//! - `PremiumAlert`, `PositionChange`, `MarketCap`: enriched alert values
//! - `amount`: decimal-aware conversion of raw on-chain amounts

pub mod alert;
pub mod amount;
pub mod chain;
pub mod error;
pub mod group;
pub mod swap;

pub use alert::{MarketCap, PremiumAlert};
pub use amount::{
    raw_to_decimal, PositionChange, DEFAULT_TOKEN_DECIMALS, ESTIMATED_TOTAL_SUPPLY,
    NATIVE_DECIMALS,
};
pub use chain::{ChainId, ChainInfo};
pub use error::{CoreError, Result};
pub use group::{AlertMedia, GroupConfig, GroupId, MediaSource};
pub use swap::{format_address, normalize_address, BuySignal, PoolSwap, SwapEvent};
