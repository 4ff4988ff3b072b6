//! Raw swap events and classified buy signals.

use crate::chain::ChainId;
use alloy::primitives::{Address, B256, U256};

/// Lowercase, trimmed form of an address string used as a map key.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

/// Lowercase `0x`-prefixed hex form of an address.
pub fn format_address(address: &Address) -> String {
    format!("{address:#x}")
}

/// One decoded `Swap` log of a constant-product pair.
///
/// Amounts are raw integers in each asset's own decimals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapEvent {
    pub amount0_in: U256,
    pub amount1_in: U256,
    pub amount0_out: U256,
    pub amount1_out: U256,
    /// Recipient of the output asset.
    pub to: Address,
    pub tx_hash: B256,
    pub block_number: u64,
    pub log_index: u64,
}

impl SwapEvent {
    /// Key identifying this event on its chain, used for duplicate suppression.
    pub fn dedup_key(&self) -> (B256, u64) {
        (self.tx_hash, self.log_index)
    }
}

/// A swap together with the pool it came from and the pool's asset ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSwap {
    pub chain: ChainId,
    /// Lowercase pool address.
    pub pool: String,
    /// Lowercase address of asset 0.
    pub token0: String,
    /// Lowercase address of asset 1.
    pub token1: String,
    pub event: SwapEvent,
}

/// A swap that bought the tracked token with the pool's base asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuySignal {
    pub chain: ChainId,
    pub pool: String,
    pub token_address: String,
    pub base_address: String,
    /// Raw amount of base asset paid in.
    pub base_in: U256,
    /// Raw amount of tracked token paid out.
    pub token_out: U256,
    pub buyer: Address,
    pub tx_hash: B256,
    pub block_number: u64,
}

impl BuySignal {
    pub fn buyer_hex(&self) -> String {
        format_address(&self.buyer)
    }

    pub fn tx_hex(&self) -> String {
        format!("{:#x}", self.tx_hash)
    }
}
