//! Buy/sell classification of constant-product swaps.
//!
//! For a pair `(token0, token1)` where one side is the tracked token, the
//! other side is the base asset. A swap is a buy when base flowed in and the
//! tracked token flowed out:
//! - tracked = token0: buy iff `amount1_in > 0 && amount0_out > 0`
//! - tracked = token1: buy iff `amount0_in > 0 && amount1_out > 0`

use alloy::primitives::U256;
use buybot_core::{normalize_address, BuySignal, PoolSwap};
use tracing::trace;

/// Why a swap is not a buy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotABuyReason {
    /// Tracked token flowed into the pool.
    Sell,
    /// No tracked token left the pool.
    NoTrackedOutput,
    /// No base asset entered the pool.
    NoBaseInput,
    /// Neither pool asset is the tracked token.
    UntrackedPool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Buy(BuySignal),
    NotABuy(NotABuyReason),
}

impl Classification {
    pub fn into_buy(self) -> Option<BuySignal> {
        match self {
            Self::Buy(signal) => Some(signal),
            Self::NotABuy(_) => None,
        }
    }
}

/// Classify `swap` relative to `tracked_token` (any letter case).
pub fn classify(swap: &PoolSwap, tracked_token: &str) -> Classification {
    let tracked = normalize_address(tracked_token);
    let token0 = normalize_address(&swap.token0);
    let token1 = normalize_address(&swap.token1);
    let event = &swap.event;

    let (tracked_in, tracked_out, base_in, base_address) = if token0 == tracked {
        (event.amount0_in, event.amount0_out, event.amount1_in, token1)
    } else if token1 == tracked {
        (event.amount1_in, event.amount1_out, event.amount0_in, token0)
    } else {
        return Classification::NotABuy(NotABuyReason::UntrackedPool);
    };

    if base_in > U256::ZERO && tracked_out > U256::ZERO {
        return Classification::Buy(BuySignal {
            chain: swap.chain.clone(),
            pool: normalize_address(&swap.pool),
            token_address: tracked,
            base_address,
            base_in,
            token_out: tracked_out,
            buyer: event.to,
            tx_hash: event.tx_hash,
            block_number: event.block_number,
        });
    }

    let reason = if tracked_in > U256::ZERO {
        NotABuyReason::Sell
    } else if base_in.is_zero() {
        NotABuyReason::NoBaseInput
    } else {
        NotABuyReason::NoTrackedOutput
    };
    trace!(pool = %swap.pool, ?reason, "Swap is not a buy");
    Classification::NotABuy(reason)
}
