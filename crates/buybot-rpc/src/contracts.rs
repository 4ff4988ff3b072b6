//! Minimal contract ABIs and swap log decoding.

use alloy::primitives::Address;
use alloy::rpc::types::{Filter, Log};
use alloy::sol;
use alloy::sol_types::SolEvent;
use buybot_core::SwapEvent;

sol! {
    /// Constant-product pair (Uniswap V2 and forks).
    interface IUniswapV2Pair {
        function token0() external view returns (address);
        function token1() external view returns (address);

        event Swap(
            address indexed sender,
            uint256 amount0In,
            uint256 amount1In,
            uint256 amount0Out,
            uint256 amount1Out,
            address indexed to
        );
    }

    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
    }
}

/// Log filter selecting `Swap` events of one pool.
pub fn swap_filter(pool: Address) -> Filter {
    Filter::new()
        .address(pool)
        .event_signature(IUniswapV2Pair::Swap::SIGNATURE_HASH)
}

/// Decode a `Swap` log. Returns `None` for foreign or pending logs.
pub fn decode_swap(log: &Log) -> Option<SwapEvent> {
    let block_number = log.block_number?;
    let tx_hash = log.transaction_hash?;
    let decoded = IUniswapV2Pair::Swap::decode_log(&log.inner, true).ok()?;
    let swap = decoded.data;

    Some(SwapEvent {
        amount0_in: swap.amount0In,
        amount1_in: swap.amount1In,
        amount0_out: swap.amount0Out,
        amount1_out: swap.amount1Out,
        to: swap.to,
        tx_hash,
        block_number,
        log_index: log.log_index.unwrap_or_default(),
    })
}
