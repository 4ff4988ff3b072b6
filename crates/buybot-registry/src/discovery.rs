//! Pool ranking for discovery.

use crate::market_data::PoolLiquidity;
use buybot_core::normalize_address;
use rust_decimal::Decimal;

/// Keep pools with liquidity above `min_liquidity_usd`, ordered by descending
/// liquidity. Ties are broken by ascending lowercase address so repeated runs
/// over the same listing yield the same order.
pub fn rank_pools(pools: Vec<PoolLiquidity>, min_liquidity_usd: Decimal) -> Vec<String> {
    let mut kept: Vec<PoolLiquidity> = pools
        .into_iter()
        .filter(|p| p.liquidity_usd > min_liquidity_usd)
        .map(|p| PoolLiquidity {
            address: normalize_address(&p.address),
            liquidity_usd: p.liquidity_usd,
        })
        .filter(|p| !p.address.is_empty())
        .collect();

    kept.sort_by(|a, b| {
        b.liquidity_usd
            .cmp(&a.liquidity_usd)
            .then_with(|| a.address.cmp(&b.address))
    });

    let mut ranked: Vec<String> = Vec::with_capacity(kept.len());
    for pool in kept {
        if !ranked.contains(&pool.address) {
            ranked.push(pool.address);
        }
    }
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pool(address: &str, usd: Decimal) -> PoolLiquidity {
        PoolLiquidity {
            address: address.to_string(),
            liquidity_usd: usd,
        }
    }

    #[test]
    fn test_sorted_by_liquidity_desc() {
        let ranked = rank_pools(
            vec![pool("0xP2", dec!(10000)), pool("0xP1", dec!(50000))],
            dec!(1000),
        );
        assert_eq!(ranked, vec!["0xp1", "0xp2"]);
    }

    #[test]
    fn test_floor_is_exclusive() {
        let ranked = rank_pools(
            vec![pool("0xa", dec!(1000)), pool("0xb", dec!(1000.01))],
            dec!(1000),
        );
        assert_eq!(ranked, vec!["0xb"]);
    }

    #[test]
    fn test_ties_broken_by_address() {
        let ranked = rank_pools(
            vec![pool("0xC", dec!(5)), pool("0xa", dec!(5)), pool("0xB", dec!(5))],
            Decimal::ZERO,
        );
        assert_eq!(ranked, vec!["0xa", "0xb", "0xc"]);
    }

    #[test]
    fn test_duplicates_keep_best_entry() {
        let ranked = rank_pools(
            vec![pool("0xA", dec!(5)), pool("0xa", dec!(50)), pool("0xb", dec!(10))],
            Decimal::ZERO,
        );
        assert_eq!(ranked, vec!["0xa", "0xb"]);
    }

    #[test]
    fn test_empty_listing() {
        assert!(rank_pools(vec![], Decimal::ZERO).is_empty());
    }
}
