//! Buy signal enrichment.
//!
//! Each figure has its own fallback so a failing collaborator never drops an
//! alert:
//! - market snapshot unavailable: 18 token decimals, symbol "TOKEN", no price
//! - market cap missing: `price * ESTIMATED_TOTAL_SUPPLY`, flagged estimated
//! - native price unavailable: last known, then the chain's fixed fallback
//! - balance read failed: position change unknown

use crate::price::{NativePriceCache, PriceOrigin};
use alloy::primitives::{Address, U256};
use buybot_core::{
    raw_to_decimal, BuySignal, ChainInfo, MarketCap, PositionChange, PremiumAlert,
    DEFAULT_TOKEN_DECIMALS, ESTIMATED_TOTAL_SUPPLY, NATIVE_DECIMALS,
};
use buybot_registry::{MarketData, PairSnapshot};
use buybot_rpc::ChainClient;
use buybot_telemetry::Metrics;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_TOKEN_SYMBOL: &str = "TOKEN";

#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    /// Bound on market-data and price calls.
    pub http_timeout: Duration,
    /// Bound on the balance read.
    pub rpc_timeout: Duration,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(10),
            rpc_timeout: Duration::from_secs(8),
        }
    }
}

pub struct Enricher {
    market: Arc<dyn MarketData>,
    prices: Arc<NativePriceCache>,
    config: EnrichmentConfig,
}

impl Enricher {
    pub fn new(
        market: Arc<dyn MarketData>,
        prices: Arc<NativePriceCache>,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            market,
            prices,
            config,
        }
    }

    /// Build the alert for `signal`. `client` is the chain's live connection,
    /// used for the buyer's pre-trade balance.
    pub async fn enrich(
        &self,
        signal: &BuySignal,
        client: Option<Arc<dyn ChainClient>>,
    ) -> PremiumAlert {
        let chain = ChainInfo::for_chain(&signal.chain);

        let (snapshot, (native_usd, price_origin), pre_balance) = tokio::join!(
            self.snapshot(signal),
            self.native_price(&chain),
            self.pre_trade_balance(signal, client),
        );

        let base_amount = raw_to_decimal(signal.base_in, NATIVE_DECIMALS);
        let token_decimals = snapshot.token_decimals.unwrap_or(DEFAULT_TOKEN_DECIMALS);
        let token_amount = raw_to_decimal(signal.token_out, token_decimals);
        // Unrounded: thresholds compare against this, rendering rounds.
        let usd_value = base_amount.checked_mul(native_usd).unwrap_or(Decimal::MAX);
        debug!(
            chain = %signal.chain,
            tx = %signal.tx_hex(),
            usd = %usd_value,
            native_usd = %native_usd,
            price_origin = ?price_origin,
            "Buy enriched"
        );

        let market_cap = match (snapshot.market_cap_usd, snapshot.price_usd) {
            (Some(reported), _) => MarketCap::Reported(reported),
            (None, Some(price)) => price
                .checked_mul(Decimal::from(ESTIMATED_TOTAL_SUPPLY))
                .map_or(MarketCap::Unknown, MarketCap::Estimated),
            (None, None) => MarketCap::Unknown,
        };

        let position = match pre_balance {
            Some(pre) => PositionChange::from_balances(pre, signal.token_out),
            None => PositionChange::Unknown,
        };

        PremiumAlert {
            signal: signal.clone(),
            base_amount,
            native_symbol: chain.native_symbol.clone(),
            native_usd,
            usd_value,
            token_amount,
            token_symbol: snapshot
                .token_symbol
                .unwrap_or_else(|| DEFAULT_TOKEN_SYMBOL.to_string()),
            price_usd: snapshot.price_usd,
            market_cap,
            volume_24h_usd: snapshot.volume_24h_usd,
            position,
        }
    }

    async fn snapshot(&self, signal: &BuySignal) -> PairSnapshot {
        let call = self
            .market
            .pair_snapshot(&signal.chain, &signal.pool, &signal.token_address);
        match tokio::time::timeout(self.config.http_timeout, call).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                Metrics::upstream_failure("market_data");
                warn!(chain = %signal.chain, pool = %signal.pool, error = %e, "Pair snapshot failed");
                PairSnapshot::default()
            }
            Err(_) => {
                Metrics::upstream_failure("market_data");
                warn!(chain = %signal.chain, pool = %signal.pool, "Pair snapshot timed out");
                PairSnapshot::default()
            }
        }
    }

    async fn native_price(&self, chain: &ChainInfo) -> (Decimal, PriceOrigin) {
        let lookup = self.prices.price_for(chain);
        match tokio::time::timeout(self.config.http_timeout, lookup).await {
            Ok(result) => result,
            Err(_) => {
                Metrics::upstream_failure("price");
                (chain.fallback_native_usd, PriceOrigin::Fallback)
            }
        }
    }

    /// Buyer's token balance at `block - 1`, or `None` when it cannot be read.
    async fn pre_trade_balance(
        &self,
        signal: &BuySignal,
        client: Option<Arc<dyn ChainClient>>,
    ) -> Option<U256> {
        let client = client?;
        let token = Address::from_str(&signal.token_address).ok()?;
        let block = signal.block_number.checked_sub(1)?;

        let read = client.balance_of_at(token, signal.buyer, block);
        match tokio::time::timeout(self.config.rpc_timeout, read).await {
            Ok(Ok(balance)) => Some(balance),
            Ok(Err(e)) => {
                Metrics::upstream_failure("rpc");
                debug!(chain = %signal.chain, block, error = %e, "Pre-trade balance read failed");
                None
            }
            Err(_) => {
                Metrics::upstream_failure("rpc");
                debug!(chain = %signal.chain, block, "Pre-trade balance read timed out");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AlertError, AlertResult};
    use crate::price::NativePriceSource;
    use alloy::primitives::B256;
    use async_trait::async_trait;
    use buybot_core::ChainId;
    use buybot_registry::{PoolLiquidity, RegistryError, RegistryResult};
    use buybot_rpc::{RpcError, RpcResult, SwapStream};
    use rust_decimal_macros::dec;
    use tokio_util::sync::CancellationToken;

    struct FixedPrice(Option<Decimal>);

    #[async_trait]
    impl NativePriceSource for FixedPrice {
        async fn usd_price(&self, symbol: &str) -> AlertResult<Decimal> {
            self.0.ok_or_else(|| AlertError::PriceUnavailable {
                symbol: symbol.to_string(),
                reason: "down".to_string(),
            })
        }
    }

    struct FixedMarket(Option<PairSnapshot>);

    #[async_trait]
    impl MarketData for FixedMarket {
        async fn list_pools(
            &self,
            _chain: &ChainId,
            _token: &str,
        ) -> RegistryResult<Vec<PoolLiquidity>> {
            Ok(vec![])
        }

        async fn pair_snapshot(
            &self,
            _chain: &ChainId,
            _pool: &str,
            _token: &str,
        ) -> RegistryResult<PairSnapshot> {
            self.0
                .clone()
                .ok_or_else(|| RegistryError::HttpClient("HTTP 503".to_string()))
        }
    }

    fn enricher(snapshot: Option<PairSnapshot>, price: Option<Decimal>) -> Enricher {
        Enricher::new(
            Arc::new(FixedMarket(snapshot)),
            Arc::new(NativePriceCache::new(Arc::new(FixedPrice(price)))),
            EnrichmentConfig::default(),
        )
    }

    fn signal() -> BuySignal {
        BuySignal {
            chain: ChainId::new("bsc"),
            pool: "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_string(),
            token_address: "0x1111111111111111111111111111111111111111".to_string(),
            base_address: "0xbb4cdb9cbd36b01bd1cbaebf2de08d9173bc095c".to_string(),
            base_in: U256::from(2_000_000_000_000_000_000u128),
            token_out: U256::from(500_000_000_000u64),
            buyer: Address::repeat_byte(0x44),
            tx_hash: B256::repeat_byte(0x55),
            block_number: 100,
        }
    }

    #[tokio::test]
    async fn test_usd_value_from_native_price() {
        let alert = enricher(None, Some(dec!(600))).enrich(&signal(), None).await;
        assert_eq!(alert.base_amount, dec!(2));
        assert_eq!(alert.usd_value, dec!(1200));
        assert_eq!(alert.native_symbol, "BNB");
    }

    #[tokio::test]
    async fn test_usd_value_keeps_full_precision() {
        let mut buy = signal();
        // 99.995 native units
        buy.base_in = U256::from(99_995_000_000_000_000_000u128);
        let alert = enricher(None, Some(dec!(1))).enrich(&buy, None).await;
        assert_eq!(alert.usd_value, dec!(99.995));
        assert!(alert.usd_value < dec!(100));
    }

    #[tokio::test]
    async fn test_defaults_when_market_data_fails() {
        let alert = enricher(None, Some(dec!(600))).enrich(&signal(), None).await;
        assert_eq!(alert.token_symbol, "TOKEN");
        // 5e11 raw with 18 decimals
        assert_eq!(alert.token_amount, dec!(0.0000005));
        assert_eq!(alert.market_cap, MarketCap::Unknown);
        assert_eq!(alert.position, PositionChange::Unknown);
    }

    #[tokio::test]
    async fn test_snapshot_fields_are_used() {
        let snapshot = PairSnapshot {
            price_usd: Some(dec!(0.002)),
            volume_24h_usd: Some(dec!(1000)),
            market_cap_usd: None,
            token_decimals: Some(9),
            token_symbol: Some("PEPE".to_string()),
        };
        let alert = enricher(Some(snapshot), Some(dec!(600)))
            .enrich(&signal(), None)
            .await;
        assert_eq!(alert.token_symbol, "PEPE");
        assert_eq!(alert.token_amount, dec!(500));
        assert_eq!(alert.market_cap, MarketCap::Estimated(dec!(2000000000000)));
        assert_eq!(alert.volume_24h_usd, Some(dec!(1000)));
    }

    #[tokio::test]
    async fn test_price_fallback() {
        let alert = enricher(None, None).enrich(&signal(), None).await;
        assert_eq!(alert.native_usd, dec!(600));
        assert_eq!(alert.usd_value, dec!(1200));
    }

    struct BalanceChain {
        balance: Option<U256>,
        lost: CancellationToken,
    }

    impl BalanceChain {
        fn new(balance: Option<U256>) -> Self {
            Self {
                balance,
                lost: CancellationToken::new(),
            }
        }
    }

    #[async_trait]
    impl ChainClient for BalanceChain {
        fn generation(&self) -> u64 {
            1
        }
        async fn pool_tokens(&self, _pool: Address) -> RpcResult<(Address, Address)> {
            Err(RpcError::ConnectionLost)
        }
        async fn balance_of_at(&self, _t: Address, _h: Address, block: u64) -> RpcResult<U256> {
            assert_eq!(block, 99);
            self.balance.ok_or(RpcError::ConnectionLost)
        }
        async fn subscribe_swaps(&self, _pool: Address) -> RpcResult<SwapStream> {
            Err(RpcError::ConnectionLost)
        }
        fn lost_token(&self) -> CancellationToken {
            self.lost.clone()
        }
    }

    #[tokio::test]
    async fn test_position_from_prior_balance() {
        let client: Arc<dyn ChainClient> = Arc::new(BalanceChain::new(Some(U256::from(
            1_000_000_000_000u64,
        ))));
        let alert = enricher(None, Some(dec!(600)))
            .enrich(&signal(), Some(client))
            .await;
        assert_eq!(alert.position, PositionChange::Increase { pct: dec!(50.0) });
    }

    #[tokio::test]
    async fn test_position_unknown_on_read_failure() {
        let client: Arc<dyn ChainClient> = Arc::new(BalanceChain::new(None));
        let alert = enricher(None, Some(dec!(600)))
            .enrich(&signal(), Some(client))
            .await;
        assert_eq!(alert.position, PositionChange::Unknown);
    }
}
