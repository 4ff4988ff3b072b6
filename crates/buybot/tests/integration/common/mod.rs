//! Shared fixtures for integration tests.

#![allow(dead_code)]

pub mod chain;
pub mod gateway;
pub mod market;

use alloy::primitives::{Address, B256, U256};
use buybot::{BuyBot, DiscoverySettings, GroupStore};
use buybot_alert::{
    AlertDispatcher, AlertResult, AlertTiers, Enricher, EnrichmentConfig, NativePriceCache,
    NativePriceSource,
};
use buybot_core::{GroupConfig, GroupId, PoolSwap, SwapEvent};
use buybot_registry::{ChainConnectionPool, SubscriptionRegistry};
use chain::FakeChain;
use gateway::RecordingGateway;
use market::FakeMarket;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const TOKEN: &str = "0x1111111111111111111111111111111111111111";
pub const WBNB: &str = "0xbb4cdb9cbd36b01bd1cbaebf2de08d9173bc095c";
pub const P1: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const P2: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
pub const P3: &str = "0xcccccccccccccccccccccccccccccccccccccccc";
pub const BUYER: &str = "0x4444444444444444444444444444444444444444";

/// One ether-style unit (1e18 raw).
pub const UNIT: u128 = 1_000_000_000_000_000_000;

pub fn addr(s: &str) -> Address {
    Address::from_str(s).unwrap()
}

pub fn group(id: GroupId, chain: &str, token: &str, pair: &str) -> GroupConfig {
    let mut g: GroupConfig = serde_json::from_value(serde_json::json!({
        "chain": chain,
        "tokenAddress": token,
        "pairAddress": pair,
    }))
    .unwrap();
    g.group_id = id;
    g
}

/// A swap with the given in/out amounts (token0 first).
pub fn swap_event(amounts: [u128; 4], tx: u8, log_index: u64) -> SwapEvent {
    SwapEvent {
        amount0_in: U256::from(amounts[0]),
        amount1_in: U256::from(amounts[1]),
        amount0_out: U256::from(amounts[2]),
        amount1_out: U256::from(amounts[3]),
        to: addr(BUYER),
        tx_hash: B256::repeat_byte(tx),
        block_number: 100,
        log_index,
    }
}

/// Native price source with a fixed USD price.
pub struct FixedPrice(pub Decimal);

#[async_trait::async_trait]
impl NativePriceSource for FixedPrice {
    async fn usd_price(&self, _symbol: &str) -> AlertResult<Decimal> {
        Ok(self.0)
    }
}

pub struct Harness {
    pub bot: Arc<BuyBot>,
    pub chain: Arc<FakeChain>,
    pub market: Arc<FakeMarket>,
    pub gateway: Arc<RecordingGateway>,
    pub swap_rx: mpsc::Receiver<PoolSwap>,
}

pub fn harness(groups: Vec<GroupConfig>) -> Harness {
    harness_with(groups, DiscoverySettings::default())
}

pub fn harness_with(groups: Vec<GroupConfig>, discovery: DiscoverySettings) -> Harness {
    harness_from_store(GroupStore::from_groups(groups), discovery)
}

pub fn harness_from_store(store: GroupStore, discovery: DiscoverySettings) -> Harness {
    let chain = Arc::new(FakeChain::default());
    let market = Arc::new(FakeMarket::default());
    let gateway = Arc::new(RecordingGateway::default());

    let connections = Arc::new(ChainConnectionPool::new(chain.clone()));
    let (swap_tx, swap_rx) = mpsc::channel(64);
    let registry = Arc::new(SubscriptionRegistry::new(connections, swap_tx));

    let prices = Arc::new(NativePriceCache::new(Arc::new(FixedPrice(Decimal::from(600)))));
    let enricher = Arc::new(Enricher::new(
        market.clone(),
        prices,
        EnrichmentConfig::default(),
    ));
    let dispatcher = Arc::new(AlertDispatcher::new(gateway.clone(), AlertTiers::default()));

    let bot = Arc::new(BuyBot::new(
        Arc::new(store),
        registry,
        market.clone(),
        enricher,
        dispatcher,
        discovery,
        1000,
    ));

    Harness {
        bot,
        chain,
        market,
        gateway,
        swap_rx,
    }
}

/// Next swap forwarded by a subscription, or panic after two seconds.
pub async fn next_swap(rx: &mut mpsc::Receiver<PoolSwap>) -> PoolSwap {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("no swap forwarded within timeout")
        .expect("swap channel closed")
}
