//! In-process market-data provider.

use async_trait::async_trait;
use buybot_core::{normalize_address, ChainId};
use buybot_registry::{MarketData, PairSnapshot, PoolLiquidity, RegistryError, RegistryResult};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Default)]
pub struct FakeMarket {
    pools: Mutex<HashMap<String, Vec<PoolLiquidity>>>,
    snapshot: Mutex<PairSnapshot>,
    failing: AtomicBool,
    list_calls: AtomicUsize,
}

pub fn pool(address: &str, liquidity_usd: u64) -> PoolLiquidity {
    PoolLiquidity {
        address: address.to_string(),
        liquidity_usd: Decimal::from(liquidity_usd),
    }
}

impl FakeMarket {
    pub fn set_pools(&self, token: &str, pools: Vec<PoolLiquidity>) {
        self.pools.lock().insert(normalize_address(token), pools);
    }

    pub fn set_snapshot(&self, snapshot: PairSnapshot) {
        *self.snapshot.lock() = snapshot;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketData for FakeMarket {
    async fn list_pools(&self, _chain: &ChainId, token: &str) -> RegistryResult<Vec<PoolLiquidity>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RegistryError::HttpClient("HTTP 429".to_string()));
        }
        Ok(self
            .pools
            .lock()
            .get(&normalize_address(token))
            .cloned()
            .unwrap_or_default())
    }

    async fn pair_snapshot(
        &self,
        _chain: &ChainId,
        _pool: &str,
        _token: &str,
    ) -> RegistryResult<PairSnapshot> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RegistryError::HttpClient("HTTP 429".to_string()));
        }
        Ok(self.snapshot.lock().clone())
    }
}
