//! Pool discovery and subscription management.
//!
//! - `ChainConnectionPool`: one lazily created connection per chain, replaced
//!   with a new generation once lost
//! - `SubscriptionRegistry`: at most one swap subscription per (chain, pool)
//! - `MarketData`: pool listing and pair snapshots from the market-data provider
//! - `rank_pools`: liquidity filtering and deterministic ordering for discovery

pub mod connection_pool;
pub mod discovery;
pub mod error;
pub mod market_data;
pub mod subscriptions;

#[cfg(test)]
pub(crate) mod testing;

pub use connection_pool::{ChainConnectionPool, ChainStatus};
pub use discovery::rank_pools;
pub use error::{RegistryError, RegistryResult};
pub use market_data::{GeckoTerminalClient, MarketData, PairSnapshot, PoolLiquidity};
pub use subscriptions::{PoolSubscription, SubscribeOutcome, SubscriptionRegistry};
