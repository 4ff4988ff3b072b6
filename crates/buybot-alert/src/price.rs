//! Native asset USD prices.

use crate::error::{AlertError, AlertResult};
use async_trait::async_trait;
use buybot_core::ChainInfo;
use buybot_telemetry::Metrics;
use dashmap::DashMap;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub const BINANCE_API: &str = "https://api.binance.com";

/// Source of USD prices for native assets (BNB, ETH, ...).
#[async_trait]
pub trait NativePriceSource: Send + Sync {
    async fn usd_price(&self, symbol: &str) -> AlertResult<Decimal>;
}

/// Binance spot ticker (`/api/v3/ticker/price?symbol=BNBUSDT`).
pub struct BinancePriceSource {
    client: Client,
    base_url: String,
}

impl BinancePriceSource {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> AlertResult<Self> {
        let client = Client::builder()
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .map_err(|e| AlertError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl NativePriceSource for BinancePriceSource {
    async fn usd_price(&self, symbol: &str) -> AlertResult<Decimal> {
        let pair = format!("{}USDT", symbol.to_ascii_uppercase());
        let url = format!("{}/api/v3/ticker/price?symbol={}", self.base_url, pair);
        let unavailable = |reason: String| AlertError::PriceUnavailable {
            symbol: symbol.to_string(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| unavailable(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("HTTP {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| unavailable(format!("Failed to parse response: {e}")))?;

        parse_ticker_price(&body).ok_or_else(|| unavailable("missing price field".to_string()))
    }
}

/// `{"symbol":"BNBUSDT","price":"600.12000000"}` -> 600.12
pub fn parse_ticker_price(body: &Value) -> Option<Decimal> {
    let price = body.get("price")?.as_str()?;
    Decimal::from_str(price)
        .ok()
        .map(|d| d.normalize())
        .filter(|d| *d > Decimal::ZERO)
}

/// Where a native price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceOrigin {
    Live,
    LastKnown,
    Fallback,
}

/// Price lookups with last-known-good and per-chain fallback.
pub struct NativePriceCache {
    source: Arc<dyn NativePriceSource>,
    last_known: DashMap<String, Decimal>,
}

impl NativePriceCache {
    pub fn new(source: Arc<dyn NativePriceSource>) -> Self {
        Self {
            source,
            last_known: DashMap::new(),
        }
    }

    /// USD price of the chain's native asset. Never fails.
    pub async fn price_for(&self, chain: &ChainInfo) -> (Decimal, PriceOrigin) {
        let symbol = chain.native_symbol.to_ascii_uppercase();
        match self.source.usd_price(&symbol).await {
            Ok(price) => {
                self.last_known.insert(symbol, price);
                (price, PriceOrigin::Live)
            }
            Err(e) => {
                Metrics::upstream_failure("price");
                if let Some(price) = self.last_known.get(&symbol).map(|p| *p) {
                    debug!(symbol = %symbol, error = %e, "Using last known native price");
                    (price, PriceOrigin::LastKnown)
                } else {
                    warn!(
                        symbol = %symbol,
                        error = %e,
                        fallback = %chain.fallback_native_usd,
                        "Native price unavailable, using fallback"
                    );
                    (chain.fallback_native_usd, PriceOrigin::Fallback)
                }
            }
        }
    }
}
