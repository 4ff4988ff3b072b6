//! Market-data provider: pool listings and pair snapshots.
//!
//! The GeckoTerminal v2 adapter parses responses best-effort from
//! `serde_json::Value`; any field it cannot read is reported as missing and
//! the caller falls back to its defaults.

use crate::error::{RegistryError, RegistryResult};
use async_trait::async_trait;
use buybot_core::{normalize_address, ChainId, ChainInfo};
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub const GECKOTERMINAL_API: &str = "https://api.geckoterminal.com/api/v2";

/// A pool trading the token, with its liquidity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolLiquidity {
    pub address: String,
    pub liquidity_usd: Decimal,
}

/// Point-in-time market figures for a pair, from the tracked token's side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairSnapshot {
    pub price_usd: Option<Decimal>,
    pub volume_24h_usd: Option<Decimal>,
    pub market_cap_usd: Option<Decimal>,
    pub token_decimals: Option<u8>,
    pub token_symbol: Option<String>,
}

#[async_trait]
pub trait MarketData: Send + Sync {
    /// All known pools trading `token` on `chain`.
    async fn list_pools(&self, chain: &ChainId, token: &str) -> RegistryResult<Vec<PoolLiquidity>>;

    /// Snapshot of `pool` as seen from `token`.
    async fn pair_snapshot(
        &self,
        chain: &ChainId,
        pool: &str,
        token: &str,
    ) -> RegistryResult<PairSnapshot>;
}

/// GeckoTerminal v2 REST client.
pub struct GeckoTerminalClient {
    client: Client,
    base_url: String,
}

impl GeckoTerminalClient {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> RegistryResult<Self> {
        let client = Client::builder()
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .map_err(|e| RegistryError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, url: &str) -> RegistryResult<Value> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| RegistryError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::HttpClient(format!("HTTP {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| RegistryError::HttpClient(format!("Failed to parse response: {e}")))
    }
}

#[async_trait]
impl MarketData for GeckoTerminalClient {
    async fn list_pools(&self, chain: &ChainId, token: &str) -> RegistryResult<Vec<PoolLiquidity>> {
        let network = ChainInfo::for_chain(chain).market_network;
        let url = format!(
            "{}/networks/{}/tokens/{}/pools?page=1",
            self.base_url,
            network,
            normalize_address(token)
        );
        let body = self.get_json(&url).await?;
        let pools = parse_pools(&body)?;
        debug!(chain = %chain, token, count = pools.len(), "Fetched token pools");
        Ok(pools)
    }

    async fn pair_snapshot(
        &self,
        chain: &ChainId,
        pool: &str,
        token: &str,
    ) -> RegistryResult<PairSnapshot> {
        let network = ChainInfo::for_chain(chain).market_network;
        let url = format!(
            "{}/networks/{}/pools/{}?include=base_token,quote_token",
            self.base_url,
            network,
            normalize_address(pool)
        );
        let body = self.get_json(&url).await?;
        Ok(parse_pair_snapshot(&body, token))
    }
}

/// Decimal from a JSON string or number.
fn json_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s.trim())
            .or_else(|_| Decimal::from_scientific(s.trim()))
            .ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        _ => None,
    }
}

/// Parse `GET /networks/{net}/tokens/{token}/pools`.
pub fn parse_pools(body: &Value) -> RegistryResult<Vec<PoolLiquidity>> {
    let data = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| RegistryError::ParseError("pools response has no data array".to_string()))?;

    Ok(data
        .iter()
        .filter_map(|entry| {
            let attrs = entry.get("attributes")?;
            let address = attrs.get("address")?.as_str()?;
            let liquidity_usd = attrs
                .get("reserve_in_usd")
                .and_then(json_decimal)
                .unwrap_or(Decimal::ZERO);
            Some(PoolLiquidity {
                address: normalize_address(address),
                liquidity_usd,
            })
        })
        .collect())
}

/// Address part of a `"{network}_{address}"` relationship id.
fn relationship_address(attrs_parent: &Value, side: &str) -> Option<String> {
    let id = attrs_parent
        .get("relationships")?
        .get(side)?
        .get("data")?
        .get("id")?
        .as_str()?;
    let address = id.rsplit_once('_').map(|(_, a)| a).unwrap_or(id);
    Some(normalize_address(address))
}

/// Parse `GET /networks/{net}/pools/{pool}?include=base_token,quote_token`.
pub fn parse_pair_snapshot(body: &Value, token: &str) -> PairSnapshot {
    let token = normalize_address(token);
    let Some(data) = body.get("data") else {
        return PairSnapshot::default();
    };
    let attrs = data.get("attributes").cloned().unwrap_or(Value::Null);

    let tracked_is_quote = relationship_address(data, "quote_token").as_deref() == Some(&token)
        && relationship_address(data, "base_token").as_deref() != Some(&token);
    let price_field = if tracked_is_quote {
        "quote_token_price_usd"
    } else {
        "base_token_price_usd"
    };

    let token_attrs = body
        .get("included")
        .and_then(Value::as_array)
        .and_then(|included| {
            included.iter().find_map(|item| {
                let a = item.get("attributes")?;
                let address = a.get("address")?.as_str()?;
                (normalize_address(address) == token).then_some(a)
            })
        });

    PairSnapshot {
        price_usd: attrs.get(price_field).and_then(json_decimal),
        volume_24h_usd: attrs
            .get("volume_usd")
            .and_then(|v| v.get("h24"))
            .and_then(json_decimal),
        market_cap_usd: attrs
            .get("market_cap_usd")
            .and_then(json_decimal)
            .filter(|v| !v.is_zero()),
        token_decimals: token_attrs
            .and_then(|a| a.get("decimals"))
            .and_then(Value::as_u64)
            .and_then(|d| u8::try_from(d).ok()),
        token_symbol: token_attrs
            .and_then(|a| a.get("symbol"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    }
}
