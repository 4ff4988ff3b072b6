//! Chain identifiers and per-chain metadata.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chain identifier as used in group configuration (e.g. "bsc", "ethereum").
///
/// Always stored lowercase so that map lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ChainId(String);

impl ChainId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_ascii_lowercase())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ChainId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ChainId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<ChainId> for String {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static metadata for a chain: native asset, fallback price and link targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainInfo {
    /// Native asset ticker used for the USD price lookup (e.g. "BNB").
    pub native_symbol: String,
    /// Price used when the price collaborator is unreachable and no
    /// previous price is known.
    pub fallback_native_usd: Decimal,
    /// Block explorer base URL, without trailing slash.
    pub explorer_url: String,
    /// Network slug understood by the market-data provider.
    pub market_network: String,
    /// Chain slug used for chart links.
    pub chart_slug: String,
}

impl ChainInfo {
    /// Metadata for well-known chains; unknown chains get ETH-like defaults.
    pub fn for_chain(chain: &ChainId) -> Self {
        let (symbol, fallback, explorer, network, chart) = match chain.as_str() {
            "bsc" | "bnb" => ("BNB", dec!(600), "https://bscscan.com", "bsc", "bsc"),
            "ethereum" | "eth" => (
                "ETH",
                dec!(3000),
                "https://etherscan.io",
                "eth",
                "ethereum",
            ),
            "base" => ("ETH", dec!(3000), "https://basescan.org", "base", "base"),
            "arbitrum" => (
                "ETH",
                dec!(3000),
                "https://arbiscan.io",
                "arbitrum",
                "arbitrum",
            ),
            "polygon" => (
                "POL",
                dec!(0.5),
                "https://polygonscan.com",
                "polygon_pos",
                "polygon",
            ),
            "avalanche" | "avax" => (
                "AVAX",
                dec!(30),
                "https://snowtrace.io",
                "avax",
                "avalanche",
            ),
            other => {
                return Self {
                    native_symbol: "ETH".to_string(),
                    fallback_native_usd: dec!(3000),
                    explorer_url: String::new(),
                    market_network: other.to_string(),
                    chart_slug: other.to_string(),
                }
            }
        };

        Self {
            native_symbol: symbol.to_string(),
            fallback_native_usd: fallback,
            explorer_url: explorer.to_string(),
            market_network: network.to_string(),
            chart_slug: chart.to_string(),
        }
    }

    /// Explorer link for an address, or `None` when no explorer is known.
    pub fn address_url(&self, address: &str) -> Option<String> {
        (!self.explorer_url.is_empty()).then(|| format!("{}/address/{}", self.explorer_url, address))
    }

    /// Explorer link for a transaction hash.
    pub fn tx_url(&self, tx_hash: &str) -> Option<String> {
        (!self.explorer_url.is_empty()).then(|| format!("{}/tx/{}", self.explorer_url, tx_hash))
    }

    /// Chart link for a pool.
    pub fn chart_url(&self, pool: &str) -> String {
        format!("https://dexscreener.com/{}/{}", self.chart_slug, pool)
    }
}
