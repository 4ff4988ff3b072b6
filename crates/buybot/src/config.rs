//! Application configuration.
//!
//! Loaded from a TOML file with `BUYBOT__SECTION__KEY` environment overrides
//! (e.g. `BUYBOT__TELEGRAM__BOT_TOKEN`). Groups live in a separate JSON file
//! referenced by `groups_file`.

use crate::error::{AppError, AppResult};
use buybot_alert::price::BINANCE_API;
use buybot_alert::{AlertTiers, EnrichmentConfig};
use buybot_core::{ChainId, GroupConfig};
use buybot_registry::market_data::GECKOTERMINAL_API;
use buybot_rpc::EndpointConfig;
use config::{Config, Environment, File, FileFormat};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Telegram Bot API settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
}

/// Market-data provider and pool discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDataConfig {
    #[serde(default = "default_market_data_url")]
    pub base_url: String,
    /// Pools at or below this liquidity (USD) are never tracked. Default: 1000.
    #[serde(default = "default_min_liquidity_usd")]
    pub min_liquidity_usd: Decimal,
    #[serde(default = "default_true")]
    pub discovery_enabled: bool,
    /// Re-run discovery for every group every N ticks. 0 disables.
    #[serde(default)]
    pub refresh_every_ticks: u64,
    /// Minimum ticks between discovery attempts for a group that still has
    /// a single pool. Default: 1 (every tick).
    #[serde(default = "default_retry_every_ticks")]
    pub retry_every_ticks: u64,
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_market_data_url() -> String {
    GECKOTERMINAL_API.to_string()
}

fn default_min_liquidity_usd() -> Decimal {
    Decimal::from(1000)
}

fn default_retry_every_ticks() -> u64 {
    1
}

fn default_true() -> bool {
    true
}

fn default_http_timeout_ms() -> u64 {
    10_000
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            base_url: default_market_data_url(),
            min_liquidity_usd: default_min_liquidity_usd(),
            discovery_enabled: true,
            refresh_every_ticks: 0,
            retry_every_ticks: default_retry_every_ticks(),
            timeout_ms: default_http_timeout_ms(),
        }
    }
}

/// Native asset price source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceConfig {
    #[serde(default = "default_price_url")]
    pub base_url: String,
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_price_url() -> String {
    BINANCE_API.to_string()
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            base_url: default_price_url(),
            timeout_ms: default_http_timeout_ms(),
        }
    }
}

/// Chain RPC timing shared by every chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_rpc_timeout_ms")]
    pub call_timeout_ms: u64,
    /// Log poll interval for HTTP endpoints.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_rpc_timeout_ms() -> u64 {
    8_000
}

fn default_poll_interval_ms() -> u64 {
    3_000
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_rpc_timeout_ms(),
            call_timeout_ms: default_rpc_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResyncConfig {
    #[serde(default = "default_resync_interval_secs")]
    pub interval_secs: u64,
    /// Deadline of one chain's resync pass.
    #[serde(default = "default_chain_timeout_secs")]
    pub chain_timeout_secs: u64,
}

fn default_resync_interval_secs() -> u64 {
    15
}

fn default_chain_timeout_secs() -> u64 {
    12
}

impl Default for ResyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_resync_interval_secs(),
            chain_timeout_secs: default_chain_timeout_secs(),
        }
    }
}

/// Alert tiers and pipeline buffers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    #[serde(default = "default_strong_usd")]
    pub strong_usd: Decimal,
    #[serde(default = "default_big_usd")]
    pub big_usd: Decimal,
    #[serde(default = "default_whale_usd")]
    pub whale_usd: Decimal,
    /// Capacity of the swap channel between subscriptions and the event loop.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Number of recently seen swaps remembered for duplicate suppression.
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,
}

fn default_strong_usd() -> Decimal {
    Decimal::from(500)
}

fn default_big_usd() -> Decimal {
    Decimal::from(1000)
}

fn default_whale_usd() -> Decimal {
    Decimal::from(5000)
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_dedup_capacity() -> usize {
    10_000
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            strong_usd: default_strong_usd(),
            big_usd: default_big_usd(),
            whale_usd: default_whale_usd(),
            channel_capacity: default_channel_capacity(),
            dedup_capacity: default_dedup_capacity(),
        }
    }
}

impl AlertsConfig {
    pub fn tiers(&self) -> AlertTiers {
        AlertTiers {
            strong_usd: self.strong_usd,
            big_usd: self.big_usd,
            whale_usd: self.whale_usd,
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Prometheus metrics port. 0 disables the exporter.
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: default_metrics_port(),
        }
    }
}

/// RPC endpoint of one chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainEndpoint {
    /// `wss://` streams logs, `https://` polls them.
    pub rpc_url: String,
}

fn default_groups_file() -> String {
    "config/groups.json".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub market_data: MarketDataConfig,
    #[serde(default)]
    pub prices: PriceConfig,
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub resync: ResyncConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Endpoints keyed by chain id (`bsc`, `ethereum`, ...).
    #[serde(default)]
    pub chains: BTreeMap<String, ChainEndpoint>,
    #[serde(default = "default_groups_file")]
    pub groups_file: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig::default(),
            market_data: MarketDataConfig::default(),
            prices: PriceConfig::default(),
            rpc: RpcConfig::default(),
            resync: ResyncConfig::default(),
            alerts: AlertsConfig::default(),
            telemetry: TelemetryConfig::default(),
            chains: BTreeMap::new(),
            groups_file: default_groups_file(),
        }
    }
}

impl AppConfig {
    /// Load from a TOML file, then apply `BUYBOT__*` environment overrides.
    pub fn from_file(path: &str) -> AppResult<Self> {
        Config::builder()
            .add_source(File::new(path, FileFormat::Toml))
            .add_source(
                Environment::with_prefix("BUYBOT")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .and_then(|settings| settings.try_deserialize::<Self>())
            .map_err(|e| AppError::Config(format!("Failed to load {path}: {e}")))
    }

    /// Parse a TOML document without environment overrides.
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync.interval_secs)
    }

    pub fn chain_timeout(&self) -> Duration {
        Duration::from_secs(self.resync.chain_timeout_secs)
    }

    /// Endpoint settings per chain, with the shared RPC timing applied.
    pub fn endpoints(&self) -> HashMap<ChainId, EndpointConfig> {
        self.chains
            .iter()
            .map(|(id, chain)| {
                let endpoint = EndpointConfig {
                    url: chain.rpc_url.trim().to_string(),
                    connect_timeout: Duration::from_millis(self.rpc.connect_timeout_ms),
                    call_timeout: Duration::from_millis(self.rpc.call_timeout_ms),
                    poll_interval: Duration::from_millis(self.rpc.poll_interval_ms),
                };
                (ChainId::new(id), endpoint)
            })
            .collect()
    }

    pub fn enrichment(&self) -> EnrichmentConfig {
        EnrichmentConfig {
            http_timeout: Duration::from_millis(self.market_data.timeout_ms.max(self.prices.timeout_ms)),
            rpc_timeout: Duration::from_millis(self.rpc.call_timeout_ms),
        }
    }

    /// Startup validation against the initial group set.
    pub fn validate(&self, groups: &[GroupConfig]) -> AppResult<()> {
        if self.resync.interval_secs == 0 {
            return Err(AppError::Config("resync.interval_secs must be positive".to_string()));
        }
        if self.resync.chain_timeout_secs == 0 {
            return Err(AppError::Config(
                "resync.chain_timeout_secs must be positive".to_string(),
            ));
        }
        if self.alerts.channel_capacity == 0 {
            return Err(AppError::Config("alerts.channel_capacity must be positive".to_string()));
        }
        let tiers = self.alerts.tiers();
        if !(tiers.strong_usd <= tiers.big_usd && tiers.big_usd <= tiers.whale_usd) {
            return Err(AppError::Config(
                "alerts tiers must satisfy strong_usd <= big_usd <= whale_usd".to_string(),
            ));
        }

        let endpoints = self.endpoints();
        for group in groups {
            group.validate()?;
            match endpoints.get(&group.chain) {
                Some(endpoint) if !endpoint.url.is_empty() => {}
                _ => {
                    return Err(AppError::Config(format!(
                        "group {}: no RPC endpoint configured for chain {}",
                        group.group_id, group.chain
                    )))
                }
            }
        }
        Ok(())
    }
}
