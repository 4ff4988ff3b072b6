//! Destination group configuration.
//!
//! A group subscribes to buys of one token on one chain. The configuration is
//! produced by an external setup flow and read from the groups file; the only
//! field the pipeline itself rewrites is the derived pool set.

use crate::chain::ChainId;
use crate::error::{CoreError, Result};
use crate::swap::normalize_address;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Chat id of a destination group.
pub type GroupId = i64;

fn default_dollars_per_emoji() -> Decimal {
    dec!(50)
}

fn default_emoji() -> String {
    "🟢".to_string()
}

/// Per-group alert configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupConfig {
    /// Filled from the groups file key.
    #[serde(default)]
    pub group_id: GroupId,
    pub chain: ChainId,
    pub token_address: String,
    /// Main pair. Always the first element of the pool set.
    pub pair_address: String,
    /// All tracked pools, ordered by descending liquidity.
    #[serde(default)]
    pub all_pair_addresses: Vec<String>,
    #[serde(default)]
    pub min_buy_usd: Decimal,
    #[serde(default)]
    pub max_buy_usd: Option<Decimal>,
    #[serde(default = "default_dollars_per_emoji")]
    pub dollars_per_emoji: Decimal,
    #[serde(default = "default_emoji")]
    pub emoji: String,
    #[serde(default)]
    pub animation_file_id: Option<String>,
    #[serde(default)]
    pub image_file_id: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub link_label: Option<String>,
}

/// Where a media item comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Id of a file previously uploaded to the messaging service.
    FileId(String),
    Url(String),
}

impl MediaSource {
    pub fn as_str(&self) -> &str {
        match self {
            Self::FileId(s) | Self::Url(s) => s,
        }
    }
}

/// Media attached to an alert, after priority resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertMedia {
    Animation(MediaSource),
    Image(MediaSource),
    None,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl GroupConfig {
    /// Normalised pool set with the main pair first and no duplicates.
    pub fn pool_set(&self) -> Vec<String> {
        let main = normalize_address(&self.pair_address);
        let mut pools = Vec::with_capacity(self.all_pair_addresses.len() + 1);
        if !main.is_empty() {
            pools.push(main);
        }
        for pool in &self.all_pair_addresses {
            let pool = normalize_address(pool);
            if !pool.is_empty() && !pools.contains(&pool) {
                pools.push(pool);
            }
        }
        pools
    }

    /// Replace the derived pool set. The first entry becomes the main pair.
    ///
    /// An empty list is ignored so a failed discovery never drops the main pair.
    pub fn set_pool_set(&mut self, pools: Vec<String>) {
        let mut normalized: Vec<String> = Vec::with_capacity(pools.len());
        for pool in pools {
            let pool = normalize_address(&pool);
            if !pool.is_empty() && !normalized.contains(&pool) {
                normalized.push(pool);
            }
        }
        let Some(first) = normalized.first() else {
            return;
        };
        self.pair_address = first.clone();
        self.all_pair_addresses = normalized;
    }

    /// True when only the main pair is known and discovery should run.
    pub fn needs_discovery(&self) -> bool {
        self.pool_set().len() <= 1
    }

    /// Whether `pool` (any case) belongs to this group's pool set.
    pub fn tracks_pool(&self, pool: &str) -> bool {
        let pool = normalize_address(pool);
        self.pool_set().iter().any(|p| *p == pool)
    }

    pub fn token_key(&self) -> String {
        normalize_address(&self.token_address)
    }

    /// Identity of the configured source: chain, token and configured main pair.
    ///
    /// A derived pool set is only carried across reloads while this is unchanged.
    pub fn source_key(&self) -> (ChainId, String, String) {
        (
            self.chain.clone(),
            self.token_key(),
            normalize_address(&self.pair_address),
        )
    }

    /// Media selection: uploaded animation, uploaded image, then URL.
    pub fn media(&self) -> AlertMedia {
        if let Some(id) = non_empty(&self.animation_file_id) {
            return AlertMedia::Animation(MediaSource::FileId(id.to_string()));
        }
        if let Some(id) = non_empty(&self.image_file_id) {
            return AlertMedia::Image(MediaSource::FileId(id.to_string()));
        }
        if let Some(url) = non_empty(&self.media_url) {
            let source = MediaSource::Url(url.to_string());
            return if url.to_ascii_lowercase().ends_with(".gif") {
                AlertMedia::Animation(source)
            } else {
                AlertMedia::Image(source)
            };
        }
        AlertMedia::None
    }

    /// Companion link button, if both url and label are set.
    pub fn companion_link(&self) -> Option<(&str, &str)> {
        let url = non_empty(&self.link_url)?;
        let label = non_empty(&self.link_label).unwrap_or("Website");
        Some((label, url))
    }

    pub fn validate(&self) -> Result<()> {
        if !is_hex_address(&self.token_address) {
            return Err(CoreError::InvalidAddress(self.token_address.clone()));
        }
        if !is_hex_address(&self.pair_address) {
            return Err(CoreError::InvalidAddress(self.pair_address.clone()));
        }
        if let Some(bad) = self
            .all_pair_addresses
            .iter()
            .find(|a| !is_hex_address(a))
        {
            return Err(CoreError::InvalidAddress(bad.clone()));
        }
        if self.dollars_per_emoji <= Decimal::ZERO {
            return Err(CoreError::InvalidGroup(format!(
                "group {}: dollarsPerEmoji must be positive",
                self.group_id
            )));
        }
        if self.min_buy_usd < Decimal::ZERO {
            return Err(CoreError::InvalidGroup(format!(
                "group {}: minBuyUsd must not be negative",
                self.group_id
            )));
        }
        if let Some(max) = self.max_buy_usd {
            if max < self.min_buy_usd {
                return Err(CoreError::InvalidGroup(format!(
                    "group {}: maxBuyUsd {} is below minBuyUsd {}",
                    self.group_id, max, self.min_buy_usd
                )));
            }
        }
        Ok(())
    }
}

fn is_hex_address(s: &str) -> bool {
    let s = s.trim();
    s.len() == 42
        && (s.starts_with("0x") || s.starts_with("0X"))
        && s[2..].chars().all(|c| c.is_ascii_hexdigit())
}
