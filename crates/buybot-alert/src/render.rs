//! Alert rendering (Telegram HTML).

use crate::gateway::LinkButton;
use buybot_core::{ChainInfo, GroupConfig, PositionChange, PremiumAlert};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::fmt::Write;

/// Upper bound on emoji glyphs in one alert.
pub const MAX_EMOJIS: usize = 50;

/// USD thresholds of the headline tiers. Each threshold is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertTiers {
    pub strong_usd: Decimal,
    pub big_usd: Decimal,
    pub whale_usd: Decimal,
}

impl Default for AlertTiers {
    fn default() -> Self {
        Self {
            strong_usd: dec!(500),
            big_usd: dec!(1000),
            whale_usd: dec!(5000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuyTier {
    New,
    Strong,
    Big,
    Whale,
}

impl BuyTier {
    pub fn headline(&self) -> &'static str {
        match self {
            Self::New => "New Buy",
            Self::Strong => "Strong Buy",
            Self::Big => "Big Buy",
            Self::Whale => "Whale Buy",
        }
    }
}

impl AlertTiers {
    pub fn tier(&self, usd: Decimal) -> BuyTier {
        if usd >= self.whale_usd {
            BuyTier::Whale
        } else if usd >= self.big_usd {
            BuyTier::Big
        } else if usd >= self.strong_usd {
            BuyTier::Strong
        } else {
            BuyTier::New
        }
    }
}

/// `min(50, floor(usd / dollars_per_emoji))` copies of `emoji`.
pub fn emoji_bar(usd: Decimal, dollars_per_emoji: Decimal, emoji: &str) -> String {
    if dollars_per_emoji <= Decimal::ZERO || usd <= Decimal::ZERO {
        return String::new();
    }
    let count = usd
        .checked_div(dollars_per_emoji)
        .map(|q| q.floor())
        .and_then(|q| q.to_usize())
        .unwrap_or(MAX_EMOJIS)
        .min(MAX_EMOJIS);
    emoji.repeat(count)
}

/// Rendered message body and its inline buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedAlert {
    pub html: String,
    pub buttons: Vec<LinkButton>,
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn group_thousands(int_part: &str) -> String {
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    format!("{sign}{out}")
}

/// Thousands-separated amount. Values below 1 keep four significant digits.
pub fn format_amount(value: Decimal) -> String {
    let rounded = if value.abs() >= Decimal::ONE {
        value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    } else {
        value.round_sf(4).unwrap_or(value)
    }
    .normalize();

    let text = rounded.to_string();
    match text.split_once('.') {
        Some((int_part, frac)) => format!("{}.{}", group_thousands(int_part), frac),
        None => group_thousands(&text),
    }
}

/// `$1.23K`, `$4.5M`, `$2B` style compact USD.
pub fn format_usd_compact(value: Decimal) -> String {
    let (scaled, suffix) = if value >= dec!(1_000_000_000) {
        (value / dec!(1_000_000_000), "B")
    } else if value >= dec!(1_000_000) {
        (value / dec!(1_000_000), "M")
    } else if value >= dec!(1_000) {
        (value / dec!(1_000), "K")
    } else {
        (value, "")
    };
    let scaled = scaled
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    format!("${scaled}{suffix}")
}

fn format_price(value: Decimal) -> String {
    if value >= Decimal::ONE {
        format!("${}", format_amount(value))
    } else {
        format!("${}", value.round_sf(4).unwrap_or(value).normalize())
    }
}

fn short_address(address: &str) -> String {
    if address.len() > 12 {
        format!("{}…{}", &address[..6], &address[address.len() - 4..])
    } else {
        address.to_string()
    }
}

fn link(url: Option<String>, label: &str) -> String {
    match url {
        Some(url) => format!("<a href=\"{}\">{}</a>", escape_html(&url), escape_html(label)),
        None => escape_html(label),
    }
}

/// Render `alert` for `group`.
pub fn render_alert(alert: &PremiumAlert, group: &GroupConfig, tiers: &AlertTiers) -> RenderedAlert {
    let chain = ChainInfo::for_chain(&alert.signal.chain);
    let symbol = escape_html(&alert.token_symbol);
    let tier = tiers.tier(alert.usd_value);
    let buyer = alert.signal.buyer_hex();
    let tx = alert.signal.tx_hex();

    let mut html = String::new();
    let _ = writeln!(html, "<b>{} {}!</b>", symbol, tier.headline());
    let bar = emoji_bar(alert.usd_value, group.dollars_per_emoji, &escape_html(&group.emoji));
    if !bar.is_empty() {
        let _ = writeln!(html, "{bar}");
    }
    html.push('\n');

    let _ = writeln!(
        html,
        "💵 Spent: <b>{} {}</b> ({})",
        format_amount(alert.base_amount),
        escape_html(&alert.native_symbol),
        format_usd_compact(alert.usd_value)
    );
    let _ = writeln!(
        html,
        "🪙 Got: <b>{} {}</b>",
        format_amount(alert.token_amount),
        symbol
    );
    let _ = writeln!(
        html,
        "👤 Buyer: {} | {}",
        link(chain.address_url(&buyer), &short_address(&buyer)),
        link(chain.tx_url(&tx), "Txn")
    );

    match alert.position {
        PositionChange::NoPriorPosition => {
            let _ = writeln!(html, "📈 Position: New Holder");
        }
        PositionChange::Increase { .. } => {
            if let Some(pct) = alert.position.display_pct() {
                let _ = writeln!(html, "📈 Position: +{pct}%");
            }
        }
        PositionChange::Unknown => {}
    }

    if let Some(price) = alert.price_usd {
        let _ = writeln!(html, "💲 Price: {}", format_price(price));
    }
    if let Some(cap) = alert.market_cap.value() {
        let est = if alert.market_cap.is_estimated() { " (est.)" } else { "" };
        let _ = writeln!(html, "🏦 Market Cap: {}{est}", format_usd_compact(cap));
    }
    if let Some(volume) = alert.volume_24h_usd {
        let _ = writeln!(html, "📊 Volume 24h: {}", format_usd_compact(volume));
    }

    let mut buttons = vec![LinkButton {
        text: "📊 Chart".to_string(),
        url: chain.chart_url(&alert.signal.pool),
    }];
    if let Some((label, url)) = group.companion_link() {
        buttons.push(LinkButton {
            text: label.to_string(),
            url: url.to_string(),
        });
    }

    RenderedAlert {
        html: html.trim_end().to_string(),
        buttons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, B256, U256};
    use buybot_core::{BuySignal, ChainId, MarketCap};

    // ========================================================================
    // Tiers and emoji bar
    // ========================================================================

    #[test]
    fn test_tier_boundaries() {
        let tiers = AlertTiers::default();
        assert_eq!(tiers.tier(dec!(499.99)), BuyTier::New);
        assert_eq!(tiers.tier(dec!(500)), BuyTier::Strong);
        assert_eq!(tiers.tier(dec!(1000)), BuyTier::Big);
        assert_eq!(tiers.tier(dec!(1200)), BuyTier::Big);
        assert_eq!(tiers.tier(dec!(5000)), BuyTier::Whale);
    }

    #[test]
    fn test_emoji_bar() {
        assert_eq!(emoji_bar(dec!(220), dec!(50), "🟢"), "🟢".repeat(4));
        assert_eq!(emoji_bar(dec!(49.99), dec!(50), "🟢"), "");
        assert_eq!(emoji_bar(dec!(1000000), dec!(1), "x"), "x".repeat(50));
        assert_eq!(emoji_bar(dec!(100), Decimal::ZERO, "x"), "");
    }

    // ========================================================================
    // Formatting
    // ========================================================================

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(dec!(1234567.891)), "1,234,567.89");
        assert_eq!(format_amount(dec!(2)), "2");
        assert_eq!(format_amount(dec!(0.000123456)), "0.0001235");
        assert_eq!(format_amount(dec!(999)), "999");
    }

    #[test]
    fn test_format_usd_compact() {
        assert_eq!(format_usd_compact(dec!(1200)), "$1.2K");
        assert_eq!(format_usd_compact(dec!(2100000)), "$2.1M");
        assert_eq!(format_usd_compact(dec!(3000000000)), "$3B");
        assert_eq!(format_usd_compact(dec!(12.345)), "$12.35");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>&\"</b>"), "&lt;b&gt;&amp;&quot;&lt;/b&gt;");
    }

    // ========================================================================
    // Full render
    // ========================================================================

    fn group() -> GroupConfig {
        serde_json::from_value(serde_json::json!({
            "chain": "bsc",
            "tokenAddress": "0x1111111111111111111111111111111111111111",
            "pairAddress": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            "dollarsPerEmoji": 100,
            "emoji": "🐸",
            "linkUrl": "https://pepe.example",
            "linkLabel": "Website"
        }))
        .unwrap()
    }

    fn alert(market_cap: MarketCap, position: PositionChange) -> PremiumAlert {
        PremiumAlert {
            signal: BuySignal {
                chain: ChainId::new("bsc"),
                pool: "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_string(),
                token_address: "0x1111111111111111111111111111111111111111".to_string(),
                base_address: "0xbb4cdb9cbd36b01bd1cbaebf2de08d9173bc095c".to_string(),
                base_in: U256::from(2u64),
                token_out: U256::from(1u64),
                buyer: Address::repeat_byte(0x44),
                tx_hash: B256::repeat_byte(0x55),
                block_number: 1,
            },
            base_amount: dec!(2),
            native_symbol: "BNB".to_string(),
            native_usd: dec!(600),
            usd_value: dec!(1200),
            token_amount: dec!(500000),
            token_symbol: "PEPE".to_string(),
            price_usd: Some(dec!(0.0024)),
            market_cap,
            volume_24h_usd: Some(dec!(50000)),
            position,
        }
    }

    #[test]
    fn test_render_big_buy() {
        let rendered = render_alert(
            &alert(MarketCap::Estimated(dec!(2400000)), PositionChange::NoPriorPosition),
            &group(),
            &AlertTiers::default(),
        );
        assert!(rendered.html.starts_with("<b>PEPE Big Buy!</b>\n🐸🐸🐸🐸🐸🐸🐸🐸🐸🐸🐸🐸\n"));
        assert!(rendered.html.contains("Spent: <b>2 BNB</b> ($1.2K)"));
        assert!(rendered.html.contains("Got: <b>500,000 PEPE</b>"));
        assert!(rendered.html.contains("https://bscscan.com/tx/0x5555"));
        assert!(rendered.html.contains("Position: New Holder"));
        assert!(rendered.html.contains("Market Cap: $2.4M (est.)"));
        assert!(rendered.html.contains("Price: $0.0024"));
        assert_eq!(rendered.buttons.len(), 2);
        assert_eq!(
            rendered.buttons[0].url,
            "https://dexscreener.com/bsc/0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
        );
        assert_eq!(rendered.buttons[1].text, "Website");
    }

    #[test]
    fn test_render_position_and_reported_cap() {
        let rendered = render_alert(
            &alert(
                MarketCap::Reported(dec!(2400000)),
                PositionChange::Increase { pct: dec!(66.7) },
            ),
            &group(),
            &AlertTiers::default(),
        );
        assert!(rendered.html.contains("Position: +67%"));
        assert!(rendered.html.contains("Market Cap: $2.4M\n"));
    }

    #[test]
    fn test_render_escapes_emoji() {
        let mut g = group();
        g.emoji = "<i>".to_string();
        let rendered = render_alert(
            &alert(MarketCap::Unknown, PositionChange::Unknown),
            &g,
            &AlertTiers::default(),
        );
        assert!(rendered.html.contains(&"&lt;i&gt;".repeat(12)));
        assert!(!rendered.html.contains("<i>"));
    }

    #[test]
    fn test_render_omits_unknown_position() {
        let rendered = render_alert(
            &alert(MarketCap::Unknown, PositionChange::Unknown),
            &group(),
            &AlertTiers::default(),
        );
        assert!(!rendered.html.contains("Position"));
        assert!(!rendered.html.contains("Market Cap"));
    }
}
