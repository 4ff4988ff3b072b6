//! Prometheus metrics for the buy alert pipeline.
//!
//! Covers:
//! - Swap intake and buy classification
//! - Alert outcomes and delivery
//! - Upstream (RPC, market data, price, gateway, groups file) failures
//! - Chain connection state and subscription counts
//! - Per-chain resync pass duration and timeouts
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. Registration only fails
//! on duplicate metric names, which is a programming error caught at startup.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge_vec, HistogramVec,
    IntCounterVec, IntGaugeVec,
};

/// Swaps received from subscriptions.
pub static SWAPS_RECEIVED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "buybot_swaps_received_total",
        "Total swap events received",
        &["chain"]
    )
    .unwrap()
});

/// Swaps classified as buys of a tracked token.
pub static BUYS_DETECTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "buybot_buys_detected_total",
        "Total swaps classified as buys",
        &["chain"]
    )
    .unwrap()
});

/// Duplicate swap deliveries suppressed.
pub static DUPLICATE_SWAPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "buybot_duplicate_swaps_total",
        "Swap events dropped as duplicates",
        &["chain"]
    )
    .unwrap()
});

/// Alert outcomes per group.
/// Labels: outcome (sent/below_min/above_max/failed)
pub static ALERTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "buybot_alerts_total",
        "Alert dispatch outcomes",
        &["chain", "outcome"]
    )
    .unwrap()
});

/// Failed calls to external collaborators.
/// Labels: source (rpc/market_data/price/gateway/config)
pub static UPSTREAM_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "buybot_upstream_failures_total",
        "Failed calls to external services",
        &["source"]
    )
    .unwrap()
});

/// Live pool subscriptions per chain.
pub static SUBSCRIPTIONS: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "buybot_subscriptions",
        "Live pool subscriptions",
        &["chain"]
    )
    .unwrap()
});

/// Connection state per chain (1 = active state, 0 = inactive).
pub static CHAIN_STATE: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "buybot_chain_state",
        "Chain connection state (1=active, 0=inactive)",
        &["chain", "state"]
    )
    .unwrap()
});

/// Resync pass duration per chain, in seconds.
pub static RESYNC_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "buybot_resync_duration_seconds",
        "Duration of one chain's pool discovery resync pass",
        &["chain"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .unwrap()
});

/// Resync passes abandoned at their deadline.
pub static RESYNC_TIMEOUTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "buybot_resync_timeouts_total",
        "Chain resync passes that hit their deadline",
        &["chain"]
    )
    .unwrap()
});

const CHAIN_STATES: [&str; 3] = ["disconnected", "connecting", "connected"];

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    pub fn swap_received(chain: &str) {
        SWAPS_RECEIVED_TOTAL.with_label_values(&[chain]).inc();
    }

    pub fn buy_detected(chain: &str) {
        BUYS_DETECTED_TOTAL.with_label_values(&[chain]).inc();
    }

    pub fn duplicate_swap(chain: &str) {
        DUPLICATE_SWAPS_TOTAL.with_label_values(&[chain]).inc();
    }

    /// Record one dispatch outcome.
    pub fn alert(chain: &str, outcome: &str) {
        ALERTS_TOTAL.with_label_values(&[chain, outcome]).inc();
    }

    pub fn upstream_failure(source: &str) {
        UPSTREAM_FAILURES_TOTAL.with_label_values(&[source]).inc();
    }

    pub fn subscriptions_set(chain: &str, count: usize) {
        SUBSCRIPTIONS
            .with_label_values(&[chain])
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Set the chain's current state; all other states go to 0.
    pub fn chain_state_set(chain: &str, state: &str) {
        for s in CHAIN_STATES {
            CHAIN_STATE.with_label_values(&[chain, s]).set(0);
        }
        CHAIN_STATE.with_label_values(&[chain, state]).set(1);
    }

    pub fn resync_duration(chain: &str, seconds: f64) {
        RESYNC_DURATION_SECONDS
            .with_label_values(&[chain])
            .observe(seconds);
    }

    pub fn resync_timeout(chain: &str) {
        RESYNC_TIMEOUTS_TOTAL.with_label_values(&[chain]).inc();
    }
}
