//! Threshold filtering and delivery of enriched alerts.

use crate::gateway::MessageGateway;
use crate::render::{render_alert, AlertTiers};
use buybot_core::{AlertMedia, GroupConfig, GroupId, PremiumAlert};
use buybot_telemetry::Metrics;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Message shape actually sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Text,
    Image,
    Animation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent(AlertKind),
    BelowMinimum,
    AboveMaximum,
    /// Delivery failed; not retried.
    Failed,
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent(_) => "sent",
            Self::BelowMinimum => "below_min",
            Self::AboveMaximum => "above_max",
            Self::Failed => "failed",
        }
    }
}

pub struct AlertDispatcher {
    gateway: Arc<dyn MessageGateway>,
    tiers: AlertTiers,
}

impl AlertDispatcher {
    pub fn new(gateway: Arc<dyn MessageGateway>, tiers: AlertTiers) -> Self {
        Self { gateway, tiers }
    }

    /// Filter `alert` against the group's `[minBuyUsd, maxBuyUsd]` window and
    /// deliver it if it passes.
    pub async fn maybe_alert(
        &self,
        group_id: GroupId,
        config: &GroupConfig,
        alert: &PremiumAlert,
    ) -> DispatchOutcome {
        let outcome = self.dispatch(group_id, config, alert).await;
        Metrics::alert(alert.signal.chain.as_str(), outcome.as_str());
        outcome
    }

    async fn dispatch(
        &self,
        group_id: GroupId,
        config: &GroupConfig,
        alert: &PremiumAlert,
    ) -> DispatchOutcome {
        let usd = alert.usd_value;
        if usd < config.min_buy_usd {
            debug!(group_id, usd = %usd, min = %config.min_buy_usd, "Buy below minimum");
            return DispatchOutcome::BelowMinimum;
        }
        if let Some(max) = config.max_buy_usd {
            if usd > max {
                debug!(group_id, usd = %usd, max = %max, "Buy above maximum");
                return DispatchOutcome::AboveMaximum;
            }
        }

        let rendered = render_alert(alert, config, &self.tiers);
        let (kind, result) = match config.media() {
            AlertMedia::Animation(media) => (
                AlertKind::Animation,
                self.gateway
                    .send_animation(group_id, &media, &rendered.html, &rendered.buttons)
                    .await,
            ),
            AlertMedia::Image(media) => (
                AlertKind::Image,
                self.gateway
                    .send_image(group_id, &media, &rendered.html, &rendered.buttons)
                    .await,
            ),
            AlertMedia::None => (
                AlertKind::Text,
                self.gateway
                    .send_text(group_id, &rendered.html, &rendered.buttons)
                    .await,
            ),
        };

        match result {
            Ok(()) => {
                info!(
                    group_id,
                    chain = %alert.signal.chain,
                    tx = %alert.signal.tx_hex(),
                    usd = %usd,
                    kind = ?kind,
                    "Buy alert sent"
                );
                DispatchOutcome::Sent(kind)
            }
            Err(e) => {
                Metrics::upstream_failure("gateway");
                warn!(group_id, error = %e, "Buy alert delivery failed");
                DispatchOutcome::Failed
            }
        }
    }
}
