//! Buy alert enrichment, rendering and delivery.
//!
//! Turns a classified `BuySignal` into a `PremiumAlert` (USD value, decimal
//! amounts, market figures, position change), filters it against the group's
//! thresholds and delivers it through the messaging gateway.

pub mod dispatcher;
pub mod enrichment;
pub mod error;
pub mod gateway;
pub mod price;
pub mod render;

pub use dispatcher::{AlertDispatcher, AlertKind, DispatchOutcome};
pub use enrichment::{Enricher, EnrichmentConfig};
pub use error::{AlertError, AlertResult};
pub use gateway::{LinkButton, MessageGateway, TelegramGateway};
pub use price::{BinancePriceSource, NativePriceCache, NativePriceSource, PriceOrigin};
pub use render::{emoji_bar, render_alert, AlertTiers, BuyTier, RenderedAlert};
