//! Token buy alert bot.
//!
//! Wires the pipeline together: resync loop, subscription registry, swap
//! classification, enrichment and alert dispatch.

pub mod app;
pub mod config;
pub mod error;
pub mod groups;

pub use app::{
    run_event_loop, run_resync_loop, Application, BuyBot, DiscoverySettings, ResyncReport,
    DEFAULT_CHAIN_TIMEOUT,
};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use groups::GroupStore;
