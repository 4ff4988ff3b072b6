//! Prometheus metrics and structured logging for the token buy alert bot.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Prometheus counters and gauges for the swap/alert pipeline
//! - `/metrics` HTTP exporter

pub mod error;
pub mod exporter;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use exporter::serve_metrics;
pub use logging::init_logging;
pub use metrics::Metrics;
