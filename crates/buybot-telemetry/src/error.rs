//! Telemetry error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Logging initialization failed: {0}")]
    LoggingInit(String),

    #[error("Metrics encoding failed: {0}")]
    Encode(String),

    #[error("Metrics server failed on port {port}: {source}")]
    Server {
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

pub type TelemetryResult<T> = Result<T, TelemetryError>;
