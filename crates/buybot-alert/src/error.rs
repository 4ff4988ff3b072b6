//! Alert error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Price unavailable for {symbol}: {reason}")]
    PriceUnavailable { symbol: String, reason: String },

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Invalid button url: {0}")]
    InvalidUrl(String),
}

pub type AlertResult<T> = Result<T, AlertError>;
