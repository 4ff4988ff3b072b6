//! Registry error types.

use buybot_rpc::RpcError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Pool {pool} could not be resolved: {reason}")]
    PoolResolution { pool: String, reason: String },

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parse error: {0}")]
    ParseError(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
