//! RPC error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("No RPC endpoint configured for chain {0}")]
    NoEndpoint(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Timed out after {timeout_ms}ms: {operation}")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    #[error("Connection lost")]
    ConnectionLost,

    #[error("Transport error: {0}")]
    Transport(#[from] alloy::transports::TransportError),

    #[error("ABI decode error: {0}")]
    Decode(#[from] alloy::sol_types::Error),
}

pub type RpcResult<T> = Result<T, RpcError>;
