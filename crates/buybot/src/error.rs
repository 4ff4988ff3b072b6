//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Group config error: {0}")]
    Group(#[from] buybot_core::CoreError),

    #[error("RPC error: {0}")]
    Rpc(#[from] buybot_rpc::RpcError),

    #[error("Registry error: {0}")]
    Registry(#[from] buybot_registry::RegistryError),

    #[error("Alert error: {0}")]
    Alert(#[from] buybot_alert::AlertError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] buybot_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type AppResult<T> = Result<T, AppError>;
