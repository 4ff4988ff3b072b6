//! `/metrics` HTTP exporter.

use crate::error::{TelemetryError, TelemetryResult};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, TextEncoder};
use std::net::SocketAddr;
use tracing::{info, warn};

/// Prometheus text exposition of every registered metric.
pub fn render_metrics() -> TelemetryResult<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| TelemetryError::Encode(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::Encode(e.to_string()))
}

async fn metrics_handler() -> impl IntoResponse {
    match render_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub fn router() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Serve `/metrics` on `0.0.0.0:port` until the task is dropped.
pub async fn serve_metrics(port: u16) -> TelemetryResult<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "Starting metrics server");

    let server_error = |source: std::io::Error| TelemetryError::Server { port, source };
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(server_error)?;
    axum::serve(listener, router()).await.map_err(server_error)?;

    Ok(())
}
