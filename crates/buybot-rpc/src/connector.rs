//! Opens chain clients from endpoint configuration.

use crate::client::{AlloyChainClient, ChainClient};
use crate::error::{RpcError, RpcResult};
use crate::state::Transport;
use alloy::providers::{Provider, ProviderBuilder};
use async_trait::async_trait;
use buybot_core::ChainId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Endpoint settings for one chain.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// `ws(s)://` for streaming, `http(s)://` for polling.
    pub url: String,
    /// Bound on connection establishment.
    pub connect_timeout: Duration,
    /// Bound on every individual call.
    pub call_timeout: Duration,
    /// Log poll interval for HTTP endpoints.
    pub poll_interval: Duration,
}

impl EndpointConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: Duration::from_secs(8),
            call_timeout: Duration::from_secs(8),
            poll_interval: Duration::from_secs(3),
        }
    }
}

/// Factory for chain clients.
#[async_trait]
pub trait ChainConnector: Send + Sync {
    /// Open a new connection for `chain`, tagged with `generation`.
    async fn connect(&self, chain: &ChainId, generation: u64)
        -> RpcResult<Arc<dyn ChainClient>>;
}

/// Connector backed by alloy providers.
pub struct AlloyConnector {
    endpoints: HashMap<ChainId, EndpointConfig>,
}

impl AlloyConnector {
    pub fn new(endpoints: HashMap<ChainId, EndpointConfig>) -> Self {
        Self { endpoints }
    }
}

#[async_trait]
impl ChainConnector for AlloyConnector {
    async fn connect(
        &self,
        chain: &ChainId,
        generation: u64,
    ) -> RpcResult<Arc<dyn ChainClient>> {
        let endpoint = self
            .endpoints
            .get(chain)
            .ok_or_else(|| RpcError::NoEndpoint(chain.to_string()))?;
        let transport = Transport::for_url(&endpoint.url);
        let timeout_ms = endpoint.connect_timeout.as_millis() as u64;

        let connect = async {
            let provider = ProviderBuilder::new().on_builtin(&endpoint.url).await?;
            // HTTP providers are lazy; one round trip proves the endpoint answers.
            let head = provider.get_block_number().await?;
            Ok::<_, alloy::transports::TransportError>((provider, head))
        };

        let (provider, head) = tokio::time::timeout(endpoint.connect_timeout, connect)
            .await
            .map_err(|_| RpcError::Timeout {
                operation: "connect",
                timeout_ms,
            })?
            .map_err(|e| RpcError::ConnectionFailed(e.to_string()))?;

        info!(
            chain = %chain,
            transport = ?transport,
            generation,
            head,
            "Chain connection established"
        );

        Ok(Arc::new(AlloyChainClient::new(
            chain.clone(),
            transport,
            generation,
            provider,
            endpoint.call_timeout,
            endpoint.poll_interval,
        )))
    }
}
