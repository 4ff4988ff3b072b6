//! Chain client trait and alloy implementation.

use crate::contracts::{decode_swap, swap_filter, IUniswapV2Pair, IERC20};
use crate::error::{RpcError, RpcResult};
use crate::state::Transport;
use alloy::eips::BlockId;
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use alloy::transports::BoxTransport;
use async_trait::async_trait;
use buybot_core::{ChainId, SwapEvent};
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Stream of decoded swaps of one pool.
pub type SwapStream = BoxStream<'static, SwapEvent>;

/// One live connection to a chain.
///
/// A handle is never repaired in place: once lost it stays lost and the
/// owner replaces it with a fresh one carrying a higher generation.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Connection generation this handle was created on.
    fn generation(&self) -> u64;

    /// Resolve a pair's `(token0, token1)`.
    async fn pool_tokens(&self, pool: Address) -> RpcResult<(Address, Address)>;

    /// ERC-20 balance of `holder` as of `block`.
    async fn balance_of_at(&self, token: Address, holder: Address, block: u64)
        -> RpcResult<U256>;

    /// Open a swap log stream for `pool`.
    async fn subscribe_swaps(&self, pool: Address) -> RpcResult<SwapStream>;

    /// Cancelled when the connection is considered lost.
    fn lost_token(&self) -> CancellationToken;

    fn mark_lost(&self) {
        self.lost_token().cancel();
    }

    fn is_lost(&self) -> bool {
        self.lost_token().is_cancelled()
    }
}

/// Alloy-backed chain client.
pub struct AlloyChainClient {
    chain: ChainId,
    transport: Transport,
    generation: u64,
    provider: RootProvider<BoxTransport>,
    call_timeout: Duration,
    poll_interval: Duration,
    lost: CancellationToken,
}

impl AlloyChainClient {
    pub(crate) fn new(
        chain: ChainId,
        transport: Transport,
        generation: u64,
        provider: RootProvider<BoxTransport>,
        call_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            chain,
            transport,
            generation,
            provider,
            call_timeout,
            poll_interval,
            lost: CancellationToken::new(),
        }
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> RpcResult<T>
    where
        F: Future<Output = Result<T, alloy::transports::TransportError>>,
    {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(RpcError::Timeout {
                operation,
                timeout_ms: self.call_timeout.as_millis() as u64,
            }),
        }
    }

    async fn eth_call(
        &self,
        operation: &'static str,
        to: Address,
        input: Vec<u8>,
        block: BlockId,
    ) -> RpcResult<Bytes> {
        let tx = TransactionRequest::default().to(to).input(input.into());
        self.bounded(operation, async { self.provider.call(&tx).block(block).await })
            .await
    }
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    fn generation(&self) -> u64 {
        self.generation
    }

    async fn pool_tokens(&self, pool: Address) -> RpcResult<(Address, Address)> {
        let latest = BlockId::latest();
        let (raw0, raw1) = tokio::join!(
            self.eth_call(
                "token0",
                pool,
                IUniswapV2Pair::token0Call {}.abi_encode(),
                latest
            ),
            self.eth_call(
                "token1",
                pool,
                IUniswapV2Pair::token1Call {}.abi_encode(),
                latest
            ),
        );
        let token0 = IUniswapV2Pair::token0Call::abi_decode_returns(&raw0?, true)?._0;
        let token1 = IUniswapV2Pair::token1Call::abi_decode_returns(&raw1?, true)?._0;
        Ok((token0, token1))
    }

    async fn balance_of_at(
        &self,
        token: Address,
        holder: Address,
        block: u64,
    ) -> RpcResult<U256> {
        let call = IERC20::balanceOfCall { account: holder };
        let raw = self
            .eth_call("balanceOf", token, call.abi_encode(), BlockId::number(block))
            .await?;
        Ok(IERC20::balanceOfCall::abi_decode_returns(&raw, true)?._0)
    }

    async fn subscribe_swaps(&self, pool: Address) -> RpcResult<SwapStream> {
        if self.is_lost() {
            return Err(RpcError::ConnectionLost);
        }

        let filter = swap_filter(pool);
        let stream: SwapStream = match self.transport {
            Transport::Streaming => {
                let subscription = self
                    .bounded("eth_subscribe", self.provider.subscribe_logs(&filter))
                    .await?;
                subscription
                    .into_stream()
                    .filter_map(|log| async move { decode_swap(&log) })
                    .boxed()
            }
            Transport::Polling => {
                let poller = self
                    .bounded("eth_newFilter", self.provider.watch_logs(&filter))
                    .await?
                    .with_poll_interval(self.poll_interval);
                poller
                    .into_stream()
                    .flat_map(stream::iter)
                    .filter_map(|log| async move {
                        let decoded = decode_swap(&log);
                        if decoded.is_none() {
                            warn!(address = %log.address(), "Skipping undecodable swap log");
                        }
                        decoded
                    })
                    .boxed()
            }
        };

        debug!(
            chain = %self.chain,
            pool = %pool,
            transport = ?self.transport,
            "Swap stream opened"
        );
        Ok(stream)
    }

    fn lost_token(&self) -> CancellationToken {
        self.lost.clone()
    }
}
