//! In-process chain: pool assets, balances and swap streams.

use super::addr;
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use buybot_core::{ChainId, SwapEvent};
use buybot_rpc::{ChainClient, ChainConnector, RpcError, RpcResult, SwapStream};
use futures_util::stream;
use futures_util::StreamExt;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct State {
    pools: Mutex<HashMap<Address, (Address, Address)>>,
    balances: Mutex<HashMap<(Address, Address), U256>>,
    streams: Mutex<HashMap<Address, Vec<mpsc::UnboundedSender<SwapEvent>>>>,
    lost_tokens: Mutex<Vec<CancellationToken>>,
    balance_blocks: Mutex<Vec<u64>>,
    stalled: Mutex<HashSet<ChainId>>,
    failing_connects: AtomicUsize,
    connects: AtomicUsize,
    subscribe_calls: AtomicUsize,
}

#[derive(Default)]
pub struct FakeChain {
    state: Arc<State>,
}

impl FakeChain {
    pub fn set_pool(&self, pool: &str, token0: &str, token1: &str) {
        self.state
            .pools
            .lock()
            .insert(addr(pool), (addr(token0), addr(token1)));
    }

    pub fn set_balance(&self, token: &str, holder: &str, balance: U256) {
        self.state
            .balances
            .lock()
            .insert((addr(token), addr(holder)), balance);
    }

    /// Pool lookups on `chain` started from now on never complete.
    pub fn stall(&self, chain: &str) {
        self.state.stalled.lock().insert(ChainId::new(chain));
    }

    pub fn resume(&self, chain: &str) {
        self.state.stalled.lock().remove(&ChainId::new(chain));
    }

    pub fn fail_next_connects(&self, n: usize) {
        self.state.failing_connects.store(n, Ordering::SeqCst);
    }

    /// Push `event` to every open stream of `pool`; returns the number of streams.
    pub fn emit(&self, pool: &str, event: SwapEvent) -> usize {
        let mut streams = self.state.streams.lock();
        let Some(senders) = streams.get_mut(&addr(pool)) else {
            return 0;
        };
        senders.retain(|tx| tx.send(event.clone()).is_ok());
        senders.len()
    }

    /// Lose every open connection, as a dropped socket would.
    pub fn drop_connections(&self) {
        for token in self.state.lost_tokens.lock().drain(..) {
            token.cancel();
        }
        self.state.streams.lock().clear();
    }

    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn subscribe_calls(&self) -> usize {
        self.state.subscribe_calls.load(Ordering::SeqCst)
    }

    /// Blocks at which balances were read.
    pub fn balance_blocks(&self) -> Vec<u64> {
        self.state.balance_blocks.lock().clone()
    }
}

#[async_trait]
impl ChainConnector for FakeChain {
    async fn connect(&self, chain: &ChainId, generation: u64) -> RpcResult<Arc<dyn ChainClient>> {
        let failing = self
            .state
            .failing_connects
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(RpcError::ConnectionFailed("connection refused".to_string()));
        }
        self.state.connects.fetch_add(1, Ordering::SeqCst);

        let lost = CancellationToken::new();
        self.state.lost_tokens.lock().push(lost.clone());
        Ok(Arc::new(FakeClient {
            chain: chain.clone(),
            generation,
            state: self.state.clone(),
            lost,
        }))
    }
}

struct FakeClient {
    chain: ChainId,
    generation: u64,
    state: Arc<State>,
    lost: CancellationToken,
}

#[async_trait]
impl ChainClient for FakeClient {
    fn generation(&self) -> u64 {
        self.generation
    }

    async fn pool_tokens(&self, pool: Address) -> RpcResult<(Address, Address)> {
        let stalled = self.state.stalled.lock().contains(&self.chain);
        if stalled {
            std::future::pending::<()>().await;
        }
        self.state
            .pools
            .lock()
            .get(&pool)
            .copied()
            .ok_or_else(|| RpcError::ConnectionFailed("execution reverted".to_string()))
    }

    async fn balance_of_at(&self, token: Address, holder: Address, block: u64) -> RpcResult<U256> {
        self.state.balance_blocks.lock().push(block);
        Ok(self
            .state
            .balances
            .lock()
            .get(&(token, holder))
            .copied()
            .unwrap_or(U256::ZERO))
    }

    async fn subscribe_swaps(&self, pool: Address) -> RpcResult<SwapStream> {
        self.state.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.streams.lock().entry(pool).or_default().push(tx);
        Ok(stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|e| (e, rx)) }).boxed())
    }

    fn lost_token(&self) -> CancellationToken {
        self.lost.clone()
    }
}
