//! In-process chain fakes for registry tests.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use buybot_core::{ChainId, SwapEvent};
use buybot_rpc::{ChainClient, ChainConnector, RpcError, RpcResult, SwapStream};
use futures_util::stream;
use futures_util::StreamExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub(crate) fn addr(s: &str) -> Address {
    Address::from_str(s).unwrap()
}

#[derive(Default)]
struct FakeState {
    pool_tokens: Mutex<HashMap<Address, (Address, Address)>>,
    streams: Mutex<HashMap<Address, Vec<mpsc::UnboundedSender<SwapEvent>>>>,
    failing_lookups: AtomicUsize,
    stalled_lookups: AtomicBool,
    failing_connects: AtomicUsize,
    connects: AtomicUsize,
    subscribe_calls: AtomicUsize,
}

#[derive(Default)]
pub(crate) struct FakeConnector {
    state: Arc<FakeState>,
}

impl FakeConnector {
    pub fn set_pool_tokens(&self, pool: &str, token0: &str, token1: &str) {
        self.state
            .pool_tokens
            .lock()
            .insert(addr(pool), (addr(token0), addr(token1)));
    }

    pub fn fail_next_token_lookups(&self, n: usize) {
        self.state.failing_lookups.store(n, Ordering::SeqCst);
    }

    /// Token lookups started while stalled never complete.
    pub fn stall_token_lookups(&self, stalled: bool) {
        self.state.stalled_lookups.store(stalled, Ordering::SeqCst);
    }

    pub fn fail_next_connects(&self, n: usize) {
        self.state.failing_connects.store(n, Ordering::SeqCst);
    }

    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn subscribe_calls(&self) -> usize {
        self.state.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn emit(&self, pool: &str, event: SwapEvent) {
        if let Some(senders) = self.state.streams.lock().get(&addr(pool)) {
            for tx in senders {
                let _ = tx.send(event.clone());
            }
        }
    }

    /// Close every open swap stream, as a dropped socket would.
    pub fn end_streams(&self) {
        self.state.streams.lock().clear();
    }
}

fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl ChainConnector for FakeConnector {
    async fn connect(&self, _chain: &ChainId, generation: u64) -> RpcResult<Arc<dyn ChainClient>> {
        if take_failure(&self.state.failing_connects) {
            return Err(RpcError::ConnectionFailed("refused".to_string()));
        }
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeClient {
            generation,
            state: self.state.clone(),
            lost: CancellationToken::new(),
        }))
    }
}

struct FakeClient {
    generation: u64,
    state: Arc<FakeState>,
    lost: CancellationToken,
}

#[async_trait]
impl ChainClient for FakeClient {
    fn generation(&self) -> u64 {
        self.generation
    }

    async fn pool_tokens(&self, pool: Address) -> RpcResult<(Address, Address)> {
        if self.state.stalled_lookups.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if take_failure(&self.state.failing_lookups) {
            return Err(RpcError::ConnectionFailed("execution reverted".to_string()));
        }
        self.state
            .pool_tokens
            .lock()
            .get(&pool)
            .copied()
            .ok_or_else(|| RpcError::ConnectionFailed("not a pair".to_string()))
    }

    async fn balance_of_at(&self, _token: Address, _holder: Address, _block: u64) -> RpcResult<U256> {
        Ok(U256::ZERO)
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
