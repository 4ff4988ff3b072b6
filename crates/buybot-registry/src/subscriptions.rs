//! Pool subscription registry.
//!
//! Tracks which (chain, pool) pairs have a live swap subscription. Each
//! subscription owns a forwarding task that pushes decoded swaps, tagged with
//! the pool's asset ordering, into the processing channel.

use crate::connection_pool::{ChainConnectionPool, ChainStatus};
use crate::error::{RegistryError, RegistryResult};
use alloy::primitives::Address;
use buybot_core::{format_address, normalize_address, ChainId, PoolSwap};
use buybot_rpc::{ChainClient, RpcResult};
use futures_util::StreamExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const RESOLVE_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Result of `ensure_subscribed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// A live subscription already exists on the current connection.
    AlreadySubscribed,
    /// Another caller is resolving this pool right now.
    Pending,
    /// A new subscription was created.
    Subscribed,
}

/// A live swap subscription for one pool.
#[derive(Debug)]
pub struct PoolSubscription {
    pub pool: String,
    pub token0: String,
    pub token1: String,
    /// Connection generation the subscription was created on.
    pub generation: u64,
    task: JoinHandle<()>,
}

impl PoolSubscription {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for PoolSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

enum Entry {
    Pending,
    Live(PoolSubscription),
}

type Key = (ChainId, String);

/// Removes a `Pending` entry when dropped before being disarmed, so an
/// abandoned `ensure_subscribed` never blocks later attempts.
struct PendingGuard<'a> {
    entries: &'a Mutex<HashMap<Key, Entry>>,
    key: Key,
    armed: bool,
}

impl PendingGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut entries = self.entries.lock();
        if matches!(entries.get(&self.key), Some(Entry::Pending)) {
            entries.remove(&self.key);
        }
    }
}

pub struct SubscriptionRegistry {
    connections: Arc<ChainConnectionPool>,
    entries: Mutex<HashMap<Key, Entry>>,
    swap_tx: mpsc::Sender<PoolSwap>,
    attempts: AtomicU64,
}

impl SubscriptionRegistry {
    pub fn new(connections: Arc<ChainConnectionPool>, swap_tx: mpsc::Sender<PoolSwap>) -> Self {
        Self {
            connections,
            entries: Mutex::new(HashMap::new()),
            swap_tx,
            attempts: AtomicU64::new(0),
        }
    }

    pub fn connections(&self) -> &Arc<ChainConnectionPool> {
        &self.connections
    }

    /// Make sure `pool_address` on `chain` has a live swap subscription.
    ///
    /// `token_address` is only used to warn about pools that do not trade the
    /// tracked token.
    pub async fn ensure_subscribed(
        &self,
        chain: &ChainId,
        pool_address: &str,
        token_address: &str,
    ) -> RegistryResult<SubscribeOutcome> {
        let pool_key = normalize_address(pool_address);
        let pool = Address::from_str(&pool_key)
            .map_err(|_| RegistryError::InvalidAddress(pool_address.to_string()))?;
        let client = self.connections.get_or_create_connection(chain).await?;
        let key = (chain.clone(), pool_key.clone());

        {
            let mut entries = self.entries.lock();
            match entries.get(&key) {
                Some(Entry::Pending) => return Ok(SubscribeOutcome::Pending),
                Some(Entry::Live(sub))
                    if sub.generation == client.generation() && sub.is_running() =>
                {
                    return Ok(SubscribeOutcome::AlreadySubscribed);
                }
                Some(Entry::Live(sub)) => {
                    debug!(
                        chain = %chain,
                        pool = %pool_key,
                        stale_generation = sub.generation,
                        "Re-establishing stale subscription"
                    );
                }
                None => {}
            }
            // Replacing a stale entry drops it, which aborts its task.
            entries.insert(key.clone(), Entry::Pending);
        }
        let pending = PendingGuard {
            entries: &self.entries,
            key: key.clone(),
            armed: true,
        };

        self.attempts.fetch_add(1, Ordering::Relaxed);

        match self.subscribe(client, &key, pool, token_address).await {
            Ok(subscription) => {
                info!(
                    chain = %chain,
                    pool = %pool_key,
                    token0 = %subscription.token0,
                    token1 = %subscription.token1,
                    generation = subscription.generation,
                    "Subscribed to pool swaps"
                );
                self.entries.lock().insert(key, Entry::Live(subscription));
                pending.disarm();
                Ok(SubscribeOutcome::Subscribed)
            }
            // Dropping the guard clears the pending marker.
            Err(e) => Err(e),
        }
    }

    async fn subscribe(
        &self,
        client: Arc<dyn ChainClient>,
        key: &Key,
        pool: Address,
        token_address: &str,
    ) -> RegistryResult<PoolSubscription> {
        let (chain, pool_key) = key;
        let (token0, token1) = resolve_tokens(client.as_ref(), pool)
            .await
            .map_err(|e| RegistryError::PoolResolution {
                pool: pool_key.clone(),
                reason: e.to_string(),
            })?;
        let token0 = format_address(&token0);
        let token1 = format_address(&token1);

        let tracked = normalize_address(token_address);
        if !tracked.is_empty() && token0 != tracked && token1 != tracked {
            warn!(
                chain = %chain,
                pool = %pool_key,
                token = %tracked,
                "Pool does not trade the tracked token"
            );
        }

        let mut stream = client.subscribe_swaps(pool).await?;
        let generation = client.generation();
        let lost = client.lost_token();
        let tx = self.swap_tx.clone();
        let (task_chain, task_pool) = (chain.clone(), pool_key.clone());
        let (task_token0, task_token1) = (token0.clone(), token1.clone());

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = lost.cancelled() => {
                        debug!(chain = %task_chain, pool = %task_pool, "Connection lost, stopping swap forwarder");
                        break;
                    }
                    next = stream.next() => match next {
                        Some(event) => {
                            let swap = PoolSwap {
                                chain: task_chain.clone(),
                                pool: task_pool.clone(),
                                token0: task_token0.clone(),
                                token1: task_token1.clone(),
                                event,
                            };
                            if tx.send(swap).await.is_err() {
                                debug!(pool = %task_pool, "Swap receiver closed");
                                break;
                            }
                        }
                        None => {
                            warn!(
                                chain = %task_chain,
                                pool = %task_pool,
                                "Swap stream ended, marking connection lost"
                            );
                            client.mark_lost();
                            break;
                        }
                    }
                }
            }
        });

        Ok(PoolSubscription {
            pool: pool_key.clone(),
            token0,
            token1,
            generation,
            task,
        })
    }

    /// Live subscriptions on `chain` that belong to its current connection.
    pub fn subscription_count(&self, chain: &ChainId) -> usize {
        let generation = self.connections.generation(chain);
        self.entries
            .lock()
            .iter()
            .filter(|((c, _), entry)| {
                c == chain
                    && matches!(entry, Entry::Live(sub) if sub.generation == generation && sub.is_running())
            })
            .count()
    }

    pub fn is_subscribed(&self, chain: &ChainId, pool: &str) -> bool {
        let key = (chain.clone(), normalize_address(pool));
        let generation = self.connections.generation(chain);
        matches!(
            self.entries.lock().get(&key),
            Some(Entry::Live(sub)) if sub.generation == generation && sub.is_running()
        )
    }

    pub fn chain_status(&self, chain: &ChainId) -> ChainStatus {
        ChainStatus {
            state: self.connections.state(chain),
            subscriptions: self.subscription_count(chain),
        }
    }

    /// Total subscription attempts made so far (including failed ones).
    pub fn subscribe_attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }
}

/// `token0()` / `token1()` with one retry.
async fn resolve_tokens(client: &dyn ChainClient, pool: Address) -> RpcResult<(Address, Address)> {
    match client.pool_tokens(pool).await {
        Ok(tokens) => Ok(tokens),
        Err(e) => {
            debug!(pool = %pool, error = %e, "Pool token lookup failed, retrying once");
            tokio::time::sleep(RESOLVE_RETRY_DELAY).await;
            client.pool_tokens(pool).await
        }
    }
}
