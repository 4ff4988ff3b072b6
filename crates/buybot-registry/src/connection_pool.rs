//! Chain connection pool.
//!
//! Holds at most one live `ChainClient` per chain. A handle that reports loss
//! is discarded on the next `get_or_create_connection`, which opens a fresh
//! connection with the next generation number.

use crate::error::RegistryResult;
use buybot_core::ChainId;
use buybot_rpc::{ChainClient, ChainConnector, ConnectionState};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Connection state of a chain together with its live subscription count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainStatus {
    pub state: ConnectionState,
    pub subscriptions: usize,
}

impl fmt::Display for ChainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state {
            ConnectionState::Connected => write!(f, "Subscribed({})", self.subscriptions),
            other => write!(f, "{other}"),
        }
    }
}

struct ChainSlot {
    state: ConnectionState,
    generation: u64,
    client: Option<Arc<dyn ChainClient>>,
}

impl ChainSlot {
    fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            generation: 0,
            client: None,
        }
    }

    fn healthy(&self) -> Option<Arc<dyn ChainClient>> {
        self.client.as_ref().filter(|c| !c.is_lost()).cloned()
    }
}

pub struct ChainConnectionPool {
    connector: Arc<dyn ChainConnector>,
    slots: Mutex<HashMap<ChainId, ChainSlot>>,
    /// Serialises connection attempts per chain.
    connect_locks: DashMap<ChainId, Arc<tokio::sync::Mutex<()>>>,
}

impl ChainConnectionPool {
    pub fn new(connector: Arc<dyn ChainConnector>) -> Self {
        Self {
            connector,
            slots: Mutex::new(HashMap::new()),
            connect_locks: DashMap::new(),
        }
    }

    /// Return the healthy cached handle for `chain` or open a new one.
    pub async fn get_or_create_connection(
        &self,
        chain: &ChainId,
    ) -> RegistryResult<Arc<dyn ChainClient>> {
        if let Some(client) = self.current(chain) {
            return Ok(client);
        }

        let lock = self
            .connect_locks
            .entry(chain.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Another caller may have connected while we waited.
        let generation = {
            let mut slots = self.slots.lock();
            let slot = slots.entry(chain.clone()).or_insert_with(ChainSlot::new);
            if let Some(client) = slot.healthy() {
                return Ok(client);
            }
            if let Some(lost) = slot.client.take() {
                warn!(
                    chain = %chain,
                    generation = lost.generation(),
                    "Discarding lost chain connection"
                );
            }
            slot.generation += 1;
            slot.state = ConnectionState::Connecting;
            slot.generation
        };

        let result = self.connector.connect(chain, generation).await;

        let mut slots = self.slots.lock();
        let slot = slots.entry(chain.clone()).or_insert_with(ChainSlot::new);
        match result {
            Ok(client) => {
                slot.client = Some(client.clone());
                slot.state = ConnectionState::Connected;
                info!(chain = %chain, generation, "Chain connection ready");
                Ok(client)
            }
            Err(e) => {
                slot.state = ConnectionState::Disconnected;
                Err(e.into())
            }
        }
    }

    /// Healthy cached handle, without connecting.
    pub fn current(&self, chain: &ChainId) -> Option<Arc<dyn ChainClient>> {
        self.slots.lock().get(chain).and_then(ChainSlot::healthy)
    }

    pub fn state(&self, chain: &ChainId) -> ConnectionState {
        let slots = self.slots.lock();
        match slots.get(chain) {
            Some(slot) if slot.state == ConnectionState::Connected && slot.healthy().is_none() => {
                ConnectionState::Disconnected
            }
            Some(slot) => slot.state,
            None => ConnectionState::Disconnected,
        }
    }

    /// Generation of the most recent connection attempt for `chain`.
    pub fn generation(&self, chain: &ChainId) -> u64 {
        self.slots.lock().get(chain).map_or(0, |s| s.generation)
    }
}
