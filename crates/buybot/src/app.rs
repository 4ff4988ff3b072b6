//! Main application orchestration.
//!
//! Coordinates all components:
//! - Resync: group reload, then one independent loop per chain for pool
//!   discovery and subscriptions
//! - Event loop: swap de-duplication, classification, per-group alert tasks
//! - Shutdown on Ctrl-C

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::groups::GroupStore;
use alloy::primitives::B256;
use buybot_alert::{
    AlertDispatcher, BinancePriceSource, DispatchOutcome, Enricher, NativePriceCache,
    TelegramGateway,
};
use buybot_core::{ChainId, GroupConfig, GroupId, PoolSwap};
use buybot_detector::classify;
use buybot_registry::{
    rank_pools, ChainConnectionPool, GeckoTerminalClient, MarketData, SubscribeOutcome,
    SubscriptionRegistry,
};
use buybot_rpc::AlloyConnector;
use buybot_telemetry::Metrics;
use futures_util::future::join_all;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Deadline of one chain's resync pass unless configured otherwise.
pub const DEFAULT_CHAIN_TIMEOUT: Duration = Duration::from_secs(12);

/// Pool discovery settings.
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    pub enabled: bool,
    /// Pools must have strictly more liquidity than this (USD).
    pub min_liquidity_usd: Decimal,
    /// Force rediscovery every N ticks. 0 disables.
    pub refresh_every_ticks: u64,
    /// Minimum ticks between discovery attempts for a group that still has
    /// a single pool. 1 retries every tick.
    pub retry_every_ticks: u64,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            min_liquidity_usd: Decimal::from(1000),
            refresh_every_ticks: 0,
            retry_every_ticks: 1,
        }
    }
}

/// Outcome of one resync tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResyncReport {
    pub tick: u64,
    pub chains: usize,
    pub groups: usize,
    /// Groups whose pool set changed through discovery.
    pub discovered: usize,
    /// New subscriptions created.
    pub subscribed: usize,
    /// Connection, discovery or subscription failures (retried next tick).
    pub failures: usize,
}

impl ResyncReport {
    fn merge(&mut self, other: ResyncReport) {
        self.groups += other.groups;
        self.discovered += other.discovered;
        self.subscribed += other.subscribed;
        self.failures += other.failures;
    }
}

enum Discovery {
    Updated(GroupConfig),
    Unchanged,
    Failed,
}

type SwapKey = (ChainId, (B256, u64));
type SourceKey = (ChainId, String, String);

/// Bounded set of recently processed swaps.
struct SeenSwaps {
    capacity: usize,
    keys: HashSet<SwapKey>,
    order: VecDeque<SwapKey>,
}

impl SeenSwaps {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            keys: HashSet::new(),
            order: VecDeque::new(),
        }
    }

    /// Record `key`; false if it was already present.
    fn insert(&mut self, key: SwapKey) -> bool {
        if self.keys.contains(&key) {
            return false;
        }
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.keys.remove(&oldest);
            }
        }
        self.keys.insert(key.clone());
        self.order.push_back(key);
        true
    }
}

/// Pipeline core shared by the resync and event loops.
pub struct BuyBot {
    groups: Arc<GroupStore>,
    registry: Arc<SubscriptionRegistry>,
    market: Arc<dyn MarketData>,
    enricher: Arc<Enricher>,
    dispatcher: Arc<AlertDispatcher>,
    discovery: DiscoverySettings,
    /// Last discovery attempt per group, with the source it was made for.
    discovery_attempts: Mutex<HashMap<GroupId, (SourceKey, u64)>>,
    chain_timeout: Duration,
    seen: Mutex<SeenSwaps>,
    ticks: AtomicU64,
}

impl BuyBot {
    pub fn new(
        groups: Arc<GroupStore>,
        registry: Arc<SubscriptionRegistry>,
        market: Arc<dyn MarketData>,
        enricher: Arc<Enricher>,
        dispatcher: Arc<AlertDispatcher>,
        discovery: DiscoverySettings,
        dedup_capacity: usize,
    ) -> Self {
        Self {
            groups,
            registry,
            market,
            enricher,
            dispatcher,
            discovery,
            discovery_attempts: Mutex::new(HashMap::new()),
            chain_timeout: DEFAULT_CHAIN_TIMEOUT,
            seen: Mutex::new(SeenSwaps::new(dedup_capacity)),
            ticks: AtomicU64::new(0),
        }
    }

    /// Bound each chain's resync pass by `timeout`.
    pub fn with_chain_timeout(mut self, timeout: Duration) -> Self {
        self.chain_timeout = timeout;
        self
    }

    pub fn groups(&self) -> &Arc<GroupStore> {
        &self.groups
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Re-read the groups file. On failure the current groups stay active.
    pub fn reload_groups(&self) {
        if let Err(e) = self.groups.reload() {
            Metrics::upstream_failure("config");
            warn!(error = %e, "Groups reload failed, keeping current groups");
        }
    }

    /// One resync pass over every chain: reload groups, then connect,
    /// discover and subscribe.
    ///
    /// Chains run concurrently and each is bounded by the chain timeout.
    /// Failures are logged and left for the next pass.
    pub async fn resync_once(&self) -> ResyncReport {
        let started = Instant::now();
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        self.reload_groups();

        let chains: Vec<ChainId> = self.groups.ids_by_chain().into_keys().collect();
        let mut report = ResyncReport {
            tick,
            chains: chains.len(),
            ..Default::default()
        };
        let chain_reports = join_all(chains.iter().map(|chain| self.resync_chain(chain, tick))).await;
        for chain_report in chain_reports {
            report.merge(chain_report);
        }

        info!(
            tick,
            chains = report.chains,
            groups = report.groups,
            discovered = report.discovered,
            subscribed = report.subscribed,
            failures = report.failures,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Resync complete"
        );
        report
    }

    /// One resync pass for `chain`, abandoned at the chain timeout.
    ///
    /// A pass cut short counts as one failure; whatever it did not finish is
    /// retried on the next tick.
    pub async fn resync_chain(&self, chain: &ChainId, tick: u64) -> ResyncReport {
        let started = Instant::now();
        let mut report = ResyncReport {
            tick,
            ..Default::default()
        };
        let ids = self.groups.ids_for_chain(chain);
        if ids.is_empty() {
            return report;
        }
        report.chains = 1;

        match tokio::time::timeout(self.chain_timeout, self.sync_chain(chain, ids, tick)).await {
            Ok(chain_report) => report.merge(chain_report),
            Err(_) => {
                Metrics::resync_timeout(chain.as_str());
                warn!(
                    chain = %chain,
                    tick,
                    timeout_ms = self.chain_timeout.as_millis() as u64,
                    "Chain resync timed out, retrying next tick"
                );
                report.failures += 1;
            }
        }

        let status = self.registry.chain_status(chain);
        Metrics::subscriptions_set(chain.as_str(), status.subscriptions);
        Metrics::chain_state_set(chain.as_str(), status.state.as_str());
        let elapsed = started.elapsed();
        Metrics::resync_duration(chain.as_str(), elapsed.as_secs_f64());
        debug!(
            chain = %chain,
            tick,
            status = %status,
            subscribed = report.subscribed,
            failures = report.failures,
            elapsed_ms = elapsed.as_millis() as u64,
            "Chain resync complete"
        );
        report
    }

    async fn sync_chain(&self, chain: &ChainId, ids: Vec<GroupId>, tick: u64) -> ResyncReport {
        let mut report = ResyncReport::default();

        if let Err(e) = self.registry.connections().get_or_create_connection(chain).await {
            Metrics::upstream_failure("rpc");
            warn!(chain = %chain, error = %e, "Chain connection failed, retrying next tick");
            report.failures += 1;
            return report;
        }

        for id in ids {
            let Some(group) = self.groups.get(id) else {
                continue;
            };
            report.groups += 1;

            let group = if self.should_discover(&group, tick) {
                match self.discover(&group, tick).await {
                    Discovery::Updated(updated) => {
                        report.discovered += 1;
                        updated
                    }
                    Discovery::Unchanged => group,
                    Discovery::Failed => {
                        report.failures += 1;
                        group
                    }
                }
            } else {
                group
            };

            for pool in group.pool_set() {
                match self
                    .registry
                    .ensure_subscribed(chain, &pool, &group.token_address)
                    .await
                {
                    Ok(SubscribeOutcome::Subscribed) => report.subscribed += 1,
                    Ok(SubscribeOutcome::AlreadySubscribed | SubscribeOutcome::Pending) => {}
                    Err(e) => {
                        warn!(
                            chain = %chain,
                            group_id = id,
                            pool = %pool,
                            error = %e,
                            "Subscription failed, retrying next tick"
                        );
                        report.failures += 1;
                    }
                }
            }
        }

        report
    }

    fn should_discover(&self, group: &GroupConfig, tick: u64) -> bool {
        if !self.discovery.enabled {
            return false;
        }
        let refresh = self.discovery.refresh_every_ticks;
        if refresh > 0 && tick % refresh == 0 {
            return true;
        }
        if !group.needs_discovery() {
            return false;
        }
        let retry = self.discovery.retry_every_ticks.max(1);
        match self.discovery_attempts.lock().get(&group.group_id) {
            Some((source, last)) if *source == group.source_key() => {
                tick.saturating_sub(*last) >= retry
            }
            _ => true,
        }
    }

    /// Query all pools of the group's token and replace its pool set.
    async fn discover(&self, group: &GroupConfig, tick: u64) -> Discovery {
        self.discovery_attempts
            .lock()
            .insert(group.group_id, (group.source_key(), tick));
        let pools = match self.market.list_pools(&group.chain, &group.token_address).await {
            Ok(pools) => pools,
            Err(e) => {
                Metrics::upstream_failure("market_data");
                warn!(
                    group_id = group.group_id,
                    chain = %group.chain,
                    token = %group.token_key(),
                    error = %e,
                    "Pool discovery failed"
                );
                return Discovery::Failed;
            }
        };

        let ranked = rank_pools(pools, self.discovery.min_liquidity_usd);
        if ranked.is_empty() {
            debug!(group_id = group.group_id, "Discovery found no pools above the floor");
            return Discovery::Unchanged;
        }
        if ranked == group.pool_set() || !self.groups.set_pool_set(group.group_id, ranked) {
            return Discovery::Unchanged;
        }

        match self.groups.get(group.group_id) {
            Some(updated) => {
                info!(
                    group_id = group.group_id,
                    chain = %group.chain,
                    main_pair = %updated.pair_address,
                    pools = updated.all_pair_addresses.len(),
                    "Pool set updated"
                );
                Discovery::Updated(updated)
            }
            None => Discovery::Unchanged,
        }
    }

    /// Handle one swap: de-duplicate, classify for every group tracking the
    /// pool and spawn one alert task per buying group.
    pub fn handle_swap(self: &Arc<Self>, swap: PoolSwap) -> Vec<JoinHandle<DispatchOutcome>> {
        Metrics::swap_received(swap.chain.as_str());

        let key = (swap.chain.clone(), swap.event.dedup_key());
        if !self.seen.lock().insert(key) {
            Metrics::duplicate_swap(swap.chain.as_str());
            debug!(
                chain = %swap.chain,
                tx = %swap.event.tx_hash,
                log_index = swap.event.log_index,
                "Duplicate swap ignored"
            );
            return Vec::new();
        }

        let mut tasks = Vec::new();
        for group in self.groups.groups_for_pool(&swap.chain, &swap.pool) {
            let Some(signal) = classify(&swap, &group.token_address).into_buy() else {
                continue;
            };
            Metrics::buy_detected(swap.chain.as_str());
            debug!(
                chain = %signal.chain,
                pool = %signal.pool,
                group_id = group.group_id,
                tx = %signal.tx_hex(),
                "Buy detected"
            );

            let bot = Arc::clone(self);
            tasks.push(tokio::spawn(async move {
                let client = bot.registry.connections().current(&signal.chain);
                let alert = bot.enricher.enrich(&signal, client).await;
                bot.dispatcher
                    .maybe_alert(group.group_id, &group, &alert)
                    .await
            }));
        }
        tasks
    }
}

/// Reload groups every `interval` and keep one resync loop running per
/// chain that has groups.
///
/// Chains tick independently, so a stalled chain never delays another.
pub async fn run_resync_loop(bot: Arc<BuyBot>, interval: Duration, shutdown: CancellationToken) {
    let mut chains: HashMap<ChainId, JoinHandle<()>> = HashMap::new();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                bot.reload_groups();
                for chain in bot.groups().ids_by_chain().into_keys() {
                    if chains.get(&chain).is_some_and(|task| !task.is_finished()) {
                        continue;
                    }
                    info!(chain = %chain, "Starting chain resync loop");
                    let task = tokio::spawn(run_chain_loop(
                        bot.clone(),
                        chain.clone(),
                        interval,
                        shutdown.clone(),
                    ));
                    chains.insert(chain, task);
                }
            }
        }
    }

    for (chain, task) in chains {
        if let Err(e) = task.await {
            warn!(chain = %chain, error = %e, "Chain resync task ended abnormally");
        }
    }
    debug!("Resync loop stopped");
}

/// Run `resync_chain` for `chain` every `interval`, first tick immediately.
async fn run_chain_loop(
    bot: Arc<BuyBot>,
    chain: ChainId,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut tick = 0u64;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                tick += 1;
                bot.resync_chain(&chain, tick).await;
            }
        }
    }
    debug!(chain = %chain, "Chain resync loop stopped");
}

/// Consume swaps until the channel closes or shutdown is requested.
pub async fn run_event_loop(
    bot: Arc<BuyBot>,
    mut swap_rx: mpsc::Receiver<PoolSwap>,
    shutdown: CancellationToken,
) {
    loop {
        let swap = tokio::select! {
            _ = shutdown.cancelled() => break,
            swap = swap_rx.recv() => swap,
        };
        let Some(swap) = swap else {
            warn!("Swap channel closed");
            break;
        };
        // Alert tasks run detached.
        drop(bot.handle_swap(swap));
    }
    debug!("Event loop stopped");
}

/// Main application.
pub struct Application {
    config: AppConfig,
    bot: Arc<BuyBot>,
    swap_rx: mpsc::Receiver<PoolSwap>,
    shutdown: CancellationToken,
}

impl Application {
    /// Build every service from configuration. Fails on invalid groups or
    /// configuration.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let groups = Arc::new(GroupStore::load_file(&config.groups_file)?);
        config.validate(&groups.snapshot())?;

        let connector = Arc::new(AlloyConnector::new(config.endpoints()));
        let connections = Arc::new(ChainConnectionPool::new(connector));
        let (swap_tx, swap_rx) = mpsc::channel(config.alerts.channel_capacity);
        let registry = Arc::new(SubscriptionRegistry::new(connections, swap_tx));

        let market: Arc<dyn MarketData> = Arc::new(GeckoTerminalClient::new(
            config.market_data.base_url.clone(),
            Some(Duration::from_millis(config.market_data.timeout_ms)),
        )?);
        let price_source = Arc::new(BinancePriceSource::new(
            config.prices.base_url.clone(),
            Some(Duration::from_millis(config.prices.timeout_ms)),
        )?);
        let prices = Arc::new(NativePriceCache::new(price_source));
        let enricher = Arc::new(Enricher::new(market.clone(), prices, config.enrichment()));

        let gateway = Arc::new(TelegramGateway::new(&config.telegram.bot_token)?);
        let dispatcher = Arc::new(AlertDispatcher::new(gateway, config.alerts.tiers()));

        let discovery = DiscoverySettings {
            enabled: config.market_data.discovery_enabled,
            min_liquidity_usd: config.market_data.min_liquidity_usd,
            refresh_every_ticks: config.market_data.refresh_every_ticks,
            retry_every_ticks: config.market_data.retry_every_ticks,
        };

        let bot = Arc::new(BuyBot::new(
            groups,
            registry,
            market,
            enricher,
            dispatcher,
            discovery,
            config.alerts.dedup_capacity,
        )
        .with_chain_timeout(config.chain_timeout()));

        Ok(Self {
            config,
            bot,
            swap_rx,
            shutdown: CancellationToken::new(),
        })
    }

    /// Token that stops the application when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run until Ctrl-C or the shutdown token is cancelled.
    pub async fn run(self) -> AppResult<()> {
        let Self {
            config,
            bot,
            swap_rx,
            shutdown,
        } = self;

        info!(
            groups = bot.groups().len(),
            chains = config.chains.len(),
            resync_interval_secs = config.resync.interval_secs,
            "Starting application"
        );

        let resync = tokio::spawn(run_resync_loop(
            bot.clone(),
            config.resync_interval(),
            shutdown.clone(),
        ));
        let events = tokio::spawn(run_event_loop(bot.clone(), swap_rx, shutdown.clone()));

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                }
                info!("Shutdown requested");
            }
            _ = shutdown.cancelled() => {}
        }
        shutdown.cancel();

        if let Err(e) = resync.await {
            warn!(error = %e, "Resync task ended abnormally");
        }
        if let Err(e) = events.await {
            warn!(error = %e, "Event task ended abnormally");
        }
        info!("Application stopped");
        Ok(())
    }
}
