// ============================================================================
// Matching Engine
// Submission pipeline, worker threads, and engine lifecycle
// ============================================================================

use crate::domain::{
    EngineConfig, MarketData, Order, OrderBookSnapshot, OrderId, OrderType, Symbol,
};
use crate::engine::{EngineMetrics, MetricsSnapshot, OrderBook, OrderBookRegistry};
use crate::error::{EngineError, EngineResult};
use crate::interfaces::EventSink;
use crate::numeric::Price;
use crate::queue::RingQueue;
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Orders drained per worker iteration.
const BATCH_SIZE: usize = 100;

/// Back-off when a worker finds its queue empty.
const IDLE_BACKOFF: Duration = Duration::from_micros(1);

/// Cadence at which the metrics sampler checks for shutdown.
const METRICS_POLL: Duration = Duration::from_millis(100);

/// Multi-symbol matching engine.
///
/// Owns the book registry, the lock-free ingress queues, and the worker
/// threads that drain them. Order queues are sharded by symbol hash so every
/// symbol is served by exactly one matching worker; together with per-book
/// write guards this makes matching deterministic in the ingress order.
///
/// `cancel_order` and `modify_order` run synchronously on the caller's
/// thread: they must observe live book state, and the per-book write guard
/// already serializes them against the owning worker.
pub struct MatchingEngine {
    config: EngineConfig,
    registry: Arc<OrderBookRegistry>,
    order_queues: Vec<Arc<RingQueue<Arc<Order>>>>,
    market_data_queue: Arc<RingQueue<MarketData>>,
    sink: Arc<dyn EventSink>,
    metrics: Arc<EngineMetrics>,
    next_order_id: AtomicU64,
    running: AtomicBool,
    shutdown: Arc<AtomicBool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl MatchingEngine {
    /// Create an engine with the given configuration and event sink.
    ///
    /// # Errors
    /// `InvalidConfig` if the configuration fails validation.
    pub fn new(config: EngineConfig, sink: Arc<dyn EventSink>) -> EngineResult<Self> {
        config.validate()?;

        let order_queues = (0..config.matching_threads)
            .map(|_| Arc::new(RingQueue::with_capacity(config.queue_capacity)))
            .collect();

        Ok(Self {
            registry: Arc::new(OrderBookRegistry::new(Arc::clone(&sink))),
            market_data_queue: Arc::new(RingQueue::with_capacity(config.queue_capacity)),
            order_queues,
            sink,
            metrics: Arc::new(EngineMetrics::new()),
            next_order_id: AtomicU64::new(1),
            running: AtomicBool::new(false),
            shutdown: Arc::new(AtomicBool::new(false)),
            workers: Mutex::new(Vec::new()),
            config,
        })
    }

    /// Create an engine with the default configuration.
    pub fn with_defaults(sink: Arc<dyn EventSink>) -> Self {
        // Default configuration always validates.
        match Self::new(EngineConfig::default(), sink) {
            Ok(engine) => engine,
            Err(err) => unreachable!("default config rejected: {err}"),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Spawn the worker threads and transition to running.
    ///
    /// # Errors
    /// `AlreadyRunning` if the engine is up; `StartupFailed` if any worker
    /// fails to spawn, in which case every worker already started has been
    /// joined and the engine remains stopped.
    pub fn start(&self) -> EngineResult<()> {
        if self.running.load(Ordering::Acquire) {
            return Err(EngineError::AlreadyRunning);
        }

        self.shutdown.store(false, Ordering::Release);
        let mut handles = Vec::new();

        for (index, queue) in self.order_queues.iter().enumerate() {
            let spawned = thread::Builder::new()
                .name(format!("matching-{index}"))
                .spawn({
                    let queue = Arc::clone(queue);
                    let registry = Arc::clone(&self.registry);
                    let metrics = Arc::clone(&self.metrics);
                    let sink = Arc::clone(&self.sink);
                    let shutdown = Arc::clone(&self.shutdown);
                    let snapshot_depth = self.config.snapshot_depth;
                    move || matching_worker(queue, registry, metrics, sink, shutdown, snapshot_depth)
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => return self.rollback_startup(handles, "matching", err),
            }
        }

        for index in 0..self.config.market_data_threads {
            let spawned = thread::Builder::new()
                .name(format!("market-data-{index}"))
                .spawn({
                    let queue = Arc::clone(&self.market_data_queue);
                    let metrics = Arc::clone(&self.metrics);
                    let sink = Arc::clone(&self.sink);
                    let shutdown = Arc::clone(&self.shutdown);
                    move || market_data_worker(queue, metrics, sink, shutdown)
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => return self.rollback_startup(handles, "market-data", err),
            }
        }

        if self.config.enable_metrics {
            let spawned = thread::Builder::new().name("metrics".into()).spawn({
                let metrics = Arc::clone(&self.metrics);
                let shutdown = Arc::clone(&self.shutdown);
                move || metrics_worker(metrics, shutdown)
            });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => return self.rollback_startup(handles, "metrics", err),
            }
        }

        *self.workers.lock() = handles;
        self.running.store(true, Ordering::Release);
        tracing::info!(
            matching_threads = self.config.matching_threads,
            market_data_threads = self.config.market_data_threads,
            queue_capacity = self.config.queue_capacity,
            "matching engine started"
        );
        Ok(())
    }

    fn rollback_startup(
        &self,
        handles: Vec<JoinHandle<()>>,
        worker_kind: &str,
        err: std::io::Error,
    ) -> EngineResult<()> {
        self.shutdown.store(true, Ordering::Release);
        for handle in handles {
            let _ = handle.join();
        }
        self.shutdown.store(false, Ordering::Release);
        tracing::error!(worker_kind, error = %err, "worker failed to spawn; startup rolled back");
        Err(EngineError::StartupFailed(format!(
            "failed to spawn {worker_kind} worker: {err}"
        )))
    }

    /// Signal shutdown and join every worker. Idempotent: calling `stop` on
    /// a stopped engine is a no-op.
    ///
    /// Queued submissions that were not drained remain countable through
    /// `queued_orders` / `queued_market_data`.
    pub fn stop(&self) {
        if !self.running.load(Ordering::Acquire) {
            return;
        }

        self.shutdown.store(true, Ordering::Release);
        let handles = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            if handle.join().is_err() {
                tracing::error!("worker thread panicked during shutdown");
            }
        }
        self.running.store(false, Ordering::Release);
        self.shutdown.store(false, Ordering::Release);

        tracing::info!(
            queued_orders = self.queued_orders(),
            queued_market_data = self.queued_market_data(),
            "matching engine stopped"
        );
    }

    /// Request shutdown without joining.
    ///
    /// Only stores an atomic, so it is safe to call from a signal handler;
    /// a normal thread must still call `stop` to join the workers.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Allocate the next order id from the engine-wide monotonic counter.
    pub fn next_order_id(&self) -> OrderId {
        OrderId::new(self.next_order_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Validate an order and hand it to its symbol's matching worker.
    ///
    /// # Errors
    /// `NotRunning` / `ShutdownInProgress` when the engine cannot accept;
    /// `InvalidQuantity` / `InvalidPrice` on validation failure (counted as
    /// rejected); `QueueFull` when the shard is saturated (counted as
    /// dropped). Nothing is retried.
    pub fn submit_order(&self, order: Arc<Order>) -> EngineResult<()> {
        if !self.running.load(Ordering::Acquire) {
            return Err(EngineError::NotRunning);
        }
        if self.shutdown.load(Ordering::Acquire) {
            return Err(EngineError::ShutdownInProgress);
        }
        if let Err(err) = validate_order(&order) {
            self.metrics.record_order_rejected();
            return Err(err);
        }

        let started = Instant::now();
        let shard = self.shard_for(&order.symbol);
        if self.order_queues[shard].try_push(order).is_err() {
            self.metrics.record_order_dropped();
            tracing::warn!(shard, "order queue full; submission dropped");
            return Err(EngineError::QueueFull);
        }
        self.metrics
            .record_latency_ns(started.elapsed().as_nanos() as u64);
        Ok(())
    }

    /// Cancel a resting order, synchronously.
    pub fn cancel_order(&self, order_id: OrderId, symbol: Symbol) -> EngineResult<()> {
        if !self.running.load(Ordering::Acquire) {
            return Err(EngineError::NotRunning);
        }
        let book = self
            .registry
            .get(&symbol)
            .ok_or(EngineError::OrderNotFound(order_id))?;
        book.cancel_order(order_id).map(|_| ())
    }

    /// Modify a resting order's quantity and price, synchronously.
    pub fn modify_order(
        &self,
        order_id: OrderId,
        symbol: Symbol,
        new_quantity: u64,
        new_price: Price,
    ) -> EngineResult<()> {
        if !self.running.load(Ordering::Acquire) {
            return Err(EngineError::NotRunning);
        }
        let book = self
            .registry
            .get(&symbol)
            .ok_or(EngineError::OrderNotFound(order_id))?;
        let executed = book.modify_order(order_id, new_quantity, new_price)?;
        if executed > 0 {
            self.metrics.record_trades_executed(executed as u64);
            self.sink.on_snapshot(&book.snapshot(self.config.snapshot_depth));
        }
        Ok(())
    }

    /// Enqueue a market-data record for fan-out.
    pub fn submit_market_data(&self, data: MarketData) -> EngineResult<()> {
        if !self.running.load(Ordering::Acquire) {
            return Err(EngineError::NotRunning);
        }
        if self.market_data_queue.try_push(data).is_err() {
            tracing::warn!("market data queue full; record dropped");
            return Err(EngineError::QueueFull);
        }
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// The book for a symbol, if it exists.
    pub fn order_book(&self, symbol: &Symbol) -> Option<Arc<OrderBook>> {
        self.registry.get(symbol)
    }

    /// Level-2 snapshot for a symbol at the configured depth.
    pub fn snapshot(&self, symbol: &Symbol) -> Option<OrderBookSnapshot> {
        self.registry
            .get(symbol)
            .map(|book| book.snapshot(self.config.snapshot_depth))
    }

    pub fn active_symbols(&self) -> Vec<Symbol> {
        self.registry.symbols()
    }

    /// Resting orders across all books.
    pub fn total_order_count(&self) -> usize {
        self.registry
            .symbols()
            .iter()
            .filter_map(|symbol| self.registry.get(symbol))
            .map(|book| book.order_count())
            .sum()
    }

    /// Trades executed across all books.
    pub fn total_trade_count(&self) -> u64 {
        self.registry
            .symbols()
            .iter()
            .filter_map(|symbol| self.registry.get(symbol))
            .map(|book| book.trade_count())
            .sum()
    }

    /// Submissions accepted but not yet drained by the matching workers.
    pub fn queued_orders(&self) -> usize {
        self.order_queues.iter().map(|queue| queue.len()).sum()
    }

    /// Market-data records not yet fanned out.
    pub fn queued_market_data(&self) -> usize {
        self.market_data_queue.len()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn shard_for(&self, symbol: &Symbol) -> usize {
        let mut hasher = DefaultHasher::new();
        symbol.hash(&mut hasher);
        (hasher.finish() as usize) % self.order_queues.len()
    }
}

impl Drop for MatchingEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn validate_order(order: &Order) -> EngineResult<()> {
    if order.quantity == 0 {
        return Err(EngineError::InvalidQuantity);
    }
    match order.order_type {
        OrderType::Market => Ok(()),
        OrderType::Limit => match order.price {
            Some(price) if price.is_positive() => Ok(()),
            _ => Err(EngineError::InvalidPrice),
        },
        OrderType::Stop => match order.stop_price {
            Some(stop) if stop.is_positive() => Ok(()),
            _ => Err(EngineError::InvalidPrice),
        },
        OrderType::StopLimit => match (order.price, order.stop_price) {
            (Some(price), Some(stop)) if price.is_positive() && stop.is_positive() => Ok(()),
            _ => Err(EngineError::InvalidPrice),
        },
    }
}

// ============================================================================
// Worker Loops
// ============================================================================

fn matching_worker(
    queue: Arc<RingQueue<Arc<Order>>>,
    registry: Arc<OrderBookRegistry>,
    metrics: Arc<EngineMetrics>,
    sink: Arc<dyn EventSink>,
    shutdown: Arc<AtomicBool>,
    snapshot_depth: usize,
) {
    tracing::debug!("matching worker started");
    let mut batch: Vec<Arc<Order>> = Vec::with_capacity(BATCH_SIZE);

    while !shutdown.load(Ordering::Acquire) {
        batch.clear();
        while batch.len() < BATCH_SIZE {
            match queue.try_pop() {
                Some(order) => batch.push(order),
                None => break,
            }
        }

        if batch.is_empty() {
            thread::sleep(IDLE_BACKOFF);
            continue;
        }

        for order in batch.drain(..) {
            let book = registry.get_or_create(order.symbol);
            match book.add_order(order) {
                Ok(executed) => {
                    metrics.record_orders_processed(1);
                    if executed > 0 {
                        metrics.record_trades_executed(executed as u64);
                        sink.on_snapshot(&book.snapshot(snapshot_depth));
                    }
                },
                Err(err) => {
                    metrics.record_order_rejected();
                    tracing::warn!(error = %err, "order rejected by book");
                },
            }
        }
    }
    tracing::debug!("matching worker stopped");
}

fn market_data_worker(
    queue: Arc<RingQueue<MarketData>>,
    metrics: Arc<EngineMetrics>,
    sink: Arc<dyn EventSink>,
    shutdown: Arc<AtomicBool>,
) {
    tracing::debug!("market data worker started");
    let mut batch: Vec<MarketData> = Vec::with_capacity(BATCH_SIZE);

    while !shutdown.load(Ordering::Acquire) {
        batch.clear();
        while batch.len() < BATCH_SIZE {
            match queue.try_pop() {
                Some(data) => batch.push(data),
                None => break,
            }
        }

        if batch.is_empty() {
            thread::sleep(IDLE_BACKOFF);
            continue;
        }

        let drained = batch.len() as u64;
        for data in batch.drain(..) {
            sink.on_market_data(&data);
        }
        metrics.record_market_data_updates(drained);
    }
    tracing::debug!("market data worker stopped");
}

fn metrics_worker(metrics: Arc<EngineMetrics>, shutdown: Arc<AtomicBool>) {
    tracing::debug!("metrics worker started");
    let mut last_tick = Instant::now();
    let mut last_orders = metrics.orders_processed();
    let mut last_trades = metrics.trades_executed();
    let mut last_market_data = metrics.market_data_updates();

    while !shutdown.load(Ordering::Acquire) {
        thread::sleep(METRICS_POLL);

        if last_tick.elapsed() >= Duration::from_secs(1) {
            let orders = metrics.orders_processed();
            let trades = metrics.trades_executed();
            let market_data = metrics.market_data_updates();

            // saturating: a concurrent reset_metrics can move counters backwards
            metrics.set_throughput(
                orders.saturating_sub(last_orders),
                trades.saturating_sub(last_trades),
                market_data.saturating_sub(last_market_data),
            );

            last_orders = orders;
            last_trades = trades;
            last_market_data = market_data;
            last_tick = Instant::now();
        }
    }
    tracing::debug!("metrics worker stopped");
}
