// ============================================================================
// Engine Metrics
// Relaxed atomic counters plus per-second throughput gauges
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Engine-level performance counters.
///
/// Counters are bumped with relaxed increments from the hot path; the
/// per-second gauges are written by the metrics sampler thread from deltas
/// over its 1 s tick.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    orders_processed: AtomicU64,
    trades_executed: AtomicU64,
    market_data_updates: AtomicU64,
    orders_rejected: AtomicU64,
    orders_dropped: AtomicU64,

    total_latency_ns: AtomicU64,
    min_latency_ns: AtomicU64,
    max_latency_ns: AtomicU64,

    orders_per_second: AtomicU64,
    trades_per_second: AtomicU64,
    market_data_per_second: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        let metrics = Self::default();
        metrics.min_latency_ns.store(u64::MAX, Ordering::Relaxed);
        metrics
    }

    // ========================================================================
    // Recording
    // ========================================================================

    pub fn record_orders_processed(&self, count: u64) {
        self.orders_processed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_trades_executed(&self, count: u64) {
        self.trades_executed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_market_data_updates(&self, count: u64) {
        self.market_data_updates.fetch_add(count, Ordering::Relaxed);
    }

    /// A submission failed validation and was not enqueued.
    pub fn record_order_rejected(&self) {
        self.orders_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// A submission was dropped because its queue was full.
    pub fn record_order_dropped(&self) {
        self.orders_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one submission's enqueue latency.
    pub fn record_latency_ns(&self, latency_ns: u64) {
        self.total_latency_ns.fetch_add(latency_ns, Ordering::Relaxed);

        let mut current = self.min_latency_ns.load(Ordering::Relaxed);
        while latency_ns < current {
            match self.min_latency_ns.compare_exchange_weak(
                current,
                latency_ns,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }

        let mut current = self.max_latency_ns.load(Ordering::Relaxed);
        while latency_ns > current {
            match self.max_latency_ns.compare_exchange_weak(
                current,
                latency_ns,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }

    pub(crate) fn set_throughput(&self, orders: u64, trades: u64, market_data: u64) {
        self.orders_per_second.store(orders, Ordering::Relaxed);
        self.trades_per_second.store(trades, Ordering::Relaxed);
        self.market_data_per_second
            .store(market_data, Ordering::Relaxed);
    }

    // ========================================================================
    // Reading
    // ========================================================================

    pub fn orders_processed(&self) -> u64 {
        self.orders_processed.load(Ordering::Relaxed)
    }

    pub fn trades_executed(&self) -> u64 {
        self.trades_executed.load(Ordering::Relaxed)
    }

    pub fn market_data_updates(&self) -> u64 {
        self.market_data_updates.load(Ordering::Relaxed)
    }

    pub fn orders_rejected(&self) -> u64 {
        self.orders_rejected.load(Ordering::Relaxed)
    }

    pub fn orders_dropped(&self) -> u64 {
        self.orders_dropped.load(Ordering::Relaxed)
    }

    /// Mean enqueue latency in nanoseconds over all processed submissions.
    pub fn average_latency_ns(&self) -> f64 {
        let processed = self.orders_processed();
        if processed == 0 {
            return 0.0;
        }
        self.total_latency_ns.load(Ordering::Relaxed) as f64 / processed as f64
    }

    /// Reset every counter and gauge.
    pub fn reset(&self) {
        self.orders_processed.store(0, Ordering::Relaxed);
        self.trades_executed.store(0, Ordering::Relaxed);
        self.market_data_updates.store(0, Ordering::Relaxed);
        self.orders_rejected.store(0, Ordering::Relaxed);
        self.orders_dropped.store(0, Ordering::Relaxed);
        self.total_latency_ns.store(0, Ordering::Relaxed);
        self.min_latency_ns.store(u64::MAX, Ordering::Relaxed);
        self.max_latency_ns.store(0, Ordering::Relaxed);
        self.orders_per_second.store(0, Ordering::Relaxed);
        self.trades_per_second.store(0, Ordering::Relaxed);
        self.market_data_per_second.store(0, Ordering::Relaxed);
    }

    /// Copy the current values into a plain struct.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let min_latency = self.min_latency_ns.load(Ordering::Relaxed);
        MetricsSnapshot {
            orders_processed: self.orders_processed(),
            trades_executed: self.trades_executed(),
            market_data_updates: self.market_data_updates(),
            orders_rejected: self.orders_rejected(),
            orders_dropped: self.orders_dropped(),
            average_latency_ns: self.average_latency_ns(),
            min_latency_ns: if min_latency == u64::MAX { 0 } else { min_latency },
            max_latency_ns: self.max_latency_ns.load(Ordering::Relaxed),
            orders_per_second: self.orders_per_second.load(Ordering::Relaxed),
            trades_per_second: self.trades_per_second.load(Ordering::Relaxed),
            market_data_per_second: self.market_data_per_second.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the engine counters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricsSnapshot {
    pub orders_processed: u64,
    pub trades_executed: u64,
    pub market_data_updates: u64,
    pub orders_rejected: u64,
    pub orders_dropped: u64,
    pub average_latency_ns: f64,
    pub min_latency_ns: u64,
    pub max_latency_ns: u64,
    pub orders_per_second: u64,
    pub trades_per_second: u64,
    pub market_data_per_second: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = EngineMetrics::new();
        metrics.record_orders_processed(3);
        metrics.record_trades_executed(2);
        metrics.record_order_rejected();
        metrics.record_order_dropped();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.orders_processed, 3);
        assert_eq!(snapshot.trades_executed, 2);
        assert_eq!(snapshot.orders_rejected, 1);
        assert_eq!(snapshot.orders_dropped, 1);
    }

    #[test]
    fn test_latency_min_max() {
        let metrics = EngineMetrics::new();
        metrics.record_orders_processed(3);
        metrics.record_latency_ns(500);
        metrics.record_latency_ns(100);
        metrics.record_latency_ns(900);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.min_latency_ns, 100);
        assert_eq!(snapshot.max_latency_ns, 900);
        assert_eq!(snapshot.average_latency_ns, 500.0);
    }

    #[test]
    fn test_no_latency_recorded() {
        let metrics = EngineMetrics::new();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.min_latency_ns, 0);
        assert_eq!(snapshot.max_latency_ns, 0);
        assert_eq!(snapshot.average_latency_ns, 0.0);
    }

    #[test]
    fn test_reset() {
        let metrics = EngineMetrics::new();
        metrics.record_orders_processed(10);
        metrics.record_latency_ns(42);
        metrics.set_throughput(1, 2, 3);
        metrics.reset();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.orders_processed, 0);
        assert_eq!(snapshot.min_latency_ns, 0);
        assert_eq!(snapshot.orders_per_second, 0);
    }
}
