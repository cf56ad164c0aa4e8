// ============================================================================
// Event Sink Interface
// Fan-out for trade, fill, snapshot and market-data events
// ============================================================================

use crate::domain::{MarketData, Order, OrderBookSnapshot, Trade};
use crate::numeric::Price;
use std::sync::atomic::{AtomicU64, Ordering};

/// Publisher interface consumed by the ingress adapter.
///
/// All methods default to no-ops so implementations subscribe selectively.
/// Sinks are called from the matching workers and MUST NOT block: an
/// implementation that needs to do slow work (network, disk) has to queue
/// internally and drain on its own thread.
pub trait EventSink: Send + Sync {
    /// A trade was executed.
    fn on_trade(&self, _trade: &Trade) {}

    /// A book changed; `snapshot` is its fresh top levels.
    fn on_snapshot(&self, _snapshot: &OrderBookSnapshot) {}

    /// A market-data record passed through the engine.
    fn on_market_data(&self, _data: &MarketData) {}

    /// One side of a trade was filled for `fill_quantity` at `fill_price`.
    fn on_fill(&self, _order: &Order, _fill_quantity: u64, _fill_price: Price) {}

    /// A resting order was cancelled.
    fn on_cancelled(&self, _order: &Order) {}
}

/// No-op sink for benchmarks and tests.
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {}

/// Sink that logs every event at debug level.
pub struct LoggingEventSink;

impl EventSink for LoggingEventSink {
    fn on_trade(&self, trade: &Trade) {
        tracing::debug!(
            symbol = %trade.symbol,
            trade_id = trade.id,
            price = %trade.price,
            quantity = trade.quantity,
            "trade executed"
        );
    }

    fn on_snapshot(&self, snapshot: &OrderBookSnapshot) {
        tracing::debug!(
            symbol = %snapshot.symbol,
            bid_levels = snapshot.bids.len(),
            ask_levels = snapshot.asks.len(),
            "book updated"
        );
    }

    fn on_market_data(&self, data: &MarketData) {
        tracing::debug!(symbol = %data.symbol, sequence = data.sequence, "market data");
    }

    fn on_fill(&self, order: &Order, fill_quantity: u64, fill_price: Price) {
        tracing::debug!(
            order_id = %order.id,
            fill_quantity,
            fill_price = %fill_price,
            "order filled"
        );
    }

    fn on_cancelled(&self, order: &Order) {
        tracing::debug!(order_id = %order.id, "order cancelled");
    }
}

/// Sink that counts events; useful in tests and as a cheap metrics fan-out.
#[derive(Default)]
pub struct CountingEventSink {
    trades: AtomicU64,
    snapshots: AtomicU64,
    market_data: AtomicU64,
    fills: AtomicU64,
    cancellations: AtomicU64,
}

impl CountingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trades(&self) -> u64 {
        self.trades.load(Ordering::Relaxed)
    }

    pub fn snapshots(&self) -> u64 {
        self.snapshots.load(Ordering::Relaxed)
    }

    pub fn market_data(&self) -> u64 {
        self.market_data.load(Ordering::Relaxed)
    }

    pub fn fills(&self) -> u64 {
        self.fills.load(Ordering::Relaxed)
    }

    pub fn cancellations(&self) -> u64 {
        self.cancellations.load(Ordering::Relaxed)
    }
}

impl EventSink for CountingEventSink {
    fn on_trade(&self, _trade: &Trade) {
        self.trades.fetch_add(1, Ordering::Relaxed);
    }

    fn on_snapshot(&self, _snapshot: &OrderBookSnapshot) {
        self.snapshots.fetch_add(1, Ordering::Relaxed);
    }

    fn on_market_data(&self, _data: &MarketData) {
        self.market_data.fetch_add(1, Ordering::Relaxed);
    }

    fn on_fill(&self, _order: &Order, _fill_quantity: u64, _fill_price: Price) {
        self.fills.fetch_add(1, Ordering::Relaxed);
    }

    fn on_cancelled(&self, _order: &Order) {
        self.cancellations.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderId, Symbol};

    #[test]
    fn test_counting_sink() {
        let sink = CountingEventSink::new();
        let trade = Trade::new(
            1,
            Symbol::new("AAPL").unwrap(),
            OrderId::new(1),
            OrderId::new(2),
            "150.50".parse().unwrap(),
            10,
        );

        sink.on_trade(&trade);
        sink.on_trade(&trade);
        assert_eq!(sink.trades(), 2);
        assert_eq!(sink.fills(), 0);
    }

    #[test]
    fn test_noop_sink_ignores_everything() {
        let sink = NoOpEventSink;
        let md = MarketData::tick(Symbol::new("AAPL").unwrap(), 1);
        sink.on_market_data(&md);
        // Should not panic
    }
}
