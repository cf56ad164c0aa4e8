// ============================================================================
// Matchbook
// Multi-symbol order matching engine with lock-free ingress queues
// ============================================================================

//! # Matchbook
//!
//! A low-latency, multi-symbol order matching engine: continuous limit-order
//! books under price-time priority, midpoint trade prints, and lock-free
//! hand-off queues between ingress and the matching workers.
//!
//! ## Features
//!
//! - **Per-symbol order books** behind single-writer/many-reader guards
//! - **Sharded lock-free ring queues** so each symbol is served by exactly
//!   one matching worker, preserving time priority end to end
//! - **Fixed-point prices** (`Price`) that are exact and totally ordered
//! - **Pluggable event fan-out** for trades, fills, snapshots and market data
//! - **Engine-level counters** with per-second throughput sampling
//!
//! ## Example
//!
//! ```
//! use matchbook::prelude::*;
//! use std::sync::Arc;
//!
//! let engine = MatchingEngine::new(
//!     EngineConfig::default().with_metrics(false),
//!     Arc::new(NoOpEventSink),
//! )?;
//! engine.start()?;
//!
//! let symbol = Symbol::new("AAPL")?;
//! let order = Arc::new(Order::new(
//!     engine.next_order_id(),
//!     ClientId::new(1),
//!     symbol,
//!     Side::Buy,
//!     OrderType::Limit,
//!     100,
//!     Some("150.50".parse()?),
//! ));
//! engine.submit_order(order)?;
//!
//! engine.stop();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Known limitations
//!
//! Stop and stop-limit orders are accepted and rest at their stop price but
//! are never activated; there is no trigger machinery. Trades print at the
//! midpoint of the two orders' limit prices, which is this engine's
//! documented contract rather than an exchange convention.

pub mod domain;
pub mod engine;
pub mod error;
pub mod interfaces;
pub mod numeric;
pub mod queue;
pub mod utils;

// Re-exports for convenience
pub mod prelude {
    pub use crate::domain::{
        compare_priority, ClientId, EngineConfig, MarketData, MarketDataKind, Order,
        OrderBookSnapshot, OrderId, OrderStatus, OrderType, Side, Symbol, Trade,
    };
    pub use crate::engine::{
        EngineMetrics, MatchingEngine, MetricsSnapshot, OrderBook, OrderBookRegistry,
    };
    pub use crate::error::{EngineError, EngineResult};
    pub use crate::interfaces::{CountingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::numeric::{NumericError, Price};
    pub use crate::queue::RingQueue;
}

#[cfg(test)]
mod integration_tests {
    use super::prelude::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn price(s: &str) -> Price {
        s.parse().unwrap()
    }

    fn test_engine(matching_threads: usize) -> MatchingEngine {
        let config = EngineConfig::default()
            .with_matching_threads(matching_threads)
            .with_market_data_threads(1)
            .with_queue_capacity(1 << 12)
            .with_metrics(false);
        MatchingEngine::new(config, Arc::new(NoOpEventSink)).unwrap()
    }

    fn limit(engine: &MatchingEngine, symbol: &str, side: Side, px: &str, qty: u64) -> Arc<Order> {
        Arc::new(Order::new(
            engine.next_order_id(),
            ClientId::new(1),
            Symbol::new(symbol).unwrap(),
            side,
            OrderType::Limit,
            qty,
            Some(price(px)),
        ))
    }

    /// Spin until the engine has processed `processed` orders.
    fn wait_for_processed(engine: &MatchingEngine, processed: u64) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while engine.metrics().orders_processed < processed {
            assert!(
                Instant::now() < deadline,
                "timed out waiting for {processed} processed orders"
            );
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_single_resting_bid_end_to_end() {
        let engine = test_engine(2);
        engine.start().unwrap();

        engine
            .submit_order(limit(&engine, "AAPL", Side::Buy, "150.50", 100))
            .unwrap();
        wait_for_processed(&engine, 1);

        let snapshot = engine.snapshot(&Symbol::new("AAPL").unwrap()).unwrap();
        assert_eq!(snapshot.bids, vec![(price("150.50"), 100)]);
        assert!(snapshot.asks.is_empty());

        let metrics = engine.metrics();
        assert_eq!(metrics.orders_processed, 1);
        assert_eq!(metrics.trades_executed, 0);
        engine.stop();
    }

    #[test]
    fn test_partial_fill_then_cross_end_to_end() {
        let engine = test_engine(2);
        engine.start().unwrap();
        let symbol = Symbol::new("AAPL").unwrap();

        // Resting bid
        engine
            .submit_order(limit(&engine, "AAPL", Side::Buy, "150.50", 100))
            .unwrap();
        wait_for_processed(&engine, 1);

        // Same-price sell trades 60 at 150.50 (midpoint of equal prices)
        engine
            .submit_order(limit(&engine, "AAPL", Side::Sell, "150.50", 60))
            .unwrap();
        wait_for_processed(&engine, 2);

        let book = engine.order_book(&symbol).unwrap();
        assert_eq!(engine.metrics().trades_executed, 1);
        let trades = book.recent_trades(1);
        match trades[0].kind {
            MarketDataKind::Trade { price: p, quantity, .. } => {
                assert_eq!(p, price("150.50"));
                assert_eq!(quantity, 60);
            },
            other => panic!("expected trade, got {:?}", other),
        }
        assert_eq!(book.best_bid(), Some(price("150.50")));
        assert_eq!(book.best_bid_quantity(), 40);

        // Crossing sell: 40 trades at the midpoint of 150.50/150.00, the
        // residual 60 rests on the ask side
        engine
            .submit_order(limit(&engine, "AAPL", Side::Sell, "150.00", 100))
            .unwrap();
        wait_for_processed(&engine, 3);

        assert_eq!(engine.metrics().trades_executed, 2);
        let trades = book.recent_trades(1);
        match trades[0].kind {
            MarketDataKind::Trade { price: p, quantity, .. } => {
                assert_eq!(p, price("150.25"));
                assert_eq!(quantity, 40);
            },
            other => panic!("expected trade, got {:?}", other),
        }
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), Some(price("150.00")));
        assert_eq!(book.best_ask_quantity(), 60);
        book.audit().unwrap();
        engine.stop();
    }

    #[test]
    fn test_time_priority_end_to_end() {
        let engine = test_engine(2);
        engine.start().unwrap();
        let symbol = Symbol::new("GOOGL").unwrap();

        let first = limit(&engine, "GOOGL", Side::Buy, "2800", 50);
        let second = limit(&engine, "GOOGL", Side::Buy, "2800", 70);
        let first_id = first.id;
        let second_id = second.id;

        engine.submit_order(Arc::clone(&first)).unwrap();
        engine.submit_order(Arc::clone(&second)).unwrap();
        wait_for_processed(&engine, 2);

        engine
            .submit_order(limit(&engine, "GOOGL", Side::Sell, "2800", 50))
            .unwrap();
        wait_for_processed(&engine, 3);

        let book = engine.order_book(&symbol).unwrap();
        assert_eq!(first.status(), OrderStatus::Filled);
        assert!(!book.contains(first_id));
        assert!(book.contains(second_id));
        assert_eq!(second.remaining(), 70);
        assert_eq!(book.best_bid_quantity(), 70);
        book.audit().unwrap();
        engine.stop();
    }

    #[test]
    fn test_cancel_unknown_order() {
        let engine = test_engine(2);
        engine.start().unwrap();
        let symbol = Symbol::new("AAPL").unwrap();

        engine
            .submit_order(limit(&engine, "AAPL", Side::Buy, "150.50", 100))
            .unwrap();
        wait_for_processed(&engine, 1);

        let before = engine.snapshot(&symbol).unwrap();
        let result = engine.cancel_order(OrderId::new(424242), symbol);
        assert_eq!(result, Err(EngineError::OrderNotFound(OrderId::new(424242))));
        let after = engine.snapshot(&symbol).unwrap();
        assert_eq!(before.bids, after.bids);
        assert_eq!(before.asks, after.asks);
        engine.stop();
    }

    #[test]
    fn test_cancel_and_modify_end_to_end() {
        let engine = test_engine(1);
        engine.start().unwrap();
        let symbol = Symbol::new("AAPL").unwrap();

        let resting = limit(&engine, "AAPL", Side::Buy, "149.00", 10);
        let resting_id = resting.id;
        engine.submit_order(resting).unwrap();
        wait_for_processed(&engine, 1);

        engine
            .modify_order(resting_id, symbol, 25, price("149.50"))
            .unwrap();
        let book = engine.order_book(&symbol).unwrap();
        assert_eq!(book.best_bid(), Some(price("149.50")));
        assert_eq!(book.best_bid_quantity(), 25);

        engine.cancel_order(resting_id, symbol).unwrap();
        assert_eq!(book.order_count(), 0);
        book.audit().unwrap();
        engine.stop();
    }

    #[test]
    fn test_random_stream_invariants() {
        // 100,000 seeded random operations across 5 symbols, checked against
        // the book invariants and order conservation at the end.
        let symbols = ["AAPL", "GOOGL", "MSFT", "AMZN", "TSLA"];
        let sink: Arc<dyn EventSink> = Arc::new(NoOpEventSink);
        let registry = OrderBookRegistry::new(Arc::clone(&sink));
        let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);

        let mut submitted: Vec<Arc<Order>> = Vec::with_capacity(100_000);
        let mut next_id = 1u64;
        let mut last_volume = Price::ZERO;

        for step in 0..100_000u32 {
            let symbol = Symbol::new(symbols[rng.gen_range(0..symbols.len())]).unwrap();
            let book = registry.get_or_create(symbol);

            if rng.gen_bool(0.1) && !submitted.is_empty() {
                // Cancel a random earlier order; failures (already terminal)
                // are expected and ignored
                let victim = &submitted[rng.gen_range(0..submitted.len())];
                if let Some(book) = registry.get(&victim.symbol) {
                    let _ = book.cancel_order(victim.id);
                }
            } else {
                let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
                let raw = rng.gen_range(90_0000..110_0000i64);
                let px = Price::from_raw(raw);
                let qty = rng.gen_range(1..100u64);
                let order = Arc::new(Order::new(
                    OrderId::new(next_id),
                    ClientId::new(u64::from(step % 17)),
                    symbol,
                    side,
                    OrderType::Limit,
                    qty,
                    Some(px),
                ));
                next_id += 1;
                book.add_order(Arc::clone(&order)).unwrap();
                submitted.push(order);
            }

            // Volume is monotonically non-decreasing across the run
            if step % 10_000 == 0 {
                let volume = symbols
                    .iter()
                    .filter_map(|s| registry.get(&Symbol::new(s).unwrap()))
                    .fold(Price::ZERO, |acc, b| acc.saturating_add(b.total_volume()));
                assert!(volume >= last_volume);
                last_volume = volume;
            }
        }

        // Every book satisfies its structural invariants
        let mut resting_in_books = 0usize;
        for s in symbols {
            let symbol = Symbol::new(s).unwrap();
            if let Some(book) = registry.get(&symbol) {
                book.audit().unwrap();
                if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
                    assert!(bid < ask);
                }
                resting_in_books += book.order_count();
            }
        }

        // Conservation: every submitted order is terminal or resting, and
        // the resting ones are exactly the books' contents
        let mut filled = 0usize;
        let mut cancelled = 0usize;
        let mut resting = 0usize;
        for order in &submitted {
            match order.status() {
                OrderStatus::Filled => filled += 1,
                OrderStatus::Cancelled => cancelled += 1,
                OrderStatus::Rejected => unreachable!("limit orders are never rejected here"),
                OrderStatus::Pending | OrderStatus::PartiallyFilled => {
                    resting += 1;
                    let book = registry.get(&order.symbol).unwrap();
                    assert!(book.contains(order.id), "live order {} not resting", order.id);
                    assert!(order.filled_quantity() < order.quantity);
                },
            }
        }
        assert_eq!(filled + cancelled + resting, submitted.len());
        assert_eq!(resting, resting_in_books);
    }

    #[test]
    fn test_concurrent_submission_soak() {
        let engine = Arc::new(test_engine(4));
        engine.start().unwrap();
        let symbols = ["AAPL", "GOOGL", "MSFT", "AMZN", "TSLA"];

        const PER_PRODUCER: usize = 5_000;
        let mut producers = Vec::new();
        for producer in 0..2u64 {
            let engine = Arc::clone(&engine);
            producers.push(thread::spawn(move || {
                let mut rng = ChaCha8Rng::seed_from_u64(producer);
                let mut accepted = 0u64;
                for _ in 0..PER_PRODUCER {
                    let symbol = symbols[rng.gen_range(0..symbols.len())];
                    let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
                    let px = Price::from_raw(rng.gen_range(90_0000..110_0000i64));
                    let order = Arc::new(Order::new(
                        engine.next_order_id(),
                        ClientId::new(producer),
                        Symbol::new(symbol).unwrap(),
                        side,
                        OrderType::Limit,
                        rng.gen_range(1..100u64),
                        Some(px),
                    ));
                    loop {
                        match engine.submit_order(Arc::clone(&order)) {
                            Ok(()) => {
                                accepted += 1;
                                break;
                            },
                            Err(EngineError::QueueFull) => thread::sleep(Duration::from_micros(10)),
                            Err(other) => panic!("unexpected error: {other}"),
                        }
                    }
                }
                accepted
            }));
        }

        let accepted: u64 = producers.into_iter().map(|p| p.join().unwrap()).sum();
        wait_for_processed(&engine, accepted);
        engine.stop();

        assert!(!engine.is_running());
        assert_eq!(engine.queued_orders(), 0);
        assert_eq!(engine.metrics().orders_processed, accepted);

        for s in symbols {
            if let Some(book) = engine.order_book(&Symbol::new(s).unwrap()) {
                book.audit().unwrap();
            }
        }
        assert_eq!(
            engine.total_trade_count(),
            engine.metrics().trades_executed
        );
    }

    #[test]
    fn test_active_symbols_and_totals() {
        let engine = test_engine(2);
        engine.start().unwrap();

        engine
            .submit_order(limit(&engine, "AAPL", Side::Buy, "150.00", 10))
            .unwrap();
        engine
            .submit_order(limit(&engine, "MSFT", Side::Sell, "300.00", 5))
            .unwrap();
        wait_for_processed(&engine, 2);

        let mut symbols = engine.active_symbols();
        symbols.sort();
        assert_eq!(
            symbols,
            vec![Symbol::new("AAPL").unwrap(), Symbol::new("MSFT").unwrap()]
        );
        assert_eq!(engine.total_order_count(), 2);
        assert_eq!(engine.total_trade_count(), 0);
        engine.stop();
    }
}
