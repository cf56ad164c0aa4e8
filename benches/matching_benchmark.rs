// ============================================================================
// Matching Engine Benchmarks
// ============================================================================
//
// Benchmark Categories:
// 1. Ring queue - raw push/pop hand-off cost
// 2. Order book - resting inserts, crossing matches, snapshots
// 3. Cancellation - id-index lookup plus level removal
// ============================================================================

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use matchbook::prelude::*;
use std::sync::Arc;

fn symbol() -> Symbol {
    Symbol::new("BENCH").unwrap()
}

fn limit(id: u64, side: Side, price_raw: i64, quantity: u64) -> Arc<Order> {
    Arc::new(Order::new(
        OrderId::new(id),
        ClientId::new(1),
        symbol(),
        side,
        OrderType::Limit,
        quantity,
        Some(Price::from_raw(price_raw)),
    ))
}

fn benchmark_ring_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_queue");

    group.bench_function("push_pop", |b| {
        let queue: RingQueue<u64> = RingQueue::with_capacity(1 << 16);
        b.iter(|| {
            queue.try_push(black_box(42)).unwrap();
            black_box(queue.try_pop())
        });
    });

    group.finish();
}

fn benchmark_order_book(c: &mut Criterion) {
    let mut group = c.benchmark_group("order_book");

    group.bench_function("resting_insert_cancel", |b| {
        let book = OrderBook::new(symbol(), Arc::new(NoOpEventSink));
        let mut id = 0u64;
        b.iter(|| {
            id += 1;
            // Deep out-of-the-money bid: rests without matching
            book.add_order(limit(id, Side::Buy, 1_000_000 + (id % 100) as i64, 10))
                .unwrap();
            book.cancel_order(OrderId::new(id)).unwrap();
        });
    });

    group.bench_function("crossing_pair", |b| {
        let book = OrderBook::new(symbol(), Arc::new(NoOpEventSink));
        let mut id = 0u64;
        b.iter(|| {
            book.add_order(limit(id + 1, Side::Buy, 1_500_000, 10)).unwrap();
            book.add_order(limit(id + 2, Side::Sell, 1_500_000, 10)).unwrap();
            id += 2;
        });
    });

    for depth in [10usize, 100] {
        group.bench_with_input(BenchmarkId::new("snapshot", depth), &depth, |b, &depth| {
            let book = OrderBook::new(symbol(), Arc::new(NoOpEventSink));
            for i in 0..depth as u64 {
                book.add_order(limit(i * 2 + 1, Side::Buy, 1_000_000 - i as i64 * 100, 10))
                    .unwrap();
                book.add_order(limit(i * 2 + 2, Side::Sell, 1_100_000 + i as i64 * 100, 10))
                    .unwrap();
            }
            b.iter(|| black_box(book.snapshot(10)));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_ring_queue, benchmark_order_book);
criterion_main!(benches);
