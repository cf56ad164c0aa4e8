// ============================================================================
// Order Book
// Per-symbol price ladders, order index, and the matching loop
// ============================================================================

use crate::domain::{
    compare_priority, MarketData, Order, OrderBookSnapshot, OrderId, OrderStatus, Side, Symbol,
    Trade,
};
use crate::error::{EngineError, EngineResult};
use crate::interfaces::EventSink;
use crate::numeric::Price;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

/// Bounded trade history per book; the oldest record is dropped on overflow.
const MAX_TRADE_HISTORY: usize = 1_000;

// ============================================================================
// Price Level
// ============================================================================

/// All resting orders at one price on one side, in time priority.
///
/// Insertion at the tail preserves time priority because each book is fed by
/// exactly one matching worker, so timestamps at a level never decrease.
#[derive(Debug, Default)]
pub struct PriceLevel {
    orders: VecDeque<Arc<Order>>,
}

impl PriceLevel {
    fn push(&mut self, order: Arc<Order>) {
        self.orders.push_back(order);
    }

    fn front(&self) -> Option<&Arc<Order>> {
        self.orders.front()
    }

    fn pop_front(&mut self) -> Option<Arc<Order>> {
        self.orders.pop_front()
    }

    fn remove(&mut self, order_id: OrderId) -> Option<Arc<Order>> {
        let position = self.orders.iter().position(|order| order.id == order_id)?;
        self.orders.remove(position)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Sum of remaining quantities across the FIFO.
    pub fn total_quantity(&self) -> u64 {
        self.orders.iter().map(|order| order.remaining()).sum()
    }

    fn iter(&self) -> impl Iterator<Item = &Arc<Order>> {
        self.orders.iter()
    }
}

// ============================================================================
// Book Interior
// ============================================================================

/// Book state guarded by the reader-writer lock. All mutation happens here
/// under the write guard; queries borrow it through the read guard.
struct BookInner {
    bids: BTreeMap<Price, PriceLevel>,
    asks: BTreeMap<Price, PriceLevel>,
    orders_by_id: HashMap<OrderId, Arc<Order>>,
    recent_trades: VecDeque<MarketData>,
    /// Live resting orders (== orders_by_id.len(), kept as a counter for the
    /// registry's cheap occupancy check).
    resting_orders: u64,
    total_trades: u64,
    total_volume: Price,
    /// Sequence for this book's market-data stream.
    next_sequence: u64,
}

impl BookInner {
    fn new() -> Self {
        Self {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            orders_by_id: HashMap::new(),
            recent_trades: VecDeque::with_capacity(MAX_TRADE_HISTORY),
            resting_orders: 0,
            total_trades: 0,
            total_volume: Price::ZERO,
            next_sequence: 0,
        }
    }

    fn side_ladder(&mut self, side: Side) -> &mut BTreeMap<Price, PriceLevel> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    fn insert(&mut self, order: Arc<Order>) {
        let price = order.ladder_price();
        self.side_ladder(order.side)
            .entry(price)
            .or_default()
            .push(Arc::clone(&order));
        self.orders_by_id.insert(order.id, order);
        self.resting_orders += 1;
    }

    /// Remove an order from its price level and the id index. The caller has
    /// already decided the order leaves the book.
    fn evict(&mut self, order: &Order) {
        let price = order.ladder_price();
        let ladder = self.side_ladder(order.side);
        if let Some(level) = ladder.get_mut(&price) {
            level.remove(order.id);
        }
        self.orders_by_id.remove(&order.id);
        self.resting_orders -= 1;
    }

    fn prune_empty_levels(&mut self) {
        self.bids.retain(|_, level| !level.is_empty());
        self.asks.retain(|_, level| !level.is_empty());
    }

    /// Midpoint of the two orders' limit prices. A market order has no limit
    /// price and adopts the counterparty's, so the crossing sentinel never
    /// leaks into a trade print.
    fn trade_price(buy: &Order, sell: &Order) -> Option<Price> {
        match (buy.price, sell.price) {
            (Some(bid), Some(ask)) => Some(bid.midpoint(ask)),
            (Some(bid), None) => Some(bid),
            (None, Some(ask)) => Some(ask),
            (None, None) => None,
        }
    }

    /// Record a trade: bounded history, counters, and event emission.
    fn record_trade(
        &mut self,
        symbol: Symbol,
        buy: &Arc<Order>,
        sell: &Arc<Order>,
        price: Price,
        quantity: u64,
        sink: &dyn EventSink,
    ) {
        self.total_trades += 1;
        let trade_id = self.total_trades;
        self.total_volume = self
            .total_volume
            .saturating_add(price.saturating_mul_int(quantity as i64));

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.recent_trades
            .push_back(MarketData::trade(symbol, sequence, price, quantity, trade_id));
        if self.recent_trades.len() > MAX_TRADE_HISTORY {
            self.recent_trades.pop_front();
        }

        let trade = Trade::new(trade_id, symbol, buy.id, sell.id, price, quantity);
        sink.on_trade(&trade);
        sink.on_fill(buy, quantity, price);
        sink.on_fill(sell, quantity, price);
    }

    /// Match while the book is crossed. Returns the number of trades.
    fn match_crossing(&mut self, symbol: Symbol, sink: &dyn EventSink) -> usize {
        let mut executed = 0;

        loop {
            let bid_price = match self.bids.last_key_value() {
                Some((price, _)) => *price,
                None => break,
            };
            let ask_price = match self.asks.first_key_value() {
                Some((price, _)) => *price,
                None => break,
            };
            if bid_price < ask_price {
                break;
            }

            let buy = match self.bids.get(&bid_price).and_then(PriceLevel::front) {
                Some(order) => Arc::clone(order),
                None => break,
            };
            let sell = match self.asks.get(&ask_price).and_then(PriceLevel::front) {
                Some(order) => Arc::clone(order),
                None => break,
            };

            let quantity = buy.remaining().min(sell.remaining());
            let price = match Self::trade_price(&buy, &sell) {
                Some(price) => price,
                // Two unpriced orders at the head of a crossed book cannot
                // happen between calls; treat it as corruption.
                None => {
                    tracing::error!(symbol = %symbol, "crossed book with two unpriced orders");
                    panic!("crossed book with two unpriced orders; book invariants violated");
                },
            };
            if quantity == 0 {
                tracing::error!(symbol = %symbol, "zero-remaining order at level head");
                panic!("zero-remaining order at level head; book invariants violated");
            }

            self.record_trade(symbol, &buy, &sell, price, quantity, sink);

            let buy_ok = buy.fill(quantity);
            let sell_ok = sell.fill(quantity);
            if !buy_ok || !sell_ok {
                tracing::error!(symbol = %symbol, "matched quantity exceeded remaining");
                panic!("matched quantity exceeded remaining; book invariants violated");
            }

            if buy.remaining() == 0 {
                if let Some(level) = self.bids.get_mut(&bid_price) {
                    level.pop_front();
                    if level.is_empty() {
                        self.bids.remove(&bid_price);
                    }
                }
                self.orders_by_id.remove(&buy.id);
                self.resting_orders -= 1;
            }
            if sell.remaining() == 0 {
                if let Some(level) = self.asks.get_mut(&ask_price) {
                    level.pop_front();
                    if level.is_empty() {
                        self.asks.remove(&ask_price);
                    }
                }
                self.orders_by_id.remove(&sell.id);
                self.resting_orders -= 1;
            }

            executed += 1;
        }

        executed
    }

    fn depth(&self, side: Side, levels: usize) -> Vec<(Price, u64)> {
        match side {
            Side::Buy => self
                .bids
                .iter()
                .rev()
                .take(levels)
                .map(|(price, level)| (*price, level.total_quantity()))
                .collect(),
            Side::Sell => self
                .asks
                .iter()
                .take(levels)
                .map(|(price, level)| (*price, level.total_quantity()))
                .collect(),
        }
    }
}

// ============================================================================
// Order Book
// ============================================================================

/// Continuous limit-order book for one symbol.
///
/// Single-writer / many-reader: every mutation takes the write guard, every
/// query the read guard, so the matching loop is deterministic given the
/// ingress order. Orders are shared between the id index and the price-level
/// FIFOs as `Arc`s with atomic fill state.
pub struct OrderBook {
    symbol: Symbol,
    inner: RwLock<BookInner>,
    sink: Arc<dyn EventSink>,
}

impl OrderBook {
    pub fn new(symbol: Symbol, sink: Arc<dyn EventSink>) -> Self {
        Self {
            symbol,
            inner: RwLock::new(BookInner::new()),
            sink,
        }
    }

    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Accept an order, rest it, and run the matching loop.
    ///
    /// Market orders cross via a ladder sentinel; any residue after the
    /// opposite side is exhausted is removed and marked `Rejected`. Stop
    /// variants rest at their stop price and carry no trigger semantics.
    ///
    /// Returns the number of trades executed.
    ///
    /// # Errors
    /// `SymbolMismatch` if the order was routed to the wrong book,
    /// `DuplicateOrderId` if the id is already resting.
    pub fn add_order(&self, order: Arc<Order>) -> EngineResult<usize> {
        if order.symbol != self.symbol {
            return Err(EngineError::SymbolMismatch {
                book: self.symbol,
                order: order.symbol,
            });
        }

        let mut inner = self.inner.write();

        if inner.orders_by_id.contains_key(&order.id) {
            return Err(EngineError::DuplicateOrderId(order.id));
        }

        inner.insert(Arc::clone(&order));
        let executed = inner.match_crossing(self.symbol, self.sink.as_ref());

        // Market orders never rest: reject the unfilled residue.
        if order.is_market_order() && order.remaining() > 0 {
            inner.evict(&order);
            order.set_status(OrderStatus::Rejected);
        }

        inner.prune_empty_levels();
        Ok(executed)
    }

    /// Cancel a resting order.
    ///
    /// # Errors
    /// `OrderNotFound` if the id is not resting in this book.
    pub fn cancel_order(&self, order_id: OrderId) -> EngineResult<Arc<Order>> {
        let mut inner = self.inner.write();

        let order = inner
            .orders_by_id
            .get(&order_id)
            .cloned()
            .ok_or(EngineError::OrderNotFound(order_id))?;

        inner.evict(&order);
        order.try_cancel();
        inner.prune_empty_levels();
        drop(inner);

        self.sink.on_cancelled(&order);
        Ok(order)
    }

    /// Modify a resting order's quantity and price.
    ///
    /// Implemented as cancel + re-add with a fresh timestamp, so the order
    /// loses time priority. When `new_quantity` does not exceed what has
    /// already been filled the order completes as `Filled` instead of
    /// re-entering the book.
    ///
    /// Returns the number of trades executed by the re-match.
    ///
    /// # Errors
    /// `OrderNotFound` if the id is not resting in this book,
    /// `InvalidPrice` if `new_price` is not positive.
    pub fn modify_order(
        &self,
        order_id: OrderId,
        new_quantity: u64,
        new_price: Price,
    ) -> EngineResult<usize> {
        if !new_price.is_positive() {
            return Err(EngineError::InvalidPrice);
        }

        let mut inner = self.inner.write();

        let order = inner
            .orders_by_id
            .get(&order_id)
            .cloned()
            .ok_or(EngineError::OrderNotFound(order_id))?;

        inner.evict(&order);

        if new_quantity <= order.filled_quantity() {
            order.set_status(OrderStatus::Filled);
            inner.prune_empty_levels();
            return Ok(0);
        }

        let reissued = Arc::new(order.reissued(new_quantity, new_price));
        inner.insert(Arc::clone(&reissued));
        let executed = inner.match_crossing(self.symbol, self.sink.as_ref());

        if reissued.is_market_order() && reissued.remaining() > 0 {
            inner.evict(&reissued);
            reissued.set_status(OrderStatus::Rejected);
        }

        inner.prune_empty_levels();
        Ok(executed)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn best_bid(&self) -> Option<Price> {
        self.inner.read().bids.last_key_value().map(|(price, _)| *price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.inner.read().asks.first_key_value().map(|(price, _)| *price)
    }

    /// Aggregate remaining quantity at the best bid.
    pub fn best_bid_quantity(&self) -> u64 {
        self.inner
            .read()
            .bids
            .last_key_value()
            .map(|(_, level)| level.total_quantity())
            .unwrap_or(0)
    }

    /// Aggregate remaining quantity at the best ask.
    pub fn best_ask_quantity(&self) -> u64 {
        self.inner
            .read()
            .asks
            .first_key_value()
            .map(|(_, level)| level.total_quantity())
            .unwrap_or(0)
    }

    /// Top bid levels as `(price, aggregate quantity)`, best first.
    pub fn bids(&self, levels: usize) -> Vec<(Price, u64)> {
        self.inner.read().depth(Side::Buy, levels)
    }

    /// Top ask levels as `(price, aggregate quantity)`, best first.
    pub fn asks(&self, levels: usize) -> Vec<(Price, u64)> {
        self.inner.read().depth(Side::Sell, levels)
    }

    /// Level-2 snapshot of the top `depth` levels per side.
    pub fn snapshot(&self, depth: usize) -> OrderBookSnapshot {
        let inner = self.inner.read();
        OrderBookSnapshot::new(
            self.symbol,
            inner.depth(Side::Buy, depth),
            inner.depth(Side::Sell, depth),
        )
    }

    /// Most recent trades, newest first.
    pub fn recent_trades(&self, count: usize) -> Vec<MarketData> {
        let inner = self.inner.read();
        inner.recent_trades.iter().rev().take(count).copied().collect()
    }

    /// Whether this id currently rests in the book.
    pub fn contains(&self, order_id: OrderId) -> bool {
        self.inner.read().orders_by_id.contains_key(&order_id)
    }

    /// Number of live resting orders.
    pub fn order_count(&self) -> usize {
        self.inner.read().resting_orders as usize
    }

    /// Trades executed over the book's lifetime.
    pub fn trade_count(&self) -> u64 {
        self.inner.read().total_trades
    }

    /// Cumulative notional volume (Σ price × quantity).
    pub fn total_volume(&self) -> Price {
        self.inner.read().total_volume
    }

    // ========================================================================
    // Consistency Audit
    // ========================================================================

    /// Verify the book's structural invariants under the read guard.
    ///
    /// Intended for tests and debugging; a failure means a matching-path bug.
    pub fn audit(&self) -> Result<(), String> {
        let inner = self.inner.read();

        if inner.orders_by_id.len() as u64 != inner.resting_orders {
            return Err(format!(
                "resting counter {} disagrees with index size {}",
                inner.resting_orders,
                inner.orders_by_id.len()
            ));
        }

        let mut seen = 0usize;
        for (side, ladder) in [(Side::Buy, &inner.bids), (Side::Sell, &inner.asks)] {
            for (price, level) in ladder {
                if level.is_empty() {
                    return Err(format!("empty {:?} level at {}", side, price));
                }
                let mut previous: Option<&Arc<Order>> = None;
                for order in level.iter() {
                    seen += 1;
                    if order.side != side {
                        return Err(format!("order {} on the wrong side", order.id));
                    }
                    if order.ladder_price() != *price {
                        return Err(format!(
                            "order {} at level {} but priced {}",
                            order.id,
                            price,
                            order.ladder_price()
                        ));
                    }
                    if !inner.orders_by_id.contains_key(&order.id) {
                        return Err(format!("order {} missing from the id index", order.id));
                    }
                    if order.remaining() == 0 || order.filled_quantity() >= order.quantity {
                        return Err(format!("fully filled order {} still resting", order.id));
                    }
                    if let Some(previous) = previous {
                        if compare_priority(previous, order) == std::cmp::Ordering::Greater {
                            return Err(format!(
                                "time priority violated between {} and {}",
                                previous.id, order.id
                            ));
                        }
                    }
                    previous = Some(order);
                }
            }
        }

        if seen != inner.orders_by_id.len() {
            return Err(format!(
                "{} orders in levels but {} in the id index",
                seen,
                inner.orders_by_id.len()
            ));
        }

        if let (Some((bid, _)), Some((ask, _))) =
            (inner.bids.last_key_value(), inner.asks.first_key_value())
        {
            if bid >= ask {
                return Err(format!("book is crossed: bid {} >= ask {}", bid, ask));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
