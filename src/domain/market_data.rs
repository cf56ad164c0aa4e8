// ============================================================================
// Market Data & Book Snapshots
// ============================================================================

use super::Symbol;
use crate::numeric::Price;
use crate::utils::monotonic_ns;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Market Data Records
// ============================================================================

/// Payload of a market-data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MarketDataKind {
    /// A trade print.
    Trade {
        price: Price,
        quantity: u64,
        trade_id: u64,
    },
    /// Top-of-book quote.
    Quote {
        bid_price: Price,
        bid_quantity: u64,
        ask_price: Price,
        ask_quantity: u64,
    },
    /// A single price-level change.
    BookUpdate {
        price: Price,
        quantity: u64,
        is_bid: bool,
    },
    /// Heartbeat-style tick with no payload.
    Tick,
}

/// A market-data record as it travels through the hand-off queue.
///
/// Everything is inline (`Copy`), so records move through ring-queue slots
/// without heap allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MarketData {
    pub symbol: Symbol,
    /// Producer-assigned, monotonically increasing per stream.
    pub sequence: u64,
    /// Monotonic nanoseconds.
    pub timestamp_ns: u64,
    pub kind: MarketDataKind,
}

impl MarketData {
    pub fn new(symbol: Symbol, sequence: u64, kind: MarketDataKind) -> Self {
        Self {
            symbol,
            sequence,
            timestamp_ns: monotonic_ns(),
            kind,
        }
    }

    pub fn trade(symbol: Symbol, sequence: u64, price: Price, quantity: u64, trade_id: u64) -> Self {
        Self::new(
            symbol,
            sequence,
            MarketDataKind::Trade {
                price,
                quantity,
                trade_id,
            },
        )
    }

    pub fn quote(
        symbol: Symbol,
        sequence: u64,
        bid_price: Price,
        bid_quantity: u64,
        ask_price: Price,
        ask_quantity: u64,
    ) -> Self {
        Self::new(
            symbol,
            sequence,
            MarketDataKind::Quote {
                bid_price,
                bid_quantity,
                ask_price,
                ask_quantity,
            },
        )
    }

    pub fn book_update(
        symbol: Symbol,
        sequence: u64,
        price: Price,
        quantity: u64,
        is_bid: bool,
    ) -> Self {
        Self::new(
            symbol,
            sequence,
            MarketDataKind::BookUpdate {
                price,
                quantity,
                is_bid,
            },
        )
    }

    pub fn tick(symbol: Symbol, sequence: u64) -> Self {
        Self::new(symbol, sequence, MarketDataKind::Tick)
    }

    pub fn is_trade(&self) -> bool {
        matches!(self.kind, MarketDataKind::Trade { .. })
    }
}

// ============================================================================
// Order Book Snapshot
// ============================================================================

/// Immutable level-2 snapshot: up to N `(price, aggregate quantity)` pairs
/// per side, best price first. Aggregate quantity at a price is the sum of
/// remaining quantities across that level's FIFO.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderBookSnapshot {
    pub symbol: Symbol,
    pub timestamp_ns: u64,
    /// Bid levels, highest price first.
    pub bids: Vec<(Price, u64)>,
    /// Ask levels, lowest price first.
    pub asks: Vec<(Price, u64)>,
}

impl OrderBookSnapshot {
    pub fn new(symbol: Symbol, bids: Vec<(Price, u64)>, asks: Vec<(Price, u64)>) -> Self {
        Self {
            symbol,
            timestamp_ns: monotonic_ns(),
            bids,
            asks,
        }
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|(price, _)| *price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|(price, _)| *price)
    }

    /// Current spread (best ask − best bid).
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => ask.checked_sub(bid).ok(),
            _ => None,
        }
    }

    /// Midpoint of the best bid and ask.
    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(bid.midpoint(ask)),
            _ => None,
        }
    }

    pub fn total_bid_quantity(&self) -> u64 {
        self.bids.iter().map(|(_, quantity)| quantity).sum()
    }

    pub fn total_ask_quantity(&self) -> u64 {
        self.asks.iter().map(|(_, quantity)| quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(s: &str) -> Price {
        s.parse().unwrap()
    }

    #[test]
    fn test_trade_record() {
        let symbol = Symbol::new("AAPL").unwrap();
        let md = MarketData::trade(symbol, 7, price("150.25"), 40, 2);

        assert!(md.is_trade());
        assert_eq!(md.sequence, 7);
        match md.kind {
            MarketDataKind::Trade {
                price: p,
                quantity,
                trade_id,
            } => {
                assert_eq!(p, price("150.25"));
                assert_eq!(quantity, 40);
                assert_eq!(trade_id, 2);
            },
            other => panic!("expected trade, got {:?}", other),
        }
    }

    #[test]
    fn test_snapshot_helpers() {
        let snapshot = OrderBookSnapshot::new(
            Symbol::new("AAPL").unwrap(),
            vec![(price("150.50"), 100), (price("150.00"), 30)],
            vec![(price("150.75"), 20)],
        );

        assert_eq!(snapshot.best_bid(), Some(price("150.50")));
        assert_eq!(snapshot.best_ask(), Some(price("150.75")));
        assert_eq!(snapshot.spread(), Some(price("0.25")));
        assert_eq!(snapshot.mid_price(), Some(price("150.625")));
        assert_eq!(snapshot.total_bid_quantity(), 130);
        assert_eq!(snapshot.total_ask_quantity(), 20);
    }

    #[test]
    fn test_snapshot_one_sided() {
        let snapshot = OrderBookSnapshot::new(
            Symbol::new("AAPL").unwrap(),
            vec![(price("150.50"), 100)],
            Vec::new(),
        );

        assert_eq!(snapshot.best_ask(), None);
        assert_eq!(snapshot.spread(), None);
        assert_eq!(snapshot.mid_price(), None);
    }
}
