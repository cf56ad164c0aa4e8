// ============================================================================
// Order Book Registry
// Symbol to book mapping, read-mostly
// ============================================================================

use crate::domain::Symbol;
use crate::engine::OrderBook;
use crate::interfaces::EventSink;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Concurrent mapping from symbol to its order book.
///
/// Books are created lazily on first reference and live for the engine's
/// lifetime. Lookups take the shared guard; only `get_or_create` of a new
/// symbol and `remove` take the exclusive guard. The registry guard is never
/// held across book mutation, so cross-symbol work is not serialized.
pub struct OrderBookRegistry {
    books: RwLock<HashMap<Symbol, Arc<OrderBook>>>,
    sink: Arc<dyn EventSink>,
}

impl OrderBookRegistry {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            books: RwLock::new(HashMap::new()),
            sink,
        }
    }

    /// Look up the book for a symbol, creating it if absent.
    pub fn get_or_create(&self, symbol: Symbol) -> Arc<OrderBook> {
        if let Some(book) = self.books.read().get(&symbol) {
            return Arc::clone(book);
        }

        let mut books = self.books.write();
        // Double-check: another writer may have created it while we upgraded.
        Arc::clone(
            books
                .entry(symbol)
                .or_insert_with(|| Arc::new(OrderBook::new(symbol, Arc::clone(&self.sink)))),
        )
    }

    /// Look up the book for a symbol.
    pub fn get(&self, symbol: &Symbol) -> Option<Arc<OrderBook>> {
        self.books.read().get(symbol).cloned()
    }

    /// All known symbols, in no particular order.
    pub fn symbols(&self) -> Vec<Symbol> {
        self.books.read().keys().copied().collect()
    }

    /// Number of books.
    pub fn count(&self) -> usize {
        self.books.read().len()
    }

    /// Remove a book. Refuses (returns false) while the book still holds
    /// resting orders, so an in-flight cancel can never target a dropped
    /// book.
    pub fn remove(&self, symbol: &Symbol) -> bool {
        let mut books = self.books.write();
        match books.get(symbol) {
            Some(book) if book.order_count() > 0 => false,
            Some(_) => {
                books.remove(symbol);
                true
            },
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClientId, Order, OrderId, OrderType, Side};
    use crate::interfaces::NoOpEventSink;

    fn registry() -> OrderBookRegistry {
        OrderBookRegistry::new(Arc::new(NoOpEventSink))
    }

    fn symbol(s: &str) -> Symbol {
        Symbol::new(s).unwrap()
    }

    #[test]
    fn test_lazy_creation() {
        let registry = registry();
        assert_eq!(registry.count(), 0);
        assert!(registry.get(&symbol("AAPL")).is_none());

        let book = registry.get_or_create(symbol("AAPL"));
        assert_eq!(book.symbol(), symbol("AAPL"));
        assert_eq!(registry.count(), 1);

        // Same book handed out on repeat lookups
        let again = registry.get_or_create(symbol("AAPL"));
        assert!(Arc::ptr_eq(&book, &again));
    }

    #[test]
    fn test_symbols() {
        let registry = registry();
        registry.get_or_create(symbol("AAPL"));
        registry.get_or_create(symbol("MSFT"));

        let mut symbols = registry.symbols();
        symbols.sort();
        assert_eq!(symbols, vec![symbol("AAPL"), symbol("MSFT")]);
    }

    #[test]
    fn test_remove_refuses_live_orders() {
        let registry = registry();
        let book = registry.get_or_create(symbol("AAPL"));
        book.add_order(Arc::new(Order::new(
            OrderId::new(1),
            ClientId::new(1),
            symbol("AAPL"),
            Side::Buy,
            OrderType::Limit,
            10,
            Some("150".parse().unwrap()),
        )))
        .unwrap();

        assert!(!registry.remove(&symbol("AAPL")));
        assert_eq!(registry.count(), 1);

        book.cancel_order(OrderId::new(1)).unwrap();
        assert!(registry.remove(&symbol("AAPL")));
        assert_eq!(registry.count(), 0);

        // Unknown symbol
        assert!(!registry.remove(&symbol("MSFT")));
    }
}
