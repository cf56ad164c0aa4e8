// ============================================================================
// Trade Domain Model
// ============================================================================

use chrono::{DateTime, Utc};

use super::{OrderId, Symbol};
use crate::numeric::Price;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A matched trade between a resting buy and a resting sell.
///
/// Trade ids are sequential per book, starting at 1. The execution price is
/// the midpoint of the two orders' limit prices; see the matching loop for
/// the policy.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Trade {
    pub id: u64,
    pub symbol: Symbol,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub price: Price,
    pub quantity: u64,
    /// Wall-clock execution time, for reporting.
    pub timestamp: DateTime<Utc>,
}

impl Trade {
    pub fn new(
        id: u64,
        symbol: Symbol,
        buy_order_id: OrderId,
        sell_order_id: OrderId,
        price: Price,
        quantity: u64,
    ) -> Self {
        Self {
            id,
            symbol,
            buy_order_id,
            sell_order_id,
            price,
            quantity,
            timestamp: Utc::now(),
        }
    }

    /// Notional value of the trade (price × quantity), clamped at the
    /// representable range.
    pub fn notional_value(&self) -> Price {
        self.price.saturating_mul_int(self.quantity as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_creation() {
        let trade = Trade::new(
            1,
            Symbol::new("AAPL").unwrap(),
            OrderId::new(10),
            OrderId::new(11),
            "150.25".parse().unwrap(),
            40,
        );

        assert_eq!(trade.id, 1);
        assert_eq!(trade.symbol.as_str(), "AAPL");
        assert_eq!(trade.quantity, 40);
        assert_eq!(trade.notional_value().to_string(), "6010.0000");
    }
}
