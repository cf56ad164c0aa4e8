// ============================================================================
// Order Domain Model
// ============================================================================

use crate::domain::Symbol;
use crate::numeric::Price;
use crate::utils::monotonic_ns;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering as MemOrdering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Value Objects
// ============================================================================

/// Globally unique order identifier.
///
/// Ids are drawn from a single engine-wide monotonic counter; they never
/// encode client identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderId(u64);

impl OrderId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client session identifier, independent of order ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClientId(u64);

impl ClientId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OrderType {
    Market,
    Limit,
    /// Accepted and stored at its stop price, never activated.
    Stop,
    /// Accepted and stored at its stop price, never activated.
    StopLimit,
}

// ============================================================================
// Order Status Machine
// ============================================================================

pub mod status {
    #[cfg(feature = "serde")]
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[repr(u8)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub enum OrderStatus {
        Pending = 0,
        PartiallyFilled = 1,
        Filled = 2,
        Cancelled = 3,
        Rejected = 4,
    }

    impl OrderStatus {
        pub fn from_u8(val: u8) -> Self {
            match val {
                0 => OrderStatus::Pending,
                1 => OrderStatus::PartiallyFilled,
                2 => OrderStatus::Filled,
                3 => OrderStatus::Cancelled,
                _ => OrderStatus::Rejected,
            }
        }

        /// Filled, Cancelled and Rejected are terminal.
        pub fn is_terminal(&self) -> bool {
            matches!(
                self,
                OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
            )
        }

        pub fn can_be_cancelled(&self) -> bool {
            matches!(self, OrderStatus::Pending | OrderStatus::PartiallyFilled)
        }
    }
}

pub use status::OrderStatus;

// ============================================================================
// Order Entity
// ============================================================================

/// An order's immutable identity plus its mutable fill state.
///
/// Identity fields are plain; fill state lives in atomics so the order can be
/// observed through shared references from the id index and the price-level
/// FIFO while the owning book mutates it under its write guard.
#[derive(Debug)]
pub struct Order {
    pub id: OrderId,
    pub client_id: ClientId,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    /// Total quantity; strictly positive for accepted orders.
    pub quantity: u64,
    /// Limit price; `None` for market orders.
    pub price: Option<Price>,
    /// Trigger price for stop variants.
    pub stop_price: Option<Price>,
    /// Monotonic nanoseconds stamped at creation; drives time priority.
    pub timestamp_ns: u64,

    filled: AtomicU64,
    status: AtomicU8,
}

impl Order {
    pub fn new(
        id: OrderId,
        client_id: ClientId,
        symbol: Symbol,
        side: Side,
        order_type: OrderType,
        quantity: u64,
        price: Option<Price>,
    ) -> Self {
        Self {
            id,
            client_id,
            symbol,
            side,
            order_type,
            quantity,
            price,
            stop_price: None,
            timestamp_ns: monotonic_ns(),
            filled: AtomicU64::new(0),
            status: AtomicU8::new(OrderStatus::Pending as u8),
        }
    }

    /// Attach a stop trigger price (for `Stop` / `StopLimit` orders).
    pub fn with_stop_price(mut self, stop_price: Price) -> Self {
        self.stop_price = Some(stop_price);
        self
    }

    // ========================================================================
    // Atomic Accessors
    // ========================================================================

    pub fn filled_quantity(&self) -> u64 {
        self.filled.load(MemOrdering::Acquire)
    }

    pub fn remaining(&self) -> u64 {
        self.quantity.saturating_sub(self.filled_quantity())
    }

    pub fn status(&self) -> OrderStatus {
        OrderStatus::from_u8(self.status.load(MemOrdering::Acquire))
    }

    pub fn set_status(&self, status: OrderStatus) {
        self.status.store(status as u8, MemOrdering::Release);
    }

    // ========================================================================
    // Atomic Operations
    // ========================================================================

    /// Fill a quantity of this order.
    ///
    /// Returns false if the fill would exceed the remaining quantity; the
    /// order is left untouched in that case. On success the status advances
    /// to `PartiallyFilled` or `Filled`.
    pub fn fill(&self, quantity: u64) -> bool {
        loop {
            let filled = self.filled.load(MemOrdering::Acquire);
            let remaining = self.quantity - filled;

            if quantity > remaining {
                return false;
            }

            let next = filled + quantity;
            if self
                .filled
                .compare_exchange(filled, next, MemOrdering::AcqRel, MemOrdering::Acquire)
                .is_ok()
            {
                let status = if next == self.quantity {
                    OrderStatus::Filled
                } else {
                    OrderStatus::PartiallyFilled
                };
                self.set_status(status);
                return true;
            }
            // CAS lost a race, retry
        }
    }

    /// Cancel this order if it is still live.
    pub fn try_cancel(&self) -> bool {
        let current = self.status.load(MemOrdering::Acquire);
        if !OrderStatus::from_u8(current).can_be_cancelled() {
            return false;
        }

        self.status
            .compare_exchange(
                current,
                OrderStatus::Cancelled as u8,
                MemOrdering::AcqRel,
                MemOrdering::Acquire,
            )
            .is_ok()
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    pub fn is_filled(&self) -> bool {
        self.remaining() == 0
    }

    pub fn is_market_order(&self) -> bool {
        matches!(self.order_type, OrderType::Market)
    }

    pub fn is_limit_order(&self) -> bool {
        matches!(self.order_type, OrderType::Limit)
    }

    /// Price at which this order rests in the ladder.
    ///
    /// Market orders take a sentinel that guarantees immediate crossing so
    /// the one matching loop handles every order type; stop variants rest at
    /// their trigger price. The fallbacks are never reached for validated
    /// orders.
    pub fn ladder_price(&self) -> Price {
        match self.order_type {
            OrderType::Market => match self.side {
                Side::Buy => Price::MAX,
                Side::Sell => Price::ZERO,
            },
            OrderType::Limit => self.price.unwrap_or(Price::ZERO),
            OrderType::Stop | OrderType::StopLimit => {
                self.stop_price.or(self.price).unwrap_or(Price::ZERO)
            },
        }
    }

    /// Rebuild this order for a modify: same identity, new quantity and
    /// price, fill progress carried over, fresh timestamp. Losing time
    /// priority on modify is intentional.
    pub(crate) fn reissued(&self, new_quantity: u64, new_price: Price) -> Self {
        Self {
            id: self.id,
            client_id: self.client_id,
            symbol: self.symbol,
            side: self.side,
            order_type: self.order_type,
            quantity: new_quantity,
            price: Some(new_price),
            stop_price: self.stop_price,
            timestamp_ns: monotonic_ns(),
            filled: AtomicU64::new(self.filled_quantity()),
            status: AtomicU8::new(self.status.load(MemOrdering::Acquire)),
        }
    }
}

impl Clone for Order {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            client_id: self.client_id,
            symbol: self.symbol,
            side: self.side,
            order_type: self.order_type,
            quantity: self.quantity,
            price: self.price,
            stop_price: self.stop_price,
            timestamp_ns: self.timestamp_ns,
            filled: AtomicU64::new(self.filled.load(MemOrdering::Acquire)),
            status: AtomicU8::new(self.status.load(MemOrdering::Acquire)),
        }
    }
}

impl PartialEq for Order {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.client_id == other.client_id
            && self.symbol == other.symbol
            && self.side == other.side
            && self.order_type == other.order_type
            && self.quantity == other.quantity
            && self.price == other.price
            && self.stop_price == other.stop_price
            && self.timestamp_ns == other.timestamp_ns
            && self.filled.load(MemOrdering::Acquire) == other.filled.load(MemOrdering::Acquire)
            && self.status.load(MemOrdering::Acquire) == other.status.load(MemOrdering::Acquire)
    }
}

// ============================================================================
// Price-Time Priority
// ============================================================================

/// Compare two same-side orders by price-time priority.
///
/// `Ordering::Less` means `a` executes before `b`: buys prefer the higher
/// price, sells the lower, and the earlier timestamp breaks price ties.
/// Order id breaks exact timestamp ties so the ordering is total.
pub fn compare_priority(a: &Order, b: &Order) -> Ordering {
    debug_assert_eq!(a.side, b.side, "priority is only defined within one side");

    let by_price = match a.side {
        Side::Buy => b.ladder_price().cmp(&a.ladder_price()),
        Side::Sell => a.ladder_price().cmp(&b.ladder_price()),
    };

    by_price
        .then_with(|| a.timestamp_ns.cmp(&b.timestamp_ns))
        .then_with(|| a.id.cmp(&b.id))
}
