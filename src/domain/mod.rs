// ============================================================================
// Domain Models Module
// Contains all core domain entities and value objects
// ============================================================================

pub mod config;
pub mod market_data;
pub mod order;
pub mod symbol;
pub mod trade;

pub use config::EngineConfig;
pub use market_data::{MarketData, MarketDataKind, OrderBookSnapshot};
pub use order::{compare_priority, ClientId, Order, OrderId, OrderType, Side};
pub use symbol::{Symbol, MAX_SYMBOL_LEN};
pub use trade::Trade;

// Re-export the status machine
pub use order::status::OrderStatus;
