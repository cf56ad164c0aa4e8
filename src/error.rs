// ============================================================================
// Engine Errors
// Named error kinds for the submission pipeline and book operations
// ============================================================================

use crate::domain::{OrderId, Symbol};
use thiserror::Error;

/// Errors reported by the matching engine and its components.
///
/// Validation errors on `submit_*` are returned to the caller and counted;
/// none are retried. Matching-path inconsistencies are programmer bugs and
/// abort the worker instead of surfacing here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The target ring queue is at capacity; the submission was dropped.
    #[error("queue is full")]
    QueueFull,

    /// The ring queue has no items to consume.
    #[error("queue is empty")]
    QueueEmpty,

    /// An order with this id is already resting in the book.
    #[error("duplicate order id {0}")]
    DuplicateOrderId(OrderId),

    /// No resting order with this id.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// The order was routed to a book for a different symbol.
    #[error("order symbol {order} does not match book symbol {book}")]
    SymbolMismatch { book: Symbol, order: Symbol },

    /// Limit and stop prices must be strictly positive.
    #[error("price must be positive")]
    InvalidPrice,

    /// Order quantity must be strictly positive.
    #[error("quantity must be positive")]
    InvalidQuantity,

    /// Symbols are 1-16 bytes of printable ASCII.
    #[error("symbol must be 1-16 bytes of printable ASCII")]
    InvalidSymbol,

    /// The engine has not been started (or has been stopped).
    #[error("engine is not running")]
    NotRunning,

    /// `start` was called on a running engine.
    #[error("engine is already running")]
    AlreadyRunning,

    /// A worker thread failed to spawn; all previously started workers
    /// have been rolled back.
    #[error("engine startup failed: {0}")]
    StartupFailed(String),

    /// A shutdown has been requested; no new submissions are accepted.
    #[error("shutdown in progress")]
    ShutdownInProgress,

    /// The engine configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
