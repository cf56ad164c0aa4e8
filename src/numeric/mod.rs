// ============================================================================
// Numeric Module
// Fixed-point arithmetic for prices and notional volumes
// ============================================================================
//
// This module provides:
// - FixedDecimal<D>: Fixed-point decimal with compile-time precision
// - NumericError: Error types for arithmetic operations
// - Price: the 4-decimal-place alias used throughout the engine
//
// Design principles:
// - No floating-point operations; prices are total-ordered map keys
// - All fallible arithmetic returns Result
// - Compile-time configurable precision via const generics

mod errors;
mod fixed_decimal;

pub use errors::{NumericError, NumericResult};
pub use fixed_decimal::{FixedDecimal, Price};
