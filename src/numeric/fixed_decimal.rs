// ============================================================================
// Fixed-Point Decimal
// High-performance fixed-point arithmetic with compile-time precision
// ============================================================================

use super::errors::{NumericError, NumericResult};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Neg;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Fixed-point decimal number with compile-time precision.
///
/// Internally stores `value × 10^DECIMALS` as an i64. Unlike `f64`, the
/// representation is exact and totally ordered, so it can serve as a
/// `BTreeMap` key for price ladders.
///
/// # Type Parameter
/// - `DECIMALS`: Number of decimal places (0-18). Default is 4.
///
/// # Value Range
/// With DECIMALS=4 (default):
/// - Minimum: -922,337,203,685,477.5808
/// - Maximum: +922,337,203,685,477.5807
/// - Precision: 0.0001
///
/// # Example
/// ```ignore
/// use matchbook::numeric::Price;
///
/// let price: Price = "150.50".parse()?;
/// let notional = price.checked_mul_int(100)?;   // 15050.0000
/// ```
#[derive(Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(transparent)]
pub struct FixedDecimal<const DECIMALS: u8 = 4>(i64);

/// Compute 10^n at compile time
const fn pow10(n: u8) -> i64 {
    let mut result: i64 = 1;
    let mut i = 0;
    while i < n {
        result *= 10;
        i += 1;
    }
    result
}

impl<const D: u8> FixedDecimal<D> {
    /// The scale factor (10^DECIMALS)
    pub const SCALE: i64 = pow10(D);

    /// Zero value
    pub const ZERO: Self = Self(0);

    /// One (1.0)
    pub const ONE: Self = Self(pow10(D));

    /// Maximum representable value
    pub const MAX: Self = Self(i64::MAX);

    /// Minimum representable value
    pub const MIN: Self = Self(i64::MIN);

    // ========================================================================
    // Construction
    // ========================================================================

    /// Create from raw internal representation (a value already scaled by
    /// `10^DECIMALS`).
    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Create from an integer value.
    ///
    /// # Errors
    /// Returns `Overflow` if the value is too large to represent.
    #[inline]
    pub fn from_integer(value: i64) -> NumericResult<Self> {
        value
            .checked_mul(Self::SCALE)
            .map(Self)
            .ok_or(NumericError::Overflow)
    }

    /// Create from integer and fractional parts.
    ///
    /// # Arguments
    /// - `integer`: The integer part (can be negative)
    /// - `fraction`: The fractional part scaled to DECIMALS digits
    ///
    /// # Example
    /// ```ignore
    /// // Create 150.25 with 4 decimals
    /// let x = FixedDecimal::<4>::from_parts(150, 2_500)?;
    /// ```
    #[inline]
    pub fn from_parts(integer: i64, fraction: u64) -> NumericResult<Self> {
        if fraction >= Self::SCALE as u64 {
            return Err(NumericError::InvalidInput);
        }

        let int_scaled = integer
            .checked_mul(Self::SCALE)
            .ok_or(NumericError::Overflow)?;

        let frac_signed = if integer < 0 {
            -(fraction as i64)
        } else {
            fraction as i64
        };

        int_scaled
            .checked_add(frac_signed)
            .map(Self)
            .ok_or(NumericError::Overflow)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Get the raw internal value (scaled).
    #[inline]
    pub const fn raw_value(self) -> i64 {
        self.0
    }

    /// Get the integer part (truncated toward zero).
    #[inline]
    pub const fn integer_part(self) -> i64 {
        self.0 / Self::SCALE
    }

    /// Get the fractional part as a positive value.
    #[inline]
    pub const fn fractional_part(self) -> u64 {
        (self.0 % Self::SCALE).unsigned_abs()
    }

    /// Check if value is zero.
    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Check if value is strictly positive.
    #[inline]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    // ========================================================================
    // Arithmetic Operations
    // ========================================================================

    /// Checked addition.
    ///
    /// # Errors
    /// Returns `Overflow` or `Underflow` if the result is out of range.
    #[inline]
    pub fn checked_add(self, rhs: Self) -> NumericResult<Self> {
        self.0.checked_add(rhs.0).map(Self).ok_or_else(|| {
            if rhs.0 > 0 {
                NumericError::Overflow
            } else {
                NumericError::Underflow
            }
        })
    }

    /// Checked subtraction.
    ///
    /// # Errors
    /// Returns `Overflow` or `Underflow` if the result is out of range.
    #[inline]
    pub fn checked_sub(self, rhs: Self) -> NumericResult<Self> {
        self.0.checked_sub(rhs.0).map(Self).ok_or_else(|| {
            if rhs.0 < 0 {
                NumericError::Overflow
            } else {
                NumericError::Underflow
            }
        })
    }

    /// Saturating addition; clamps at the representable range.
    #[inline]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Multiply by an integer (no rescaling needed).
    ///
    /// # Errors
    /// Returns `Overflow` if the result is out of range.
    #[inline]
    pub fn checked_mul_int(self, rhs: i64) -> NumericResult<Self> {
        self.0
            .checked_mul(rhs)
            .map(Self)
            .ok_or(NumericError::Overflow)
    }

    /// Multiply by an integer, clamping at the representable range.
    #[inline]
    pub const fn saturating_mul_int(self, rhs: i64) -> Self {
        Self(self.0.saturating_mul(rhs))
    }

    /// Arithmetic mean of two values, truncated toward zero on a half-unit
    /// tie. The intermediate sum is widened to i128 and cannot overflow.
    #[inline]
    pub const fn midpoint(self, other: Self) -> Self {
        let sum = self.0 as i128 + other.0 as i128;
        Self((sum / 2) as i64)
    }

    // ========================================================================
    // Comparison
    // ========================================================================

    /// Returns the minimum of two values.
    #[inline]
    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }

    /// Returns the maximum of two values.
    #[inline]
    pub fn max(self, other: Self) -> Self {
        Self(self.0.max(other.0))
    }
}

// ============================================================================
// Trait Implementations
// ============================================================================

impl<const D: u8> Default for FixedDecimal<D> {
    #[inline]
    fn default() -> Self {
        Self::ZERO
    }
}

impl<const D: u8> PartialEq for FixedDecimal<D> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<const D: u8> Eq for FixedDecimal<D> {}

impl<const D: u8> PartialOrd for FixedDecimal<D> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.0.cmp(&other.0))
    }
}

impl<const D: u8> Ord for FixedDecimal<D> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<const D: u8> Hash for FixedDecimal<D> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<const D: u8> Neg for FixedDecimal<D> {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

// ============================================================================
// Display and Debug
// ============================================================================

impl<const D: u8> fmt::Debug for FixedDecimal<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedDecimal<{}>({}, raw={})", D, self, self.0)
    }
}

impl<const D: u8> fmt::Display for FixedDecimal<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let int_part = self.integer_part();
        let frac_part = self.fractional_part();

        if D == 0 {
            write!(f, "{}", int_part)
        } else if self.0 < 0 && int_part == 0 {
            // Handle -0.xxx case
            write!(f, "-0.{:0>width$}", frac_part, width = D as usize)
        } else {
            write!(f, "{}.{:0>width$}", int_part, frac_part, width = D as usize)
        }
    }
}

// ============================================================================
// Conversion from rust_decimal (for API boundaries)
// ============================================================================

impl<const D: u8> FixedDecimal<D> {
    /// Convert from rust_decimal::Decimal.
    ///
    /// This is intended for API boundaries only (parsing client input).
    /// The conversion normalizes the scale to match DECIMALS.
    ///
    /// # Errors
    /// - `PrecisionLoss` if significant digits would be lost
    /// - `Overflow` if the value is too large
    pub fn from_decimal(d: rust_decimal::Decimal) -> NumericResult<Self> {
        use rust_decimal::prelude::ToPrimitive;

        let decimal_scale = d.scale();
        let target_scale = D as u32;

        let multiplier = rust_decimal::Decimal::from(Self::SCALE);
        let scaled = d * multiplier;

        let raw = scaled.to_i64().ok_or(NumericError::Overflow)?;

        if decimal_scale > target_scale {
            let reconstructed =
                rust_decimal::Decimal::from(raw) / rust_decimal::Decimal::from(Self::SCALE);
            if reconstructed != d {
                return Err(NumericError::PrecisionLoss);
            }
        }

        Ok(Self(raw))
    }

    /// Convert to rust_decimal::Decimal (for display and reporting).
    pub fn to_decimal(self) -> rust_decimal::Decimal {
        let mut d = rust_decimal::Decimal::from(self.0);
        d.set_scale(D as u32).expect("valid scale");
        d
    }
}

// ============================================================================
// String Parsing
// ============================================================================

impl<const D: u8> std::str::FromStr for FixedDecimal<D> {
    type Err = NumericError;

    /// Parse from a decimal string.
    ///
    /// # Examples
    /// - "150" -> 150.0000
    /// - "150.50" -> 150.5000
    /// - "-0.25" -> -0.2500
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(NumericError::InvalidInput);
        }

        let (is_negative, s) = if let Some(rest) = s.strip_prefix('-') {
            (true, rest)
        } else {
            (false, s)
        };

        let (int_str, frac_str) = if let Some(pos) = s.find('.') {
            (&s[..pos], Some(&s[pos + 1..]))
        } else {
            (s, None)
        };

        let int_val: i64 = if int_str.is_empty() {
            0
        } else {
            int_str.parse().map_err(|_| NumericError::InvalidInput)?
        };

        let frac_val: u64 = if let Some(frac) = frac_str {
            if frac.is_empty() {
                0
            } else if frac.len() > D as usize {
                return Err(NumericError::PrecisionLoss);
            } else {
                // Pad with zeros to reach DECIMALS length
                let padded = format!("{:0<width$}", frac, width = D as usize);
                padded.parse().map_err(|_| NumericError::InvalidInput)?
            }
        } else {
            0
        };

        let mut result = Self::from_parts(int_val, frac_val)?;
        if is_negative {
            result = -result;
        }

        Ok(result)
    }
}

// ============================================================================
// Type Alias
// ============================================================================

/// Price with 4 decimal places.
///
/// Four places cover equity-style ticks exactly while leaving enough i64
/// headroom for a book's cumulative notional volume counter.
pub type Price = FixedDecimal<4>;

// ============================================================================
// Tests
// ============================================================================
