// ============================================================================
// Symbol
// Inline instrument identifier used as the book routing key
// ============================================================================

use crate::error::EngineError;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Maximum symbol length in bytes.
pub const MAX_SYMBOL_LEN: usize = 16;

/// Instrument identifier, stored inline.
///
/// Symbols are 1-16 bytes of printable ASCII and are treated as opaque
/// equality/hash keys. The inline representation keeps them `Copy`, so they
/// move through ring-queue slots without touching the heap.
#[derive(Clone, Copy)]
pub struct Symbol {
    bytes: [u8; MAX_SYMBOL_LEN],
    len: u8,
}

impl Symbol {
    /// Create a symbol from a string.
    ///
    /// # Errors
    /// `InvalidSymbol` if the input is empty, longer than 16 bytes, or
    /// contains anything other than printable ASCII.
    pub fn new(s: &str) -> Result<Self, EngineError> {
        let raw = s.as_bytes();
        if raw.is_empty() || raw.len() > MAX_SYMBOL_LEN {
            return Err(EngineError::InvalidSymbol);
        }
        if !raw.iter().all(|b| b.is_ascii_graphic()) {
            return Err(EngineError::InvalidSymbol);
        }

        let mut bytes = [0u8; MAX_SYMBOL_LEN];
        bytes[..raw.len()].copy_from_slice(raw);
        Ok(Self {
            bytes,
            len: raw.len() as u8,
        })
    }

    /// View the symbol as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        // SAFETY: the constructor only admits printable ASCII bytes.
        unsafe { std::str::from_utf8_unchecked(&self.bytes[..self.len as usize]) }
    }

    /// Length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

// Trailing bytes are always zeroed, so comparing the raw arrays is sound,
// but string comparison keeps the ordering lexicographic.
impl PartialEq for Symbol {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Symbol {}

impl PartialOrd for Symbol {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl Hash for Symbol {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.as_str())
    }
}

impl FromStr for Symbol {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for Symbol {
    type Error = EngineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Symbol {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Symbol {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Symbol::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let sym = Symbol::new("AAPL").unwrap();
        assert_eq!(sym.as_str(), "AAPL");
        assert_eq!(sym.len(), 4);
        assert_eq!(sym.to_string(), "AAPL");
    }

    #[test]
    fn test_equality_and_hash_key() {
        use std::collections::HashMap;

        let a = Symbol::new("GOOGL").unwrap();
        let b = Symbol::new("GOOGL").unwrap();
        let c = Symbol::new("MSFT").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut map = HashMap::new();
        map.insert(a, 1);
        assert_eq!(map.get(&b), Some(&1));
        assert_eq!(map.get(&c), None);
    }

    #[test]
    fn test_max_length() {
        let sixteen = "ABCDEFGHIJKLMNOP";
        assert_eq!(sixteen.len(), MAX_SYMBOL_LEN);
        assert!(Symbol::new(sixteen).is_ok());
        assert_eq!(
            Symbol::new("ABCDEFGHIJKLMNOPQ"),
            Err(EngineError::InvalidSymbol)
        );
    }

    #[test]
    fn test_rejects_invalid() {
        assert_eq!(Symbol::new(""), Err(EngineError::InvalidSymbol));
        assert_eq!(Symbol::new("A B"), Err(EngineError::InvalidSymbol));
        assert_eq!(Symbol::new("Ä"), Err(EngineError::InvalidSymbol));
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let a = Symbol::new("A").unwrap();
        let ab = Symbol::new("AB").unwrap();
        let b = Symbol::new("B").unwrap();
        assert!(a < ab);
        assert!(ab < b);
    }
}
