//! Core identifier types for revtree.
//!
//! These types provide type-safe wrappers around numeric identifiers,
//! preventing accidental misuse of page keys and transaction ids.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::UBER_PAGE_KEY;

/// Page key - identifies one page container in the durable store.
///
/// Committed pages are never overwritten; every new version of a page gets
/// a fresh key. The only exception is the uber page, which always lives at
/// [`PageKey::UBER`].
///
/// # Example
///
/// ```rust
/// use revtree_common::types::PageKey;
///
/// let page = PageKey::new(42);
/// assert_eq!(page.as_u64(), 42);
/// assert_eq!(page.next().as_u64(), 43);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PageKey(u64);

impl PageKey {
    /// Invalid page key constant, used as a sentinel value.
    pub const INVALID: Self = Self(u64::MAX);

    /// Key of the uber page.
    pub const UBER: Self = Self(UBER_PAGE_KEY);

    /// First key handed out to a non-uber page.
    pub const FIRST: Self = Self(UBER_PAGE_KEY + 1);

    /// Creates a new `PageKey` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(key: u64) -> Self {
        Self(key)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next page key.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Checks if this is a valid page key.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }

    /// Creates a `PageKey` from bytes (big-endian).
    #[inline]
    #[must_use]
    pub fn from_be_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_be_bytes(bytes))
    }

    /// Converts to bytes (big-endian).
    #[inline]
    #[must_use]
    pub fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Debug for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "PageKey(INVALID)")
        } else {
            write!(f, "PageKey({})", self.0)
        }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PageKey {
    #[inline]
    fn from(key: u64) -> Self {
        Self::new(key)
    }
}

impl From<PageKey> for u64 {
    #[inline]
    fn from(key: PageKey) -> Self {
        key.0
    }
}

/// Transaction identifier - identifies a read or write transaction on a
/// resource. Ids are handed out in increasing order by the resource session.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TrxId(u64);

impl TrxId {
    /// First transaction id.
    pub const FIRST: Self = Self(1);

    /// Creates a new `TrxId`.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TrxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrxId({})", self.0)
    }
}

impl fmt::Display for TrxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TrxId {
    #[inline]
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_key() {
        let key = PageKey::new(42);
        assert_eq!(key.as_u64(), 42);
        assert!(key.is_valid());
        assert!(!PageKey::INVALID.is_valid());
        assert_eq!(key.next().as_u64(), 43);
        assert_eq!(PageKey::UBER.as_u64(), 0);
        assert!(PageKey::FIRST > PageKey::UBER);
    }

    #[test]
    fn test_page_key_bytes() {
        let key = PageKey::new(0x0102_0304_0506_0708);
        assert_eq!(PageKey::from_be_bytes(key.to_be_bytes()), key);
    }

    #[test]
    fn test_page_key_debug() {
        assert_eq!(format!("{:?}", PageKey::new(7)), "PageKey(7)");
        assert_eq!(format!("{:?}", PageKey::INVALID), "PageKey(INVALID)");
    }

    #[test]
    fn test_trx_id() {
        let id = TrxId::new(5);
        assert_eq!(id.as_u64(), 5);
        assert_eq!(id.to_string(), "5");
        assert!(TrxId::FIRST < id);
    }
}
