//! Cursor-local atomic values.
//!
//! Query evaluation can park atomic values next to the tree and visit them
//! with the same cursor. They live under synthetic negative keys starting
//! at `FIRST_ITEM_KEY` and are never persisted.

use bytes::Bytes;
use revtree_common::FIRST_ITEM_KEY;
use revtree_storage::name::untyped_type_key;

/// An atomic value with its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicValue {
    /// Encoded value.
    pub value: Bytes,
    /// Dictionary key of the type name.
    pub type_key: i32,
}

impl AtomicValue {
    /// Creates a typed value.
    pub fn new(value: impl Into<Bytes>, type_key: i32) -> Self {
        Self {
            value: value.into(),
            type_key,
        }
    }

    /// Creates an `xs:untyped` value.
    pub fn untyped(value: impl Into<Bytes>) -> Self {
        Self::new(value, untyped_type_key())
    }
}

/// Values addressed by keys `-2, -3, ...` in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ItemList {
    items: Vec<AtomicValue>,
}

impl ItemList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` and returns its key.
    pub fn add(&mut self, value: AtomicValue) -> i64 {
        let key = FIRST_ITEM_KEY - self.items.len() as i64;
        self.items.push(value);
        key
    }

    /// Looks up the value under `key`.
    pub fn get(&self, key: i64) -> Option<&AtomicValue> {
        if key > FIRST_ITEM_KEY {
            return None;
        }
        usize::try_from(FIRST_ITEM_KEY - key)
            .ok()
            .and_then(|index| self.items.get(index))
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if no value was added.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drops all values.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_count_down_from_first_item_key() {
        let mut items = ItemList::new();
        assert_eq!(items.add(AtomicValue::untyped("a")), -2);
        assert_eq!(items.add(AtomicValue::new("b", 7)), -3);
        assert_eq!(items.len(), 2);

        assert_eq!(items.get(-2).map(|v| v.value.as_ref()), Some(&b"a"[..]));
        assert_eq!(items.get(-3).map(|v| v.type_key), Some(7));
        assert!(items.get(-4).is_none());
        assert!(items.get(-1).is_none());
        assert!(items.get(0).is_none());
    }

    #[test]
    fn test_clear() {
        let mut items = ItemList::new();
        items.add(AtomicValue::untyped("a"));
        items.clear();
        assert!(items.is_empty());
        assert!(items.get(-2).is_none());
    }
}
