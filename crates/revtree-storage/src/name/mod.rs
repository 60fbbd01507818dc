//! Name dictionary.
//!
//! Names are interned per node kind. A name's key is a 31-multiplier string
//! hash over its UTF-16 code units, so the key of a known name can be
//! computed without a lookup. Every revision references its own immutable
//! copy of the dictionary through the name page.

use std::collections::BTreeMap;

use revtree_common::{NodeKind, RevtreeError, RevtreeResult, UNTYPED_TYPE_NAME};

/// Computes the dictionary key of a name.
pub fn name_key(name: &str) -> i32 {
    name.encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Key of the `xs:untyped` type name.
pub fn untyped_type_key() -> i32 {
    name_key(UNTYPED_TYPE_NAME)
}

/// One interned name and the number of nodes referencing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameEntry {
    /// The name.
    pub name: String,
    /// Reference count.
    pub count: u32,
}

/// Interned names partitioned by node kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameDictionary {
    partitions: BTreeMap<u8, BTreeMap<i32, NameEntry>>,
}

impl NameDictionary {
    /// Creates an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `name` under `kind`, bumping its reference count.
    ///
    /// # Errors
    ///
    /// Fails when a different name already occupies the same key.
    pub fn intern(&mut self, name: &str, kind: NodeKind) -> RevtreeResult<i32> {
        let key = name_key(name);
        let partition = self.partitions.entry(kind.as_u8()).or_default();
        match partition.get_mut(&key) {
            Some(entry) if entry.name == name => entry.count += 1,
            Some(entry) => {
                return Err(RevtreeError::invalid_argument(format!(
                    "name {name:?} collides with {:?} on key {key}",
                    entry.name
                )))
            }
            None => {
                partition.insert(
                    key,
                    NameEntry {
                        name: name.to_string(),
                        count: 1,
                    },
                );
            }
        }
        Ok(key)
    }

    /// Drops one reference to `key`; the entry disappears at zero.
    pub fn release(&mut self, key: i32, kind: NodeKind) {
        let Some(partition) = self.partitions.get_mut(&kind.as_u8()) else {
            return;
        };
        if let Some(entry) = partition.get_mut(&key) {
            entry.count = entry.count.saturating_sub(1);
            if entry.count == 0 {
                partition.remove(&key);
            }
        }
        if partition.is_empty() {
            self.partitions.remove(&kind.as_u8());
        }
    }

    /// Resolves `key` under `kind`.
    pub fn get(&self, key: i32, kind: NodeKind) -> Option<&str> {
        self.entry(key, kind).map(|e| e.name.as_str())
    }

    /// Reference count of `key` under `kind`; zero when unknown.
    pub fn count(&self, key: i32, kind: NodeKind) -> u32 {
        self.entry(key, kind).map_or(0, |e| e.count)
    }

    /// Total number of interned names across all kinds.
    pub fn len(&self) -> usize {
        self.partitions.values().map(BTreeMap::len).sum()
    }

    /// True if nothing is interned.
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Iterates over `(kind tag, key, entry)` in a stable order.
    pub fn entries(&self) -> impl Iterator<Item = (u8, i32, &NameEntry)> {
        self.partitions
            .iter()
            .flat_map(|(&kind, names)| names.iter().map(move |(&key, entry)| (kind, key, entry)))
    }

    /// Inserts a decoded entry as is.
    pub(crate) fn restore(&mut self, kind: u8, key: i32, entry: NameEntry) {
        self.partitions.entry(kind).or_default().insert(key, entry);
    }

    fn entry(&self, key: i32, kind: NodeKind) -> Option<&NameEntry> {
        self.partitions.get(&kind.as_u8())?.get(&key)
    }
}
