//! Durable page stores.
//!
//! A page store is the never-evicting tier behind the page cache. It maps
//! page keys to page containers and survives restarts when file-backed.
//!
//! - `PageStore` trait: the seam used by [`PageTiers`](crate::tiers::PageTiers)
//! - `PersistentPageStore`: append-only file with periodic durability syncs
//! - `MemoryPageStore`: hash map for in-memory resources and tests

mod file;
mod memory;

pub use file::PersistentPageStore;
pub use memory::MemoryPageStore;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use revtree_common::PageKey;

use crate::error::StoreResult;
use crate::page::PageContainer;

/// Abstract interface for a durable key to page container store.
pub trait PageStore: Send + Sync + fmt::Debug {
    /// Reads the container stored under `key`.
    ///
    /// A missing key is `Ok(None)`; faults are errors.
    fn get(&self, key: PageKey) -> StoreResult<Option<Arc<PageContainer>>>;

    /// Stores `container` under `key`, replacing any previous value.
    fn put(&self, key: PageKey, container: Arc<PageContainer>) -> StoreResult<()>;

    /// Stores every entry, in order.
    fn put_all(&self, entries: Vec<(PageKey, Arc<PageContainer>)>) -> StoreResult<()> {
        for (key, container) in entries {
            self.put(key, container)?;
        }
        Ok(())
    }

    /// Reads every entry, ordered by key.
    fn get_all(&self) -> StoreResult<Vec<(PageKey, Arc<PageContainer>)>>;

    /// Removes `key`. Removing an absent key is an error.
    fn remove(&self, key: PageKey) -> StoreResult<()>;

    /// Irreversibly destroys the store. Later calls fail with `Closed`.
    fn clear(&self) -> StoreResult<()>;

    /// Forces written entries to stable storage.
    fn sync(&self) -> StoreResult<()>;

    /// Number of live keys.
    fn len(&self) -> usize;

    /// True if the store holds no keys.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Operation counters.
    fn stats(&self) -> &StoreStats;
}

/// Counters of store operations.
#[derive(Debug, Default)]
pub struct StoreStats {
    puts: AtomicU64,
    removes: AtomicU64,
    syncs: AtomicU64,
}

impl StoreStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a put and returns the new put count.
    pub fn record_put(&self) -> u64 {
        self.puts.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Records a removal.
    pub fn record_remove(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a durability sync.
    pub fn record_sync(&self) {
        self.syncs.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of puts.
    pub fn puts(&self) -> u64 {
        self.puts.load(Ordering::Relaxed)
    }

    /// Number of removals.
    pub fn removes(&self) -> u64 {
        self.removes.load(Ordering::Relaxed)
    }

    /// Number of durability syncs.
    pub fn syncs(&self) -> u64 {
        self.syncs.load(Ordering::Relaxed)
    }
}

impl fmt::Display for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "puts={} removes={} syncs={}",
            self.puts(),
            self.removes(),
            self.syncs()
        )
    }
}
