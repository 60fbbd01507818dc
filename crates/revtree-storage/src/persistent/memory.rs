//! In-memory page store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use revtree_common::PageKey;

use super::{PageStore, StoreStats};
use crate::error::{StoreError, StoreResult};
use crate::page::PageContainer;

/// A page store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryPageStore {
    pages: RwLock<HashMap<PageKey, Arc<PageContainer>>>,
    stats: StoreStats,
    closed: AtomicBool,
}

impl MemoryPageStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn check_closed(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

impl PageStore for MemoryPageStore {
    fn get(&self, key: PageKey) -> StoreResult<Option<Arc<PageContainer>>> {
        self.check_closed()?;
        Ok(self.pages.read().get(&key).cloned())
    }

    fn put(&self, key: PageKey, container: Arc<PageContainer>) -> StoreResult<()> {
        self.check_closed()?;
        self.pages.write().insert(key, container);
        self.stats.record_put();
        Ok(())
    }

    fn get_all(&self) -> StoreResult<Vec<(PageKey, Arc<PageContainer>)>> {
        self.check_closed()?;
        let mut entries: Vec<_> = self
            .pages
            .read()
            .iter()
            .map(|(key, container)| (*key, Arc::clone(container)))
            .collect();
        entries.sort_by_key(|(key, _)| *key);
        Ok(entries)
    }

    fn remove(&self, key: PageKey) -> StoreResult<()> {
        self.check_closed()?;
        self.pages
            .write()
            .remove(&key)
            .ok_or(StoreError::KeyNotFound { key })?;
        self.stats.record_remove();
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        self.check_closed()?;
        self.closed.store(true, Ordering::Release);
        self.pages.write().clear();
        Ok(())
    }

    fn sync(&self) -> StoreResult<()> {
        self.check_closed()
    }

    fn len(&self) -> usize {
        self.pages.read().len()
    }

    fn stats(&self) -> &StoreStats {
        &self.stats
    }
}
