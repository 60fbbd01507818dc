//! Shared page tiers.
//!
//! `PageTiers` pairs the bounded page cache with the durable store. Readers
//! resolve through [`PageTiers::fetch`]; the single writer publishes new
//! pages through [`PageTiers::publish`], which writes the store first and
//! then refreshes the cache.
//!
//! The uber page is the only page that is overwritten, so it never enters
//! the cache: a reader filling the cache with an uber page it read just
//! before a commit would otherwise hide that commit.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use revtree_cache::{CacheStats, SharedLruCache};
use revtree_common::{PageKey, RevtreeError, RevtreeResult, TrxId};
use tracing::trace;

use crate::page::{Page, PageContainer, UberPage};
use crate::persistent::PageStore;

/// The cache and store shared by all transactions of one resource.
pub struct PageTiers {
    cache: SharedLruCache<PageKey, Arc<PageContainer>>,
    store: Arc<dyn PageStore>,
    writer: Mutex<Option<TrxId>>,
}

impl PageTiers {
    /// Creates tiers over `store` with a cache of `cache_capacity` pages.
    pub fn new(store: Arc<dyn PageStore>, cache_capacity: usize) -> Self {
        Self {
            cache: SharedLruCache::new(cache_capacity),
            store,
            writer: Mutex::new(None),
        }
    }

    /// Resolves `key`, consulting the cache before the store.
    ///
    /// Containers read from the store are cached, except the uber page,
    /// which is always read from the store.
    pub fn fetch(&self, key: PageKey) -> RevtreeResult<Option<Arc<PageContainer>>> {
        if key == PageKey::UBER {
            return Ok(self.store.get(key)?);
        }
        if let Some(container) = self.cache.get(&key) {
            return Ok(Some(container));
        }

        trace!(page = %key, "page cache miss");
        let Some(container) = self.store.get(key)? else {
            return Ok(None);
        };
        self.cache.insert(key, Arc::clone(&container));
        Ok(Some(container))
    }

    /// Writes `container` under `key` to the store, then to the cache.
    pub fn publish(&self, key: PageKey, container: Arc<PageContainer>) -> RevtreeResult<()> {
        self.store.put(key, Arc::clone(&container))?;
        if key != PageKey::UBER {
            self.cache.insert(key, container);
        }
        Ok(())
    }

    /// Forces the store to stable storage.
    pub fn sync(&self) -> RevtreeResult<()> {
        self.store.sync()?;
        Ok(())
    }

    /// Reads the uber page; `None` for a resource that was never bootstrapped.
    pub fn load_uber(&self) -> RevtreeResult<Option<UberPage>> {
        let Some(container) = self.fetch(PageKey::UBER)? else {
            return Ok(None);
        };
        match container.complete() {
            Page::Uber(uber) => Ok(Some(uber.clone())),
            other => Err(RevtreeError::corruption(format!(
                "page {} holds a {} page instead of the uber page",
                PageKey::UBER,
                other.kind()
            ))),
        }
    }

    /// Registers `id` as the resource's only writer.
    ///
    /// # Errors
    ///
    /// `ConcurrentWriter` if another writer is active.
    pub fn acquire_writer(&self, id: TrxId) -> RevtreeResult<()> {
        let mut writer = self.writer.lock();
        match *writer {
            Some(active) => Err(RevtreeError::ConcurrentWriter { active }),
            None => {
                *writer = Some(id);
                Ok(())
            }
        }
    }

    /// Releases the writer slot if `id` holds it.
    pub fn release_writer(&self, id: TrxId) {
        let mut writer = self.writer.lock();
        if *writer == Some(id) {
            *writer = None;
        }
    }

    /// Id of the active writer, if any.
    pub fn active_writer(&self) -> Option<TrxId> {
        *self.writer.lock()
    }

    /// The durable store.
    pub fn store(&self) -> &Arc<dyn PageStore> {
        &self.store
    }

    /// Snapshot of the cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Number of cached containers.
    pub fn cached_pages(&self) -> usize {
        self.cache.len()
    }

    /// Evicts every cached container. The store is untouched.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

impl fmt::Debug for PageTiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageTiers")
            .field("cache", &self.cache)
            .field("store", &self.store)
            .field("writer", &self.active_writer())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::RecordPage;
    use crate::persistent::MemoryPageStore;

    fn tiers(capacity: usize) -> PageTiers {
        PageTiers::new(Arc::new(MemoryPageStore::new()), capacity)
    }

    fn record(page_number: u64) -> Arc<PageContainer> {
        Arc::new(PageContainer::new(Page::Record(RecordPage::new(page_number))))
    }

    #[test]
    fn test_fetch_fills_cache() {
        let tiers = tiers(4);
        tiers.store().put(PageKey::new(1), record(1)).unwrap();

        assert!(tiers.fetch(PageKey::new(1)).unwrap().is_some());
        assert_eq!(tiers.cache_stats().misses(), 1);
        assert!(tiers.fetch(PageKey::new(1)).unwrap().is_some());
        assert_eq!(tiers.cache_stats().hits(), 1);
        assert_eq!(tiers.cached_pages(), 1);

        assert!(tiers.fetch(PageKey::new(2)).unwrap().is_none());
    }

    #[test]
    fn test_evicted_pages_come_back_from_store() {
        let tiers = tiers(1);
        tiers.publish(PageKey::new(1), record(1)).unwrap();
        tiers.publish(PageKey::new(2), record(2)).unwrap();
        assert_eq!(tiers.cached_pages(), 1);

        let page = tiers.fetch(PageKey::new(1)).unwrap().unwrap();
        assert_eq!(page.complete().as_record().map(|p| p.page_number), Some(1));
        assert_eq!(tiers.store().len(), 2);
    }

    #[test]
    fn test_load_uber() {
        let tiers = tiers(4);
        assert!(tiers.load_uber().unwrap().is_none());

        tiers
            .publish(PageKey::UBER, Arc::new(PageContainer::new(Page::Uber(UberPage::new()))))
            .unwrap();
        assert_eq!(tiers.load_uber().unwrap(), Some(UberPage::new()));
    }

    #[test]
    fn test_uber_page_bypasses_cache() {
        let tiers = tiers(4);
        let mut uber = UberPage::new();
        tiers
            .publish(PageKey::UBER, Arc::new(PageContainer::new(Page::Uber(uber.clone()))))
            .unwrap();
        assert_eq!(tiers.cached_pages(), 0);
        assert_eq!(tiers.load_uber().unwrap(), Some(uber.clone()));

        // A newer uber page written behind the cache is seen at once.
        uber.revision_roots.push(PageKey::new(9));
        tiers
            .store()
            .put(PageKey::UBER, Arc::new(PageContainer::new(Page::Uber(uber.clone()))))
            .unwrap();
        assert_eq!(tiers.load_uber().unwrap(), Some(uber));
        assert_eq!(tiers.cached_pages(), 0);
        assert_eq!(tiers.cache_stats().lookups(), 0);
    }

    #[test]
    fn test_uber_slot_with_wrong_page_is_corruption() {
        let tiers = tiers(4);
        tiers.publish(PageKey::UBER, record(0)).unwrap();
        assert!(matches!(
            tiers.load_uber(),
            Err(RevtreeError::Corruption { .. })
        ));
    }

    #[test]
    fn test_single_writer() {
        let tiers = tiers(4);
        tiers.acquire_writer(TrxId::new(1)).unwrap();
        let err = tiers.acquire_writer(TrxId::new(2)).unwrap_err();
        assert!(matches!(
            err,
            RevtreeError::ConcurrentWriter { active } if active == TrxId::new(1)
        ));

        // Only the holder can release.
        tiers.release_writer(TrxId::new(2));
        assert_eq!(tiers.active_writer(), Some(TrxId::new(1)));
        tiers.release_writer(TrxId::new(1));
        assert!(tiers.acquire_writer(TrxId::new(2)).is_ok());
    }
}
