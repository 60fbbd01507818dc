//! Page store fault injection.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use revtree_common::PageKey;
use revtree_storage::{PageContainer, PageStore, StoreError, StoreResult, StoreStats};
use tracing::debug;

/// Wraps a store and fails its reads while armed.
#[derive(Debug)]
pub struct FaultyStore {
    inner: Arc<dyn PageStore>,
    fail_reads: AtomicBool,
    injected: AtomicU64,
}

impl FaultyStore {
    /// Wraps `inner`, disarmed.
    pub fn new(inner: Arc<dyn PageStore>) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            injected: AtomicU64::new(0),
        }
    }

    /// Makes every following `get` fail with an I/O error.
    pub fn arm(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    /// Stops failing reads.
    pub fn disarm(&self) {
        self.fail_reads.store(false, Ordering::SeqCst);
    }

    /// Number of reads failed so far.
    pub fn injected(&self) -> u64 {
        self.injected.load(Ordering::SeqCst)
    }
}

impl PageStore for FaultyStore {
    fn get(&self, key: PageKey) -> StoreResult<Option<Arc<PageContainer>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            self.injected.fetch_add(1, Ordering::SeqCst);
            debug!(page = %key, "injecting read fault");
            return Err(StoreError::Io(io::Error::other(format!(
                "injected read fault on page {key}"
            ))));
        }
        self.inner.get(key)
    }

    fn put(&self, key: PageKey, container: Arc<PageContainer>) -> StoreResult<()> {
        self.inner.put(key, container)
    }

    fn get_all(&self) -> StoreResult<Vec<(PageKey, Arc<PageContainer>)>> {
        self.inner.get_all()
    }

    fn remove(&self, key: PageKey) -> StoreResult<()> {
        self.inner.remove(key)
    }

    fn clear(&self) -> StoreResult<()> {
        self.inner.clear()
    }

    fn sync(&self) -> StoreResult<()> {
        self.inner.sync()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn stats(&self) -> &StoreStats {
        self.inner.stats()
    }
}
