//! Resource sessions.
//!
//! A session owns the page tiers of one resource. It bootstraps the initial
//! revision on first open, hands out read cursors and the single committer,
//! and keeps track of the readers still open.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use revtree_common::config::ResourceConfig;
use revtree_common::{PageKey, RevtreeError, RevtreeResult, TrxId, CONFIG_FILE};
use revtree_storage::{
    MemoryPageStore, PageReadTrx, PageStore, PageTiers, PersistentPageStore, RevisionCommitter,
};
use tracing::{debug, info};

use crate::cursor::NodeReadCursor;

#[derive(Debug)]
struct SessionInner {
    config: ResourceConfig,
    tiers: Arc<PageTiers>,
    next_trx_id: AtomicU64,
    readers: Mutex<BTreeSet<TrxId>>,
}

/// Handle to an open resource. Cloning shares the session.
#[derive(Debug, Clone)]
pub struct ResourceSession {
    inner: Arc<SessionInner>,
}

impl ResourceSession {
    /// Opens a file-backed resource in `config.data_dir`.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the configuration is invalid or has no data
    /// directory; storage errors if the page store cannot be opened.
    pub fn open(config: ResourceConfig) -> RevtreeResult<Self> {
        config.validate()?;
        let dir = config.data_dir.clone().ok_or_else(|| {
            RevtreeError::invalid_config("data_dir is required for a file-backed resource")
        })?;
        let store = PersistentPageStore::open(&dir, config.flush_threshold)?;
        Self::with_store(config, Arc::new(store))
    }

    /// Opens the resource in `dir`, reading `resource.toml` when present and
    /// writing a default one otherwise.
    pub fn open_dir(dir: impl AsRef<Path>) -> RevtreeResult<Self> {
        let dir = dir.as_ref();
        let config_path = dir.join(CONFIG_FILE);
        let config = if config_path.exists() {
            let mut config = ResourceConfig::from_file(&config_path)?;
            config.data_dir = Some(dir.to_path_buf());
            config
        } else {
            std::fs::create_dir_all(dir)?;
            let config = ResourceConfig::with_data_dir(dir);
            config.save(&config_path)?;
            config
        };
        Self::open(config)
    }

    /// Opens a resource that lives only in memory.
    pub fn in_memory(config: ResourceConfig) -> RevtreeResult<Self> {
        Self::with_store(config, Arc::new(MemoryPageStore::new()))
    }

    /// Opens a resource over an existing store.
    pub fn with_store(config: ResourceConfig, store: Arc<dyn PageStore>) -> RevtreeResult<Self> {
        config.validate()?;
        let tiers = Arc::new(PageTiers::new(store, config.page_cache_capacity));
        let bootstrapped = RevisionCommitter::bootstrap(&tiers, config.store_dewey_ids)?;

        let session = Self {
            inner: Arc::new(SessionInner {
                config,
                tiers,
                next_trx_id: AtomicU64::new(TrxId::FIRST.as_u64()),
                readers: Mutex::new(BTreeSet::new()),
            }),
        };
        info!(
            bootstrapped,
            latest_revision = session.latest_revision()?,
            dewey_ids = session.inner.config.store_dewey_ids,
            "opened resource"
        );
        Ok(session)
    }

    fn next_trx_id(&self) -> TrxId {
        TrxId::new(self.inner.next_trx_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Most recent committed revision.
    pub fn latest_revision(&self) -> RevtreeResult<u32> {
        self.inner
            .tiers
            .load_uber()?
            .and_then(|uber| uber.latest_revision())
            .ok_or(RevtreeError::PageNotFound {
                page_key: PageKey::UBER,
            })
    }

    /// Opens a cursor on `revision`, positioned at the document root.
    ///
    /// # Errors
    ///
    /// `RevisionNotFound` if the revision was never committed.
    pub fn begin_node_read_trx(&self, revision: u32) -> RevtreeResult<NodeReadCursor> {
        let id = self.next_trx_id();
        let trx = PageReadTrx::open(id, Arc::clone(&self.inner.tiers), revision)?;
        let cursor = NodeReadCursor::new(self.clone(), trx)?;
        self.inner.readers.lock().insert(id);
        debug!(trx = %id, revision, "began node read transaction");
        Ok(cursor)
    }

    /// Opens a cursor on the latest revision.
    pub fn begin_latest_node_read_trx(&self) -> RevtreeResult<NodeReadCursor> {
        self.begin_node_read_trx(self.latest_revision()?)
    }

    /// Starts the writer of the next revision.
    ///
    /// # Errors
    ///
    /// `ConcurrentWriter` while another committer is alive.
    pub fn begin_commit(&self) -> RevtreeResult<RevisionCommitter> {
        RevisionCommitter::begin(
            self.next_trx_id(),
            Arc::clone(&self.inner.tiers),
            self.inner.config.store_dewey_ids,
        )
    }

    /// Number of read cursors not yet closed.
    pub fn active_reader_count(&self) -> usize {
        self.inner.readers.lock().len()
    }

    /// The resource configuration.
    pub fn config(&self) -> &ResourceConfig {
        &self.inner.config
    }

    /// The shared page tiers.
    pub fn tiers(&self) -> &Arc<PageTiers> {
        &self.inner.tiers
    }

    pub(crate) fn deregister_reader(&self, id: TrxId) {
        if self.inner.readers.lock().remove(&id) {
            debug!(trx = %id, "closed node read transaction");
        }
    }
}
