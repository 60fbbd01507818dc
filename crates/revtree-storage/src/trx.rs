//! Read-only access to one revision.

use std::sync::Arc;

use revtree_common::{NodeKind, PageKey, RevtreeError, RevtreeResult, TrxId, UNTYPED_TYPE_NAME};
use tracing::trace;

use crate::name::{untyped_type_key, NameDictionary};
use crate::node::Node;
use crate::page::{CommitCredentials, PageContainer, PageKind, RevisionRootPage, UberPage};
use crate::tiers::PageTiers;

/// Index of the document tree in record lookups. Other indexes address
/// secondary trees, which are not stored.
pub const DOCUMENT_TREE_INDEX: i32 = -1;

/// A page-level read transaction bound to one revision.
///
/// The uber page, revision root and name dictionary are captured at open
/// time. Every record page is then resolved through the captured root, so
/// revisions committed later are never observed.
#[derive(Debug)]
pub struct PageReadTrx {
    id: TrxId,
    tiers: Arc<PageTiers>,
    uber: UberPage,
    root: RevisionRootPage,
    names: NameDictionary,
    closed: bool,
}

impl PageReadTrx {
    /// Opens `revision`.
    ///
    /// # Errors
    ///
    /// `RevisionNotFound` if the revision was never committed; storage
    /// errors if its pages cannot be read.
    pub fn open(id: TrxId, tiers: Arc<PageTiers>, revision: u32) -> RevtreeResult<Self> {
        let uber = tiers.load_uber()?.ok_or(RevtreeError::PageNotFound {
            page_key: PageKey::UBER,
        })?;
        let root_key = uber
            .revision_root_key(revision)
            .ok_or(RevtreeError::RevisionNotFound {
                revision,
                latest: uber.latest_revision().unwrap_or_default(),
            })?;

        let root = Self::load(&tiers, root_key)?
            .complete()
            .as_revision_root()
            .cloned()
            .ok_or_else(|| RevtreeError::corruption(format!("page {root_key} is not a revision root")))?;
        let names = Self::load(&tiers, root.name_page)?
            .complete()
            .as_names()
            .cloned()
            .ok_or_else(|| RevtreeError::corruption(format!("page {} is not a name page", root.name_page)))?;

        trace!(trx = %id, revision, "opened page read transaction");
        Ok(Self {
            id,
            tiers,
            uber,
            root,
            names,
            closed: false,
        })
    }

    fn load(tiers: &PageTiers, key: PageKey) -> RevtreeResult<Arc<PageContainer>> {
        tiers
            .fetch(key)?
            .ok_or(RevtreeError::PageNotFound { page_key: key })
    }

    fn check_closed(&self) -> RevtreeResult<()> {
        if self.closed {
            return Err(RevtreeError::ClosedTransaction);
        }
        Ok(())
    }

    /// Resolves the record `node_key` in the tree addressed by `page_kind`
    /// and `index`.
    ///
    /// Returns `Ok(None)` for keys the revision does not hold, including
    /// removed nodes and negative keys.
    ///
    /// # Errors
    ///
    /// `NotSupported` for page kinds other than [`PageKind::Record`],
    /// `PageNotFound` if a referenced page is missing from every tier, and
    /// any store fault.
    pub fn get_record(&self, node_key: i64, page_kind: PageKind, index: i32) -> RevtreeResult<Option<Node>> {
        self.check_closed()?;
        if page_kind != PageKind::Record {
            return Err(RevtreeError::not_supported(format!(
                "record lookup in {page_kind} pages"
            )));
        }
        if index != DOCUMENT_TREE_INDEX {
            return Ok(None);
        }
        let Some(page_key) = self.root.record_page_key(node_key) else {
            return Ok(None);
        };

        let container = Self::load(&self.tiers, page_key)?;
        let page = container
            .complete()
            .as_record()
            .ok_or_else(|| RevtreeError::corruption(format!("page {page_key} is not a record page")))?;
        Ok(page
            .records
            .get(&node_key)
            .filter(|node| node.kind() != NodeKind::Null)
            .cloned())
    }

    /// Shorthand for a document tree lookup.
    pub fn get_node(&self, node_key: i64) -> RevtreeResult<Option<Node>> {
        self.get_record(node_key, PageKind::Record, DOCUMENT_TREE_INDEX)
    }

    /// Resolves a name key; empty for unknown keys.
    pub fn get_name(&self, key: i32, kind: NodeKind) -> String {
        match self.names.get(key, kind) {
            Some(name) => name.to_string(),
            None if key == untyped_type_key() => UNTYPED_TYPE_NAME.to_string(),
            None => String::new(),
        }
    }

    /// Resolves a name key to its UTF-8 bytes.
    pub fn get_raw_name(&self, key: i32, kind: NodeKind) -> Vec<u8> {
        self.get_name(key, kind).into_bytes()
    }

    /// Number of nodes referencing a name; zero for unknown keys.
    pub fn get_name_count(&self, key: i32, kind: NodeKind) -> u32 {
        self.names.count(key, kind)
    }

    /// The revision's name dictionary.
    pub fn names(&self) -> &NameDictionary {
        &self.names
    }

    /// Revision this transaction is bound to.
    pub fn revision_number(&self) -> u32 {
        self.root.revision
    }

    /// Commit time of the revision in milliseconds since the epoch.
    pub fn revision_timestamp(&self) -> i64 {
        self.root.timestamp
    }

    /// Highest node key assigned up to this revision.
    pub fn max_node_key(&self) -> i64 {
        self.root.max_node_key
    }

    /// Author and message of the commit.
    pub fn commit_credentials(&self) -> &CommitCredentials {
        &self.root.credentials
    }

    /// The captured revision root.
    pub fn revision_root(&self) -> &RevisionRootPage {
        &self.root
    }

    /// Latest revision at open time.
    pub fn latest_revision_at_open(&self) -> u32 {
        self.uber.latest_revision().unwrap_or_default()
    }

    /// The shared tiers this transaction reads through.
    pub fn tiers(&self) -> &Arc<PageTiers> {
        &self.tiers
    }

    /// Transaction id.
    pub fn id(&self) -> TrxId {
        self.id
    }

    /// Closes the transaction. Idempotent.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            trace!(trx = %self.id, revision = self.root.revision, "closed page read transaction");
        }
    }

    /// True once closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
