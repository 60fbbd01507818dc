//! The single writer.
//!
//! A `RevisionCommitter` stages node changes for the next revision and
//! writes them on commit. Changed record pages are copied on first write and
//! published under fresh page keys together with a new name page and a new
//! revision root. The uber page is overwritten last, so a reader either sees
//! the whole revision or none of it.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use revtree_common::{
    NodeKind, PageKey, RevtreeError, RevtreeResult, TrxId, DOCUMENT_NODE_KEY, NULL_NODE_KEY,
};
use tracing::info;

use crate::name::NameDictionary;
use crate::node::{DeweyId, Node};
use crate::page::{CommitCredentials, Page, PageContainer, RecordPage, RevisionRootPage, UberPage};
use crate::tiers::PageTiers;

/// Id used by the bootstrap commit.
const BOOTSTRAP_TRX_ID: TrxId = TrxId::new(0);

/// Writes one new revision.
///
/// Holds the writer slot of its [`PageTiers`] until committed or dropped.
/// Dropping without committing discards the staged changes.
#[derive(Debug)]
pub struct RevisionCommitter {
    id: TrxId,
    tiers: Arc<PageTiers>,
    uber: UberPage,
    root: RevisionRootPage,
    names: NameDictionary,
    dirty: BTreeMap<u64, RecordPage>,
    store_dewey_ids: bool,
}

impl RevisionCommitter {
    /// Writes revision 0, holding only the document root, unless the
    /// resource already has revisions. Returns true if it wrote one.
    pub fn bootstrap(tiers: &Arc<PageTiers>, store_dewey_ids: bool) -> RevtreeResult<bool> {
        if tiers.load_uber()?.is_some() {
            return Ok(false);
        }

        tiers.acquire_writer(BOOTSTRAP_TRX_ID)?;
        let mut committer = Self {
            id: BOOTSTRAP_TRX_ID,
            tiers: Arc::clone(tiers),
            uber: UberPage::new(),
            root: RevisionRootPage {
                revision: 0,
                timestamp: 0,
                max_node_key: NULL_NODE_KEY,
                credentials: CommitCredentials::default(),
                record_pages: BTreeMap::new(),
                name_page: PageKey::INVALID,
            },
            names: NameDictionary::new(),
            dirty: BTreeMap::new(),
            store_dewey_ids,
        };

        let dewey_id = store_dewey_ids.then(DeweyId::root);
        committer.put_node(Node::document(DOCUMENT_NODE_KEY).with_dewey_id(dewey_id))?;
        committer.commit(CommitCredentials::default())?;
        Ok(true)
    }

    /// Starts writing the revision after the latest one.
    ///
    /// # Errors
    ///
    /// `ConcurrentWriter` if another committer is active, or a storage error
    /// if the latest revision cannot be read.
    pub fn begin(id: TrxId, tiers: Arc<PageTiers>, store_dewey_ids: bool) -> RevtreeResult<Self> {
        tiers.acquire_writer(id)?;
        match Self::load_latest(&tiers) {
            Ok((uber, root, names)) => Ok(Self {
                id,
                tiers,
                uber,
                root,
                names,
                dirty: BTreeMap::new(),
                store_dewey_ids,
            }),
            Err(e) => {
                tiers.release_writer(id);
                Err(e)
            }
        }
    }

    fn load_latest(tiers: &PageTiers) -> RevtreeResult<(UberPage, RevisionRootPage, NameDictionary)> {
        let uber = tiers.load_uber()?.ok_or(RevtreeError::PageNotFound {
            page_key: PageKey::UBER,
        })?;
        let latest = uber
            .latest_revision()
            .ok_or_else(|| RevtreeError::corruption("uber page lists no revisions"))?;
        let root_key = uber
            .revision_root_key(latest)
            .ok_or_else(|| RevtreeError::corruption("latest revision root missing"))?;

        let mut root = load_page(tiers, root_key)?
            .complete()
            .as_revision_root()
            .cloned()
            .ok_or_else(|| RevtreeError::corruption(format!("page {root_key} is not a revision root")))?;
        let names = load_page(tiers, root.name_page)?
            .complete()
            .as_names()
            .cloned()
            .ok_or_else(|| RevtreeError::corruption(format!("page {} is not a name page", root.name_page)))?;

        root.revision = latest + 1;
        root.timestamp = 0;
        root.credentials = CommitCredentials::default();
        root.name_page = PageKey::INVALID;
        Ok((uber, root, names))
    }

    /// Id of this writer.
    pub fn id(&self) -> TrxId {
        self.id
    }

    /// Number of the revision being written.
    pub fn revision(&self) -> u32 {
        self.root.revision
    }

    /// True if new nodes should carry order labels.
    pub fn store_dewey_ids(&self) -> bool {
        self.store_dewey_ids
    }

    /// Highest node key assigned so far.
    pub fn max_node_key(&self) -> i64 {
        self.root.max_node_key
    }

    /// Reads a node as staged in this revision.
    pub fn node(&self, key: i64) -> RevtreeResult<Option<Node>> {
        let Some(page_number) = RecordPage::page_number_of(key) else {
            return Ok(None);
        };

        let node = match self.dirty.get(&page_number) {
            Some(page) => page.records.get(&key).cloned(),
            None => match self.root.record_pages.get(&page_number) {
                Some(&page_key) => load_record_page(&self.tiers, page_key)?.records.get(&key).cloned(),
                None => None,
            },
        };
        Ok(node.filter(|n| n.kind() != NodeKind::Null))
    }

    /// Stages `node`, replacing any node with the same key.
    pub fn put_node(&mut self, node: Node) -> RevtreeResult<()> {
        let key = node.key;
        let page = self.page_mut(key)?;
        page.records.insert(key, node);
        self.root.max_node_key = self.root.max_node_key.max(key);
        Ok(())
    }

    /// Stages the removal of `key` and returns the removed node.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if no node is stored under `key`.
    pub fn remove_node(&mut self, key: i64) -> RevtreeResult<Node> {
        let removed = self
            .node(key)?
            .ok_or(RevtreeError::NodeNotFound { node_key: key })?;
        self.page_mut(key)?.records.insert(key, Node::null(key));
        Ok(removed)
    }

    /// Hands out the next node key. Keys are never reused.
    pub fn allocate_node_key(&mut self) -> i64 {
        self.root.max_node_key += 1;
        self.root.max_node_key
    }

    /// Interns `name` for `kind` in this revision's dictionary.
    pub fn intern_name(&mut self, name: &str, kind: NodeKind) -> RevtreeResult<i32> {
        self.names.intern(name, kind)
    }

    /// Drops one reference to a name.
    pub fn release_name(&mut self, key: i32, kind: NodeKind) {
        self.names.release(key, kind);
    }

    /// The dictionary as staged.
    pub fn names(&self) -> &NameDictionary {
        &self.names
    }

    /// Commits with the current wall-clock time.
    pub fn commit(self, credentials: CommitCredentials) -> RevtreeResult<u32> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();
        self.commit_at(credentials, timestamp)
    }

    /// Writes the staged revision and returns its number.
    pub fn commit_at(mut self, credentials: CommitCredentials, timestamp: i64) -> RevtreeResult<u32> {
        let revision = self.root.revision;
        if self.uber.revision_roots.len() != revision as usize {
            return Err(RevtreeError::internal(format!(
                "uber page lists {} revisions while writing revision {revision}",
                self.uber.revision_roots.len()
            )));
        }

        let dirty = std::mem::take(&mut self.dirty);
        let record_pages = dirty.len();
        for (page_number, page) in dirty {
            let page_key = self.uber.allocate_page_key();
            self.tiers
                .publish(page_key, Arc::new(PageContainer::new(Page::Record(page))))?;
            self.root.record_pages.insert(page_number, page_key);
        }

        let name_page = self.uber.allocate_page_key();
        self.tiers.publish(
            name_page,
            Arc::new(PageContainer::new(Page::Name(self.names.clone()))),
        )?;

        self.root.name_page = name_page;
        self.root.timestamp = timestamp;
        self.root.credentials = credentials;
        let root_key = self.uber.allocate_page_key();
        self.tiers.publish(
            root_key,
            Arc::new(PageContainer::new(Page::RevisionRoot(self.root.clone()))),
        )?;

        self.uber.revision_roots.push(root_key);
        self.tiers.publish(
            PageKey::UBER,
            Arc::new(PageContainer::new(Page::Uber(self.uber.clone()))),
        )?;
        self.tiers.sync()?;

        info!(
            revision,
            record_pages,
            max_node_key = self.root.max_node_key,
            "committed revision"
        );
        Ok(revision)
    }

    fn page_mut(&mut self, key: i64) -> RevtreeResult<&mut RecordPage> {
        let page_number = RecordPage::page_number_of(key).ok_or_else(|| {
            RevtreeError::invalid_argument(format!("node key {key} cannot be stored"))
        })?;

        match self.dirty.entry(page_number) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let page = match self.root.record_pages.get(&page_number) {
                    Some(&page_key) => load_record_page(&self.tiers, page_key)?,
                    None => RecordPage::new(page_number),
                };
                Ok(entry.insert(page))
            }
        }
    }
}

impl Drop for RevisionCommitter {
    fn drop(&mut self) {
        self.tiers.release_writer(self.id);
    }
}

fn load_page(tiers: &PageTiers, key: PageKey) -> RevtreeResult<Arc<PageContainer>> {
    tiers
        .fetch(key)?
        .ok_or(RevtreeError::PageNotFound { page_key: key })
}

fn load_record_page(tiers: &PageTiers, key: PageKey) -> RevtreeResult<RecordPage> {
    load_page(tiers, key)?
        .complete()
        .as_record()
        .cloned()
        .ok_or_else(|| RevtreeError::corruption(format!("page {key} is not a record page")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NameFields;
    use crate::persistent::MemoryPageStore;

    fn tiers() -> Arc<PageTiers> {
        Arc::new(PageTiers::new(Arc::new(MemoryPageStore::new()), 16))
    }

    #[test]
    fn test_bootstrap_once() {
        let tiers = tiers();
        assert!(RevisionCommitter::bootstrap(&tiers, false).unwrap());
        assert!(!RevisionCommitter::bootstrap(&tiers, false).unwrap());

        let uber = tiers.load_uber().unwrap().unwrap();
        assert_eq!(uber.latest_revision(), Some(0));
        assert_eq!(tiers.active_writer(), None);
    }

    #[test]
    fn test_bootstrap_labels_root() {
        let tiers = tiers();
        RevisionCommitter::bootstrap(&tiers, true).unwrap();
        let committer = RevisionCommitter::begin(TrxId::new(1), Arc::clone(&tiers), true).unwrap();
        let root = committer.node(DOCUMENT_NODE_KEY).unwrap().unwrap();
        assert_eq!(root.dewey_id, Some(DeweyId::root()));
        assert_eq!(committer.max_node_key(), 0);
    }

    #[test]
    fn test_commit_new_revision() {
        let tiers = tiers();
        RevisionCommitter::bootstrap(&tiers, false).unwrap();

        let mut committer = RevisionCommitter::begin(TrxId::new(1), Arc::clone(&tiers), false).unwrap();
        assert_eq!(committer.revision(), 1);
        let name = committer.intern_name("a", NodeKind::Element).unwrap();
        let key = committer.allocate_node_key();
        assert_eq!(key, 1);
        committer
            .put_node(Node::element(key, DOCUMENT_NODE_KEY, NameFields::local(name)))
            .unwrap();
        assert_eq!(committer.node(key).unwrap().map(|n| n.kind()), Some(NodeKind::Element));

        let revision = committer
            .commit_at(CommitCredentials::new("alice", None), 1_000)
            .unwrap();
        assert_eq!(revision, 1);
        assert_eq!(tiers.load_uber().unwrap().unwrap().latest_revision(), Some(1));
        assert_eq!(tiers.active_writer(), None);
    }

    #[test]
    fn test_remove_leaves_tombstone() {
        let tiers = tiers();
        RevisionCommitter::bootstrap(&tiers, false).unwrap();

        let mut committer = RevisionCommitter::begin(TrxId::new(1), Arc::clone(&tiers), false).unwrap();
        let key = committer.allocate_node_key();
        committer.put_node(Node::text(key, 0, "x")).unwrap();
        committer.commit_at(CommitCredentials::default(), 1).unwrap();

        let mut committer = RevisionCommitter::begin(TrxId::new(2), Arc::clone(&tiers), false).unwrap();
        let removed = committer.remove_node(key).unwrap();
        assert_eq!(removed.kind(), NodeKind::Text);
        assert!(committer.node(key).unwrap().is_none());
        assert!(matches!(
            committer.remove_node(key),
            Err(RevtreeError::NodeNotFound { node_key }) if node_key == key
        ));

        // Removed keys are not handed out again.
        assert_eq!(committer.allocate_node_key(), key + 1);
    }

    #[test]
    fn test_second_writer_rejected() {
        let tiers = tiers();
        RevisionCommitter::bootstrap(&tiers, false).unwrap();

        let first = RevisionCommitter::begin(TrxId::new(1), Arc::clone(&tiers), false).unwrap();
        let err = RevisionCommitter::begin(TrxId::new(2), Arc::clone(&tiers), false).unwrap_err();
        assert!(matches!(err, RevtreeError::ConcurrentWriter { .. }));

        drop(first);
        assert!(RevisionCommitter::begin(TrxId::new(2), tiers, false).is_ok());
    }

    #[test]
    fn test_begin_without_bootstrap_fails() {
        let tiers = tiers();
        let err = RevisionCommitter::begin(TrxId::new(1), Arc::clone(&tiers), false).unwrap_err();
        assert!(matches!(err, RevtreeError::PageNotFound { .. }));
        assert_eq!(tiers.active_writer(), None);
    }

    #[test]
    fn test_negative_keys_rejected() {
        let tiers = tiers();
        RevisionCommitter::bootstrap(&tiers, false).unwrap();
        let mut committer = RevisionCommitter::begin(TrxId::new(1), tiers, false).unwrap();
        assert!(committer.put_node(Node::text(-2, 0, "x")).is_err());
    }
}
