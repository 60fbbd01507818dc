//! Page types.
//!
//! Pages are the unit of caching and persistence. All pages except the uber
//! page are immutable once written; a commit writes changed pages under
//! fresh keys.

mod codec;

pub use codec::{decode_container, encode_container};

use std::collections::BTreeMap;
use std::fmt;

use revtree_common::{PageKey, RECORD_PAGE_SHIFT};

use crate::name::NameDictionary;
use crate::node::Node;

/// Kind of a page, used to address records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    /// The uber page listing all revision roots.
    Uber,
    /// The root page of one revision.
    RevisionRoot,
    /// A page of node records.
    Record,
    /// The name dictionary of one revision.
    Name,
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uber => "uber",
            Self::RevisionRoot => "revision root",
            Self::Record => "record",
            Self::Name => "name",
        };
        f.write_str(name)
    }
}

/// The single mutable page, stored at [`PageKey::UBER`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UberPage {
    /// Page key of each revision root, indexed by revision number.
    pub revision_roots: Vec<PageKey>,
    /// Next unused page key.
    pub next_page_key: PageKey,
}

impl UberPage {
    /// Creates an uber page with no revisions.
    pub fn new() -> Self {
        Self {
            revision_roots: Vec::new(),
            next_page_key: PageKey::FIRST,
        }
    }

    /// Most recent committed revision, if any.
    pub fn latest_revision(&self) -> Option<u32> {
        self.revision_roots.len().checked_sub(1).map(|r| r as u32)
    }

    /// Page key of the root of `revision`.
    pub fn revision_root_key(&self, revision: u32) -> Option<PageKey> {
        self.revision_roots.get(revision as usize).copied()
    }

    /// Hands out a fresh page key.
    pub fn allocate_page_key(&mut self) -> PageKey {
        let key = self.next_page_key;
        self.next_page_key = key.next();
        key
    }
}

impl Default for UberPage {
    fn default() -> Self {
        Self::new()
    }
}

/// Author and message recorded with a commit. Opaque to the read path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitCredentials {
    /// Who committed.
    pub author: String,
    /// Optional commit message.
    pub message: Option<String>,
}

impl CommitCredentials {
    /// Creates credentials.
    pub fn new(author: impl Into<String>, message: Option<String>) -> Self {
        Self {
            author: author.into(),
            message,
        }
    }
}

/// Root page of one revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionRootPage {
    /// Revision number.
    pub revision: u32,
    /// Commit time in milliseconds since the epoch.
    pub timestamp: i64,
    /// Highest node key ever assigned up to this revision.
    pub max_node_key: i64,
    /// Commit author and message.
    pub credentials: CommitCredentials,
    /// Logical record page number to physical page key.
    pub record_pages: BTreeMap<u64, PageKey>,
    /// Page key of the name dictionary.
    pub name_page: PageKey,
}

impl RevisionRootPage {
    /// Physical key of the record page holding `node_key`.
    pub fn record_page_key(&self, node_key: i64) -> Option<PageKey> {
        u64::try_from(node_key)
            .ok()
            .and_then(|key| self.record_pages.get(&(key >> RECORD_PAGE_SHIFT)).copied())
    }
}

/// A page of up to 128 node records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPage {
    /// Logical page number, `node_key >> RECORD_PAGE_SHIFT`.
    pub page_number: u64,
    /// Records by node key. Removed nodes are kept as null records.
    pub records: BTreeMap<i64, Node>,
}

impl RecordPage {
    /// Creates an empty record page.
    pub fn new(page_number: u64) -> Self {
        Self {
            page_number,
            records: BTreeMap::new(),
        }
    }

    /// Logical page number of `node_key`. Negative keys have none.
    pub fn page_number_of(node_key: i64) -> Option<u64> {
        u64::try_from(node_key).ok().map(|key| key >> RECORD_PAGE_SHIFT)
    }
}

/// A page of any kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    /// The uber page.
    Uber(UberPage),
    /// A revision root.
    RevisionRoot(RevisionRootPage),
    /// Node records.
    Record(RecordPage),
    /// A name dictionary.
    Name(NameDictionary),
}

impl Page {
    /// Returns the page kind.
    pub fn kind(&self) -> PageKind {
        match self {
            Self::Uber(_) => PageKind::Uber,
            Self::RevisionRoot(_) => PageKind::RevisionRoot,
            Self::Record(_) => PageKind::Record,
            Self::Name(_) => PageKind::Name,
        }
    }

    /// Returns the uber page, if this is one.
    pub fn as_uber(&self) -> Option<&UberPage> {
        match self {
            Self::Uber(page) => Some(page),
            _ => None,
        }
    }

    /// Returns the revision root, if this is one.
    pub fn as_revision_root(&self) -> Option<&RevisionRootPage> {
        match self {
            Self::RevisionRoot(page) => Some(page),
            _ => None,
        }
    }

    /// Returns the record page, if this is one.
    pub fn as_record(&self) -> Option<&RecordPage> {
        match self {
            Self::Record(page) => Some(page),
            _ => None,
        }
    }

    /// Returns the name dictionary, if this is one.
    pub fn as_names(&self) -> Option<&NameDictionary> {
        match self {
            Self::Name(names) => Some(names),
            _ => None,
        }
    }
}

/// Copy-on-write pair of a durable page and an in-progress overlay.
///
/// Readers only look at `complete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContainer {
    complete: Page,
    modified: Option<Page>,
}

impl PageContainer {
    /// Wraps a committed page.
    pub fn new(complete: Page) -> Self {
        Self {
            complete,
            modified: None,
        }
    }

    /// Wraps a committed page with a pending overlay.
    pub fn with_modified(complete: Page, modified: Page) -> Self {
        Self {
            complete,
            modified: Some(modified),
        }
    }

    /// The committed page.
    pub fn complete(&self) -> &Page {
        &self.complete
    }

    /// The pending overlay, if any.
    pub fn modified(&self) -> Option<&Page> {
        self.modified.as_ref()
    }

    /// Kind of the committed page.
    pub fn kind(&self) -> PageKind {
        self.complete.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uber_allocation() {
        let mut uber = UberPage::new();
        assert_eq!(uber.latest_revision(), None);
        assert_eq!(uber.allocate_page_key(), PageKey::new(1));
        assert_eq!(uber.allocate_page_key(), PageKey::new(2));

        uber.revision_roots.push(PageKey::new(2));
        assert_eq!(uber.latest_revision(), Some(0));
        assert_eq!(uber.revision_root_key(0), Some(PageKey::new(2)));
        assert_eq!(uber.revision_root_key(1), None);
    }

    #[test]
    fn test_record_page_addressing() {
        assert_eq!(RecordPage::page_number_of(0), Some(0));
        assert_eq!(RecordPage::page_number_of(127), Some(0));
        assert_eq!(RecordPage::page_number_of(128), Some(1));
        assert_eq!(RecordPage::page_number_of(-2), None);

        let mut record_pages = BTreeMap::new();
        record_pages.insert(1, PageKey::new(9));
        let root = RevisionRootPage {
            revision: 0,
            timestamp: 0,
            max_node_key: 200,
            credentials: CommitCredentials::default(),
            record_pages,
            name_page: PageKey::new(3),
        };
        assert_eq!(root.record_page_key(130), Some(PageKey::new(9)));
        assert_eq!(root.record_page_key(5), None);
        assert_eq!(root.record_page_key(-1), None);
    }

    #[test]
    fn test_container_reads_complete() {
        let container = PageContainer::with_modified(
            Page::Record(RecordPage::new(0)),
            Page::Record(RecordPage::new(1)),
        );
        assert_eq!(container.kind(), PageKind::Record);
        assert_eq!(container.complete().as_record().map(|p| p.page_number), Some(0));
        assert!(container.modified().is_some());
        assert!(container.complete().as_uber().is_none());
    }
}
