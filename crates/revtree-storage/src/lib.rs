//! # revtree-storage
//!
//! Page-level storage for revtree.
//!
//! Every commit writes fresh, immutable pages and then overwrites the single
//! uber page that lists all revision roots. Readers resolve nodes through the
//! root of the revision they were opened on, so later commits are invisible
//! to them.
//!
//! ```text
//!   PageReadTrx ──► PageTiers ──► SharedLruCache (hit)
//!                       │
//!                       └──────► PageStore (miss) ──► pages.log
//! ```
//!
//! - [`node`]: the node model and order labels
//! - [`name`]: the per-revision name dictionary
//! - [`page`]: page types and their binary codec
//! - [`persistent`]: durable key/container stores
//! - [`tiers`]: the shared cache plus store pair
//! - [`trx`]: read-only access to one revision
//! - [`commit`]: the single writer producing new revisions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod commit;
pub mod error;
pub mod name;
pub mod node;
pub mod page;
pub mod persistent;
pub mod tiers;
pub mod trx;

pub use commit::RevisionCommitter;
pub use error::{DecodeError, StoreError, StoreResult};
pub use name::NameDictionary;
pub use node::{DeweyId, NameFields, Node, NodeData, QName, StructFields};
pub use page::{CommitCredentials, Page, PageContainer, PageKind, RecordPage, RevisionRootPage, UberPage};
pub use persistent::{MemoryPageStore, PageStore, PersistentPageStore, StoreStats};
pub use tiers::PageTiers;
pub use trx::{PageReadTrx, DOCUMENT_TREE_INDEX};
