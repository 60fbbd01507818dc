//! # revtree-xdm
//!
//! Navigation over revisioned document trees.
//!
//! A [`ResourceSession`] owns the page tiers of one resource and hands out
//! [`NodeReadCursor`]s bound to a single revision. A cursor moves over the
//! tree through its page read transaction; the [`TemporalAxis`] follows one
//! node key across revisions.
//!
//! ## Example
//!
//! ```rust
//! use revtree_common::config::ResourceConfig;
//! use revtree_xdm::{Move, ResourceSession};
//!
//! let session = ResourceSession::in_memory(ResourceConfig::default()).unwrap();
//! let mut cursor = session.begin_latest_node_read_trx().unwrap();
//! assert!(cursor.is_document_root().unwrap());
//! assert_eq!(cursor.move_to_first_child().unwrap(), Move::NotMoved);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod axis;
pub mod cursor;
pub mod item_list;
pub mod movement;
pub mod resource;

pub use axis::{IncludeSelf, TemporalAxis};
pub use cursor::NodeReadCursor;
pub use item_list::{AtomicValue, ItemList};
pub use movement::Move;
pub use resource::ResourceSession;
