//! # revtree-common
//!
//! Common types, errors, and configuration for revtree.
//!
//! This crate provides the foundational types shared by every revtree
//! component:
//!
//! - **Types**: page keys, transaction ids and the node kind tag
//! - **Errors**: unified error handling with `RevtreeError`
//! - **Config**: per-resource configuration (`ResourceConfig`)
//! - **Constants**: reserved node keys, page geometry and store defaults
//!
//! ## Example
//!
//! ```rust
//! use revtree_common::types::{NodeKind, PageKey};
//! use revtree_common::error::RevtreeResult;
//! use revtree_common::DOCUMENT_NODE_KEY;
//!
//! fn example() -> RevtreeResult<()> {
//!     let page = PageKey::new(42);
//!     assert!(page.is_valid());
//!     assert_eq!(DOCUMENT_NODE_KEY, 0);
//!     assert!(NodeKind::Element.is_structural());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use error::{RevtreeError, RevtreeResult};
pub use types::{NodeKind, PageKey, TrxId};
