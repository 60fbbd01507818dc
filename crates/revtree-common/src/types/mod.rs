//! Type definitions for revtree.
//!
//! This module contains the identifier and tag types shared by the page
//! layer and the node cursor.

mod ids;
mod kind;

pub use ids::{PageKey, TrxId};
pub use kind::NodeKind;
