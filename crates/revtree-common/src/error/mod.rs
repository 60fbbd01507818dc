//! Error handling for revtree.
//!
//! This module provides the unified error type and result alias used
//! across all revtree components.

mod revtree;

pub use revtree::{ErrorCode, RevtreeError};

/// Result type alias for revtree operations.
pub type RevtreeResult<T> = std::result::Result<T, RevtreeError>;
