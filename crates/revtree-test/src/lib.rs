//! # revtree-test
//!
//! Integration tests for revtree.
//!
//! This crate contains:
//! - A tree editor that keeps structural links, counts and order labels
//!   consistent on top of the raw committer
//! - Fixture documents shared by the integration tests
//! - A page store wrapper that injects read faults

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Structure-maintaining edits over a committer.
pub mod editor;

/// Fault injection.
pub mod fault;

/// Fixture documents.
pub mod fixtures;

/// Test utilities and helpers.
pub mod utils;

pub use editor::{NodeSpec, TreeEditor};
pub use fault::FaultyStore;
