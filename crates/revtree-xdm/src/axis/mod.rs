//! Axes over revisions.

mod temporal;

pub use temporal::{IncludeSelf, TemporalAxis};
