//! Configuration for revtree resources.
//!
//! This module provides the per-resource configuration loaded from TOML.

mod resource;

pub use resource::{ResourceConfig, ResourceConfigBuilder};
