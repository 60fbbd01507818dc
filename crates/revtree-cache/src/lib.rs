//! Bounded caching for revtree.
//!
//! The page tier keeps recently resolved page containers in memory so that
//! repeated node resolution does not reach the durable store:
//!
//! - **LRU Cache**: least recently used eviction with O(1) operations
//! - **Shared LRU Cache**: a mutex-guarded handle shared by many readers
//! - **Statistics**: hit, miss and eviction counters
//!
//! # Example
//!
//! ```rust
//! use revtree_cache::LruCache;
//!
//! let mut cache = LruCache::new(100);
//! cache.insert("key1", "value1");
//! assert_eq!(cache.get(&"key1"), Some(&"value1"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod lru;
pub mod stats;

pub use lru::{LruCache, SharedLruCache};
pub use stats::CacheStats;
