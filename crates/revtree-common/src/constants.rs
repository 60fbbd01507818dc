//! System-wide constants for revtree.

// =============================================================================
// Reserved Node Keys
// =============================================================================

/// Node key of the document root. It is present in every revision.
pub const DOCUMENT_NODE_KEY: i64 = 0;

/// Sentinel for an absent structural link (no parent, no sibling, no child).
pub const NULL_NODE_KEY: i64 = -1;

/// Sentinel for an unset name key (no prefix, no namespace URI).
pub const NULL_NAME_KEY: i32 = -1;

/// First synthetic key handed out by a cursor's item list.
///
/// Item keys count downwards from here: `-2, -3, -4, ...`.
pub const FIRST_ITEM_KEY: i64 = -2;

// =============================================================================
// Page Geometry
// =============================================================================

/// Number of bits of a node key that select the slot within a record page.
pub const RECORD_PAGE_SHIFT: u32 = 7;

/// Number of records held by one record page (128).
pub const RECORDS_PER_PAGE: i64 = 1 << RECORD_PAGE_SHIFT;

/// Page key of the uber page, the only page that is ever overwritten.
pub const UBER_PAGE_KEY: u64 = 0;

// =============================================================================
// Names and Types
// =============================================================================

/// Type name assigned to nodes that carry no schema type.
pub const UNTYPED_TYPE_NAME: &str = "xs:untyped";

// =============================================================================
// Cache and Store Defaults
// =============================================================================

/// Default number of page containers held by the in-memory page cache.
pub const DEFAULT_PAGE_CACHE_CAPACITY: usize = 1024;

/// Default number of `put` calls between two durability syncs of the
/// persistent page store.
pub const DEFAULT_FLUSH_THRESHOLD: u64 = 10_000;

/// File name of the persistent page store inside a resource directory.
pub const PAGE_STORE_FILE: &str = "pages.log";

/// Magic number prefixed to every persistent store entry.
pub const PAGE_STORE_MAGIC: u32 = 0x5254_5047; // "RTPG" in ASCII

/// Default name of the resource configuration file.
pub const CONFIG_FILE: &str = "resource.toml";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_keys_do_not_collide() {
        assert!(DOCUMENT_NODE_KEY >= 0);
        assert!(NULL_NODE_KEY < 0);
        assert!(FIRST_ITEM_KEY < NULL_NODE_KEY);
    }

    #[test]
    fn test_page_geometry() {
        assert_eq!(RECORDS_PER_PAGE, 128);
        assert_eq!(RECORDS_PER_PAGE, 1 << RECORD_PAGE_SHIFT);
    }
}
