//! Test utilities.

use std::sync::Once;

use revtree_common::RevtreeResult;
use revtree_xdm::{Move, NodeReadCursor};
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Installs a tracing subscriber honouring `RUST_LOG`. Safe to call from
/// every test.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Node keys of the subtree rooted at the cursor's current node, in
/// pre-order. The cursor ends where it started.
pub fn preorder_keys(cursor: &mut NodeReadCursor) -> RevtreeResult<Vec<i64>> {
    let start = cursor.node_key()?;
    let mut keys = vec![start];
    'walk: loop {
        if cursor.move_to_first_child()?.has_moved() {
            keys.push(cursor.node_key()?);
            continue;
        }
        loop {
            if cursor.node_key()? == start {
                break 'walk;
            }
            if cursor.move_to_right_sibling()?.has_moved() {
                keys.push(cursor.node_key()?);
                continue 'walk;
            }
            if cursor.move_to_parent()? == Move::NotMoved {
                break 'walk;
            }
        }
    }
    cursor.move_to(start)?;
    Ok(keys)
}
