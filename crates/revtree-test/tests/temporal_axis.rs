//! Following nodes across revisions.

use revtree_common::config::ResourceConfig;
use revtree_common::{RevtreeResult, DOCUMENT_NODE_KEY};
use revtree_test::fixtures::attributed_element;
use revtree_test::utils::init_tracing;
use revtree_test::{NodeSpec, TreeEditor};
use revtree_xdm::{IncludeSelf, NodeReadCursor, ResourceSession, TemporalAxis};

fn session() -> ResourceSession {
    init_tracing();
    ResourceSession::in_memory(ResourceConfig::default()).unwrap()
}

fn empty_commit(session: &ResourceSession) -> u32 {
    TreeEditor::begin(session).unwrap().commit().unwrap()
}

fn revisions(axis: impl Iterator<Item = RevtreeResult<NodeReadCursor>>) -> Vec<u32> {
    axis.map(|cursor| cursor.unwrap().revision_number().unwrap())
        .collect()
}

/// Revisions 1 to 3 hold text node 4, revision 4 deletes it and revision 5
/// adds another text node.
fn deleted_text(session: &ResourceSession) -> (i64, i64) {
    let doc = attributed_element(session).unwrap();
    assert_eq!(doc.revision, 1);
    assert_eq!(empty_commit(session), 2);
    assert_eq!(empty_commit(session), 3);

    let mut editor = TreeEditor::begin(session).unwrap();
    editor.remove_subtree(doc.text).unwrap();
    assert_eq!(editor.commit().unwrap(), 4);

    let mut editor = TreeEditor::begin(session).unwrap();
    let replacement = editor
        .insert_first_child(doc.element, NodeSpec::Text("again"))
        .unwrap();
    assert_eq!(editor.commit().unwrap(), 5);
    (doc.text, replacement)
}

#[test]
fn test_future_axis_stops_at_deletion() {
    let session = session();
    let (text, replacement) = deleted_text(&session);
    assert_eq!(text, 4);
    assert_ne!(replacement, text);

    let mut cursor = session.begin_node_read_trx(3).unwrap();
    assert!(cursor.move_to(text).unwrap().has_moved());

    let axis = TemporalAxis::future(&cursor, IncludeSelf::No).unwrap();
    assert!(revisions(axis).is_empty());
    let axis = TemporalAxis::future(&cursor, IncludeSelf::Yes).unwrap();
    assert_eq!(revisions(axis), vec![3]);
}

#[test]
fn test_past_axis() {
    let session = session();
    let (text, _) = deleted_text(&session);

    let mut cursor = session.begin_node_read_trx(3).unwrap();
    cursor.move_to(text).unwrap();
    let axis = TemporalAxis::past(&cursor, IncludeSelf::No).unwrap();
    assert_eq!(revisions(axis), vec![2, 1]);
}

#[test]
fn test_all_time() {
    let session = session();
    let (text, replacement) = deleted_text(&session);

    let mut cursor = session.begin_node_read_trx(1).unwrap();
    cursor.move_to(text).unwrap();
    assert_eq!(revisions(TemporalAxis::all_time(&cursor).unwrap()), vec![1, 2, 3]);

    let mut cursor = session.begin_latest_node_read_trx().unwrap();
    assert!(cursor.move_to(replacement).unwrap().has_moved());
    assert_eq!(revisions(TemporalAxis::all_time(&cursor).unwrap()), vec![5]);
}

#[test]
fn test_future_axis_sees_later_commits() {
    let session = session();
    let doc = attributed_element(&session).unwrap();
    empty_commit(&session);

    let mut cursor = session.begin_node_read_trx(doc.revision).unwrap();
    cursor.move_to(doc.element).unwrap();
    let mut axis = TemporalAxis::future(&cursor, IncludeSelf::No).unwrap();

    assert_eq!(axis.next().unwrap().unwrap().revision_number().unwrap(), 2);
    empty_commit(&session);
    assert_eq!(axis.next().unwrap().unwrap().revision_number().unwrap(), 3);
    assert!(axis.next().is_none());

    // Exhausted axes are not restarted.
    empty_commit(&session);
    assert!(axis.next().is_none());
}

#[test]
fn test_axis_cursors_are_independent() {
    let session = session();
    let doc = attributed_element(&session).unwrap();
    empty_commit(&session);

    let mut cursor = session.begin_node_read_trx(doc.revision).unwrap();
    cursor.move_to(doc.element).unwrap();
    let found: Vec<_> = TemporalAxis::future(&cursor, IncludeSelf::Yes)
        .unwrap()
        .collect::<RevtreeResult<_>>()
        .unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(session.active_reader_count(), 3);

    let mut first = found.into_iter().next().unwrap();
    assert!(first.move_to_document_root().unwrap().has_moved());
    assert_eq!(first.node_key().unwrap(), DOCUMENT_NODE_KEY);
    assert_eq!(cursor.node_key().unwrap(), doc.element);
    drop(first);
    assert_eq!(session.active_reader_count(), 1);
}
