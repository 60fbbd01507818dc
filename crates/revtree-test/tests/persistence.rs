//! File-backed resources and the persistent page store.

use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Arc;

use revtree_common::config::ResourceConfig;
use revtree_common::{PageKey, CONFIG_FILE, DOCUMENT_NODE_KEY, PAGE_STORE_FILE};
use revtree_storage::{
    Node, Page, PageContainer, PageStore, PersistentPageStore, RecordPage, StoreError,
};
use revtree_test::fixtures::library;
use revtree_test::utils::{init_tracing, preorder_keys};
use revtree_test::TreeEditor;
use revtree_xdm::ResourceSession;
use tempfile::TempDir;

fn container(key: i64) -> Arc<PageContainer> {
    let mut page = RecordPage::new(0);
    page.records.insert(key, Node::text(key, DOCUMENT_NODE_KEY, "page"));
    Arc::new(PageContainer::new(Page::Record(page)))
}

fn walk(session: &ResourceSession, revision: u32) -> Vec<i64> {
    let mut cursor = session.begin_node_read_trx(revision).unwrap();
    preorder_keys(&mut cursor).unwrap()
}

#[test]
fn test_revisions_survive_reopen() {
    init_tracing();
    let tmp = TempDir::new().unwrap();

    let keys = {
        let session = ResourceSession::open_dir(tmp.path()).unwrap();
        let keys = library(&session).unwrap();
        assert_eq!(walk(&session, 1), keys);
        keys
    };

    let session = ResourceSession::open_dir(tmp.path()).unwrap();
    assert_eq!(session.latest_revision().unwrap(), 1);
    assert_eq!(walk(&session, 1), keys);

    let mut cursor = session.begin_latest_node_read_trx().unwrap();
    cursor.move_to(keys[1]).unwrap();
    assert_eq!(cursor.name().unwrap().unwrap().local_name, "library");
    assert_eq!(cursor.namespace_count().unwrap(), 1);
    cursor.move_to(keys[4]).unwrap();
    assert_eq!(cursor.value().unwrap(), "Dune");
}

#[test]
fn test_old_revisions_unchanged_after_reopen() {
    init_tracing();
    let tmp = TempDir::new().unwrap();

    let dune = {
        let session = ResourceSession::open_dir(tmp.path()).unwrap();
        let keys = library(&session).unwrap();
        let mut editor = TreeEditor::begin(&session).unwrap();
        editor.set_value(keys[4], "Dune Messiah").unwrap();
        assert_eq!(editor.commit().unwrap(), 2);
        keys[4]
    };

    let session = ResourceSession::open_dir(tmp.path()).unwrap();
    let mut old = session.begin_node_read_trx(1).unwrap();
    let mut new = session.begin_node_read_trx(2).unwrap();
    assert!(old.move_to(dune).unwrap().has_moved());
    assert!(new.move_to(dune).unwrap().has_moved());
    assert_eq!(old.value().unwrap(), "Dune");
    assert_eq!(new.value().unwrap(), "Dune Messiah");
    assert_eq!(walk(&session, 1), walk(&session, 2));
}

#[test]
fn test_sync_on_threshold_put() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let store = PersistentPageStore::open(tmp.path(), 3).unwrap();

    store.put(PageKey::new(1), container(1)).unwrap();
    store.put(PageKey::new(2), container(2)).unwrap();
    assert_eq!(store.stats().syncs(), 0);

    store.put(PageKey::new(3), container(3)).unwrap();
    assert_eq!(store.stats().syncs(), 1);

    // Upserts count as writes too.
    store.put(PageKey::new(1), container(1)).unwrap();
    store.put(PageKey::new(1), container(1)).unwrap();
    assert_eq!(store.stats().syncs(), 1);
    store.put(PageKey::new(1), container(1)).unwrap();
    assert_eq!(store.stats().syncs(), 2);
    assert_eq!(store.stats().puts(), 6);
    assert_eq!(store.len(), 3);
}

#[test]
fn test_remove_absent_key() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let store = PersistentPageStore::open(tmp.path(), 3).unwrap();
    store.put(PageKey::new(1), container(1)).unwrap();

    let err = store.remove(PageKey::new(7)).unwrap_err();
    assert!(matches!(err, StoreError::KeyNotFound { key } if key == PageKey::new(7)));
    assert!(err.is_programming_error());
    assert!(store.get(PageKey::new(7)).unwrap().is_none());

    store.remove(PageKey::new(1)).unwrap();
    assert!(store.get(PageKey::new(1)).unwrap().is_none());
    assert_eq!(store.stats().removes(), 1);
}

#[test]
fn test_torn_tail_after_last_commit() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let log = tmp.path().join(PAGE_STORE_FILE);

    let (keys, committed_len) = {
        let session = ResourceSession::open_dir(tmp.path()).unwrap();
        let keys = library(&session).unwrap();
        (keys, std::fs::metadata(&log).unwrap().len())
    };

    // Half of an entry header, as left by a crash during append.
    let mut file = OpenOptions::new().append(true).open(&log).unwrap();
    file.write_all(&[0x47, 0x50, 0x54, 0x52, 0x01, 0x00, 0x00]).unwrap();
    drop(file);

    {
        let session = ResourceSession::open_dir(tmp.path()).unwrap();
        assert_eq!(std::fs::metadata(&log).unwrap().len(), committed_len);
        assert_eq!(walk(&session, 1), keys);

        let mut editor = TreeEditor::begin(&session).unwrap();
        editor.set_value(keys[11], "end").unwrap();
        assert_eq!(editor.commit().unwrap(), 2);
    }

    let session = ResourceSession::open_dir(tmp.path()).unwrap();
    assert_eq!(session.latest_revision().unwrap(), 2);
    let mut cursor = session.begin_latest_node_read_trx().unwrap();
    cursor.move_to(keys[11]).unwrap();
    assert_eq!(cursor.value().unwrap(), "end");
}

#[test]
fn test_config_file_is_honoured() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    ResourceConfig::builder()
        .store_dewey_ids(true)
        .flush_threshold(5)
        .build()
        .save(&tmp.path().join(CONFIG_FILE))
        .unwrap();

    let session = ResourceSession::open_dir(tmp.path()).unwrap();
    assert!(session.config().store_dewey_ids);
    assert_eq!(session.config().flush_threshold, 5);
    assert_eq!(session.config().data_dir.as_deref(), Some(tmp.path()));

    let keys = library(&session).unwrap();
    let mut cursor = session.begin_latest_node_read_trx().unwrap();
    cursor.move_to(keys[2]).unwrap();
    let book = cursor.dewey_id().unwrap().unwrap();
    let parent = cursor.parent_dewey_id().unwrap().unwrap();
    assert!(parent.is_ancestor_of(&book));
}

#[test]
fn test_default_config_is_written() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("resource");

    let session = ResourceSession::open_dir(&dir).unwrap();
    assert!(dir.join(CONFIG_FILE).exists());
    assert!(dir.join(PAGE_STORE_FILE).exists());
    assert!(!session.config().store_dewey_ids);

    let config = ResourceConfig::from_file(&dir.join(CONFIG_FILE)).unwrap();
    assert_eq!(config.flush_threshold, session.config().flush_threshold);
}
