//! Reopen, crash recovery and schema checks.

use wikistore_core::log::{LogManager, LogRecord};
use wikistore_core::schema::{ColumnDef, ColumnType, IndexDef, TableDef};
use wikistore_core::types::TransactionId;
use wikistore_core::{Config, Schema, SequenceNumber, StoreError, WikiStore};
use wikistore_storage::InMemoryBackend;
use wikistore_testkit::prelude::*;

#[test]
fn ids_are_not_reused_after_reopen() {
    let store = TestStore::memory();
    let foo = store.create_wiki("foo", "").unwrap();
    let bar = store.create_wiki("bar", "").unwrap();
    let hat = store.create_page(foo.id, "Hat").unwrap();
    store.delete_page(foo.id, hat.id).unwrap();
    store.delete_wiki(bar.id).unwrap();

    let store = store.reopen();
    let qux = store.create_wiki("qux", "").unwrap();
    assert!(qux.id > bar.id);
    let cap = store.create_page(foo.id, "Cap").unwrap();
    assert!(cap.id > hat.id);
}

#[test]
fn compaction_keeps_data_and_counters() {
    let store = TestStore::memory();
    let wikis = scenarios::demo_store(&store);
    let titles = store.list_pages_by_title(wikis.foo.id).unwrap();
    let before = store.stats().unwrap();

    store.compact().unwrap();
    let after = store.stats().unwrap();
    assert!(after.log_size < before.log_size);
    assert_eq!((after.wikis, after.pages), (before.wikis, before.pages));

    let store = store.reopen();
    assert_eq!(store.list_pages_by_title(wikis.foo.id).unwrap(), titles);
    let bar_again = store.create_wiki("bar", "").unwrap();
    assert_eq!(bar_again.id.0, 4);
}

#[test]
fn torn_final_frame_is_discarded() {
    let store = TestStore::memory();
    store.create_wiki("foo", "").unwrap();
    store.create_wiki("bar", "").unwrap();
    let backend = store.backend().unwrap().clone();
    store.close().unwrap();

    simulate_crash(&backend, CrashPoint::TornFinalFrame);
    let store = store.reopen();
    let names: Vec<_> = store.list_wikis().unwrap().into_iter().map(|w| w.name).collect();
    assert_eq!(names, vec!["foo"]);

    // The discarded tail is gone, so new commits land on a clean log.
    store.create_wiki("bar", "").unwrap();
    let store = store.reopen();
    assert_eq!(store.list_wikis().unwrap().len(), 2);
}

#[test]
fn uncommitted_transaction_is_discarded() {
    let store = TestStore::file();
    let foo = store.create_wiki("foo", "").unwrap();
    store.create_page(foo.id, "Hat").unwrap();
    let path = store.path().unwrap().to_path_buf();
    store.close().unwrap();

    // Cut the last commit frame off the file on disk.
    let bytes = std::fs::read(&path).unwrap();
    let last = last_frame_offset(&InMemoryBackend::with_data(bytes.clone()));
    std::fs::write(&path, &bytes[..last as usize]).unwrap();

    let store = store.reopen();
    assert!(!store.page_exists(foo.id, "Hat").unwrap());
    assert_eq!(store.count_pages(foo.id).unwrap(), 1);
}

#[test]
fn corrupted_committed_frame_is_fatal() {
    let store = TestStore::memory();
    store.create_wiki("foo", "").unwrap();
    let backend = store.backend().unwrap().clone();
    store.close().unwrap();

    let mut bytes = backend.contents();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0xFF;
    let result = WikiStore::open_with_backend(
        Config::default(),
        Box::new(InMemoryBackend::with_data(bytes)),
    );
    assert!(matches!(
        result,
        Err(StoreError::ChecksumMismatch { .. } | StoreError::LogCorruption { .. })
    ));
}

#[test]
fn foreign_schema_is_rejected() {
    let foreign = Schema::new().table(
        TableDef::new("notes")
            .column(ColumnDef::new("id", ColumnType::Long).autoincrement())
            .column(ColumnDef::new("body", ColumnType::LongText))
            .index(IndexDef::new("byId").asc("id").primary()),
    );
    let txid = TransactionId::new(1);
    let backend = InMemoryBackend::new();
    let log = LogManager::new(Box::new(backend.clone()), false);
    log.append_batch(&[
        LogRecord::Begin { txid },
        LogRecord::Schema {
            txid,
            schema: foreign,
        },
        LogRecord::Commit {
            txid,
            sequence: SequenceNumber::new(1),
        },
    ])
    .unwrap();
    drop(log);

    let result = WikiStore::open_with_backend(Config::default(), Box::new(backend));
    assert!(matches!(result, Err(StoreError::StorageInit { .. })));
}

#[test]
fn second_open_of_a_file_is_refused() {
    with_file_store(|store, path| {
        store.create_wiki("foo", "").unwrap();
        let second = WikiStore::open_with_config(Config::new().path(path));
        assert!(matches!(second, Err(StoreError::StorageInit { .. })));
    });
}

#[test]
fn missing_parent_directories_are_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("deeper").join("wikis.wdb");
    let config = Config::new().path(&path);

    let store = WikiStore::open_with_config(config.clone()).unwrap();
    let foo = store.create_wiki("foo", "").unwrap();
    store.close().unwrap();
    drop(store);
    assert!(path.exists());

    let store = WikiStore::open_with_config(config).unwrap();
    assert_eq!(store.get_wiki_by_name("foo").unwrap().id, foo.id);
}

#[test]
fn missing_file_without_create_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::new()
        .path(dir.path().join("absent.wdb"))
        .create_if_missing(false);
    assert!(matches!(
        WikiStore::open_with_config(config),
        Err(StoreError::StorageInit { .. })
    ));
}

#[test]
fn automatic_compaction_bounds_the_log() {
    let backend = InMemoryBackend::new();
    let config = Config::default().max_log_size(4 * 1024);
    let store = WikiStore::open_with_backend(config.clone(), Box::new(backend.clone())).unwrap();
    let foo = store.create_wiki("foo", "").unwrap();
    for i in 0..200 {
        let page = store.create_page(foo.id, &format!("page {i}")).unwrap();
        store.delete_page(foo.id, page.id).unwrap();
    }
    let size = store.stats().unwrap().log_size;
    assert!(size < 16 * 1024, "log grew to {size} bytes");
    store.close().unwrap();
    drop(store);

    let store = WikiStore::open_with_backend(config, Box::new(backend)).unwrap();
    assert_eq!(store.count_pages(foo.id).unwrap(), 1);
    let next = store.create_page(foo.id, "after").unwrap();
    assert_eq!(next.id.0, 202);
}
