//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up test stores
//! and common test scenarios.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use wikistore_core::clock::from_micros;
use wikistore_core::{Config, ManualClock, WikiStore};
use wikistore_storage::InMemoryBackend;

/// Time every fixture clock starts at: 2013-09-24 12:00:00 UTC.
pub const START_MICROS: i64 = 1_380_024_000_000_000;

/// File name used for file-backed fixtures.
pub const TEST_FILE_NAME: &str = "wikis.wdb";

/// A test store with automatic cleanup.
///
/// Every fixture runs on a [`ManualClock`], so `last_updated` values only
/// move when the test says so.
pub struct TestStore {
    /// The store instance.
    pub store: WikiStore,
    clock: Arc<ManualClock>,
    backend: Option<InMemoryBackend>,
    path: Option<PathBuf>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a new in-memory test store.
    pub fn memory() -> Self {
        let backend = InMemoryBackend::new();
        let clock = Arc::new(ManualClock::new(from_micros(START_MICROS)));
        let store = open_memory(&backend, &clock);
        Self {
            store,
            clock,
            backend: Some(backend),
            path: None,
            _temp_dir: None,
        }
    }

    /// Creates a new store in a temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join(TEST_FILE_NAME);
        let clock = Arc::new(ManualClock::new(from_micros(START_MICROS)));
        let store = open_file(&path, &clock);
        Self {
            store,
            clock,
            backend: None,
            path: Some(path),
            _temp_dir: Some(temp_dir),
        }
    }

    /// Closes the store and opens the same bytes again.
    #[must_use]
    pub fn reopen(self) -> Self {
        let Self {
            store,
            clock,
            backend,
            path,
            _temp_dir,
        } = self;
        store.close().expect("Failed to close store");
        drop(store);

        let store = match (&backend, &path) {
            (Some(backend), _) => open_memory(backend, &clock),
            (None, Some(path)) => open_file(path, &clock),
            (None, None) => unreachable!("fixture has neither backend nor path"),
        };
        Self {
            store,
            clock,
            backend,
            path,
            _temp_dir,
        }
    }

    /// The fixture clock.
    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Moves the fixture clock forward by `micros`.
    pub fn tick(&self, micros: i64) {
        self.clock.advance(micros);
    }

    /// Shared handle to the in-memory bytes, `None` for file stores.
    pub fn backend(&self) -> Option<&InMemoryBackend> {
        self.backend.as_ref()
    }

    /// Database file path, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl std::ops::Deref for TestStore {
    type Target = WikiStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

fn open_memory(backend: &InMemoryBackend, clock: &Arc<ManualClock>) -> WikiStore {
    WikiStore::open_with_backend(Config::default(), Box::new(backend.clone()))
        .expect("Failed to open in-memory store")
        .with_clock(clock.clone())
}

fn open_file(path: &Path, clock: &Arc<ManualClock>) -> WikiStore {
    let config = Config::new().path(path).sync_on_commit(false);
    WikiStore::open_with_config(config)
        .expect("Failed to open file store")
        .with_clock(clock.clone())
}

/// Runs a test with a temporary in-memory store.
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&TestStore) -> R,
{
    let store = TestStore::memory();
    f(&store)
}

/// Runs a test with a store in a temporary directory.
pub fn with_file_store<F, R>(f: F) -> R
where
    F: FnOnce(&TestStore, &Path) -> R,
{
    let store = TestStore::file();
    let path = store.path().expect("File store should have a path").to_path_buf();
    f(&store, &path)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use wikistore_core::Wiki;

    /// Wikis left by [`demo_store`].
    #[derive(Debug, Clone)]
    pub struct DemoWikis {
        /// "foo", with pages Monkey, Hat and Fish.
        pub foo: Wiki,
        /// "baz", with page Fish.
        pub baz: Wiki,
    }

    /// Runs the demo walkthrough: three wikis, foo renamed, bar deleted,
    /// pages added one second apart.
    pub fn demo_store(store: &TestStore) -> DemoWikis {
        let foo = store.create_wiki("foo", "A wiki about foos.").expect("create foo");
        let bar = store.create_wiki("bar", "A wiki about bars.").expect("create bar");
        let baz = store.create_wiki("baz", "A wiki about bazzes.").expect("create baz");

        let foo = store
            .rename_wiki(foo.id, "foo", "A wiki about fooze.")
            .expect("rename foo");
        store.delete_wiki(bar.id).expect("delete bar");

        for title in ["Monkey", "Hat", "Fish"] {
            store.tick(1_000_000);
            store.create_page(foo.id, title).expect("create page");
        }
        store.tick(1_000_000);
        store.create_page(baz.id, "Fish").expect("create page");

        DemoWikis { foo, baz }
    }
}
