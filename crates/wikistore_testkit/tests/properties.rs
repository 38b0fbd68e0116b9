//! Property tests: generated operation sequences against the reference model.

use proptest::prelude::*;
use wikistore_core::store::MAX_NAME_CHARS;
use wikistore_core::{PageId, StoreError};
use wikistore_testkit::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn store_matches_model(ops in store_ops_strategy(40)) {
        let store = TestStore::memory();
        let mut model = ReferenceModel::new();
        for op in &ops {
            let got = model.run(&store, op);
            let want = model.apply(op);
            prop_assert_eq!(got, want, "outcome of {:?}", op);
            if let Err(diff) = model.check(&store) {
                return Err(TestCaseError::fail(format!("after {op:?}: {diff}")));
            }
        }
    }

    #[test]
    fn model_survives_reopen(ops in store_ops_strategy(25)) {
        let store = TestStore::memory();
        let mut model = ReferenceModel::new();
        for op in &ops {
            model.run(&store, op);
            model.apply(op);
        }
        let store = store.reopen();
        if let Err(diff) = model.check(&store) {
            return Err(TestCaseError::fail(format!("after reopen: {diff}")));
        }
    }

    #[test]
    fn duplicate_wiki_leaves_count(names in prop::collection::vec(name_strategy(), 1..12)) {
        let store = TestStore::memory();
        for name in &names {
            let before = store.list_wikis().unwrap().len();
            match store.create_wiki(name, "") {
                Ok(_) => prop_assert_eq!(store.list_wikis().unwrap().len(), before + 1),
                Err(StoreError::DuplicateName { .. }) => {
                    prop_assert_eq!(store.list_wikis().unwrap().len(), before);
                }
                Err(err) => return Err(TestCaseError::fail(err.to_string())),
            }
        }
        let mut unique = names.clone();
        unique.sort();
        unique.dedup();
        prop_assert_eq!(store.list_wikis().unwrap().len(), unique.len());
    }

    #[test]
    fn duplicate_page_title_fails(title in name_strategy()) {
        let store = TestStore::memory();
        let wiki = store.create_wiki("foo", "").unwrap();
        let first = store.create_page(wiki.id, &title);
        let second = store.create_page(wiki.id, &title);
        let is_duplicate = matches!(second, Err(StoreError::DuplicateName { .. }));
        prop_assert!(is_duplicate);
        // "Front Page" already exists with every wiki.
        prop_assert_eq!(first.is_ok(), title != "Front Page");
    }

    #[test]
    fn lookups_beyond_the_name_limit_are_absent(extra in 1usize..64, ch in "[a-z]") {
        let store = TestStore::memory();
        let stored = ch.repeat(MAX_NAME_CHARS);
        let wiki = store.create_wiki(&stored, "").unwrap();
        store.create_page(wiki.id, &stored).unwrap();

        let query = ch.repeat(MAX_NAME_CHARS + extra);
        prop_assert!(!store.page_exists(wiki.id, &query).unwrap());
        prop_assert!(store.get_page_by_title(wiki.id, &query).unwrap_err().is_not_found());
        prop_assert!(store.get_wiki_by_name(&query).unwrap_err().is_not_found());
    }

    #[test]
    fn delete_wiki_cascades(titles in prop::collection::btree_set(name_strategy(), 0..10)) {
        let store = TestStore::memory();
        let doomed = store.create_wiki("doomed", "").unwrap();
        let kept = store.create_wiki("kept", "").unwrap();
        for title in &titles {
            let _ = store.create_page(doomed.id, title);
            let _ = store.create_page(kept.id, title);
        }
        let doomed_ids: Vec<PageId> = store
            .list_pages_by_title(doomed.id)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        let kept_count = store.count_pages(kept.id).unwrap();

        store.delete_wiki(doomed.id).unwrap();
        prop_assert_eq!(store.count_pages(doomed.id).unwrap(), 0);
        for id in doomed_ids {
            prop_assert!(store.get_page(doomed.id, id).unwrap_err().is_not_found());
        }
        prop_assert_eq!(store.count_pages(kept.id).unwrap(), kept_count);
    }

    #[test]
    fn recency_is_descending(ticks in prop::collection::vec(0i64..2_000_000, 1..15)) {
        let store = TestStore::memory();
        let wiki = store.create_wiki("foo", "").unwrap();
        for (i, micros) in ticks.iter().enumerate() {
            store.tick(*micros);
            store.create_page(wiki.id, &format!("page {i:02}")).unwrap();
        }
        let pages = store.list_pages_by_recency(wiki.id).unwrap();
        prop_assert_eq!(pages.len(), ticks.len() + 1);
        for pair in pages.windows(2) {
            prop_assert!(pair[0].last_updated > pair[1].last_updated);
        }
        let titles = store.list_pages_by_title(wiki.id).unwrap();
        for pair in titles.windows(2) {
            prop_assert!(pair[0].name < pair[1].name);
        }
    }
}

#[test]
fn failed_commit_leaves_nothing_behind() {
    let backend = wikistore_storage::InMemoryBackend::new();
    let (crashable, switch) = CrashableBackend::new(backend.clone());
    let store = wikistore_core::WikiStore::open_with_backend(
        wikistore_core::Config::default(),
        Box::new(crashable),
    )
    .unwrap();
    let size = backend.contents().len();

    switch.arm();
    let err = store.create_wiki("foo", "A wiki about foos.").unwrap_err();
    assert!(matches!(err, StoreError::Storage(_)));
    switch.disarm();

    assert!(store.list_wikis().unwrap().is_empty());
    assert_eq!(store.stats().unwrap().pages, 0);
    assert_eq!(backend.contents().len(), size);

    let foo = store.create_wiki("foo", "").unwrap();
    assert_eq!(store.count_pages(foo.id).unwrap(), 1);
    assert_eq!(store.get_wiki(foo.id).unwrap().name, "foo");
}
