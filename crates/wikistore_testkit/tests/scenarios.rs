//! End-to-end walkthroughs of the wiki store.

use wikistore_core::store::{FRONT_PAGE_CONTENTS, FRONT_PAGE_NAME};
use wikistore_core::{PageClass, StoreError, WikiId};
use wikistore_testkit::prelude::*;

fn wiki_names(store: &TestStore) -> Vec<String> {
    store.list_wikis().unwrap().into_iter().map(|w| w.name).collect()
}

#[test]
fn create_list_and_rename_wikis() {
    let store = TestStore::memory();
    store.create_wiki("foo", "A wiki about foos.").unwrap();
    store.create_wiki("bar", "A wiki about bars.").unwrap();
    store.create_wiki("baz", "A wiki about bazzes.").unwrap();
    assert_eq!(wiki_names(&store), vec!["bar", "baz", "foo"]);

    let foo = store.get_wiki_by_name("foo").unwrap();
    store.rename_wiki(foo.id, "foo", "A wiki about fooze.").unwrap();

    let wikis = store.list_wikis().unwrap();
    let renamed = wikis.iter().find(|w| w.name == "foo").unwrap();
    assert_eq!(renamed.id, foo.id);
    assert_eq!(renamed.description, "A wiki about fooze.");
    assert_eq!(wikis.len(), 3);
}

#[test]
fn delete_wiki_leaves_the_others() {
    let store = TestStore::memory();
    for name in ["foo", "bar", "baz"] {
        store.create_wiki(name, "").unwrap();
    }
    let bar = store.get_wiki_by_name("bar").unwrap();
    store.delete_wiki(bar.id).unwrap();
    assert_eq!(wiki_names(&store), vec!["baz", "foo"]);
}

#[test]
fn page_counts_include_front_page() {
    let store = TestStore::memory();
    let wikis = scenarios::demo_store(&store);
    assert_eq!(store.count_pages(wikis.foo.id).unwrap(), 4);
    assert_eq!(store.count_pages(wikis.baz.id).unwrap(), 2);

    let front = store.get_page_by_title(wikis.foo.id, FRONT_PAGE_NAME).unwrap();
    assert_eq!(front.class, PageClass::Cover);
    assert_eq!(front.contents, FRONT_PAGE_CONTENTS);
}

#[test]
fn duplicate_page_and_missing_wiki() {
    let store = TestStore::memory();
    let wikis = scenarios::demo_store(&store);

    let err = store.create_page(wikis.foo.id, "Fish").unwrap_err();
    assert!(matches!(err, StoreError::DuplicateName { collection: "pages", .. }));

    let err = store.create_page(WikiId(9_999), "X").unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(store.count_pages(wikis.foo.id).unwrap(), 4);
}

#[test]
fn demo_listings() {
    let store = TestStore::memory();
    let wikis = scenarios::demo_store(&store);

    let by_title: Vec<_> = store
        .list_pages_by_title(wikis.foo.id)
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(by_title, vec!["Fish", "Front Page", "Hat", "Monkey"]);

    let by_recency: Vec<_> = store
        .list_pages_by_recency(wikis.foo.id)
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(by_recency, vec!["Fish", "Hat", "Monkey", "Front Page"]);
}

#[test]
fn edit_then_reorder_by_recency() {
    let store = TestStore::memory();
    let wikis = scenarios::demo_store(&store);

    store.tick(5_000_000);
    let mut hat = store.get_page_by_title(wikis.foo.id, "Hat").unwrap();
    hat.contents = "A hat is a head covering.".into();
    hat.class = PageClass::Article;
    let saved = store.save_page(&hat).unwrap();

    let newest = &store.list_pages_by_recency(wikis.foo.id).unwrap()[0];
    assert_eq!(newest.id, hat.id);
    assert_eq!(newest.last_updated, saved.last_updated);
    assert_eq!(newest.class, PageClass::Article);
}

#[test]
fn file_store_walkthrough_survives_reopen() {
    let store = TestStore::file();
    let wikis = scenarios::demo_store(&store);
    let before = store.list_pages_by_recency(wikis.foo.id).unwrap();

    let store = store.reopen();
    assert_eq!(wiki_names(&store), vec!["baz", "foo"]);
    assert_eq!(store.list_pages_by_recency(wikis.foo.id).unwrap(), before);
    assert!(store.page_exists(wikis.baz.id, "Fish").unwrap());
}

#[test]
fn unbuilt_operations_are_signalled() {
    let store = TestStore::memory();
    let wikis = scenarios::demo_store(&store);
    assert!(matches!(
        store.search_pages(wikis.foo.id, "hat"),
        Err(StoreError::NotImplemented { .. })
    ));
    assert!(matches!(
        store.search_all("hat"),
        Err(StoreError::NotImplemented { .. })
    ));
}

#[test]
fn dispose_twice() {
    let store = TestStore::memory();
    store.create_wiki("foo", "").unwrap();
    store.close().unwrap();
    store.close().unwrap();
    assert!(!store.is_open());
    assert!(matches!(store.count_pages(WikiId(1)), Err(StoreError::StoreClosed)));
}
