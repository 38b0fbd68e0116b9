//! Demo command implementation.

use super::page_line;
use wikistore_core::{global, Config, StoreError, WikiId, WikiStore};

/// Runs the walkthrough against the process-wide store.
pub fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = global::init(config)?;
    let result = walkthrough(store);
    global::shutdown()?;
    Ok(result?)
}

fn walkthrough(store: &WikiStore) -> Result<(), StoreError> {
    println!("Adding three wikis...");
    store.create_wiki("foo", "A wiki about foos.")?;
    store.create_wiki("bar", "A wiki about bars.")?;
    store.create_wiki("baz", "A wiki about bazzes.")?;
    print_wikis(store)?;

    println!("Renaming foo wiki...");
    let foo = store.get_wiki_by_name("foo")?;
    store.rename_wiki(foo.id, &foo.name, "A wiki about fooze.")?;
    print_wikis(store)?;

    println!("Deleting bar wiki...");
    let bar = store.get_wiki_by_name("bar")?;
    store.delete_wiki(bar.id)?;
    print_wikis(store)?;

    println!("Creating some test pages...");
    for title in ["Monkey", "Hat", "Fish"] {
        store.create_page(foo.id, title)?;
    }
    let baz = store.get_wiki_by_name("baz")?;
    store.create_page(baz.id, "Fish")?;

    println!(
        "foo: {}, baz: {}",
        store.count_pages(foo.id)?,
        store.count_pages(baz.id)?
    );

    print_pages("By title:", store, foo.id, false)?;
    print_pages("By last update:", store, foo.id, true)?;
    Ok(())
}

fn print_wikis(store: &WikiStore) -> Result<(), StoreError> {
    println!();
    for wiki in store.list_wikis()? {
        println!("({}) {}: {}", wiki.id, wiki.name, wiki.description);
    }
    println!();
    Ok(())
}

fn print_pages(
    heading: &str,
    store: &WikiStore,
    wiki: WikiId,
    by_recency: bool,
) -> Result<(), StoreError> {
    println!();
    println!("{heading}");
    let pages = if by_recency {
        store.list_pages_by_recency(wiki)?
    } else {
        store.list_pages_by_title(wiki)?
    };
    for page in &pages {
        println!("{}", page_line(page));
    }
    println!();
    Ok(())
}
