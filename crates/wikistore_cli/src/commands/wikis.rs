//! Wiki listing and creation commands.

use wikistore_core::{Config, WikiStore};

/// Lists wikis in name order.
pub fn list(config: Config, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = WikiStore::open_with_config(config.create_if_missing(false))?;
    let wikis = store.list_wikis()?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&wikis)?),
        _ => {
            if wikis.is_empty() {
                println!("No wikis");
            }
            for wiki in &wikis {
                let pages = store.count_pages(wiki.id)?;
                println!("({}) {}: {} [{} pages]", wiki.id, wiki.name, wiki.description, pages);
            }
        }
    }

    store.close()?;
    Ok(())
}

/// Creates a wiki and reports its identifier.
pub fn create(config: Config, name: &str, description: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = WikiStore::open_with_config(config)?;
    let wiki = store.create_wiki(name, description)?;
    println!("Created wiki ({}) {}", wiki.id, wiki.name);
    store.close()?;
    Ok(())
}
