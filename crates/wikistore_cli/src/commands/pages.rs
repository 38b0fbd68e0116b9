//! Page listing command.

use super::page_line;
use wikistore_core::{Config, WikiStore};

/// Lists the pages of the wiki called `wiki`.
pub fn run(
    config: Config,
    wiki: &str,
    by_recency: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = WikiStore::open_with_config(config.create_if_missing(false))?;
    let wiki = store.get_wiki_by_name(wiki)?;
    let pages = if by_recency {
        store.list_pages_by_recency(wiki.id)?
    } else {
        store.list_pages_by_title(wiki.id)?
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&pages)?),
        _ => {
            println!("({}) {}: {} pages", wiki.id, wiki.name, pages.len());
            for page in &pages {
                println!("  {}", page_line(page));
            }
        }
    }

    store.close()?;
    Ok(())
}
