//! Compact command implementation.

use wikistore_core::{Config, WikiStore};

/// Rewrites the log and reports the size change.
pub fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = WikiStore::open_with_config(config.create_if_missing(false))?;
    let before = store.stats()?;
    store.compact()?;
    let after = store.stats()?;

    println!("Compacted {} wikis, {} pages", after.wikis, after.pages);
    println!("  Log size: {} -> {} bytes", before.log_size, after.log_size);

    store.close()?;
    Ok(())
}
