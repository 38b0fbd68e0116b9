//! CLI command implementations.

pub mod compact;
pub mod demo;
pub mod inspect;
pub mod pages;
pub mod verify;
pub mod wikis;

use wikistore_core::PageIndexEntry;

/// One listing line: `id: name (class/last updated)`.
pub(crate) fn page_line(page: &PageIndexEntry) -> String {
    format!(
        "{}: {} ({}/{})",
        page.id,
        page.name,
        page.class,
        page.last_updated.format("%Y-%m-%d %H:%M:%S%.6f")
    )
}
