//! The wiki and page record store.

use crate::clock::{from_micros, Clock, SystemClock};
use crate::config::Config;
use crate::database::Database;
use crate::error::{StoreError, StoreResult};
use crate::index::{IndexKey, TEXT_KEY_LIMIT};
use crate::model::{Page, PageClass, PageIndexEntry, Wiki};
use crate::schema::{tables, Schema};
use crate::table::Table;
use crate::transaction::Transaction;
use crate::types::{ColumnId, IndexId, PageId, RowId, SequenceNumber, TableId, WikiId};
use crate::value::{Row, Value};
use parking_lot::Mutex;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use wikistore_storage::StorageBackend;

/// Name of the cover page created with every wiki.
pub const FRONT_PAGE_NAME: &str = "Front Page";

/// Initial contents of the cover page.
pub const FRONT_PAGE_CONTENTS: &str = "This is the front page of this wiki.";

/// Longest accepted wiki or page name, in characters.
pub const MAX_NAME_CHARS: usize = TEXT_KEY_LIMIT;

const WIKIS: &str = "wikis";
const PAGES: &str = "pages";

/// Resolved handles into the `wikis` table.
#[derive(Debug, Clone, Copy)]
struct WikiColumns {
    table: TableId,
    width: usize,
    id: ColumnId,
    name: ColumnId,
    description: ColumnId,
    by_name: IndexId,
    by_id: IndexId,
}

impl WikiColumns {
    fn resolve(schema: &Schema) -> StoreResult<Self> {
        let (table, def) = schema.find(tables::WIKIS)?;
        Ok(Self {
            table,
            width: def.columns.len(),
            id: def.column_id("id")?,
            name: def.column_id("name")?,
            description: def.column_id("description")?,
            by_name: def.index_id("byName")?,
            by_id: def.index_id("byId")?,
        })
    }

    fn row(&self, name: &str, description: &str) -> Row {
        Row::empty(self.width)
            .with(self.name, Value::Text(name.to_string()))
            .with(self.description, Value::Text(description.to_string()))
    }

    fn decode(&self, row: &Row) -> StoreResult<Wiki> {
        Ok(Wiki {
            id: WikiId(long(row, self.id, WIKIS)?),
            name: text(row, self.name, WIKIS)?,
            description: text(row, self.description, WIKIS)?,
        })
    }

    /// Bookmark of the wiki with identifier `id`.
    fn find(&self, table: &Table, id: WikiId) -> Option<RowId> {
        table.seek(self.by_id, &IndexKey::asc(Value::Long(id.0)))
    }

    /// Bookmark of the wiki called exactly `name`.
    ///
    /// Index keys keep only a prefix of long texts, so the stored name is
    /// compared in full.
    fn find_by_name(&self, table: &Table, name: &str) -> Option<RowId> {
        table
            .seek(self.by_name, &IndexKey::asc(Value::Text(name.to_string())))
            .filter(|&row_id| has_name(table, row_id, self.name, name))
    }
}

/// Resolved handles into the `pages` table.
#[derive(Debug, Clone, Copy)]
struct PageColumns {
    table: TableId,
    width: usize,
    id: ColumnId,
    wiki: ColumnId,
    name: ColumnId,
    class: ColumnId,
    contents: ColumnId,
    last_updated: ColumnId,
    by_wiki_and_name: IndexId,
    by_id: IndexId,
    by_wiki_and_last_updated: IndexId,
}

impl PageColumns {
    fn resolve(schema: &Schema) -> StoreResult<Self> {
        let (table, def) = schema.find(tables::PAGES)?;
        Ok(Self {
            table,
            width: def.columns.len(),
            id: def.column_id("id")?,
            wiki: def.column_id("wiki")?,
            name: def.column_id("name")?,
            class: def.column_id("class")?,
            contents: def.column_id("contents")?,
            last_updated: def.column_id("lastUpdated")?,
            by_wiki_and_name: def.index_id("byWikiAndName")?,
            by_id: def.index_id("byId")?,
            by_wiki_and_last_updated: def.index_id("byWikiAndLastUpdated")?,
        })
    }

    fn row(&self, wiki: WikiId, name: &str, class: PageClass, contents: &str, stamp: i64) -> Row {
        Row::empty(self.width)
            .with(self.wiki, Value::Long(wiki.0))
            .with(self.name, Value::Text(name.to_string()))
            .with(self.class, Value::Long(class.code()))
            .with(self.contents, Value::Text(contents.to_string()))
            .with(self.last_updated, Value::DateTime(stamp))
    }

    fn decode(&self, row: &Row) -> StoreResult<Page> {
        let entry = self.decode_entry(row)?;
        Ok(Page {
            id: entry.id,
            wiki: entry.wiki,
            name: entry.name,
            class: entry.class,
            contents: row
                .get(self.contents)
                .as_text()
                .map(str::to_string)
                .unwrap_or_default(),
            last_updated: entry.last_updated,
        })
    }

    fn decode_entry(&self, row: &Row) -> StoreResult<PageIndexEntry> {
        let stamp = row
            .get(self.last_updated)
            .as_datetime()
            .ok_or_else(|| StoreError::codec("pages row without lastUpdated"))?;
        Ok(PageIndexEntry {
            id: PageId(long(row, self.id, PAGES)?),
            wiki: WikiId(long(row, self.wiki, PAGES)?),
            name: text(row, self.name, PAGES)?,
            class: PageClass::from_code(long(row, self.class, PAGES)?)?,
            last_updated: from_micros(stamp),
        })
    }

    fn wiki_prefix(wiki: WikiId) -> IndexKey {
        IndexKey::asc(Value::Long(wiki.0))
    }

    fn find(&self, table: &Table, id: PageId) -> Option<RowId> {
        table.seek(self.by_id, &IndexKey::asc(Value::Long(id.0)))
    }

    fn find_by_name(&self, table: &Table, wiki: WikiId, name: &str) -> Option<RowId> {
        let key = Self::wiki_prefix(wiki).then_asc(Value::Text(name.to_string()));
        table
            .seek(self.by_wiki_and_name, &key)
            .filter(|&row_id| has_name(table, row_id, self.name, name))
    }

    fn owner(&self, row: &Row) -> Option<WikiId> {
        row.get(self.wiki).as_long().map(WikiId)
    }

    fn class_of(&self, row: &Row) -> StoreResult<PageClass> {
        PageClass::from_code(long(row, self.class, PAGES)?)
    }

    fn entries(&self, table: &Table, rows: Vec<RowId>) -> StoreResult<Vec<PageIndexEntry>> {
        rows.into_iter()
            .filter_map(|id| table.get(id))
            .map(|row| self.decode_entry(row))
            .collect()
    }
}

fn long(row: &Row, column: ColumnId, table: &str) -> StoreResult<i64> {
    row.get(column)
        .as_long()
        .ok_or_else(|| StoreError::codec(format!("{table} row missing integer column {}", column.0)))
}

fn text(row: &Row, column: ColumnId, table: &str) -> StoreResult<String> {
    row.get(column)
        .as_text()
        .map(str::to_string)
        .ok_or_else(|| StoreError::codec(format!("{table} row missing text column {}", column.0)))
}

fn has_name(table: &Table, row_id: RowId, column: ColumnId, name: &str) -> bool {
    table
        .get(row_id)
        .and_then(|row| row.get(column).as_text())
        .is_some_and(|stored| stored == name)
}

fn validate_name(what: &str, name: &str) -> StoreResult<()> {
    if name.trim().is_empty() {
        return Err(StoreError::invalid_argument(format!("{what} name must not be empty")));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(StoreError::invalid_argument(format!(
            "{what} name is longer than {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(())
}

/// Summary of an open store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Database file, `None` for in-memory stores.
    pub path: Option<PathBuf>,
    /// Log size in bytes.
    pub log_size: u64,
    /// Sequence number of the last commit.
    pub committed_seq: u64,
    /// Number of wikis.
    pub wikis: usize,
    /// Number of pages across all wikis.
    pub pages: usize,
}

struct Inner {
    db: Database,
    /// Last `lastUpdated` handed out, in microseconds.
    last_stamp: i64,
}

/// The record store for wikis and their pages.
///
/// Every public operation takes one store-wide lock for its whole duration,
/// so concurrent callers are fully serialized. The lock is not reentrant.
/// Every mutation runs in one transaction and leaves storage untouched when
/// it fails.
///
/// ```rust
/// use wikistore_core::WikiStore;
///
/// let store = WikiStore::open_in_memory()?;
/// let foo = store.create_wiki("foo", "A wiki about foos.")?;
/// store.create_page(foo.id, "Monkey")?;
///
/// let titles: Vec<_> = store
///     .list_pages_by_title(foo.id)?
///     .into_iter()
///     .map(|p| p.name)
///     .collect();
/// assert_eq!(titles, ["Front Page", "Monkey"]);
/// # Ok::<(), wikistore_core::StoreError>(())
/// ```
pub struct WikiStore {
    inner: Mutex<Inner>,
    wikis: WikiColumns,
    pages: PageColumns,
    clock: Arc<dyn Clock>,
}

impl WikiStore {
    /// Opens or creates the database file named by `config`.
    ///
    /// # Errors
    ///
    /// `StorageInit` if the file is inaccessible, locked by another process
    /// or was created with a different schema.
    pub fn open_with_config(config: Config) -> StoreResult<Self> {
        Self::from_database(Database::open_or_create(config, Schema::wiki_store())?)
    }

    /// Opens a store over an arbitrary backend.
    pub fn open_with_backend(config: Config, backend: Box<dyn StorageBackend>) -> StoreResult<Self> {
        Self::from_database(Database::open_with_backend(
            config,
            backend,
            Schema::wiki_store(),
        )?)
    }

    /// Opens a fresh in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_database(Database::open_in_memory(Schema::wiki_store())?)
    }

    fn from_database(db: Database) -> StoreResult<Self> {
        let wikis = WikiColumns::resolve(db.schema())?;
        let pages = PageColumns::resolve(db.schema())?;
        let last_stamp = db.read(|tables| {
            Ok(tables
                .get(pages.table)?
                .rows()
                .filter_map(|(_, row)| row.get(pages.last_updated).as_datetime())
                .max()
                .unwrap_or(i64::MIN))
        })?;
        info!(path = ?db.path(), "wiki store ready");

        Ok(Self {
            inner: Mutex::new(Inner { db, last_stamp }),
            wikis,
            pages,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replaces the time source used for `last_updated`.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Next `lastUpdated` stamp: the clock, nudged past the previous stamp
    /// so recency order follows write order.
    fn next_stamp(&self, inner: &mut Inner) -> i64 {
        let now = self.clock.now().timestamp_micros();
        let stamp = now.max(inner.last_stamp.saturating_add(1));
        inner.last_stamp = stamp;
        stamp
    }

    // ========================================================================
    // Wikis
    // ========================================================================

    /// All wikis in name order.
    pub fn list_wikis(&self) -> StoreResult<Vec<Wiki>> {
        let inner = self.inner.lock();
        inner.db.read(|tables| {
            let table = tables.get(self.wikis.table)?;
            table
                .scan_primary()
                .into_iter()
                .filter_map(|id| table.get(id))
                .map(|row| self.wikis.decode(row))
                .collect()
        })
    }

    /// A wiki by identifier.
    pub fn get_wiki(&self, id: WikiId) -> StoreResult<Wiki> {
        let inner = self.inner.lock();
        inner.db.read(|tables| {
            let table = tables.get(self.wikis.table)?;
            self.wikis
                .find(table, id)
                .and_then(|row_id| table.get(row_id))
                .ok_or_else(|| StoreError::not_found(WIKIS, format!("id {id}")))
                .and_then(|row| self.wikis.decode(row))
        })
    }

    /// A wiki by name.
    pub fn get_wiki_by_name(&self, name: &str) -> StoreResult<Wiki> {
        let inner = self.inner.lock();
        inner.db.read(|tables| {
            let table = tables.get(self.wikis.table)?;
            self.wikis
                .find_by_name(table, name)
                .and_then(|row_id| table.get(row_id))
                .ok_or_else(|| StoreError::not_found(WIKIS, format!("name {name:?}")))
                .and_then(|row| self.wikis.decode(row))
        })
    }

    /// Creates a wiki together with its cover page.
    ///
    /// # Errors
    ///
    /// `DuplicateName` if a wiki called `name` exists; `InvalidArgument` if
    /// `name` is empty or too long.
    pub fn create_wiki(&self, name: &str, description: &str) -> StoreResult<Wiki> {
        validate_name("wiki", name)?;
        let mut inner = self.inner.lock();
        let stamp = self.next_stamp(&mut inner);

        let wiki = inner.db.transaction(|txn| {
            if self.wikis.find_by_name(txn.table(self.wikis.table)?, name).is_some() {
                return Err(StoreError::duplicate(WIKIS, name));
            }
            let row_id = txn.insert(self.wikis.table, self.wikis.row(name, description))?;
            let id = self.stored_id(txn, self.wikis.table, row_id, self.wikis.id)?;
            let wiki = WikiId(id);

            let front = self.pages.row(
                wiki,
                FRONT_PAGE_NAME,
                PageClass::Cover,
                FRONT_PAGE_CONTENTS,
                stamp,
            );
            txn.insert(self.pages.table, front)?;
            Ok(Wiki {
                id: wiki,
                name: name.to_string(),
                description: description.to_string(),
            })
        })?;
        debug!(id = %wiki.id, name, "created wiki");
        Ok(wiki)
    }

    /// Replaces a wiki's name and description. The identifier never changes.
    ///
    /// # Errors
    ///
    /// `NotFound` if no wiki has identifier `id`; `DuplicateName` if another
    /// wiki is already called `new_name`.
    pub fn rename_wiki(&self, id: WikiId, new_name: &str, new_description: &str) -> StoreResult<Wiki> {
        validate_name("wiki", new_name)?;
        let inner = self.inner.lock();
        inner.db.transaction(|txn| {
            let table = txn.table(self.wikis.table)?;
            let row_id = self
                .wikis
                .find(table, id)
                .ok_or_else(|| StoreError::not_found(WIKIS, format!("id {id}")))?;
            if let Some(other) = self.wikis.find_by_name(table, new_name) {
                if other != row_id {
                    return Err(StoreError::duplicate(WIKIS, new_name));
                }
            }
            txn.update(
                self.wikis.table,
                row_id,
                self.wikis.row(new_name, new_description),
            )?;
            Ok(Wiki {
                id,
                name: new_name.to_string(),
                description: new_description.to_string(),
            })
        })
    }

    /// Deletes a wiki and every page it owns, all or nothing.
    pub fn delete_wiki(&self, id: WikiId) -> StoreResult<()> {
        let inner = self.inner.lock();
        let removed = inner.db.transaction(|txn| {
            let row_id = self
                .wikis
                .find(txn.table(self.wikis.table)?, id)
                .ok_or_else(|| StoreError::not_found(WIKIS, format!("id {id}")))?;

            let pages = txn
                .table(self.pages.table)?
                .scan_prefix(self.pages.by_wiki_and_name, &PageColumns::wiki_prefix(id));
            for page in &pages {
                txn.delete(self.pages.table, *page)?;
            }
            txn.delete(self.wikis.table, row_id)?;
            Ok(pages.len())
        })?;
        debug!(%id, pages = removed, "deleted wiki");
        Ok(())
    }

    // ========================================================================
    // Pages
    // ========================================================================

    /// Pages of a wiki in name order. Empty for an unknown wiki.
    pub fn list_pages_by_title(&self, wiki: WikiId) -> StoreResult<Vec<PageIndexEntry>> {
        let inner = self.inner.lock();
        inner.db.read(|tables| {
            let table = tables.get(self.pages.table)?;
            let rows = table.scan_prefix(self.pages.by_wiki_and_name, &PageColumns::wiki_prefix(wiki));
            self.pages.entries(table, rows)
        })
    }

    /// Pages of a wiki, most recently updated first; ties by identifier.
    pub fn list_pages_by_recency(&self, wiki: WikiId) -> StoreResult<Vec<PageIndexEntry>> {
        let inner = self.inner.lock();
        inner.db.read(|tables| {
            let table = tables.get(self.pages.table)?;
            let rows = table.scan_prefix(
                self.pages.by_wiki_and_last_updated,
                &PageColumns::wiki_prefix(wiki),
            );
            self.pages.entries(table, rows)
        })
    }

    /// Number of pages in a wiki, cover page included.
    pub fn count_pages(&self, wiki: WikiId) -> StoreResult<usize> {
        let inner = self.inner.lock();
        inner.db.read(|tables| {
            Ok(tables
                .get(self.pages.table)?
                .count_prefix(self.pages.by_wiki_and_name, &PageColumns::wiki_prefix(wiki)))
        })
    }

    /// A page by identifier, scoped to its wiki.
    ///
    /// # Errors
    ///
    /// `NotFound` if the page does not exist or belongs to another wiki.
    pub fn get_page(&self, wiki: WikiId, id: PageId) -> StoreResult<Page> {
        let inner = self.inner.lock();
        inner.db.read(|tables| {
            let table = tables.get(self.pages.table)?;
            self.pages
                .find(table, id)
                .and_then(|row_id| table.get(row_id))
                .filter(|row| self.pages.owner(row) == Some(wiki))
                .ok_or_else(|| page_not_found(wiki, id))
                .and_then(|row| self.pages.decode(row))
        })
    }

    /// A page by title within a wiki.
    pub fn get_page_by_title(&self, wiki: WikiId, title: &str) -> StoreResult<Page> {
        let inner = self.inner.lock();
        inner.db.read(|tables| {
            let table = tables.get(self.pages.table)?;
            self.pages
                .find_by_name(table, wiki, title)
                .and_then(|row_id| table.get(row_id))
                .ok_or_else(|| {
                    StoreError::not_found(PAGES, format!("title {title:?} in wiki {wiki}"))
                })
                .and_then(|row| self.pages.decode(row))
        })
    }

    /// Whether a wiki has a page called `title`. Absence is not an error.
    pub fn page_exists(&self, wiki: WikiId, title: &str) -> StoreResult<bool> {
        let inner = self.inner.lock();
        inner.db.read(|tables| {
            let table = tables.get(self.pages.table)?;
            Ok(self.pages.find_by_name(table, wiki, title).is_some())
        })
    }

    /// Creates an empty `Entry` page.
    ///
    /// # Errors
    ///
    /// `NotFound` if the wiki does not exist; `DuplicateName` if the wiki
    /// already has a page called `title`.
    pub fn create_page(&self, wiki: WikiId, title: &str) -> StoreResult<Page> {
        validate_name("page", title)?;
        let mut inner = self.inner.lock();
        let stamp = self.next_stamp(&mut inner);

        let page = inner.db.transaction(|txn| {
            if self.wikis.find(txn.table(self.wikis.table)?, wiki).is_none() {
                return Err(StoreError::not_found(WIKIS, format!("id {wiki}")));
            }
            if self
                .pages
                .find_by_name(txn.table(self.pages.table)?, wiki, title)
                .is_some()
            {
                return Err(StoreError::duplicate(PAGES, title));
            }
            let row = self.pages.row(wiki, title, PageClass::Entry, "", stamp);
            let row_id = txn.insert(self.pages.table, row)?;
            let id = self.stored_id(txn, self.pages.table, row_id, self.pages.id)?;
            Ok(Page {
                id: PageId(id),
                wiki,
                name: title.to_string(),
                class: PageClass::Entry,
                contents: String::new(),
                last_updated: from_micros(stamp),
            })
        })?;
        debug!(%wiki, id = %page.id, title, "created page");
        Ok(page)
    }

    /// Writes a page's name, class and contents and refreshes `last_updated`.
    ///
    /// Returns the page as stored.
    ///
    /// # Errors
    ///
    /// - `NotFound` if `page.id` does not exist in `page.wiki`
    /// - `DuplicateName` if the new name is taken in the wiki
    /// - `CoverConflict` if the class would change to or from `Cover`
    pub fn save_page(&self, page: &Page) -> StoreResult<Page> {
        validate_name("page", &page.name)?;
        let mut inner = self.inner.lock();
        let stamp = self.next_stamp(&mut inner);

        inner.db.transaction(|txn| {
            let table = txn.table(self.pages.table)?;
            let row_id = self
                .pages
                .find(table, page.id)
                .ok_or_else(|| page_not_found(page.wiki, page.id))?;
            let stored = table
                .get(row_id)
                .ok_or_else(|| page_not_found(page.wiki, page.id))?;
            if self.pages.owner(stored) != Some(page.wiki) {
                return Err(page_not_found(page.wiki, page.id));
            }
            let was_cover = self.pages.class_of(stored)? == PageClass::Cover;
            if was_cover != (page.class == PageClass::Cover) {
                return Err(StoreError::CoverConflict { wiki: page.wiki.0 });
            }
            if let Some(other) = self.pages.find_by_name(table, page.wiki, &page.name) {
                if other != row_id {
                    return Err(StoreError::duplicate(PAGES, page.name.clone()));
                }
            }

            let row = self
                .pages
                .row(page.wiki, &page.name, page.class, &page.contents, stamp);
            txn.update(self.pages.table, row_id, row)?;
            Ok(Page {
                last_updated: from_micros(stamp),
                ..page.clone()
            })
        })
    }

    /// Deletes a page.
    ///
    /// # Errors
    ///
    /// `NotFound` if the page does not exist in `wiki`; `CoverConflict` for
    /// the cover page, which only goes away with its wiki.
    pub fn delete_page(&self, wiki: WikiId, id: PageId) -> StoreResult<()> {
        let inner = self.inner.lock();
        inner.db.transaction(|txn| {
            let table = txn.table(self.pages.table)?;
            let row_id = self
                .pages
                .find(table, id)
                .ok_or_else(|| page_not_found(wiki, id))?;
            let stored = table.get(row_id).ok_or_else(|| page_not_found(wiki, id))?;
            if self.pages.owner(stored) != Some(wiki) {
                return Err(page_not_found(wiki, id));
            }
            if self.pages.class_of(stored)? == PageClass::Cover {
                return Err(StoreError::CoverConflict { wiki: wiki.0 });
            }
            txn.delete(self.pages.table, row_id)?;
            Ok(())
        })
    }

    /// Full-text search within one wiki. Not built yet.
    pub fn search_pages(&self, _wiki: WikiId, _query: &str) -> StoreResult<Vec<PageIndexEntry>> {
        self.not_implemented("search_pages")
    }

    /// Full-text search across every wiki. Not built yet.
    pub fn search_all(&self, _query: &str) -> StoreResult<Vec<PageIndexEntry>> {
        self.not_implemented("search_all")
    }

    /// Pages linking to a page. Not built yet.
    pub fn backlinks(&self, _wiki: WikiId, _page: PageId) -> StoreResult<Vec<PageIndexEntry>> {
        self.not_implemented("backlinks")
    }

    fn not_implemented<T>(&self, operation: &'static str) -> StoreResult<T> {
        self.inner.lock().db.ensure_open()?;
        Err(StoreError::NotImplemented { operation })
    }

    /// Reads back the autoincrement value of a freshly inserted row.
    fn stored_id(
        &self,
        txn: &Transaction<'_>,
        table: TableId,
        row_id: RowId,
        column: ColumnId,
    ) -> StoreResult<i64> {
        txn.get(table, row_id)?
            .and_then(|row| row.get(column).as_long())
            .ok_or_else(|| StoreError::codec(format!("inserted {row_id} has no identifier")))
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Rewrites the log as one snapshot transaction.
    pub fn compact(&self) -> StoreResult<()> {
        self.inner.lock().db.compact()
    }

    /// Summary of the open store.
    pub fn stats(&self) -> StoreResult<StoreStats> {
        let inner = self.inner.lock();
        let (wikis, pages) = inner.db.read(|tables| {
            Ok((
                tables.get(self.wikis.table)?.len(),
                tables.get(self.pages.table)?.len(),
            ))
        })?;
        Ok(StoreStats {
            path: inner.db.path().map(PathBuf::from),
            log_size: inner.db.log_size()?,
            committed_seq: inner.db.committed_seq().as_u64(),
            wikis,
            pages,
        })
    }

    /// Sequence number of the last commit.
    pub fn committed_seq(&self) -> SequenceNumber {
        self.inner.lock().db.committed_seq()
    }

    /// Whether the store is open.
    pub fn is_open(&self) -> bool {
        self.inner.lock().db.is_open()
    }

    /// Flushes and releases the database file. Idempotent.
    pub fn close(&self) -> StoreResult<()> {
        self.inner.lock().db.close()
    }
}

fn page_not_found(wiki: WikiId, id: PageId) -> StoreError {
    StoreError::not_found(PAGES, format!("id {id} in wiki {wiki}"))
}

impl std::fmt::Debug for WikiStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WikiStore")
            .field("db", &self.inner.lock().db)
            .finish_non_exhaustive()
    }
}

impl Drop for WikiStore {
    fn drop(&mut self) {
        let _ = self.inner.get_mut().db.close();
    }
}
