//! Table, column and index definitions.
//!
//! A [`Schema`] is written into the database file inside the very first
//! committed transaction. Reopening a file replays that record and compares it
//! with the schema this build expects; any difference fails the open.
//!
//! ## The wiki store schema
//!
//! ```text
//! wikis   id (Long, autoincrement)  name (Text, not null)  description (Text, not null)
//!         byName                primary unique  +name
//!         byId                                  +id
//!
//! pages   id (Long, autoincrement)  wiki (Long, not null)  name (Text, not null)
//!         class (Long, not null)    contents (LongText)    lastUpdated (DateTime, not null)
//!         byWikiAndName         primary unique  +wiki +name
//!         byId                                  +id
//!         byWikiAndLastUpdated                  +wiki -lastUpdated
//!         byContents                            +contents
//! ```

use crate::error::{StoreError, StoreResult};
use crate::types::{ColumnId, IndexId, TableId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Current schema layout version.
pub const SCHEMA_VERSION: u16 = 2;

/// Table names.
pub mod tables {
    /// Wiki collection.
    pub const WIKIS: &str = "wikis";
    /// Page collection.
    pub const PAGES: &str = "pages";
}

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// 64-bit signed integer.
    Long,
    /// Short text.
    Text,
    /// Unbounded text.
    LongText,
    /// UTC timestamp.
    DateTime,
}

/// A column definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Storage type.
    pub ty: ColumnType,
    /// Value assigned by the table on insert.
    pub autoincrement: bool,
    /// Rejects `Null`.
    pub not_null: bool,
}

impl ColumnDef {
    /// Creates a nullable column.
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            autoincrement: false,
            not_null: false,
        }
    }

    /// Marks the column as autoincrement (implies not null).
    #[must_use]
    pub fn autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self.not_null = true;
        self
    }

    /// Marks the column as not null.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }
}

/// Sort direction of one key segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    /// `+column`
    Ascending,
    /// `-column`
    Descending,
}

/// One column of an index key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySegment {
    /// Column name.
    pub column: String,
    /// Direction.
    pub order: SortOrder,
}

/// An index definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    /// Index name.
    pub name: String,
    /// Key segments, most significant first.
    pub key: Vec<KeySegment>,
    /// Canonical key and default scan order of the table.
    pub primary: bool,
    /// At most one row per key.
    pub unique: bool,
    /// Rejects rows with a null key segment.
    pub disallow_null: bool,
}

impl IndexDef {
    /// Creates a non-unique secondary index with no segments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: Vec::new(),
            primary: false,
            unique: false,
            disallow_null: false,
        }
    }

    /// Appends an ascending segment.
    #[must_use]
    pub fn asc(mut self, column: impl Into<String>) -> Self {
        self.key.push(KeySegment {
            column: column.into(),
            order: SortOrder::Ascending,
        });
        self
    }

    /// Appends a descending segment.
    #[must_use]
    pub fn desc(mut self, column: impl Into<String>) -> Self {
        self.key.push(KeySegment {
            column: column.into(),
            order: SortOrder::Descending,
        });
        self
    }

    /// Marks the index as the table's primary, unique, null-rejecting index.
    #[must_use]
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self.unique = true;
        self.disallow_null = true;
        self
    }
}

/// A table definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    /// Table name.
    pub name: String,
    /// Columns in row order.
    pub columns: Vec<ColumnDef>,
    /// Indices.
    pub indexes: Vec<IndexDef>,
}

impl TableDef {
    /// Creates an empty table definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds an index.
    #[must_use]
    pub fn index(mut self, index: IndexDef) -> Self {
        self.indexes.push(index);
        self
    }

    /// Resolves a column name to its position.
    pub fn column_id(&self, name: &str) -> StoreResult<ColumnId> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .and_then(|pos| u16::try_from(pos).ok())
            .map(ColumnId)
            .ok_or_else(|| {
                StoreError::storage_init(format!("table {} has no column {name}", self.name))
            })
    }

    /// Resolves an index name to its position.
    pub fn index_id(&self, name: &str) -> StoreResult<IndexId> {
        self.indexes
            .iter()
            .position(|i| i.name == name)
            .and_then(|pos| u16::try_from(pos).ok())
            .map(IndexId)
            .ok_or_else(|| {
                StoreError::storage_init(format!("table {} has no index {name}", self.name))
            })
    }

    /// The autoincrement column.
    pub fn autoincrement_column(&self) -> StoreResult<ColumnId> {
        let mut found = self.columns.iter().enumerate().filter(|(_, c)| c.autoincrement);
        match (found.next(), found.next()) {
            (Some((pos, col)), None) if col.ty == ColumnType::Long => u16::try_from(pos)
                .map(ColumnId)
                .map_err(|_| StoreError::storage_init("too many columns")),
            _ => Err(StoreError::storage_init(format!(
                "table {} needs exactly one Long autoincrement column",
                self.name
            ))),
        }
    }

    /// The primary index.
    pub fn primary_index(&self) -> StoreResult<IndexId> {
        let mut found = self.indexes.iter().enumerate().filter(|(_, i)| i.primary);
        match (found.next(), found.next()) {
            (Some((pos, _)), None) => u16::try_from(pos)
                .map(IndexId)
                .map_err(|_| StoreError::storage_init("too many indexes")),
            _ => Err(StoreError::storage_init(format!(
                "table {} needs exactly one primary index",
                self.name
            ))),
        }
    }

    fn validate(&self) -> StoreResult<()> {
        let mut names = HashSet::new();
        for column in &self.columns {
            if !names.insert(column.name.as_str()) {
                return Err(StoreError::storage_init(format!(
                    "duplicate column {} in table {}",
                    column.name, self.name
                )));
            }
        }
        self.autoincrement_column()?;
        self.primary_index()?;

        let mut index_names = HashSet::new();
        for index in &self.indexes {
            if !index_names.insert(index.name.as_str()) {
                return Err(StoreError::storage_init(format!(
                    "duplicate index {} in table {}",
                    index.name, self.name
                )));
            }
            if index.key.is_empty() {
                return Err(StoreError::storage_init(format!(
                    "index {} has an empty key",
                    index.name
                )));
            }
            for segment in &index.key {
                self.column_id(&segment.column)?;
            }
        }
        Ok(())
    }
}

/// The full set of tables in a database file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Layout version.
    pub version: u16,
    /// Tables; a table's position is its [`TableId`].
    pub tables: Vec<TableDef>,
}

impl Schema {
    /// Creates an empty schema at [`SCHEMA_VERSION`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: SCHEMA_VERSION,
            tables: Vec::new(),
        }
    }

    /// Adds a table.
    #[must_use]
    pub fn table(mut self, table: TableDef) -> Self {
        self.tables.push(table);
        self
    }

    /// The schema of the wiki store.
    #[must_use]
    pub fn wiki_store() -> Self {
        let wikis = TableDef::new(tables::WIKIS)
            .column(ColumnDef::new("id", ColumnType::Long).autoincrement())
            .column(ColumnDef::new("name", ColumnType::Text).not_null())
            .column(ColumnDef::new("description", ColumnType::Text).not_null())
            .index(IndexDef::new("byName").asc("name").primary())
            .index(IndexDef::new("byId").asc("id"));

        let pages = TableDef::new(tables::PAGES)
            .column(ColumnDef::new("id", ColumnType::Long).autoincrement())
            .column(ColumnDef::new("wiki", ColumnType::Long).not_null())
            .column(ColumnDef::new("name", ColumnType::Text).not_null())
            .column(ColumnDef::new("class", ColumnType::Long).not_null())
            .column(ColumnDef::new("contents", ColumnType::LongText))
            .column(ColumnDef::new("lastUpdated", ColumnType::DateTime).not_null())
            .index(IndexDef::new("byWikiAndName").asc("wiki").asc("name").primary())
            .index(IndexDef::new("byId").asc("id"))
            .index(
                IndexDef::new("byWikiAndLastUpdated")
                    .asc("wiki")
                    .desc("lastUpdated"),
            )
            .index(IndexDef::new("byContents").asc("contents"));

        Self::new().table(wikis).table(pages)
    }

    /// Looks up a table by name.
    pub fn find(&self, name: &str) -> StoreResult<(TableId, &TableDef)> {
        self.tables
            .iter()
            .enumerate()
            .find(|(_, t)| t.name == name)
            .and_then(|(pos, t)| u32::try_from(pos).ok().map(|id| (TableId(id), t)))
            .ok_or_else(|| StoreError::storage_init(format!("schema has no table {name}")))
    }

    /// Checks internal consistency.
    pub fn validate(&self) -> StoreResult<()> {
        let mut names = HashSet::new();
        for table in &self.tables {
            if !names.insert(table.name.as_str()) {
                return Err(StoreError::storage_init(format!(
                    "duplicate table {}",
                    table.name
                )));
            }
            table.validate()?;
        }
        Ok(())
    }

    /// Fails unless `persisted` is exactly this schema.
    pub fn ensure_matches(&self, persisted: &Schema) -> StoreResult<()> {
        if persisted.version != self.version {
            return Err(StoreError::storage_init(format!(
                "schema version {} does not match expected {}",
                persisted.version, self.version
            )));
        }
        if persisted != self {
            return Err(StoreError::storage_init(
                "persisted schema does not match the expected tables, columns and indexes",
            ));
        }
        Ok(())
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wiki_store_schema_is_valid() {
        let schema = Schema::wiki_store();
        schema.validate().unwrap();

        let (wikis_id, wikis) = schema.find(tables::WIKIS).unwrap();
        assert_eq!(wikis_id, TableId(0));
        assert_eq!(wikis.primary_index().unwrap(), wikis.index_id("byName").unwrap());
        assert_eq!(wikis.autoincrement_column().unwrap(), ColumnId(0));

        let (_, pages) = schema.find(tables::PAGES).unwrap();
        let recency = &pages.indexes[pages.index_id("byWikiAndLastUpdated").unwrap().0 as usize];
        assert_eq!(recency.key[1].order, SortOrder::Descending);
        assert!(!recency.unique);
    }

    #[test]
    fn primary_implies_unique_and_not_null() {
        let index = IndexDef::new("byName").asc("name").primary();
        assert!(index.primary && index.unique && index.disallow_null);
    }

    #[test]
    fn unknown_names_fail_resolution() {
        let schema = Schema::wiki_store();
        let (_, wikis) = schema.find(tables::WIKIS).unwrap();
        assert!(matches!(
            wikis.column_id("title"),
            Err(StoreError::StorageInit { .. })
        ));
        assert!(schema.find("backlinks").is_err());
    }

    #[test]
    fn validation_rejects_missing_primary() {
        let schema = Schema::new().table(
            TableDef::new("t")
                .column(ColumnDef::new("id", ColumnType::Long).autoincrement())
                .index(IndexDef::new("byId").asc("id")),
        );
        assert!(schema.validate().is_err());
    }

    #[test]
    fn validation_rejects_unknown_key_column() {
        let schema = Schema::new().table(
            TableDef::new("t")
                .column(ColumnDef::new("id", ColumnType::Long).autoincrement())
                .index(IndexDef::new("byName").asc("name").primary()),
        );
        assert!(schema.validate().is_err());
    }

    #[test]
    fn mismatch_is_detected() {
        let expected = Schema::wiki_store();
        let mut older = Schema::wiki_store();
        older.tables[1].indexes.remove(1);
        assert!(expected.ensure_matches(&older).is_err());
        expected.ensure_matches(&Schema::wiki_store()).unwrap();

        let mut versioned = Schema::wiki_store();
        versioned.version = 1;
        assert!(expected.ensure_matches(&versioned).is_err());
    }
}
