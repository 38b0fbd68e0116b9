//! In-memory tables with their indices.
//!
//! A [`Table`] holds the live rows of one collection, keyed by bookmark, and
//! keeps every index of its definition in step with them. All checks for a
//! write run before anything is touched, so a rejected write leaves the
//! table unchanged.

use crate::error::{StoreError, StoreResult};
use crate::index::{BTreeIndex, IndexKey, KeyPart};
use crate::schema::{Schema, SortOrder, TableDef};
use crate::types::{ColumnId, IndexId, RowId, TableId};
use crate::value::{Row, Value};
use std::collections::BTreeMap;

/// An index definition with its columns resolved.
#[derive(Debug, Clone)]
struct ResolvedIndex {
    segments: Vec<(ColumnId, SortOrder)>,
    tree: BTreeIndex,
}

impl ResolvedIndex {
    fn key_for(&self, row: &Row) -> IndexKey {
        IndexKey::new(
            self.segments
                .iter()
                .map(|&(column, order)| KeyPart::new(row.get(column).clone(), order))
                .collect(),
        )
    }
}

/// Live rows of one table plus their indices.
#[derive(Debug, Clone)]
pub struct Table {
    id: TableId,
    def: TableDef,
    autoincrement: ColumnId,
    primary: IndexId,
    indexes: Vec<ResolvedIndex>,
    rows: BTreeMap<RowId, Row>,
    next_id: u64,
}

impl Table {
    /// Creates an empty table from its definition.
    pub fn new(id: TableId, def: TableDef) -> StoreResult<Self> {
        let autoincrement = def.autoincrement_column()?;
        let primary = def.primary_index()?;
        let mut indexes = Vec::with_capacity(def.indexes.len());
        for index in &def.indexes {
            let segments = index
                .key
                .iter()
                .map(|s| def.column_id(&s.column).map(|c| (c, s.order)))
                .collect::<StoreResult<Vec<_>>>()?;
            indexes.push(ResolvedIndex {
                segments,
                tree: BTreeIndex::new(index.name.clone(), index.unique, index.disallow_null),
            });
        }

        Ok(Self {
            id,
            def,
            autoincrement,
            primary,
            indexes,
            rows: BTreeMap::new(),
            next_id: 1,
        })
    }

    /// Table identifier.
    #[must_use]
    pub fn id(&self) -> TableId {
        self.id
    }

    /// Table definition.
    #[must_use]
    pub fn def(&self) -> &TableDef {
        &self.def
    }

    /// Table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Number of live rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The next bookmark [`Table::allocate`] will hand out.
    #[must_use]
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Raises the next bookmark to at least `next`.
    ///
    /// Never lowers it, so identifiers stay unique even after the rows that
    /// used them are gone.
    pub fn bump_next_id(&mut self, next: u64) {
        self.next_id = self.next_id.max(next);
    }

    /// Restores the next bookmark exactly. Used when rolling back.
    pub(crate) fn reset_next_id(&mut self, next: u64) {
        self.next_id = next;
    }

    /// Hands out a fresh bookmark.
    pub fn allocate(&mut self) -> RowId {
        let id = RowId(self.next_id);
        self.next_id += 1;
        id
    }

    /// The autoincrement column.
    #[must_use]
    pub fn autoincrement_column(&self) -> ColumnId {
        self.autoincrement
    }

    /// A row by bookmark.
    #[must_use]
    pub fn get(&self, row_id: RowId) -> Option<&Row> {
        self.rows.get(&row_id)
    }

    /// Point lookup on an index.
    #[must_use]
    pub fn seek(&self, index: IndexId, key: &IndexKey) -> Option<RowId> {
        self.index(index).and_then(|i| i.tree.seek(key))
    }

    /// Ranged scan on an index, bounded to keys starting with `prefix`.
    #[must_use]
    pub fn scan_prefix(&self, index: IndexId, prefix: &IndexKey) -> Vec<RowId> {
        self.index(index)
            .map(|i| i.tree.scan_prefix(prefix))
            .unwrap_or_default()
    }

    /// Number of rows under `prefix` on an index.
    #[must_use]
    pub fn count_prefix(&self, index: IndexId, prefix: &IndexKey) -> usize {
        self.index(index)
            .map(|i| i.tree.count_prefix(prefix))
            .unwrap_or_default()
    }

    /// Full scan in primary-index order.
    #[must_use]
    pub fn scan_primary(&self) -> Vec<RowId> {
        self.index(self.primary)
            .map(|i| i.tree.scan())
            .unwrap_or_default()
    }

    /// Every row in bookmark order.
    pub fn rows(&self) -> impl Iterator<Item = (RowId, &Row)> {
        self.rows.iter().map(|(id, row)| (*id, row))
    }

    /// Inserts a new row under `row_id`.
    ///
    /// The autoincrement column is set to the bookmark.
    pub fn insert(&mut self, row_id: RowId, mut row: Row) -> StoreResult<()> {
        if self.rows.contains_key(&row_id) {
            return Err(StoreError::Constraint {
                index: format!("{}.{}", self.def.name, self.def.columns[self.autoincrement.slot()].name),
            });
        }
        let id_value = i64::try_from(row_id.as_u64())
            .map_err(|_| StoreError::invalid_argument("row identifier overflow"))?;
        row.set(self.autoincrement, Value::Long(id_value));
        self.validate_row(&row)?;

        let keys = self.keys_for(&row);
        for (index, key) in self.indexes.iter().zip(&keys) {
            index.tree.check(key, row_id)?;
        }
        for (index, key) in self.indexes.iter_mut().zip(keys) {
            index.tree.insert(key, row_id)?;
        }
        self.rows.insert(row_id, row);
        self.bump_next_id(row_id.as_u64() + 1);
        Ok(())
    }

    /// Replaces the row under `row_id`, returning the previous row.
    ///
    /// The autoincrement column is carried over from the stored row.
    pub fn update(&mut self, row_id: RowId, mut row: Row) -> StoreResult<Row> {
        let Some(old) = self.rows.get(&row_id) else {
            return Err(StoreError::not_found("rows", format!("{row_id} in {}", self.def.name)));
        };
        row.set(self.autoincrement, old.get(self.autoincrement).clone());
        self.validate_row(&row)?;

        let old_keys = self.keys_for(old);
        let new_keys = self.keys_for(&row);
        for (index, key) in self.indexes.iter().zip(&new_keys) {
            index.tree.check(key, row_id)?;
        }
        for ((index, old_key), new_key) in self.indexes.iter_mut().zip(old_keys).zip(new_keys) {
            if old_key != new_key {
                index.tree.remove(&old_key, row_id);
                index.tree.insert(new_key, row_id)?;
            }
        }
        let previous = self.rows.insert(row_id, row);
        previous.ok_or_else(|| StoreError::not_found("rows", row_id.to_string()))
    }

    /// Removes the row under `row_id`, returning it.
    pub fn delete(&mut self, row_id: RowId) -> StoreResult<Row> {
        let Some(row) = self.rows.remove(&row_id) else {
            return Err(StoreError::not_found("rows", format!("{row_id} in {}", self.def.name)));
        };
        let keys = self.keys_for(&row);
        for (index, key) in self.indexes.iter_mut().zip(keys) {
            index.tree.remove(&key, row_id);
        }
        Ok(row)
    }

    fn index(&self, index: IndexId) -> Option<&ResolvedIndex> {
        self.indexes.get(index.0 as usize)
    }

    fn keys_for(&self, row: &Row) -> Vec<IndexKey> {
        self.indexes.iter().map(|i| i.key_for(row)).collect()
    }

    fn validate_row(&self, row: &Row) -> StoreResult<()> {
        if row.width() != self.def.columns.len() {
            return Err(StoreError::invalid_argument(format!(
                "row has {} values, table {} has {} columns",
                row.width(),
                self.def.name,
                self.def.columns.len()
            )));
        }
        for (column, value) in self.def.columns.iter().zip(row.values()) {
            if !value.fits(column.ty) {
                return Err(StoreError::invalid_argument(format!(
                    "column {}.{} expects {:?}",
                    self.def.name, column.name, column.ty
                )));
            }
            if column.not_null && value.is_null() {
                return Err(StoreError::invalid_argument(format!(
                    "column {}.{} may not be null",
                    self.def.name, column.name
                )));
            }
        }
        Ok(())
    }
}

/// The open tables of a database, in schema order.
#[derive(Debug, Clone)]
pub struct Tables {
    tables: Vec<Table>,
}

impl Tables {
    /// Creates empty tables for every table of `schema`.
    pub fn from_schema(schema: &Schema) -> StoreResult<Self> {
        let tables = schema
            .tables
            .iter()
            .enumerate()
            .map(|(pos, def)| {
                let id = u32::try_from(pos)
                    .map_err(|_| StoreError::storage_init("too many tables"))?;
                Table::new(TableId(id), def.clone())
            })
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(Self { tables })
    }

    /// A table by identifier.
    pub fn get(&self, id: TableId) -> StoreResult<&Table> {
        self.tables
            .get(id.0 as usize)
            .ok_or_else(|| StoreError::log_corruption(format!("unknown {id}")))
    }

    /// A table by identifier, mutably.
    pub fn get_mut(&mut self, id: TableId) -> StoreResult<&mut Table> {
        self.tables
            .get_mut(id.0 as usize)
            .ok_or_else(|| StoreError::log_corruption(format!("unknown {id}")))
    }

    /// All tables.
    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    /// Next bookmark of every table.
    #[must_use]
    pub fn next_ids(&self) -> Vec<(TableId, u64)> {
        self.tables.iter().map(|t| (t.id(), t.next_id())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tables;

    fn pages() -> Table {
        let schema = Schema::wiki_store();
        let (id, def) = schema.find(tables::PAGES).unwrap();
        Table::new(id, def.clone()).unwrap()
    }

    fn page_row(table: &Table, wiki: i64, name: &str, stamp: i64) -> Row {
        let def = table.def();
        Row::empty(def.columns.len())
            .with(def.column_id("wiki").unwrap(), Value::Long(wiki))
            .with(def.column_id("name").unwrap(), Value::Text(name.into()))
            .with(def.column_id("class").unwrap(), Value::Long(0))
            .with(def.column_id("contents").unwrap(), Value::Text(String::new()))
            .with(def.column_id("lastUpdated").unwrap(), Value::DateTime(stamp))
    }

    #[test]
    fn insert_sets_autoincrement_and_indexes() {
        let mut table = pages();
        let id = table.allocate();
        let row = page_row(&table, 1, "Monkey", 10);
        table.insert(id, row).unwrap();

        let stored = table.get(id).unwrap();
        assert_eq!(stored.get(ColumnId(0)).as_long(), Some(1));

        let by_id = table.def().index_id("byId").unwrap();
        assert_eq!(table.seek(by_id, &IndexKey::asc(Value::Long(1))), Some(id));
        assert_eq!(table.next_id(), 2);
    }

    #[test]
    fn duplicate_primary_key_leaves_table_untouched() {
        let mut table = pages();
        let first = table.allocate();
        table.insert(first, page_row(&table, 1, "Fish", 10)).unwrap();

        let second = table.allocate();
        let err = table.insert(second, page_row(&table, 1, "Fish", 20)).unwrap_err();
        assert!(matches!(err, StoreError::Constraint { .. }));
        assert_eq!(table.len(), 1);

        let by_id = table.def().index_id("byId").unwrap();
        assert!(table.seek(by_id, &IndexKey::asc(Value::Long(2))).is_none());
    }

    #[test]
    fn not_null_columns_are_enforced() {
        let mut table = pages();
        let id = table.allocate();
        let def = table.def().clone();
        let row = page_row(&table, 1, "Hat", 1).with(def.column_id("name").unwrap(), Value::Null);
        assert!(matches!(
            table.insert(id, row),
            Err(StoreError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn update_moves_index_entries() {
        let mut table = pages();
        let id = table.allocate();
        table.insert(id, page_row(&table, 1, "Hat", 10)).unwrap();
        let renamed = page_row(&table, 1, "Cap", 30);
        let old = table.update(id, renamed).unwrap();
        assert_eq!(old.get(table.def().column_id("name").unwrap()).as_text(), Some("Hat"));

        let primary = table.def().primary_index().unwrap();
        let prefix = IndexKey::asc(Value::Long(1));
        let rows = table.scan_prefix(primary, &prefix);
        assert_eq!(rows, vec![id]);
        let hat = prefix.clone().then_asc(Value::Text("Hat".into()));
        assert!(table.seek(primary, &hat).is_none());
        // Bookmark column is preserved.
        assert_eq!(table.get(id).unwrap().get(ColumnId(0)).as_long(), Some(1));
    }

    #[test]
    fn update_into_taken_key_fails() {
        let mut table = pages();
        let a = table.allocate();
        table.insert(a, page_row(&table, 1, "Hat", 10)).unwrap();
        let b = table.allocate();
        table.insert(b, page_row(&table, 1, "Fish", 10)).unwrap();

        assert!(table.update(b, page_row(&table, 1, "Hat", 11)).is_err());
        let name = table.def().column_id("name").unwrap();
        assert_eq!(table.get(b).unwrap().get(name).as_text(), Some("Fish"));
    }

    #[test]
    fn delete_keeps_counter() {
        let mut table = pages();
        let id = table.allocate();
        table.insert(id, page_row(&table, 1, "Hat", 10)).unwrap();
        table.delete(id).unwrap();

        assert!(table.is_empty());
        assert_eq!(table.allocate(), RowId(2));
        assert!(table.delete(id).is_err());
    }

    #[test]
    fn tables_follow_schema_order() {
        let tables = Tables::from_schema(&Schema::wiki_store()).unwrap();
        let names: Vec<_> = tables.iter().map(Table::name).collect();
        assert_eq!(names, vec!["wikis", "pages"]);
        assert_eq!(tables.next_ids(), vec![(TableId(0), 1), (TableId(1), 1)]);
        assert!(tables.get(TableId(5)).is_err());
    }
}
