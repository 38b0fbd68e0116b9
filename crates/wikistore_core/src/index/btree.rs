//! BTree index implementation.

use crate::error::{StoreError, StoreResult};
use crate::index::IndexKey;
use crate::types::RowId;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

/// Ordered index from keys to rows.
///
/// Supports:
/// - Point lookups (`seek`)
/// - Prefix-bounded ranged scans (`scan_prefix`)
/// - Full ordered scans (`scan`)
///
/// A unique index refuses a second row under an existing key; a
/// null-rejecting index refuses keys with a `Null` segment.
#[derive(Debug, Clone)]
pub struct BTreeIndex {
    name: String,
    unique: bool,
    disallow_null: bool,
    entries: BTreeMap<IndexKey, BTreeSet<RowId>>,
    count: usize,
}

impl BTreeIndex {
    /// Creates an empty index.
    pub fn new(name: impl Into<String>, unique: bool, disallow_null: bool) -> Self {
        Self {
            name: name.into(),
            unique,
            disallow_null,
            entries: BTreeMap::new(),
            count: 0,
        }
    }

    /// Index name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the index is unique.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Fails if inserting `key` for `row` would violate this index.
    ///
    /// An entry already owned by `row` itself is not a conflict, so the same
    /// check serves inserts and in-place updates.
    pub fn check(&self, key: &IndexKey, row: RowId) -> StoreResult<()> {
        if self.disallow_null && key.has_null() {
            return Err(self.violation());
        }
        if self.unique {
            if let Some(rows) = self.entries.get(key) {
                if rows.iter().any(|&existing| existing != row) {
                    return Err(self.violation());
                }
            }
        }
        Ok(())
    }

    /// Inserts a key-row mapping after [`BTreeIndex::check`].
    pub fn insert(&mut self, key: IndexKey, row: RowId) -> StoreResult<()> {
        self.check(&key, row)?;
        if self.entries.entry(key).or_default().insert(row) {
            self.count += 1;
        }
        Ok(())
    }

    /// Removes a key-row mapping. Returns whether it was present.
    pub fn remove(&mut self, key: &IndexKey, row: RowId) -> bool {
        let Some(rows) = self.entries.get_mut(key) else {
            return false;
        };
        let removed = rows.remove(&row);
        if rows.is_empty() {
            self.entries.remove(key);
        }
        if removed {
            self.count -= 1;
        }
        removed
    }

    /// First row under exactly `key`.
    #[must_use]
    pub fn seek(&self, key: &IndexKey) -> Option<RowId> {
        self.entries
            .get(key)
            .and_then(|rows| rows.iter().next().copied())
    }

    /// Whether any row carries exactly `key`.
    #[must_use]
    pub fn contains(&self, key: &IndexKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Rows whose key starts with `prefix`, in index order.
    #[must_use]
    pub fn scan_prefix(&self, prefix: &IndexKey) -> Vec<RowId> {
        self.entries
            .range((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .flat_map(|(_, rows)| rows.iter().copied())
            .collect()
    }

    /// Number of rows whose key starts with `prefix`.
    #[must_use]
    pub fn count_prefix(&self, prefix: &IndexKey) -> usize {
        self.entries
            .range((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(_, rows)| rows.len())
            .sum()
    }

    /// All rows in index order.
    #[must_use]
    pub fn scan(&self) -> Vec<RowId> {
        self.entries
            .values()
            .flat_map(|rows| rows.iter().copied())
            .collect()
    }

    /// Number of key-row mappings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.count = 0;
    }

    fn violation(&self) -> StoreError {
        StoreError::Constraint {
            index: self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::KeyPart;
    use crate::schema::SortOrder;
    use crate::value::Value;

    fn name_key(wiki: i64, name: &str) -> IndexKey {
        IndexKey::asc(Value::Long(wiki)).then_asc(Value::Text(name.into()))
    }

    #[test]
    fn unique_index_rejects_second_row() {
        let mut index = BTreeIndex::new("byWikiAndName", true, true);
        index.insert(name_key(1, "Fish"), RowId(1)).unwrap();

        let err = index.insert(name_key(1, "Fish"), RowId(2)).unwrap_err();
        assert!(matches!(err, StoreError::Constraint { ref index } if index == "byWikiAndName"));

        // Same row re-inserting its own key is fine.
        index.check(&name_key(1, "Fish"), RowId(1)).unwrap();
        index.insert(name_key(2, "Fish"), RowId(3)).unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn disallow_null_rejects_null_keys() {
        let mut index = BTreeIndex::new("byName", true, true);
        assert!(index.insert(IndexKey::asc(Value::Null), RowId(1)).is_err());

        let mut lenient = BTreeIndex::new("byContents", false, false);
        lenient.insert(IndexKey::asc(Value::Null), RowId(1)).unwrap();
    }

    #[test]
    fn non_unique_index_keeps_all_rows() {
        let mut index = BTreeIndex::new("byId", false, false);
        index.insert(IndexKey::asc(Value::Long(5)), RowId(9)).unwrap();
        index.insert(IndexKey::asc(Value::Long(5)), RowId(4)).unwrap();
        assert_eq!(index.seek(&IndexKey::asc(Value::Long(5))), Some(RowId(4)));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn prefix_scan_is_bounded_and_ordered() {
        let mut index = BTreeIndex::new("byWikiAndName", true, true);
        index.insert(name_key(1, "Monkey"), RowId(1)).unwrap();
        index.insert(name_key(1, "Hat"), RowId(2)).unwrap();
        index.insert(name_key(2, "Fish"), RowId(3)).unwrap();
        index.insert(name_key(1, "Fish"), RowId(4)).unwrap();
        index.insert(name_key(0, "Zebra"), RowId(5)).unwrap();

        let prefix = IndexKey::asc(Value::Long(1));
        assert_eq!(index.scan_prefix(&prefix), vec![RowId(4), RowId(2), RowId(1)]);
        assert_eq!(index.count_prefix(&prefix), 3);
        assert!(index.scan_prefix(&IndexKey::asc(Value::Long(7))).is_empty());
    }

    #[test]
    fn descending_prefix_scan_returns_newest_first() {
        let mut index = BTreeIndex::new("byWikiAndLastUpdated", false, false);
        for (row, stamp) in [(1, 100), (2, 300), (3, 200)] {
            let key = IndexKey::new(vec![
                KeyPart::new(Value::Long(1), SortOrder::Ascending),
                KeyPart::new(Value::DateTime(stamp), SortOrder::Descending),
            ]);
            index.insert(key, RowId(row)).unwrap();
        }
        let rows = index.scan_prefix(&IndexKey::asc(Value::Long(1)));
        assert_eq!(rows, vec![RowId(2), RowId(3), RowId(1)]);
    }

    #[test]
    fn remove_drops_empty_keys() {
        let mut index = BTreeIndex::new("byId", false, false);
        let key = IndexKey::asc(Value::Long(1));
        index.insert(key.clone(), RowId(1)).unwrap();

        assert!(index.remove(&key, RowId(1)));
        assert!(!index.remove(&key, RowId(1)));
        assert!(!index.contains(&key));
        assert!(index.is_empty());
    }
}
