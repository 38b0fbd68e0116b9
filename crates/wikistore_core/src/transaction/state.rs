//! Transaction state.

use crate::error::{StoreError, StoreResult};
use crate::log::LogRecord;
use crate::table::{Table, Tables};
use crate::types::{RowId, TableId, TransactionId};
use crate::value::Row;

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and can perform operations.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been rolled back.
    Aborted,
}

/// How to reverse one applied write.
#[derive(Debug)]
enum Undo {
    Allocated { table: TableId, previous: u64 },
    Inserted { table: TableId, row_id: RowId },
    Updated { table: TableId, row_id: RowId, old: Row },
    Deleted { table: TableId, row_id: RowId, old: Row },
}

/// An active write transaction.
///
/// Writes go straight to the in-memory tables, so reads through the
/// transaction see them. Each write also records how to undo it and the log
/// record that redoes it. Dropping an active transaction rolls every write
/// back in reverse order.
pub struct Transaction<'a> {
    id: TransactionId,
    tables: &'a mut Tables,
    state: TransactionState,
    undo: Vec<Undo>,
    redo: Vec<LogRecord>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(id: TransactionId, tables: &'a mut Tables) -> Self {
        Self {
            id,
            tables,
            state: TransactionState::Active,
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Checks if the transaction is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Number of row writes made so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.redo.len()
    }

    /// Read access to a table, including this transaction's own writes.
    pub fn table(&self, table: TableId) -> StoreResult<&Table> {
        self.tables.get(table)
    }

    /// A row by bookmark.
    pub fn get(&self, table: TableId, row_id: RowId) -> StoreResult<Option<&Row>> {
        Ok(self.tables.get(table)?.get(row_id))
    }

    /// Inserts a row under a fresh bookmark and returns the bookmark.
    pub fn insert(&mut self, table: TableId, row: Row) -> StoreResult<RowId> {
        self.ensure_active()?;
        let target = self.tables.get_mut(table)?;
        let previous = target.next_id();
        let row_id = target.allocate();
        self.undo.push(Undo::Allocated { table, previous });

        target.insert(row_id, row)?;
        self.undo.push(Undo::Inserted { table, row_id });

        let stored = target
            .get(row_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("rows", row_id.to_string()))?;
        self.redo.push(LogRecord::Insert {
            txid: self.id,
            table,
            row_id,
            row: stored,
        });
        Ok(row_id)
    }

    /// Replaces a row, returning the previous one.
    pub fn update(&mut self, table: TableId, row_id: RowId, row: Row) -> StoreResult<Row> {
        self.ensure_active()?;
        let target = self.tables.get_mut(table)?;
        let old = target.update(row_id, row)?;
        let stored = target
            .get(row_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("rows", row_id.to_string()))?;

        self.undo.push(Undo::Updated {
            table,
            row_id,
            old: old.clone(),
        });
        self.redo.push(LogRecord::Update {
            txid: self.id,
            table,
            row_id,
            row: stored,
        });
        Ok(old)
    }

    /// Deletes a row, returning it.
    pub fn delete(&mut self, table: TableId, row_id: RowId) -> StoreResult<Row> {
        self.ensure_active()?;
        let old = self.tables.get_mut(table)?.delete(row_id)?;
        self.undo.push(Undo::Deleted {
            table,
            row_id,
            old: old.clone(),
        });
        self.redo.push(LogRecord::Delete {
            txid: self.id,
            table,
            row_id,
        });
        Ok(old)
    }

    /// Log records redoing every write, in order.
    pub(crate) fn redo(&self) -> &[LogRecord] {
        &self.redo
    }

    pub(crate) fn mark_committed(&mut self) {
        self.undo.clear();
        self.state = TransactionState::Committed;
    }

    /// Reverses every write and marks the transaction aborted.
    pub fn rollback(&mut self) {
        if !self.is_active() {
            return;
        }
        while let Some(undo) = self.undo.pop() {
            let result = match undo {
                Undo::Allocated { table, previous } => self
                    .tables
                    .get_mut(table)
                    .map(|t| t.reset_next_id(previous)),
                Undo::Inserted { table, row_id } => self
                    .tables
                    .get_mut(table)
                    .and_then(|t| t.delete(row_id))
                    .map(drop),
                Undo::Updated { table, row_id, old } => self
                    .tables
                    .get_mut(table)
                    .and_then(|t| t.update(row_id, old))
                    .map(drop),
                Undo::Deleted { table, row_id, old } => self
                    .tables
                    .get_mut(table)
                    .and_then(|t| t.insert(row_id, old)),
            };
            if let Err(err) = result {
                tracing::error!(%err, txid = %self.id, "rollback step failed");
            }
        }
        self.redo.clear();
        self.state = TransactionState::Aborted;
    }

    fn ensure_active(&self) -> StoreResult<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            TransactionState::Committed => {
                Err(StoreError::invalid_argument("transaction already committed"))
            }
            TransactionState::Aborted => {
                Err(StoreError::invalid_argument("transaction already aborted"))
            }
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        self.rollback();
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("writes", &self.redo.len())
            .finish_non_exhaustive()
    }
}
