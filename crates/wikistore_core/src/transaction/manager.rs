//! Transaction manager.

use crate::error::{StoreError, StoreResult};
use crate::log::{LogManager, LogRecord};
use crate::table::Tables;
use crate::transaction::state::Transaction;
use crate::types::{SequenceNumber, TransactionId};
use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out transaction identifiers and commits transactions to the log.
///
/// Callers serialize writers; the manager itself only keeps the counters.
pub struct TransactionManager {
    next_txid: AtomicU64,
    committed_seq: AtomicU64,
}

impl TransactionManager {
    /// Creates a manager for an empty log.
    pub fn new() -> Self {
        Self::with_state(1, 0)
    }

    /// Creates a manager initialized from recovery state.
    pub fn with_state(next_txid: u64, committed_seq: u64) -> Self {
        Self {
            next_txid: AtomicU64::new(next_txid.max(1)),
            committed_seq: AtomicU64::new(committed_seq),
        }
    }

    /// Reserves a transaction identifier without starting a transaction.
    pub fn allocate_txid(&self) -> TransactionId {
        TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst))
    }

    /// Begins a transaction over `tables`.
    pub fn begin<'a>(&self, tables: &'a mut Tables) -> Transaction<'a> {
        Transaction::new(self.allocate_txid(), tables)
    }

    /// Commits a transaction.
    ///
    /// Appends `Begin`, the redo records and `Commit` in one write. A
    /// transaction with no writes commits without touching the log. If the
    /// append fails the transaction stays active, so dropping it rolls back.
    pub fn commit(&self, log: &LogManager, txn: &mut Transaction<'_>) -> StoreResult<SequenceNumber> {
        if !txn.is_active() {
            return Err(StoreError::invalid_argument("transaction not active"));
        }
        if txn.write_count() == 0 {
            txn.mark_committed();
            return Ok(self.committed_seq());
        }

        let txid = txn.id();
        let sequence = self.committed_seq().next();
        let mut records = Vec::with_capacity(txn.write_count() + 2);
        records.push(LogRecord::Begin { txid });
        records.extend_from_slice(txn.redo());
        records.push(LogRecord::Commit { txid, sequence });

        log.append_batch(&records)?;

        self.committed_seq.store(sequence.as_u64(), Ordering::SeqCst);
        txn.mark_committed();
        tracing::debug!(%txid, %sequence, writes = records.len() - 2, "committed");
        Ok(sequence)
    }

    /// Sequence number of the last commit.
    #[must_use]
    pub fn committed_seq(&self) -> SequenceNumber {
        SequenceNumber::new(self.committed_seq.load(Ordering::SeqCst))
    }

    /// Records a commit made outside [`TransactionManager::commit`].
    pub(crate) fn set_committed_seq(&self, sequence: SequenceNumber) {
        self.committed_seq.store(sequence.as_u64(), Ordering::SeqCst);
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("next_txid", &self.next_txid.load(Ordering::SeqCst))
            .field("committed_seq", &self.committed_seq.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{tables, Schema};
    use crate::value::{Row, Value};
    use wikistore_storage::InMemoryBackend;

    fn setup() -> (TransactionManager, LogManager, Tables) {
        let log = LogManager::new(Box::new(InMemoryBackend::new()), false);
        let tables = Tables::from_schema(&Schema::wiki_store()).unwrap();
        (TransactionManager::new(), log, tables)
    }

    fn wiki_row(name: &str) -> Row {
        Row::from_values(vec![
            Value::Null,
            Value::Text(name.into()),
            Value::Text("desc".into()),
        ])
    }

    #[test]
    fn commit_writes_one_batch() {
        let (tm, log, mut tables) = setup();
        let schema = Schema::wiki_store();
        let (wikis, _) = schema.find(tables::WIKIS).unwrap();

        let mut txn = tm.begin(&mut tables);
        txn.insert(wikis, wiki_row("foo")).unwrap();
        let seq = tm.commit(&log, &mut txn).unwrap();
        drop(txn);

        assert_eq!(seq, SequenceNumber::new(1));
        assert_eq!(tm.committed_seq(), seq);
        let kinds: Vec<_> = log.read_all().unwrap().iter().map(|e| e.record.kind()).collect();
        assert_eq!(kinds, vec!["begin", "insert", "commit"]);
        assert_eq!(tables.get(wikis).unwrap().len(), 1);
    }

    #[test]
    fn empty_commit_skips_the_log() {
        let (tm, log, mut tables) = setup();
        let mut txn = tm.begin(&mut tables);
        assert_eq!(tm.commit(&log, &mut txn).unwrap(), SequenceNumber::new(0));
        assert_eq!(log.size().unwrap(), 0);
    }

    #[test]
    fn sequence_numbers_increase() {
        let (tm, log, mut tables) = setup();
        let schema = Schema::wiki_store();
        let (wikis, _) = schema.find(tables::WIKIS).unwrap();
        for (i, name) in ["a", "b", "c"].into_iter().enumerate() {
            let mut txn = tm.begin(&mut tables);
            txn.insert(wikis, wiki_row(name)).unwrap();
            assert_eq!(tm.commit(&log, &mut txn).unwrap().as_u64(), i as u64 + 1);
        }
    }

    #[test]
    fn cannot_commit_twice() {
        let (tm, log, mut tables) = setup();
        let mut txn = tm.begin(&mut tables);
        tm.commit(&log, &mut txn).unwrap();
        assert!(tm.commit(&log, &mut txn).is_err());
    }

    #[test]
    fn txids_are_unique() {
        let tm = TransactionManager::with_state(10, 4);
        assert_eq!(tm.allocate_txid(), TransactionId::new(10));
        assert_eq!(tm.allocate_txid(), TransactionId::new(11));
        assert_eq!(tm.committed_seq(), SequenceNumber::new(4));
    }
}
