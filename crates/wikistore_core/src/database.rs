//! Database engine: open, recovery, transactions and compaction.

use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::lock::FileLock;
use crate::log::{LogManager, LogRecord};
use crate::schema::Schema;
use crate::table::Tables;
use crate::transaction::{Transaction, TransactionManager};
use crate::types::{SequenceNumber, TransactionId};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};
use wikistore_storage::{FileBackend, InMemoryBackend, StorageBackend};

/// The record engine behind a [`WikiStore`](crate::WikiStore).
///
/// A `Database` owns one log, the tables rebuilt from it and the schema they
/// follow. It knows nothing about wikis or pages.
///
/// # Opening
///
/// ```rust,ignore
/// use wikistore_core::{Config, Database, Schema};
///
/// let db = Database::open_or_create(Config::new().path("wikis.wdb"), Schema::wiki_store())?;
/// db.transaction(|txn| {
///     // reads and writes
///     Ok(())
/// })?;
/// db.close()?;
/// ```
pub struct Database {
    /// Configuration.
    config: Config,
    /// Database file, `None` for in-memory databases.
    path: Option<PathBuf>,
    /// Advisory lock held while open.
    lock: Mutex<Option<FileLock>>,
    /// Expected schema.
    schema: Schema,
    /// Transaction log.
    log: LogManager,
    /// Transaction counters.
    txn_manager: TransactionManager,
    /// Live tables.
    tables: Mutex<Tables>,
    /// Log size right after the last compaction.
    compacted_size: AtomicU64,
    /// Whether the database is open.
    is_open: RwLock<bool>,
}

/// State rebuilt from the log.
struct Recovered {
    tables: Option<Tables>,
    next_txid: u64,
    committed_seq: u64,
    committed_end: u64,
    torn: bool,
}

impl Database {
    /// Opens the database file named by `config`, creating it if allowed.
    ///
    /// # Errors
    ///
    /// `StorageInit` if the file is missing and may not be created, cannot be
    /// opened, is locked by another process or holds a different schema.
    /// `LogCorruption` or `ChecksumMismatch` if a committed frame is damaged.
    pub fn open_or_create(config: Config, schema: Schema) -> StoreResult<Self> {
        let path = config.resolve_path();
        if !config.create_if_missing && !path.exists() {
            return Err(StoreError::storage_init(format!(
                "database file does not exist: {}",
                path.display()
            )));
        }

        // The sidecar lock needs the directory before the database file does.
        if config.create_if_missing {
            FileBackend::create_parent_dirs(&path).map_err(|e| {
                StoreError::storage_init(format!("cannot create {}: {e}", path.display()))
            })?;
        }
        let lock = FileLock::acquire(&path)?;
        let backend = FileBackend::open(&path).map_err(|e| {
            StoreError::storage_init(format!("cannot open {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), lock = %lock.path().display(), "opened database file");

        Self::open_inner(config, Some(path), Some(lock), Box::new(backend), schema)
            .map_err(into_init_error)
    }

    /// Opens a database over an arbitrary backend.
    pub fn open_with_backend(
        config: Config,
        backend: Box<dyn StorageBackend>,
        schema: Schema,
    ) -> StoreResult<Self> {
        Self::open_inner(config, None, None, backend, schema).map_err(into_init_error)
    }

    /// Opens a fresh in-memory database.
    pub fn open_in_memory(schema: Schema) -> StoreResult<Self> {
        Self::open_with_backend(Config::default(), Box::new(InMemoryBackend::new()), schema)
    }

    fn open_inner(
        config: Config,
        path: Option<PathBuf>,
        lock: Option<FileLock>,
        backend: Box<dyn StorageBackend>,
        schema: Schema,
    ) -> StoreResult<Self> {
        schema.validate()?;
        let log = LogManager::new(backend, config.sync_on_commit);
        let size = log.size()?;
        let recovered = Self::recover(&log, &schema)?;

        let (tables, txn_manager) = match recovered.tables {
            Some(tables) => {
                if recovered.committed_end < size {
                    warn!(
                        discarded = size - recovered.committed_end,
                        torn = recovered.torn,
                        "discarding uncommitted log tail"
                    );
                    log.truncate(recovered.committed_end)?;
                }
                let manager =
                    TransactionManager::with_state(recovered.next_txid, recovered.committed_seq);
                (tables, manager)
            }
            None => {
                if size > 0 {
                    warn!(discarded = size, "log holds no committed schema, starting over");
                    log.truncate(0)?;
                }
                Self::create(&log, &schema)?
            }
        };

        let db = Self {
            compacted_size: AtomicU64::new(log.size()?),
            config,
            path,
            lock: Mutex::new(lock),
            schema,
            log,
            txn_manager,
            tables: Mutex::new(tables),
            is_open: RwLock::new(true),
        };
        debug!(
            committed_seq = %db.committed_seq(),
            log_size = db.compacted_size.load(Ordering::SeqCst),
            "database ready"
        );
        Ok(db)
    }

    /// Writes the schema into an empty log as the first transaction.
    fn create(log: &LogManager, schema: &Schema) -> StoreResult<(Tables, TransactionManager)> {
        let txid = TransactionId::new(1);
        let sequence = SequenceNumber::new(1);
        log.append_batch(&[
            LogRecord::Begin { txid },
            LogRecord::Schema {
                txid,
                schema: schema.clone(),
            },
            LogRecord::Commit { txid, sequence },
        ])?;
        info!(tables = schema.tables.len(), "created database schema");
        Ok((
            Tables::from_schema(schema)?,
            TransactionManager::with_state(2, sequence.as_u64()),
        ))
    }

    /// Replays every committed transaction of the log.
    fn recover(log: &LogManager, expected: &Schema) -> StoreResult<Recovered> {
        let mut pending: HashMap<TransactionId, Vec<LogRecord>> = HashMap::new();
        let mut tables = None;
        let mut max_txid = 0u64;
        let mut committed_seq = 0u64;
        let mut committed_end = 0u64;
        let mut replayed = 0usize;

        let mut iter = log.iter()?;
        for entry in iter.by_ref() {
            let entry = entry?;
            let txid = entry.record.txid();
            max_txid = max_txid.max(txid.as_u64());

            match entry.record {
                LogRecord::Begin { txid } => {
                    pending.insert(txid, Vec::new());
                }
                LogRecord::Commit { txid, sequence } => {
                    let ops = pending.remove(&txid).ok_or_else(|| {
                        StoreError::log_corruption(format!(
                            "commit of {txid} without begin at offset {}",
                            entry.offset
                        ))
                    })?;
                    Self::apply(&mut tables, expected, ops)?;
                    committed_seq = committed_seq.max(sequence.as_u64());
                    committed_end = entry.end;
                    replayed += 1;
                }
                record => {
                    let ops = pending.get_mut(&txid).ok_or_else(|| {
                        StoreError::log_corruption(format!(
                            "{} record outside a transaction at offset {}",
                            record.kind(),
                            entry.offset
                        ))
                    })?;
                    ops.push(record);
                }
            }
        }
        let torn = iter.torn_tail();
        drop(iter);

        debug!(
            transactions = replayed,
            uncommitted = pending.len(),
            torn,
            "replayed log"
        );
        Ok(Recovered {
            tables,
            next_txid: max_txid + 1,
            committed_seq,
            committed_end,
            torn,
        })
    }

    /// Applies the operations of one committed transaction.
    fn apply(
        tables: &mut Option<Tables>,
        expected: &Schema,
        ops: Vec<LogRecord>,
    ) -> StoreResult<()> {
        for op in ops {
            let kind = op.kind();
            match op {
                LogRecord::Schema { schema, .. } => {
                    if tables.is_some() {
                        return Err(StoreError::log_corruption("schema defined twice"));
                    }
                    expected.ensure_matches(&schema)?;
                    *tables = Some(Tables::from_schema(&schema)?);
                }
                LogRecord::Insert {
                    table, row_id, row, ..
                } => {
                    replay_target(tables, kind)?
                        .get_mut(table)?
                        .insert(row_id, row)
                        .map_err(|e| replay_error(kind, &e))?;
                }
                LogRecord::Update {
                    table, row_id, row, ..
                } => {
                    replay_target(tables, kind)?
                        .get_mut(table)?
                        .update(row_id, row)
                        .map_err(|e| replay_error(kind, &e))?;
                }
                LogRecord::Delete { table, row_id, .. } => {
                    replay_target(tables, kind)?
                        .get_mut(table)?
                        .delete(row_id)
                        .map_err(|e| replay_error(kind, &e))?;
                }
                LogRecord::Checkpoint { next_ids, .. } => {
                    let target = replay_target(tables, kind)?;
                    for (table, next) in next_ids {
                        target.get_mut(table)?.bump_next_id(next);
                    }
                }
                LogRecord::Begin { .. } | LogRecord::Commit { .. } => {
                    return Err(StoreError::log_corruption(format!(
                        "nested {kind} record"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Executes `f` within a write transaction.
    ///
    /// If `f` returns `Ok` the transaction is committed; if it returns `Err`,
    /// or the commit fails, every write is rolled back. A commit that pushes
    /// the log past its size limit compacts it.
    pub fn transaction<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> StoreResult<T>,
    {
        self.ensure_open()?;
        let mut tables = self.tables.lock();
        let mut txn = self.txn_manager.begin(&mut tables);
        let value = f(&mut txn)?;
        self.txn_manager.commit(&self.log, &mut txn)?;
        drop(txn);

        if self.needs_compaction()? {
            if let Err(err) = self.compact_locked(&tables) {
                warn!(%err, "log compaction failed, keeping the full log");
            }
        }
        Ok(value)
    }

    /// Runs `f` against the committed tables.
    pub fn read<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Tables) -> StoreResult<T>,
    {
        self.ensure_open()?;
        let tables = self.tables.lock();
        f(&tables)
    }

    /// Rewrites the log as one snapshot transaction.
    pub fn compact(&self) -> StoreResult<()> {
        self.ensure_open()?;
        let tables = self.tables.lock();
        self.compact_locked(&tables)
    }

    fn needs_compaction(&self) -> StoreResult<bool> {
        let limit = self.config.max_log_size;
        if limit == 0 {
            return Ok(false);
        }
        // A snapshot bigger than the limit would otherwise be rewritten on
        // every commit.
        let floor = self.compacted_size.load(Ordering::SeqCst).saturating_mul(2);
        Ok(self.log.size()? > limit.max(floor))
    }

    fn compact_locked(&self, tables: &Tables) -> StoreResult<()> {
        let before = self.log.size()?;
        let txid = self.txn_manager.allocate_txid();
        let committed = self.txn_manager.committed_seq();
        let sequence = committed.next();

        let mut records = vec![
            LogRecord::Begin { txid },
            LogRecord::Schema {
                txid,
                schema: self.schema.clone(),
            },
            LogRecord::Checkpoint {
                txid,
                sequence: committed,
                next_ids: tables.next_ids(),
            },
        ];
        for table in tables.iter() {
            records.extend(table.rows().map(|(row_id, row)| LogRecord::Insert {
                txid,
                table: table.id(),
                row_id,
                row: row.clone(),
            }));
        }
        records.push(LogRecord::Commit { txid, sequence });

        self.log.replace(&records)?;
        self.txn_manager.set_committed_seq(sequence);
        let after = self.log.size()?;
        self.compacted_size.store(after, Ordering::SeqCst);
        debug!(before, after, rows = records.len() - 4, "compacted log");
        Ok(())
    }

    /// Expected schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Database file, `None` for in-memory databases.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns database configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current log size in bytes.
    pub fn log_size(&self) -> StoreResult<u64> {
        self.log.size()
    }

    /// Sequence number of the last commit.
    #[must_use]
    pub fn committed_seq(&self) -> SequenceNumber {
        self.txn_manager.committed_seq()
    }

    /// Number of live rows per table, in schema order.
    pub fn row_counts(&self) -> StoreResult<Vec<(String, usize)>> {
        self.read(|tables| {
            Ok(tables
                .iter()
                .map(|t| (t.name().to_string(), t.len()))
                .collect())
        })
    }

    /// Flushes the log and releases the file lock.
    ///
    /// Idempotent; later operations fail with `StoreClosed`.
    pub fn close(&self) -> StoreResult<()> {
        let mut is_open = self.is_open.write();
        if !*is_open {
            return Ok(());
        }
        *is_open = false;

        let result = self.log.sync();
        if let Some(lock) = self.lock.lock().as_mut() {
            lock.release();
        }
        info!(path = ?self.path, "closed database");
        result
    }

    /// Checks if the database is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.is_open.read()
    }

    /// Ensures the database is open.
    pub fn ensure_open(&self) -> StoreResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(StoreError::StoreClosed)
        }
    }
}

fn replay_target<'a>(tables: &'a mut Option<Tables>, kind: &str) -> StoreResult<&'a mut Tables> {
    tables
        .as_mut()
        .ok_or_else(|| StoreError::log_corruption(format!("{kind} record before schema")))
}

fn replay_error(kind: &str, err: &StoreError) -> StoreError {
    StoreError::log_corruption(format!("replay of {kind} failed: {err}"))
}

/// Reports open failures as `StorageInit`, except damage to committed frames.
fn into_init_error(err: StoreError) -> StoreError {
    match err {
        StoreError::StorageInit { .. }
        | StoreError::LogCorruption { .. }
        | StoreError::ChecksumMismatch { .. } => err,
        other => StoreError::storage_init(other.to_string()),
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("is_open", &self.is_open())
            .field("committed_seq", &self.committed_seq())
            .finish_non_exhaustive()
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{tables, ColumnDef, ColumnType, IndexDef, TableDef};
    use crate::types::{RowId, TableId};
    use crate::value::{Row, Value};
    use tempfile::tempdir;

    fn wiki_row(name: &str) -> Row {
        Row::from_values(vec![
            Value::Null,
            Value::Text(name.into()),
            Value::Text(String::new()),
        ])
    }

    fn wikis() -> TableId {
        Schema::wiki_store().find(tables::WIKIS).unwrap().0
    }

    fn insert(db: &Database, name: &str) -> RowId {
        db.transaction(|txn| txn.insert(wikis(), wiki_row(name))).unwrap()
    }

    fn reopen(backend: &InMemoryBackend, config: Config) -> Database {
        Database::open_with_backend(config, Box::new(backend.clone()), Schema::wiki_store())
            .unwrap()
    }

    #[test]
    fn new_database_writes_schema() {
        let backend = InMemoryBackend::new();
        let db = reopen(&backend, Config::default());
        assert_eq!(db.committed_seq(), SequenceNumber::new(1));
        assert!(db.log_size().unwrap() > 0);
        assert_eq!(
            db.row_counts().unwrap(),
            vec![("wikis".to_string(), 0), ("pages".to_string(), 0)]
        );
    }

    #[test]
    fn committed_rows_survive_reopen() {
        let backend = InMemoryBackend::new();
        {
            let db = reopen(&backend, Config::default());
            insert(&db, "foo");
            insert(&db, "bar");
            db.close().unwrap();
        }
        let db = reopen(&backend, Config::default());
        let count = db.read(|t| Ok(t.get(wikis())?.len())).unwrap();
        assert_eq!(count, 2);
        assert_eq!(db.committed_seq(), SequenceNumber::new(3));
        assert_eq!(insert(&db, "baz"), RowId(3));
    }

    #[test]
    fn failed_transaction_leaves_no_trace() {
        let db = Database::open_in_memory(Schema::wiki_store()).unwrap();
        insert(&db, "foo");
        let size = db.log_size().unwrap();

        let result: StoreResult<()> = db.transaction(|txn| {
            txn.insert(wikis(), wiki_row("bar"))?;
            Err(StoreError::invalid_argument("stop"))
        });
        assert!(result.is_err());
        assert_eq!(db.log_size().unwrap(), size);
        assert_eq!(db.read(|t| Ok(t.get(wikis())?.len())).unwrap(), 1);
    }

    #[test]
    fn torn_tail_is_truncated() {
        let backend = InMemoryBackend::new();
        let good_size;
        {
            let db = reopen(&backend, Config::default());
            insert(&db, "foo");
            good_size = db.log_size().unwrap();
            insert(&db, "bar");
        }
        let mut data = backend.contents();
        data.truncate(data.len() - 3);
        let torn = InMemoryBackend::with_data(data);

        let db = reopen(&torn, Config::default());
        assert_eq!(db.log_size().unwrap(), good_size);
        assert_eq!(db.read(|t| Ok(t.get(wikis())?.len())).unwrap(), 1);
    }

    #[test]
    fn uncommitted_frames_are_discarded() {
        let backend = InMemoryBackend::new();
        let size = {
            let db = reopen(&backend, Config::default());
            insert(&db, "foo");
            db.log_size().unwrap()
        };
        let txid = TransactionId::new(99);
        let log = LogManager::new(Box::new(backend.clone()), false);
        log.append_batch(&[
            LogRecord::Begin { txid },
            LogRecord::Insert {
                txid,
                table: wikis(),
                row_id: RowId(2),
                row: wiki_row("ghost"),
            },
        ])
        .unwrap();

        let db = reopen(&backend, Config::default());
        assert_eq!(db.log_size().unwrap(), size);
        assert_eq!(db.read(|t| Ok(t.get(wikis())?.len())).unwrap(), 1);
    }

    #[test]
    fn corrupted_frame_fails_open() {
        let backend = InMemoryBackend::new();
        {
            let db = reopen(&backend, Config::default());
            insert(&db, "foo");
        }
        let mut data = backend.contents();
        let last = data.len() - 6;
        data[last] ^= 0x55;
        let result = Database::open_with_backend(
            Config::default(),
            Box::new(InMemoryBackend::with_data(data)),
            Schema::wiki_store(),
        );
        assert!(matches!(
            result,
            Err(StoreError::ChecksumMismatch { .. } | StoreError::LogCorruption { .. })
        ));
    }

    #[test]
    fn foreign_schema_fails_open() {
        let other = Schema::new().table(
            TableDef::new("notes")
                .column(ColumnDef::new("id", ColumnType::Long).autoincrement())
                .index(IndexDef::new("byId").asc("id").primary()),
        );
        let backend = InMemoryBackend::new();
        drop(
            Database::open_with_backend(Config::default(), Box::new(backend.clone()), other)
                .unwrap(),
        );

        let result = Database::open_with_backend(
            Config::default(),
            Box::new(backend.clone()),
            Schema::wiki_store(),
        );
        assert!(matches!(result, Err(StoreError::StorageInit { .. })));
    }

    #[test]
    fn compaction_keeps_rows_and_counters() {
        let backend = InMemoryBackend::new();
        {
            let db = reopen(&backend, Config::default());
            let doomed = insert(&db, "doomed");
            insert(&db, "kept");
            db.transaction(|txn| txn.delete(wikis(), doomed)).unwrap();
            let before = db.log_size().unwrap();
            db.compact().unwrap();
            assert!(db.log_size().unwrap() < before);
        }
        let db = reopen(&backend, Config::default());
        assert_eq!(db.read(|t| Ok(t.get(wikis())?.len())).unwrap(), 1);
        assert_eq!(insert(&db, "fresh"), RowId(3));
    }

    #[test]
    fn log_limit_triggers_compaction() {
        let churn = |config: Config, backend: &InMemoryBackend| {
            let db = reopen(backend, config);
            for i in 0..50 {
                let id = insert(&db, &format!("wiki {i}"));
                db.transaction(|txn| txn.delete(wikis(), id)).unwrap();
            }
            db.log_size().unwrap()
        };
        let unbounded = churn(Config::default().max_log_size(0), &InMemoryBackend::new());

        let backend = InMemoryBackend::new();
        let config = Config::default().max_log_size(512);
        let bounded = churn(config.clone(), &backend);
        assert!(bounded < unbounded / 2, "{bounded} vs {unbounded}");

        let db = reopen(&backend, config);
        assert_eq!(insert(&db, "last"), RowId(51));
    }

    #[test]
    fn closed_database_rejects_work() {
        let db = Database::open_in_memory(Schema::wiki_store()).unwrap();
        db.close().unwrap();
        db.close().unwrap();
        assert!(!db.is_open());
        assert!(matches!(
            db.transaction(|_| Ok(())),
            Err(StoreError::StoreClosed)
        ));
    }

    #[test]
    fn file_database_is_exclusive() {
        let dir = tempdir().unwrap();
        let config = Config::new().path(dir.path().join("wikis.wdb"));
        let db = Database::open_or_create(config.clone(), Schema::wiki_store()).unwrap();
        insert(&db, "foo");

        let err = Database::open_or_create(config.clone(), Schema::wiki_store()).unwrap_err();
        assert!(matches!(err, StoreError::StorageInit { .. }));

        db.close().unwrap();
        let db = Database::open_or_create(config, Schema::wiki_store()).unwrap();
        assert_eq!(db.read(|t| Ok(t.get(wikis())?.len())).unwrap(), 1);
        assert!(db.path().is_some());
    }

    #[test]
    fn missing_directories_are_created() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("wikis.wdb");
        let config = Config::new().path(&path);

        let db = Database::open_or_create(config.clone(), Schema::wiki_store()).unwrap();
        insert(&db, "foo");
        db.close().unwrap();
        assert!(path.exists());

        let db = Database::open_or_create(config, Schema::wiki_store()).unwrap();
        assert_eq!(db.read(|t| Ok(t.get(wikis())?.len())).unwrap(), 1);
    }

    #[test]
    fn missing_directories_without_create_fail() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested");
        let config = Config::new()
            .path(nested.join("wikis.wdb"))
            .create_if_missing(false);
        assert!(matches!(
            Database::open_or_create(config, Schema::wiki_store()),
            Err(StoreError::StorageInit { .. })
        ));
        assert!(!nested.exists());
    }

    #[test]
    fn missing_file_without_create_fails() {
        let dir = tempdir().unwrap();
        let config = Config::new()
            .path(dir.path().join("absent.wdb"))
            .create_if_missing(false);
        assert!(matches!(
            Database::open_or_create(config, Schema::wiki_store()),
            Err(StoreError::StorageInit { .. })
        ));
    }
}
