//! The store handle and its write transaction.

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition};
use tracing::debug;

use crate::column::{ColumnFamily, ScanControl};
use crate::error::{map_err, StoreResult};
use crate::key::TableKey;

/// All column families share one redb table; a row's full key is the
/// family's 2-byte id followed by the encoded column key.
const STATE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("partition_state");

/// A partition's embedded state store.
///
/// Opened once per partition, either on disk or in memory (the latter for
/// testing). All reads and writes go through [`Transaction`]s; the store
/// itself only manages the database lifecycle and the consistency-check
/// mode.
pub struct StateDb {
    db: Database,
    consistency_checks: bool,
}

impl StateDb {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self {
            db,
            consistency_checks: cfg!(debug_assertions),
        };
        store.ensure_table()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self {
            db,
            consistency_checks: true,
        };
        store.ensure_table()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Enable or disable consistency checks (foreign-key verification and
    /// the present/absent guards of `insert`/`update`).
    pub fn with_consistency_checks(mut self, enabled: bool) -> Self {
        self.consistency_checks = enabled;
        self
    }

    fn ensure_table(&self) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(STATE).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Begin a write transaction.
    pub fn begin(&self) -> StoreResult<Transaction> {
        let inner = self.db.begin_write().map_err(map_err!(Transaction))?;
        Ok(Transaction {
            inner,
            consistency_checks: self.consistency_checks,
        })
    }

    /// Dump every `(family id, key, value)` triple in key order.
    ///
    /// Reads committed state only; used to compare replica contents in
    /// determinism tests.
    pub fn export(&self) -> StoreResult<Vec<(u16, Vec<u8>, Vec<u8>)>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(STATE).map_err(map_err!(Table))?;
        let mut rows = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            let key = key.value();
            let family = u16::from_be_bytes(key[..2].try_into().expect("family prefix"));
            rows.push((family, key[2..].to_vec(), value.value().to_vec()));
        }
        Ok(rows)
    }
}

/// A write transaction over the store.
///
/// Mutations buffer in the underlying redb transaction: `commit` publishes
/// all of them atomically, `abort` (or drop) discards all of them. Reads
/// within the transaction observe its own writes.
pub struct Transaction {
    inner: redb::WriteTransaction,
    consistency_checks: bool,
}

impl Transaction {
    /// Whether invariant checks (foreign keys, insert/update guards) run on
    /// writes in this transaction.
    pub fn consistency_checks(&self) -> bool {
        self.consistency_checks
    }

    fn full_key(family: ColumnFamily, key: &[u8]) -> Vec<u8> {
        let mut full = Vec::with_capacity(2 + key.len());
        full.extend_from_slice(&family.prefix());
        full.extend_from_slice(key);
        full
    }

    pub(crate) fn get_raw(
        &self,
        family: ColumnFamily,
        key: &[u8],
    ) -> StoreResult<Option<Vec<u8>>> {
        let table = self.inner.open_table(STATE).map_err(map_err!(Table))?;
        let full = Self::full_key(family, key);
        let result = match table.get(full.as_slice()).map_err(map_err!(Read))? {
            Some(guard) => Ok(Some(guard.value().to_vec())),
            None => Ok(None),
        };
        result
    }

    pub(crate) fn contains_raw(&self, family: ColumnFamily, key: &[u8]) -> StoreResult<bool> {
        let table = self.inner.open_table(STATE).map_err(map_err!(Table))?;
        let full = Self::full_key(family, key);
        let result = Ok(table.get(full.as_slice()).map_err(map_err!(Read))?.is_some());
        result
    }

    /// Whether a row exists at `key` in `family`.
    pub fn contains(&self, family: ColumnFamily, key: &impl TableKey) -> StoreResult<bool> {
        self.contains_raw(family, &key.encode()?)
    }

    pub(crate) fn put_raw(
        &self,
        family: ColumnFamily,
        key: &[u8],
        value: &[u8],
    ) -> StoreResult<()> {
        let mut table = self.inner.open_table(STATE).map_err(map_err!(Table))?;
        let full = Self::full_key(family, key);
        table
            .insert(full.as_slice(), value)
            .map_err(map_err!(Write))?;
        Ok(())
    }

    /// Remove a row; returns whether it existed.
    pub(crate) fn remove_raw(&self, family: ColumnFamily, key: &[u8]) -> StoreResult<bool> {
        let mut table = self.inner.open_table(STATE).map_err(map_err!(Table))?;
        let full = Self::full_key(family, key);
        let result = Ok(table.remove(full.as_slice()).map_err(map_err!(Write))?.is_some());
        result
    }

    /// Walk rows of `family` whose key starts with `prefix`, in key order.
    ///
    /// Matching rows are collected before the visitor runs so that the
    /// visitor may itself read from this transaction (redb allows only one
    /// open handle per table at a time).
    pub(crate) fn scan_raw(
        &self,
        family: ColumnFamily,
        prefix: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> StoreResult<ScanControl>,
    ) -> StoreResult<()> {
        let full_prefix = Self::full_key(family, prefix);
        let mut rows: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();
        {
            let table = self.inner.open_table(STATE).map_err(map_err!(Table))?;
            for entry in table
                .range(full_prefix.as_slice()..)
                .map_err(map_err!(Read))?
            {
                let (key, value) = entry.map_err(map_err!(Read))?;
                let key = key.value();
                if !key.starts_with(&full_prefix) {
                    break;
                }
                rows.push((key[2..].to_vec(), value.value().to_vec()));
            }
        }
        for (key, value) in &rows {
            match visit(key, value)? {
                ScanControl::Continue => {}
                ScanControl::Stop => break,
            }
        }
        Ok(())
    }

    /// Atomically publish all buffered writes.
    pub fn commit(self) -> StoreResult<()> {
        self.inner.commit().map_err(map_err!(Transaction))
    }

    /// Discard all buffered writes.
    pub fn abort(self) -> StoreResult<()> {
        self.inner.abort().map_err(map_err!(Transaction))
    }
}
