//! Column families and typed column access.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};
use crate::key::TableKey;
use crate::txn::Transaction;

/// A logical keyspace within the store.
///
/// The id is prefixed (big-endian) to every key of the family and is part of
/// the persisted layout: ids must stay stable forever; new families extend
/// the range, existing ones are never renumbered.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnFamily {
    id: u16,
    name: &'static str,
}

impl ColumnFamily {
    pub const fn new(id: u16, name: &'static str) -> Self {
        Self { id, name }
    }

    pub const fn id(self) -> u16 {
        self.id
    }

    pub const fn name(self) -> &'static str {
        self.name
    }

    pub(crate) fn prefix(self) -> [u8; 2] {
        self.id.to_be_bytes()
    }
}

impl fmt::Debug for ColumnFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:04x})", self.name, self.id)
    }
}

/// Whether a prefix scan should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanControl {
    Continue,
    Stop,
}

/// Typed access to one column family.
///
/// Declared as a `const` next to the family registry; all actual I/O goes
/// through a [`Transaction`].
pub struct TypedColumn<K, V> {
    family: ColumnFamily,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K: TableKey, V: Serialize + DeserializeOwned> TypedColumn<K, V> {
    pub const fn new(family: ColumnFamily) -> Self {
        Self {
            family,
            _marker: PhantomData,
        }
    }

    pub const fn family(&self) -> ColumnFamily {
        self.family
    }

    fn encode_value(&self, value: &V) -> StoreResult<Vec<u8>> {
        rmp_serde::to_vec_named(value).map_err(|e| StoreError::Codec {
            family: self.family,
            message: e.to_string(),
        })
    }

    fn decode_value(&self, bytes: &[u8]) -> StoreResult<V> {
        rmp_serde::from_slice(bytes).map_err(|e| StoreError::Codec {
            family: self.family,
            message: e.to_string(),
        })
    }

    /// Read the value stored at `key`, if any.
    pub fn get(&self, txn: &Transaction, key: &K) -> StoreResult<Option<V>> {
        match txn.get_raw(self.family, &key.encode()?)? {
            Some(bytes) => Ok(Some(self.decode_value(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Whether a row exists at `key`.
    pub fn exists(&self, txn: &Transaction, key: &K) -> StoreResult<bool> {
        txn.contains(self.family, key)
    }

    /// Write `value` at `key`, inserting or replacing.
    pub fn upsert(&self, txn: &Transaction, key: &K, value: &V) -> StoreResult<()> {
        txn.put_raw(self.family, &key.encode()?, &self.encode_value(value)?)
    }

    /// Insert a new row. With consistency checks enabled, a present key is
    /// an invariant violation.
    pub fn insert(&self, txn: &Transaction, key: &K, value: &V) -> StoreResult<()> {
        let encoded = key.encode()?;
        if txn.consistency_checks() && txn.contains_raw(self.family, &encoded)? {
            return Err(StoreError::AlreadyExists {
                family: self.family,
            });
        }
        txn.put_raw(self.family, &encoded, &self.encode_value(value)?)
    }

    /// Replace an existing row. With consistency checks enabled, a missing
    /// key is an invariant violation.
    pub fn update(&self, txn: &Transaction, key: &K, value: &V) -> StoreResult<()> {
        let encoded = key.encode()?;
        if txn.consistency_checks() && !txn.contains_raw(self.family, &encoded)? {
            return Err(StoreError::MissingPrimary {
                family: self.family,
            });
        }
        txn.put_raw(self.family, &encoded, &self.encode_value(value)?)
    }

    /// Delete a row that must exist. A missing key is always an invariant
    /// violation, regardless of the consistency-check mode.
    pub fn delete_existing(&self, txn: &Transaction, key: &K) -> StoreResult<()> {
        if !txn.remove_raw(self.family, &key.encode()?)? {
            return Err(StoreError::MissingPrimary {
                family: self.family,
            });
        }
        Ok(())
    }

    /// Delete a row if present; returns whether it existed.
    pub fn delete(&self, txn: &Transaction, key: &K) -> StoreResult<bool> {
        txn.remove_raw(self.family, &key.encode()?)
    }

    /// Walk all rows whose key starts with `prefix`, in key order.
    ///
    /// `prefix` may be any leading subsequence of the key's components (for
    /// a composite `(A, B)` key, an `A` value scans all `B`s under it).
    pub fn scan_prefix<P: TableKey>(
        &self,
        txn: &Transaction,
        prefix: &P,
        mut visit: impl FnMut(K, V) -> StoreResult<ScanControl>,
    ) -> StoreResult<()> {
        let prefix = prefix.encode()?;
        txn.scan_raw(self.family, &prefix, &mut |key_bytes, value_bytes| {
            let mut input = key_bytes;
            let key = K::read_from(&mut input)?;
            let value = self.decode_value(value_bytes)?;
            visit(key, value)
        })
    }
}
