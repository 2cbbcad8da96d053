//! operon-db — typed column bindings over a transactional ordered byte-key
//! store.
//!
//! Backed by [redb](https://docs.rs/redb). All column families share a
//! single redb table; a family's rows are distinguished by a stable 16-bit
//! id prefixed to every key, which keeps the keyspace ordered per family and
//! makes prefix scans a plain range walk.
//!
//! # Architecture
//!
//! - [`ColumnFamily`] — a named, numbered logical keyspace. Ids are part of
//!   the persisted layout: extend, never renumber.
//! - [`TableKey`] — big-endian integers, 2-byte-length-prefixed strings, and
//!   tuple composites, concatenated in declaration order.
//! - [`TypedColumn`] — typed get/insert/upsert/update/delete over one
//!   family; values are MessagePack-encoded via serde.
//! - [`Transaction`] — a redb write transaction: atomic commit, abort
//!   discards everything, reads observe the transaction's own writes.
//! - [`ForeignKey`] — a key wrapper whose target row is verified at write
//!   time when consistency checks are enabled.

pub mod column;
pub mod error;
pub mod key;
pub mod txn;

pub use column::{ColumnFamily, ScanControl, TypedColumn};
pub use error::{StoreError, StoreResult};
pub use key::{ForeignKey, TableKey};
pub use txn::{StateDb, Transaction};
