//! Error types for the column bindings.

use thiserror::Error;

use crate::column::ColumnFamily;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the typed column layer.
///
/// The first group wraps the underlying engine; the second group are
/// invariant violations raised by the bindings themselves and treated as
/// fatal by the partition runtime.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("key encoding error: {0}")]
    KeyEncoding(String),

    #[error("value codec error in {family:?}: {message}")]
    Codec {
        family: ColumnFamily,
        message: String,
    },

    #[error("expected key to exist in {family:?} but it was missing")]
    MissingPrimary { family: ColumnFamily },

    #[error("expected key to be absent in {family:?} but it was present")]
    AlreadyExists { family: ColumnFamily },

    #[error("foreign key does not resolve in {family:?}")]
    ForeignKeyViolation { family: ColumnFamily },
}

/// Convert any `Display` error into a `StoreError` variant via a closure
/// factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| $crate::error::StoreError::$variant(e.to_string())
    };
}

pub(crate) use map_err;
