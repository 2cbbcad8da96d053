//! Engine error types.

use operon_db::StoreError;
use operon_protocol::{CodecError, Intent, RecordType};
use thiserror::Error;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised while processing a command.
///
/// `NoSuchResource` and `ActiveProcessInstances` are the two *expected*
/// failures of resource deletion: they reject the command but leave the
/// partition healthy. Everything else is unexpected; the transaction is
/// aborted and the error surfaces to the supervising layer.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Expected to delete resource but no resource found with key `{0}`")]
    NoSuchResource(i64),

    #[error("Expected to delete resource with key `{0}` but there are still running instances")]
    ActiveProcessInstances(i64),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("no processor bound for command {0}")]
    NoProcessor(Intent),

    #[error("expected a command record but got {0:?}")]
    NotACommand(RecordType),

    #[error("no applier for event {0}")]
    UnhandledEvent(Intent),
}
