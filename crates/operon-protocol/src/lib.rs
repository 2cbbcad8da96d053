//! operon-protocol — the wire vocabulary of the Operon partition runtime.
//!
//! Defines the log record envelope, the intent and value-type taxonomy,
//! rejection kinds, and the MessagePack-encoded record payloads exchanged
//! between partitions and persisted alongside the log.
//!
//! Payloads are encoded as MessagePack maps with stable field names so that
//! schemas can grow without renumbering (see [`codec`]).

pub mod codec;
pub mod intent;
pub mod record;
pub mod values;

pub use codec::{decode, encode, CodecError};
pub use intent::{
    CommandDistributionIntent, DecisionIntent, DecisionRequirementsIntent, Intent, ProcessIntent,
    ResourceDeletionIntent,
};
pub use record::{PartitionId, Record, RecordType, RejectionType, ValueType};
pub use values::{
    CommandDistributionRecord, DecisionRecord, DecisionRequirementsRecord, ProcessRecord,
    ResourceDeletionRecord,
};
