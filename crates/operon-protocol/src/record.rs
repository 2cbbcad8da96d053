//! The log record envelope.
//!
//! Every record read from or appended to a partition's log shares this
//! envelope: a key, the position of the record that caused it, a record
//! type (command / event / rejection), an intent, and an opaque
//! MessagePack-encoded value. Rejection records additionally carry the
//! rejection kind and a human-readable reason.

use serde::{Deserialize, Serialize};

use crate::intent::Intent;

/// Identifier of a partition. Partitions are numbered starting at 1.
pub type PartitionId = u32;

/// What kind of record this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordType {
    Command,
    Event,
    Rejection,
}

/// The family of payload carried in `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    ResourceDeletion,
    Process,
    Decision,
    DecisionRequirements,
    CommandDistribution,
}

/// Why a command was refused.
///
/// Only `NotFound` and `InvalidState` are produced by the resource-deletion
/// core; the remaining kinds are reserved for other processors sharing the
/// wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionType {
    NotFound,
    InvalidState,
    InvalidArgument,
    AlreadyExists,
    ProcessingError,
}

/// A single log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// The record key. Events emitted while processing a command carry keys
    /// drawn from the partition's key generator; distributed copies reuse
    /// the originator's key.
    pub key: u64,
    /// Position of the log record that caused this one (the command's
    /// position for follow-up events; 0 for client commands).
    pub source_record_position: u64,
    pub record_type: RecordType,
    pub intent: Intent,
    pub value_type: ValueType,
    /// Partition that wrote the record. On a distributed command copy this
    /// is the *originating* partition, which is where acknowledgements are
    /// sent.
    pub partition_id: PartitionId,
    /// True when this command is a copy replicated from another partition.
    pub distributed: bool,
    /// MessagePack-encoded payload; schema determined by `value_type`.
    pub value: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_type: Option<RejectionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl Record {
    /// A client command entering the partition.
    pub fn new_command(intent: Intent, partition_id: PartitionId, value: Vec<u8>) -> Self {
        Self {
            key: 0,
            source_record_position: 0,
            record_type: RecordType::Command,
            value_type: intent.value_type(),
            intent,
            partition_id,
            distributed: false,
            value,
            rejection_type: None,
            rejection_reason: None,
        }
    }

    /// A follow-up event appended while processing a command.
    pub fn follow_up_event(
        key: u64,
        intent: Intent,
        partition_id: PartitionId,
        source_record_position: u64,
        value: Vec<u8>,
    ) -> Self {
        Self {
            key,
            source_record_position,
            record_type: RecordType::Event,
            value_type: intent.value_type(),
            intent,
            partition_id,
            distributed: false,
            value,
            rejection_type: None,
            rejection_reason: None,
        }
    }

    /// A rejection of the given command.
    pub fn rejection_of(
        command: &Record,
        source_record_position: u64,
        rejection_type: RejectionType,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            key: command.key,
            source_record_position,
            record_type: RecordType::Rejection,
            intent: command.intent,
            value_type: command.value_type,
            partition_id: command.partition_id,
            distributed: command.distributed,
            value: command.value.clone(),
            rejection_type: Some(rejection_type),
            rejection_reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::ResourceDeletionIntent;

    #[test]
    fn envelope_roundtrips_through_messagepack() {
        let record = Record::follow_up_event(
            7,
            Intent::ResourceDeletion(ResourceDeletionIntent::Deleting),
            1,
            42,
            vec![0xc0],
        );

        let bytes = crate::codec::encode(&record).unwrap();
        let decoded: Record = crate::codec::decode(&bytes).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn rejection_copies_the_command_envelope() {
        let command = Record::new_command(
            Intent::ResourceDeletion(ResourceDeletionIntent::Delete),
            3,
            vec![1, 2, 3],
        );
        let rejection =
            Record::rejection_of(&command, 9, RejectionType::NotFound, "no such resource");

        assert_eq!(rejection.record_type, RecordType::Rejection);
        assert_eq!(rejection.intent, command.intent);
        assert_eq!(rejection.value, command.value);
        assert_eq!(rejection.source_record_position, 9);
        assert_eq!(rejection.rejection_type, Some(RejectionType::NotFound));
    }
}
