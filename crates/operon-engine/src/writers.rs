//! Log writers.
//!
//! One [`Writers`] builder per command produces the three sibling writers a
//! processor works with: the state writer for follow-up events, the
//! rejection writer for refusals, and the response writer for the reply to
//! the originating client. All three buffer into a single [`RecordBatch`]
//! that commits or is discarded together with the command's store
//! transaction.

use operon_db::Transaction;
use operon_protocol::{Intent, PartitionId, Record, RecordType, RejectionType, ValueType};

use crate::appliers::apply_event;
use crate::error::EngineResult;
use crate::partition::PartitionState;

/// The buffered output of processing one command.
#[derive(Debug, Default)]
pub struct RecordBatch {
    /// Follow-up events and rejections, in append order.
    pub records: Vec<Record>,
    /// Reply for the originating client, if any.
    pub response: Option<CommandResponse>,
    /// Records to hand to other partitions (distributed command copies and
    /// acknowledgement commands).
    pub outbound: Vec<(PartitionId, Record)>,
}

/// The reply delivered to the client that submitted the command, released
/// only when the command's transaction commits.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResponse {
    pub key: u64,
    pub record_type: RecordType,
    pub intent: Intent,
    pub value_type: ValueType,
    pub value: Vec<u8>,
    pub rejection_type: Option<RejectionType>,
    pub rejection_reason: Option<String>,
}

/// Builder for the per-command writers.
pub struct Writers {
    partition_id: PartitionId,
    source_position: u64,
    batch: RecordBatch,
}

impl Writers {
    pub fn new(partition_id: PartitionId, source_position: u64) -> Self {
        Self {
            partition_id,
            source_position,
            batch: RecordBatch::default(),
        }
    }

    /// The writer for follow-up events.
    pub fn state(&mut self) -> StateWriter<'_> {
        StateWriter { writers: self }
    }

    /// The writer for command rejections.
    pub fn rejection(&mut self) -> RejectionWriter<'_> {
        RejectionWriter { writers: self }
    }

    /// The writer for the client response.
    pub fn response(&mut self) -> ResponseWriter<'_> {
        ResponseWriter { writers: self }
    }

    pub(crate) fn push_outbound(&mut self, target: PartitionId, record: Record) {
        self.batch.outbound.push((target, record));
    }

    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }
}

/// Appends follow-up events.
///
/// Events are the source of truth: appending one also applies its state
/// effect inside the command's transaction, through the same applier that
/// [`crate::partition::Partition::replay`] uses, so processing and replay
/// cannot diverge.
pub struct StateWriter<'a> {
    writers: &'a mut Writers,
}

impl StateWriter<'_> {
    pub fn append_follow_up_event(
        &mut self,
        txn: &Transaction,
        state: &mut PartitionState,
        key: u64,
        intent: Intent,
        value: Vec<u8>,
    ) -> EngineResult<()> {
        apply_event(txn, state, key, intent, &value)?;
        let record = Record::follow_up_event(
            key,
            intent,
            self.writers.partition_id,
            self.writers.source_position,
            value,
        );
        self.writers.batch.records.push(record);
        Ok(())
    }
}

/// Appends durable rejections of the command being processed.
pub struct RejectionWriter<'a> {
    writers: &'a mut Writers,
}

impl RejectionWriter<'_> {
    pub fn append_rejection(
        &mut self,
        command: &Record,
        rejection_type: RejectionType,
        reason: &str,
    ) {
        let record = Record::rejection_of(
            command,
            self.writers.source_position,
            rejection_type,
            reason,
        );
        self.writers.batch.records.push(record);
    }
}

/// Buffers the reply to the originating client.
pub struct ResponseWriter<'a> {
    writers: &'a mut Writers,
}

impl ResponseWriter<'_> {
    /// Reply with an event, echoing the given intent at `key`.
    pub fn write_event_on_command(&mut self, key: u64, intent: Intent, value: Vec<u8>) {
        self.writers.batch.response = Some(CommandResponse {
            key,
            record_type: RecordType::Event,
            value_type: intent.value_type(),
            intent,
            value,
            rejection_type: None,
            rejection_reason: None,
        });
    }

    /// Reply with a rejection of the command.
    pub fn write_rejection_on_command(
        &mut self,
        command: &Record,
        rejection_type: RejectionType,
        reason: &str,
    ) {
        self.writers.batch.response = Some(CommandResponse {
            key: command.key,
            record_type: RecordType::Rejection,
            intent: command.intent,
            value_type: command.value_type,
            value: command.value.clone(),
            rejection_type: Some(rejection_type),
            rejection_reason: Some(reason.to_string()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use operon_protocol::{Intent, RejectionType, ResourceDeletionIntent};

    #[test]
    fn rejection_and_response_buffer_into_the_batch() {
        let mut writers = Writers::new(1, 10);
        let command = Record::new_command(
            Intent::ResourceDeletion(ResourceDeletionIntent::Delete),
            1,
            vec![0xc0],
        );

        writers
            .rejection()
            .append_rejection(&command, RejectionType::NotFound, "missing");
        writers
            .response()
            .write_rejection_on_command(&command, RejectionType::NotFound, "missing");

        let batch = writers.into_batch();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].record_type, RecordType::Rejection);
        assert_eq!(batch.records[0].source_record_position, 10);

        let response = batch.response.unwrap();
        assert_eq!(response.record_type, RecordType::Rejection);
        assert_eq!(response.rejection_type, Some(RejectionType::NotFound));
    }

    #[test]
    fn event_response_echoes_the_given_key_and_intent() {
        let mut writers = Writers::new(1, 10);
        writers.response().write_event_on_command(
            42,
            Intent::ResourceDeletion(ResourceDeletionIntent::Deleting),
            vec![0xc0],
        );

        let response = writers.into_batch().response.unwrap();
        assert_eq!(response.key, 42);
        assert_eq!(response.record_type, RecordType::Event);
        assert_eq!(
            response.intent,
            Intent::ResourceDeletion(ResourceDeletionIntent::Deleting)
        );
    }
}
