//! Event appliers.
//!
//! Maps `(value type, intent)` of a follow-up event to its state effect.
//! The same function runs in two places: inline when the state writer
//! appends an event during command processing, and from
//! [`crate::partition::Partition::replay`] when state is rebuilt from the
//! log. Keeping a single applier per event is what makes replayed state
//! byte-identical to processed state.

use operon_db::Transaction;
use operon_protocol::{
    codec, CommandDistributionIntent, CommandDistributionRecord, DecisionIntent, DecisionRecord,
    DecisionRequirementsIntent, DecisionRequirementsRecord, Intent, ProcessIntent, ProcessRecord,
    ResourceDeletionIntent,
};
use operon_state::PendingDistribution;

use crate::error::{EngineError, EngineResult};
use crate::partition::PartitionState;

/// Apply one event's state effect inside the given transaction.
pub fn apply_event(
    txn: &Transaction,
    state: &mut PartitionState,
    key: u64,
    intent: Intent,
    value: &[u8],
) -> EngineResult<()> {
    match intent {
        // The outer deletion lifecycle carries no state of its own; the
        // bracketed process/decision events do the mutating.
        Intent::ResourceDeletion(ResourceDeletionIntent::Deleting)
        | Intent::ResourceDeletion(ResourceDeletionIntent::Deleted) => Ok(()),

        Intent::Process(ProcessIntent::Created) => {
            let record: ProcessRecord = codec::decode(value)?;
            state.processes.store_process(txn, &record)?;
            Ok(())
        }
        Intent::Process(ProcessIntent::Deleting) => {
            let record: ProcessRecord = codec::decode(value)?;
            state.processes.mark_pending_deletion(txn, record.key)?;
            Ok(())
        }
        Intent::Process(ProcessIntent::Deleted) => {
            let record: ProcessRecord = codec::decode(value)?;
            state.processes.delete_process(txn, &record)?;
            Ok(())
        }

        Intent::Decision(DecisionIntent::Created) => {
            let record: DecisionRecord = codec::decode(value)?;
            state.decisions.store_decision(txn, &record)?;
            Ok(())
        }
        Intent::Decision(DecisionIntent::Deleted) => {
            let record: DecisionRecord = codec::decode(value)?;
            state.decisions.delete_decision(txn, &record)?;
            Ok(())
        }

        Intent::DecisionRequirements(DecisionRequirementsIntent::Created) => {
            let record: DecisionRequirementsRecord = codec::decode(value)?;
            state.decisions.store_drg(txn, &record)?;
            Ok(())
        }
        Intent::DecisionRequirements(DecisionRequirementsIntent::Deleted) => {
            let record: DecisionRequirementsRecord = codec::decode(value)?;
            state.decisions.delete_drg(txn, &record)?;
            Ok(())
        }

        Intent::CommandDistribution(CommandDistributionIntent::Distributing) => {
            let record: CommandDistributionRecord = codec::decode(value)?;
            state.distribution.add_pending(
                txn,
                &PendingDistribution {
                    command_key: key,
                    partition: record.partition_id,
                    retry_count: 0,
                    last_attempt_at: 0,
                    value_type: record.value_type,
                    intent: record.intent,
                    command_value: record.command_value,
                },
            )?;
            Ok(())
        }
        Intent::CommandDistribution(CommandDistributionIntent::Acknowledged) => {
            let record: CommandDistributionRecord = codec::decode(value)?;
            state.distribution.acknowledge(txn, key, record.partition_id)?;
            Ok(())
        }

        // Command intents never reach the applier.
        Intent::ResourceDeletion(ResourceDeletionIntent::Delete)
        | Intent::CommandDistribution(CommandDistributionIntent::Acknowledge) => {
            Err(EngineError::UnhandledEvent(intent))
        }
    }
}
