//! Pending command distribution state.
//!
//! One row per `(commandKey, targetPartition)` that has been scheduled for
//! replication but not yet acknowledged. Rows are inserted by the
//! `CommandDistribution:DISTRIBUTING` applier and removed by the
//! `ACKNOWLEDGED` applier, so the table replays exactly like the rest of
//! the state.

use operon_db::{ScanControl, StoreResult, Transaction, TypedColumn};
use operon_protocol::PartitionId;
use tracing::debug;

use crate::families;
use crate::records::PendingDistribution;

const PENDING: TypedColumn<(u64, PartitionId), PendingDistribution> =
    TypedColumn::new(families::PENDING_DISTRIBUTION);

/// Store of distributed command copies awaiting acknowledgement.
pub struct DistributionState;

impl DistributionState {
    pub fn new() -> Self {
        Self
    }

    /// Record a scheduled copy. A copy for the same `(command, partition)`
    /// pair must not already be pending.
    pub fn add_pending(&self, txn: &Transaction, record: &PendingDistribution) -> StoreResult<()> {
        PENDING.insert(txn, &(record.command_key, record.partition), record)
    }

    /// Drop the pending row for an acknowledged copy. Returns whether a row
    /// existed; re-delivered acknowledgements find none and change nothing.
    pub fn acknowledge(
        &self,
        txn: &Transaction,
        command_key: u64,
        partition: PartitionId,
    ) -> StoreResult<bool> {
        let existed = PENDING.delete(txn, &(command_key, partition))?;
        if existed {
            debug!(command_key, partition, "distribution acknowledged");
        }
        Ok(existed)
    }

    /// Whether any copy of the command is still unacknowledged.
    pub fn has_pending(&self, txn: &Transaction, command_key: u64) -> StoreResult<bool> {
        let mut found = false;
        PENDING.scan_prefix(txn, &command_key, |_, _| {
            found = true;
            Ok(ScanControl::Stop)
        })?;
        Ok(found)
    }

    /// All unacknowledged copies of one command, ascending by partition.
    pub fn pending_for_command(
        &self,
        txn: &Transaction,
        command_key: u64,
    ) -> StoreResult<Vec<PendingDistribution>> {
        let mut rows = Vec::new();
        PENDING.scan_prefix(txn, &command_key, |_, record| {
            rows.push(record);
            Ok(ScanControl::Continue)
        })?;
        Ok(rows)
    }

    /// Every unacknowledged copy in the partition, in key order. Scanned on
    /// restart and by the redelivery loop.
    pub fn all_pending(&self, txn: &Transaction) -> StoreResult<Vec<PendingDistribution>> {
        let mut rows = Vec::new();
        PENDING.scan_prefix(txn, &(), |_, record| {
            rows.push(record);
            Ok(ScanControl::Continue)
        })?;
        Ok(rows)
    }

    /// Bump the retry bookkeeping of a pending copy after a redelivery.
    pub fn record_retry(
        &self,
        txn: &Transaction,
        command_key: u64,
        partition: PartitionId,
        now_millis: u64,
    ) -> StoreResult<()> {
        if let Some(mut record) = PENDING.get(txn, &(command_key, partition))? {
            record.retry_count += 1;
            record.last_attempt_at = now_millis;
            PENDING.update(txn, &(command_key, partition), &record)?;
        }
        Ok(())
    }
}

impl Default for DistributionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use operon_protocol::{CommandDistributionIntent, Intent, ValueType};

    fn pending(command_key: u64, partition: PartitionId) -> PendingDistribution {
        PendingDistribution {
            command_key,
            partition,
            retry_count: 0,
            last_attempt_at: 0,
            value_type: ValueType::ResourceDeletion,
            intent: Intent::CommandDistribution(CommandDistributionIntent::Distributing),
            command_value: vec![0xc0],
        }
    }

    #[test]
    fn pending_rows_track_acknowledgements() {
        let db = operon_db::StateDb::open_in_memory().unwrap();
        let txn = db.begin().unwrap();
        let state = DistributionState::new();

        state.add_pending(&txn, &pending(5, 2)).unwrap();
        state.add_pending(&txn, &pending(5, 3)).unwrap();
        assert!(state.has_pending(&txn, 5).unwrap());
        assert_eq!(state.pending_for_command(&txn, 5).unwrap().len(), 2);

        assert!(state.acknowledge(&txn, 5, 2).unwrap());
        assert!(state.has_pending(&txn, 5).unwrap());

        assert!(state.acknowledge(&txn, 5, 3).unwrap());
        assert!(!state.has_pending(&txn, 5).unwrap());

        // A re-delivered acknowledgement is a no-op.
        assert!(!state.acknowledge(&txn, 5, 3).unwrap());
        txn.abort().unwrap();
    }

    #[test]
    fn pending_rows_are_scoped_per_command() {
        let db = operon_db::StateDb::open_in_memory().unwrap();
        let txn = db.begin().unwrap();
        let state = DistributionState::new();

        state.add_pending(&txn, &pending(5, 2)).unwrap();
        state.add_pending(&txn, &pending(6, 2)).unwrap();

        assert_eq!(state.pending_for_command(&txn, 5).unwrap().len(), 1);
        assert_eq!(state.all_pending(&txn).unwrap().len(), 2);
        txn.abort().unwrap();
    }

    #[test]
    fn retries_accumulate() {
        let db = operon_db::StateDb::open_in_memory().unwrap();
        let txn = db.begin().unwrap();
        let state = DistributionState::new();

        state.add_pending(&txn, &pending(5, 2)).unwrap();
        state.record_retry(&txn, 5, 2, 1_000).unwrap();
        state.record_retry(&txn, 5, 2, 2_000).unwrap();

        let rows = state.pending_for_command(&txn, 5).unwrap();
        assert_eq!(rows[0].retry_count, 2);
        assert_eq!(rows[0].last_attempt_at, 2_000);
        txn.abort().unwrap();
    }
}
