//! Cross-partition command distribution.
//!
//! A command applied locally at key `K` is replicated to every peer
//! partition: one `CommandDistribution:DISTRIBUTING` event per peer records
//! the scheduled copy (and, through its applier, the pending-ack row), and
//! one distributed command copy per peer is pushed to the batch's outbound
//! records. Peers apply the copy idempotently keyed by `K` and send an
//! `ACKNOWLEDGE` command back to the originating partition.
//!
//! The peer set is derived from stable partition metadata and walked in
//! ascending order, never from wall time, so fan-out is deterministic.

use operon_db::Transaction;
use operon_protocol::{
    codec, CommandDistributionIntent, CommandDistributionRecord, Intent, PartitionId, Record,
    RecordType, ValueType,
};
use tracing::info;

use crate::error::EngineResult;
use crate::partition::PartitionState;
use crate::writers::Writers;

/// Stable partition metadata: who we are and how many partitions exist.
#[derive(Debug, Clone, Copy)]
pub struct Topology {
    own_partition: PartitionId,
    partition_count: u32,
}

impl Topology {
    pub fn new(own_partition: PartitionId, partition_count: u32) -> Self {
        Self {
            own_partition,
            partition_count,
        }
    }

    pub fn own_partition(&self) -> PartitionId {
        self.own_partition
    }

    /// All other partitions, ascending.
    pub fn peers(&self) -> impl Iterator<Item = PartitionId> + '_ {
        (1..=self.partition_count).filter(|p| *p != self.own_partition)
    }
}

/// The distribution behavior invoked by processors.
pub struct CommandDistribution {
    topology: Topology,
}

impl CommandDistribution {
    pub fn new(topology: Topology) -> Self {
        Self { topology }
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Schedule one copy of `command` per peer partition, keyed by
    /// `command_key`.
    pub fn distribute_command(
        &self,
        txn: &Transaction,
        state: &mut PartitionState,
        writers: &mut Writers,
        command_key: u64,
        command: &Record,
    ) -> EngineResult<()> {
        for peer in self.topology.peers() {
            let scheduled = CommandDistributionRecord {
                partition_id: peer,
                value_type: command.value_type,
                intent: command.intent,
                command_value: command.value.clone(),
            };
            writers.state().append_follow_up_event(
                txn,
                state,
                command_key,
                Intent::CommandDistribution(CommandDistributionIntent::Distributing),
                codec::encode(&scheduled)?,
            )?;
            writers.push_outbound(peer, self.distributed_copy(command_key, command));
            info!(command_key, peer, "scheduled command distribution");
        }
        Ok(())
    }

    /// Send an acknowledgement for a distributed command back to its
    /// originating partition.
    pub fn acknowledge_command(
        &self,
        writers: &mut Writers,
        command_key: u64,
        command: &Record,
    ) -> EngineResult<()> {
        let ack = CommandDistributionRecord {
            partition_id: self.topology.own_partition,
            value_type: command.value_type,
            intent: command.intent,
            command_value: Vec::new(),
        };
        let record = Record {
            key: command_key,
            source_record_position: 0,
            record_type: RecordType::Command,
            intent: Intent::CommandDistribution(CommandDistributionIntent::Acknowledge),
            value_type: ValueType::CommandDistribution,
            partition_id: self.topology.own_partition,
            distributed: false,
            value: codec::encode(&ack)?,
            rejection_type: None,
            rejection_reason: None,
        };
        // The distributed copy carries the originator's partition id.
        writers.push_outbound(command.partition_id, record);
        info!(
            command_key,
            originator = command.partition_id,
            "acknowledging distributed command"
        );
        Ok(())
    }

    fn distributed_copy(&self, command_key: u64, command: &Record) -> Record {
        Record {
            key: command_key,
            source_record_position: 0,
            record_type: RecordType::Command,
            intent: command.intent,
            value_type: command.value_type,
            partition_id: self.topology.own_partition,
            distributed: true,
            value: command.value.clone(),
            rejection_type: None,
            rejection_reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peers_are_ascending_and_exclude_self() {
        let topology = Topology::new(2, 4);
        let peers: Vec<PartitionId> = topology.peers().collect();
        assert_eq!(peers, vec![1, 3, 4]);
    }

    #[test]
    fn single_partition_has_no_peers() {
        let topology = Topology::new(1, 1);
        assert_eq!(topology.peers().count(), 0);
    }
}
