//! The partition runtime.
//!
//! A partition owns its embedded store exclusively and processes one
//! command at a time: open a transaction, dispatch to the bound processor,
//! and either commit the transaction together with the buffered record
//! batch or abort and discard both. Crash recovery re-delivers the command
//! from the log and reprocessing is deterministic.

use tracing::{debug, warn};

use operon_db::StateDb;
use operon_protocol::{PartitionId, Record, RecordType};
use operon_state::{
    DecisionState, DistributionState, ElementInstanceState, KeyGenerator, ProcessState,
};

use crate::appliers::apply_event;
use crate::config::PartitionConfig;
use crate::distribution::{CommandDistribution, Topology};
use crate::error::{EngineError, EngineResult};
use crate::processors::{bound_processor, ProcessingContext, ProcessingError};
use crate::writers::{CommandResponse, Writers};

/// The domain stores of one partition.
pub struct PartitionState {
    pub decisions: DecisionState,
    pub processes: ProcessState,
    pub element_instances: ElementInstanceState,
    pub distribution: DistributionState,
    pub key_generator: KeyGenerator,
}

impl PartitionState {
    fn new(partition_id: PartitionId, cache_capacity: usize) -> Self {
        Self {
            decisions: DecisionState::new(cache_capacity),
            processes: ProcessState::new(),
            element_instances: ElementInstanceState::new(),
            distribution: DistributionState::new(),
            key_generator: KeyGenerator::new(partition_id),
        }
    }

    fn on_commit(&mut self) {
        self.decisions.on_commit();
    }

    fn on_abort(&mut self) {
        self.decisions.on_abort();
    }
}

/// The committed output of one processed command.
#[derive(Debug, Default)]
pub struct ProcessingResult {
    /// Follow-up events and rejections to append to the log, in order.
    pub records: Vec<Record>,
    /// Reply for the originating client, if one was written.
    pub response: Option<CommandResponse>,
    /// Records to deliver to other partitions.
    pub outbound: Vec<(PartitionId, Record)>,
}

/// A single partition of the workflow engine.
pub struct Partition {
    db: StateDb,
    state: PartitionState,
    distribution: CommandDistribution,
    partition_id: PartitionId,
}

impl Partition {
    /// Open the partition's store and states as configured. A missing
    /// `data_dir` yields an in-memory store.
    pub fn open(config: &PartitionConfig) -> EngineResult<Self> {
        let db = match config.db_path() {
            Some(path) => {
                if let Some(dir) = &config.data_dir {
                    std::fs::create_dir_all(dir)
                        .map_err(|e| operon_db::StoreError::Open(e.to_string()))?;
                }
                StateDb::open(&path)?
            }
            None => StateDb::open_in_memory()?,
        }
        .with_consistency_checks(config.consistency_checks);

        debug!(
            partition_id = config.partition_id,
            partition_count = config.partition_count,
            "partition opened"
        );
        Ok(Self {
            db,
            state: PartitionState::new(config.partition_id, config.cache_capacity),
            distribution: CommandDistribution::new(Topology::new(
                config.partition_id,
                config.partition_count,
            )),
            partition_id: config.partition_id,
        })
    }

    pub fn partition_id(&self) -> PartitionId {
        self.partition_id
    }

    /// Process one command record read from the log at `position`.
    ///
    /// On success (including expected rejections) the transaction commits
    /// and the buffered batch is returned; the caller appends the batch's
    /// records to the log and delivers the outbound records to their target
    /// partitions. On an unexpected error everything is discarded and the
    /// error propagates.
    pub fn process(&mut self, position: u64, command: &Record) -> EngineResult<ProcessingResult> {
        if command.record_type != RecordType::Command {
            return Err(EngineError::NotACommand(command.record_type));
        }
        let processor = bound_processor(command.value_type, command.intent)
            .ok_or(EngineError::NoProcessor(command.intent))?;

        let txn = self.db.begin()?;
        let mut writers = Writers::new(self.partition_id, position);

        let outcome = {
            let mut ctx = ProcessingContext {
                txn: &txn,
                state: &mut self.state,
                writers: &mut writers,
                distribution: &self.distribution,
            };
            let result = if command.distributed {
                processor.process_distributed_command(&mut ctx, command)
            } else {
                processor.process_new_command(&mut ctx, command)
            };
            match result {
                Ok(()) => Ok(()),
                Err(error) => match processor.try_handle_error(&mut ctx, command, &error) {
                    ProcessingError::Expected => {
                        warn!(intent = %command.intent, %error, "command rejected");
                        Ok(())
                    }
                    ProcessingError::Unexpected => Err(error),
                },
            }
        };

        match outcome {
            Ok(()) => {
                txn.commit()?;
                self.state.on_commit();
                let batch = writers.into_batch();
                debug!(
                    intent = %command.intent,
                    records = batch.records.len(),
                    outbound = batch.outbound.len(),
                    "command processed"
                );
                Ok(ProcessingResult {
                    records: batch.records,
                    response: batch.response,
                    outbound: batch.outbound,
                })
            }
            Err(error) => {
                txn.abort()?;
                self.state.on_abort();
                Err(error)
            }
        }
    }

    /// Apply one logged record to the store, rebuilding state after a
    /// restart. Only events carry state effects; commands and rejections
    /// replay to nothing.
    pub fn replay(&mut self, record: &Record) -> EngineResult<()> {
        if record.record_type != RecordType::Event {
            return Ok(());
        }
        let txn = self.db.begin()?;
        let applied = apply_event(&txn, &mut self.state, record.key, record.intent, &record.value);
        match applied {
            Ok(()) => {
                // Keys allocated by this partition must stay ahead of every
                // replayed record; foreign keys live in other partitions'
                // counter spaces.
                if KeyGenerator::partition_of(record.key) == self.partition_id {
                    self.state.key_generator.note_past_key(&txn, record.key)?;
                }
                txn.commit()?;
                self.state.on_commit();
                Ok(())
            }
            Err(error) => {
                txn.abort()?;
                self.state.on_abort();
                Err(error)
            }
        }
    }

    /// Re-offer every unacknowledged distribution copy, bumping its retry
    /// bookkeeping. Called on restart and whenever the transport wants to
    /// retry; delivery remains idempotent on the receiving side.
    pub fn pending_redelivery(
        &mut self,
        now_millis: u64,
    ) -> EngineResult<Vec<(PartitionId, Record)>> {
        let txn = self.db.begin()?;
        let pending = self.state.distribution.all_pending(&txn)?;
        let mut outbound = Vec::with_capacity(pending.len());
        for row in &pending {
            self.state
                .distribution
                .record_retry(&txn, row.command_key, row.partition, now_millis)?;
            outbound.push((
                row.partition,
                Record {
                    key: row.command_key,
                    source_record_position: 0,
                    record_type: RecordType::Command,
                    intent: row.intent,
                    value_type: row.value_type,
                    partition_id: self.partition_id,
                    distributed: true,
                    value: row.command_value.clone(),
                    rejection_type: None,
                    rejection_reason: None,
                },
            ));
            warn!(
                command_key = row.command_key,
                partition = row.partition,
                retry = row.retry_count + 1,
                "redelivering unacknowledged distribution"
            );
        }
        txn.commit()?;
        self.state.on_commit();
        Ok(outbound)
    }

    /// Whether a distributed command still awaits acknowledgements.
    pub fn has_pending_distribution(&mut self, command_key: u64) -> EngineResult<bool> {
        let txn = self.db.begin()?;
        let pending = self.state.distribution.has_pending(&txn, command_key)?;
        txn.abort()?;
        Ok(pending)
    }

    /// The element-instance collaborator surface: an instance of the
    /// process definition started running.
    pub fn instance_activated(&mut self, process_key: i64) -> EngineResult<()> {
        let txn = self.db.begin()?;
        self.state.element_instances.instance_activated(&txn, process_key)?;
        txn.commit()?;
        Ok(())
    }

    /// An instance of the process definition finished.
    pub fn instance_finished(&mut self, process_key: i64) -> EngineResult<()> {
        let txn = self.db.begin()?;
        self.state.element_instances.instance_finished(&txn, process_key)?;
        txn.commit()?;
        Ok(())
    }

    /// Dump the committed store contents for replica comparison.
    pub fn export_state(&self) -> EngineResult<Vec<(u16, Vec<u8>, Vec<u8>)>> {
        Ok(self.db.export()?)
    }
}
