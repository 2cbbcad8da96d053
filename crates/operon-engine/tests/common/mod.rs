//! Shared harness for partition integration tests.
#![allow(dead_code)]

use operon_engine::{EngineResult, Partition, PartitionConfig, ProcessingResult};
use operon_protocol::{
    codec, DecisionIntent, DecisionRecord, DecisionRequirementsIntent, DecisionRequirementsRecord,
    Intent, PartitionId, ProcessIntent, ProcessRecord, Record, RecordType, ResourceDeletionIntent,
    ResourceDeletionRecord,
};
use operon_state::{families, PersistedProcess};

/// One in-memory partition plus the log it would have written.
pub struct TestPartition {
    pub partition: Partition,
    pub log: Vec<Record>,
    next_position: u64,
}

impl TestPartition {
    pub fn new(partition_id: PartitionId, partition_count: u32) -> Self {
        let config = PartitionConfig {
            partition_id,
            partition_count,
            ..PartitionConfig::default()
        };
        Self {
            partition: Partition::open(&config).expect("open partition"),
            log: Vec::new(),
            next_position: 0,
        }
    }

    /// Append a deployment-side event to the log and apply it to state.
    fn apply_event(&mut self, key: u64, intent: Intent, value: Vec<u8>) {
        let record =
            Record::follow_up_event(key, intent, self.partition.partition_id(), 0, value);
        self.partition.replay(&record).expect("apply event");
        self.log.push(record);
    }

    pub fn deploy_process(&mut self, key: i64, bpmn_process_id: &str, version: i32) {
        let record = process_record(key, bpmn_process_id, version);
        self.apply_event(
            key as u64,
            Intent::Process(ProcessIntent::Created),
            codec::encode(&record).unwrap(),
        );
    }

    pub fn deploy_drg(&mut self, drg_key: i64, drg_id: &str, drg_version: i32) {
        let record = drg_record(drg_key, drg_id, drg_version);
        self.apply_event(
            drg_key as u64,
            Intent::DecisionRequirements(DecisionRequirementsIntent::Created),
            codec::encode(&record).unwrap(),
        );
    }

    pub fn deploy_decision(
        &mut self,
        decision_key: i64,
        decision_id: &str,
        version: i32,
        drg_key: i64,
    ) {
        let record = decision_record(decision_key, decision_id, version, drg_key);
        self.apply_event(
            decision_key as u64,
            Intent::Decision(DecisionIntent::Created),
            codec::encode(&record).unwrap(),
        );
    }

    /// Submit a command as the log would: assign the next position, process
    /// it, and append the committed batch records.
    pub fn submit(&mut self, command: Record) -> EngineResult<ProcessingResult> {
        self.next_position += 1;
        self.log.push(command.clone());
        let result = self.partition.process(self.next_position, &command)?;
        self.log.extend(result.records.iter().cloned());
        Ok(result)
    }
}

pub fn process_record(key: i64, bpmn_process_id: &str, version: i32) -> ProcessRecord {
    ProcessRecord {
        bpmn_process_id: bpmn_process_id.to_string(),
        version,
        key,
        resource_name: format!("{bpmn_process_id}.bpmn"),
        checksum: Some(vec![0x11, 0x22]),
        resource: Some(b"<definitions/>".to_vec()),
    }
}

pub fn drg_record(drg_key: i64, drg_id: &str, drg_version: i32) -> DecisionRequirementsRecord {
    DecisionRequirementsRecord {
        drg_id: drg_id.to_string(),
        drg_name: format!("{drg_id} graph"),
        drg_version,
        drg_key,
        resource_name: format!("{drg_id}.dmn"),
        checksum: vec![0x33],
        resource: b"<drd/>".to_vec(),
    }
}

pub fn decision_record(
    decision_key: i64,
    decision_id: &str,
    version: i32,
    drg_key: i64,
) -> DecisionRecord {
    DecisionRecord {
        decision_id: decision_id.to_string(),
        decision_name: format!("{decision_id} decision"),
        version,
        decision_key,
        drg_id: "drg".to_string(),
        drg_key,
    }
}

pub fn delete_resource_command(resource_key: i64) -> Record {
    Record::new_command(
        Intent::ResourceDeletion(ResourceDeletionIntent::Delete),
        1,
        codec::encode(&ResourceDeletionRecord { resource_key }).unwrap(),
    )
}

/// `(record type, intent)` of every batch record, for order assertions.
pub fn shape_of(records: &[Record]) -> Vec<(RecordType, Intent)> {
    records.iter().map(|r| (r.record_type, r.intent)).collect()
}

/// Decode all stored process rows from a partition's state dump.
pub fn process_rows(partition: &Partition) -> Vec<PersistedProcess> {
    partition
        .export_state()
        .unwrap()
        .into_iter()
        .filter(|(family, _, _)| *family == families::PROCESSES_BY_KEY.id())
        .map(|(_, _, value)| rmp_serde::from_slice(&value).unwrap())
        .collect()
}

/// Count the committed rows in one column family.
pub fn rows_in_family(partition: &Partition, family: operon_db::ColumnFamily) -> usize {
    partition
        .export_state()
        .unwrap()
        .into_iter()
        .filter(|(id, _, _)| *id == family.id())
        .count()
}
