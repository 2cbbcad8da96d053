//! Persisted row types.
//!
//! These are the MessagePack-encoded values stored in the column families.
//! They mirror the wire records of [`operon_protocol`] but are distinct
//! types: stored rows carry state the wire omits (the process lifecycle
//! state) and normalize optional wire fields.

use serde::{Deserialize, Serialize};

use operon_protocol::{
    DecisionRecord, DecisionRequirementsRecord, Intent, PartitionId, ProcessRecord, ValueType,
};

/// Lifecycle state of a stored process definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersistedProcessState {
    Active,
    /// Deletion was requested but active instances blocked immediate
    /// removal.
    PendingDeletion,
}

/// A deployed process definition as stored in `processes_by_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedProcess {
    pub bpmn_process_id: String,
    pub version: i32,
    pub key: i64,
    pub resource_name: String,
    pub resource: Vec<u8>,
    pub checksum: Vec<u8>,
    pub state: PersistedProcessState,
}

impl PersistedProcess {
    pub fn from_record(record: &ProcessRecord) -> Self {
        Self {
            bpmn_process_id: record.bpmn_process_id.clone(),
            version: record.version,
            key: record.key,
            resource_name: record.resource_name.clone(),
            resource: record.resource.clone().unwrap_or_default(),
            checksum: record.checksum.clone().unwrap_or_default(),
            state: PersistedProcessState::Active,
        }
    }

    /// The wire record for deletion events: `checksum` and `resource` are
    /// left out to bound event size.
    pub fn to_deletion_record(&self) -> ProcessRecord {
        ProcessRecord {
            bpmn_process_id: self.bpmn_process_id.clone(),
            version: self.version,
            key: self.key,
            resource_name: self.resource_name.clone(),
            checksum: None,
            resource: None,
        }
    }
}

/// A deployed decision as stored in `decisions_by_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedDecision {
    pub decision_id: String,
    pub decision_name: String,
    pub version: i32,
    pub decision_key: i64,
    pub drg_id: String,
    pub drg_key: i64,
}

impl PersistedDecision {
    pub fn from_record(record: &DecisionRecord) -> Self {
        Self {
            decision_id: record.decision_id.clone(),
            decision_name: record.decision_name.clone(),
            version: record.version,
            decision_key: record.decision_key,
            drg_id: record.drg_id.clone(),
            drg_key: record.drg_key,
        }
    }

    pub fn to_record(&self) -> DecisionRecord {
        DecisionRecord {
            decision_id: self.decision_id.clone(),
            decision_name: self.decision_name.clone(),
            version: self.version,
            decision_key: self.decision_key,
            drg_id: self.drg_id.clone(),
            drg_key: self.drg_key,
        }
    }
}

/// A deployed decision requirements graph as stored in `drgs_by_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedDecisionRequirements {
    pub drg_id: String,
    pub drg_name: String,
    pub drg_version: i32,
    pub drg_key: i64,
    pub resource_name: String,
    pub checksum: Vec<u8>,
    pub resource: Vec<u8>,
}

impl PersistedDecisionRequirements {
    pub fn from_record(record: &DecisionRequirementsRecord) -> Self {
        Self {
            drg_id: record.drg_id.clone(),
            drg_name: record.drg_name.clone(),
            drg_version: record.drg_version,
            drg_key: record.drg_key,
            resource_name: record.resource_name.clone(),
            checksum: record.checksum.clone(),
            resource: record.resource.clone(),
        }
    }

    /// The wire record for the deletion event; carries the full graph
    /// including `resource` and `checksum`.
    pub fn to_record(&self) -> DecisionRequirementsRecord {
        DecisionRequirementsRecord {
            drg_id: self.drg_id.clone(),
            drg_name: self.drg_name.clone(),
            drg_version: self.drg_version,
            drg_key: self.drg_key,
            resource_name: self.resource_name.clone(),
            checksum: self.checksum.clone(),
            resource: self.resource.clone(),
        }
    }
}

/// A distributed command copy awaiting a peer's acknowledgement, stored in
/// `pending_distribution`.
///
/// Carries the wrapped command so unacknowledged copies can be rebuilt and
/// re-sent after a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingDistribution {
    pub command_key: u64,
    pub partition: PartitionId,
    pub retry_count: u32,
    /// Unix millis of the last redelivery attempt; 0 until the first retry.
    pub last_attempt_at: u64,
    pub value_type: ValueType,
    pub intent: Intent,
    pub command_value: Vec<u8>,
}
