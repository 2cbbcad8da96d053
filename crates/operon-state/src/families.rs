//! Column family registry.
//!
//! Family ids are part of the persisted layout: they prefix every key in the
//! store. Ids are stable forever — new families extend the list, existing
//! ones are never renumbered or reused.

use operon_db::ColumnFamily;

/// Next key counter, single row.
pub const KEY_GENERATOR: ColumnFamily = ColumnFamily::new(0x0001, "key_generator");

/// `processKey → PersistedProcess`.
pub const PROCESSES_BY_KEY: ColumnFamily = ColumnFamily::new(0x0002, "processes_by_key");

/// `(bpmnProcessId, version) → processKey`.
pub const PROCESS_KEY_BY_ID_AND_VERSION: ColumnFamily =
    ColumnFamily::new(0x0003, "process_key_by_id_and_version");

/// `bpmnProcessId → processKey` of the highest deployed version.
pub const LATEST_PROCESS_KEY_BY_ID: ColumnFamily =
    ColumnFamily::new(0x0004, "latest_process_key_by_id");

/// `decisionKey → PersistedDecision`.
pub const DECISIONS_BY_KEY: ColumnFamily = ColumnFamily::new(0x0005, "decisions_by_key");

/// `decisionId → decisionKey` of the highest deployed version.
pub const LATEST_DECISION_KEY_BY_ID: ColumnFamily =
    ColumnFamily::new(0x0006, "latest_decision_key_by_id");

/// `(decisionId, version) → decisionKey`.
pub const DECISION_KEY_BY_ID_AND_VERSION: ColumnFamily =
    ColumnFamily::new(0x0007, "decision_key_by_id_and_version");

/// `(drgKey, decisionKey) → ∅` — join index from a decision requirements
/// graph to its decisions; prefix-scannable by `drgKey`.
pub const DECISION_KEY_BY_DRG_KEY: ColumnFamily =
    ColumnFamily::new(0x0008, "decision_key_by_drg_key");

/// `drgKey → PersistedDecisionRequirements`.
pub const DRGS_BY_KEY: ColumnFamily = ColumnFamily::new(0x0009, "drgs_by_key");

/// `drgId → drgKey` of the highest deployed version.
pub const LATEST_DRG_KEY_BY_ID: ColumnFamily =
    ColumnFamily::new(0x000a, "latest_drg_key_by_id");

/// `(drgId, drgVersion) → drgKey`.
pub const DRG_KEY_BY_ID_AND_VERSION: ColumnFamily =
    ColumnFamily::new(0x000b, "drg_key_by_id_and_version");

/// `(commandKey, targetPartition) → PendingDistribution` — distributed
/// command copies awaiting acknowledgement.
pub const PENDING_DISTRIBUTION: ColumnFamily =
    ColumnFamily::new(0x000c, "pending_distribution");

/// `processKey → active instance count` — backs the deletion guard.
pub const ACTIVE_INSTANCE_COUNTS: ColumnFamily =
    ColumnFamily::new(0x000d, "active_instance_counts");
