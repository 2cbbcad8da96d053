//! Deployed process definition state.
//!
//! Same index discipline as decisions: primary rows by key, an
//! `(id, version)` index, and a latest-version pointer maintained on store
//! and delete.

use operon_db::{ForeignKey, ScanControl, StoreResult, Transaction, TypedColumn};
use operon_protocol::ProcessRecord;
use tracing::debug;

use crate::families;
use crate::records::{PersistedProcess, PersistedProcessState};

const PROCESSES_BY_KEY: TypedColumn<i64, PersistedProcess> =
    TypedColumn::new(families::PROCESSES_BY_KEY);
const PROCESS_KEY_BY_ID_AND_VERSION: TypedColumn<(String, i32), i64> =
    TypedColumn::new(families::PROCESS_KEY_BY_ID_AND_VERSION);
const LATEST_PROCESS_KEY_BY_ID: TypedColumn<String, i64> =
    TypedColumn::new(families::LATEST_PROCESS_KEY_BY_ID);

/// Store for deployed process definitions.
pub struct ProcessState;

impl ProcessState {
    pub fn new() -> Self {
        Self
    }

    /// The process stored at `process_key`.
    pub fn get_process_by_key(
        &self,
        txn: &Transaction,
        process_key: i64,
    ) -> StoreResult<Option<PersistedProcess>> {
        PROCESSES_BY_KEY.get(txn, &process_key)
    }

    /// The process with the highest deployed version for `bpmn_process_id`.
    pub fn find_latest_process_by_id(
        &self,
        txn: &Transaction,
        bpmn_process_id: &str,
    ) -> StoreResult<Option<PersistedProcess>> {
        match LATEST_PROCESS_KEY_BY_ID.get(txn, &bpmn_process_id.to_string())? {
            Some(key) => self.get_process_by_key(txn, key),
            None => Ok(None),
        }
    }

    /// Store a deployed process and maintain its indexes.
    pub fn store_process(&self, txn: &Transaction, record: &ProcessRecord) -> StoreResult<()> {
        let persisted = PersistedProcess::from_record(record);
        PROCESSES_BY_KEY.upsert(txn, &record.key, &persisted)?;
        PROCESS_KEY_BY_ID_AND_VERSION.upsert(
            txn,
            &(record.bpmn_process_id.clone(), record.version),
            &record.key,
        )?;

        let fk = ForeignKey::new(families::PROCESSES_BY_KEY, record.key);
        fk.verify(txn)?;
        match self.find_latest_process_by_id(txn, &record.bpmn_process_id)? {
            Some(previous) => {
                if record.version > previous.version {
                    LATEST_PROCESS_KEY_BY_ID.update(txn, &record.bpmn_process_id, &record.key)?;
                }
            }
            None => {
                LATEST_PROCESS_KEY_BY_ID.insert(txn, &record.bpmn_process_id, &record.key)?;
            }
        }
        debug!(
            bpmn_process_id = %record.bpmn_process_id,
            process_key = record.key,
            version = record.version,
            "process stored"
        );
        Ok(())
    }

    /// Flag a stored process as awaiting deletion (active instances block
    /// immediate removal).
    pub fn mark_pending_deletion(&self, txn: &Transaction, process_key: i64) -> StoreResult<()> {
        let mut process = PROCESSES_BY_KEY.get(txn, &process_key)?.ok_or(
            operon_db::StoreError::MissingPrimary {
                family: families::PROCESSES_BY_KEY,
            },
        )?;
        process.state = PersistedProcessState::PendingDeletion;
        PROCESSES_BY_KEY.update(txn, &process_key, &process)
    }

    /// Delete a process, repointing or clearing the latest-version pointer
    /// when the deleted row was the latest.
    pub fn delete_process(&self, txn: &Transaction, record: &ProcessRecord) -> StoreResult<()> {
        if let Some(latest) = self.find_latest_process_by_id(txn, &record.bpmn_process_id)? {
            if latest.version == record.version {
                match self.previous_process_version_key(
                    txn,
                    &record.bpmn_process_id,
                    record.version,
                )? {
                    Some(previous_key) => {
                        ForeignKey::new(families::PROCESSES_BY_KEY, previous_key).verify(txn)?;
                        LATEST_PROCESS_KEY_BY_ID.update(
                            txn,
                            &record.bpmn_process_id,
                            &previous_key,
                        )?;
                    }
                    None => {
                        LATEST_PROCESS_KEY_BY_ID.delete_existing(txn, &record.bpmn_process_id)?;
                    }
                }
            }
        }

        PROCESSES_BY_KEY.delete_existing(txn, &record.key)?;
        PROCESS_KEY_BY_ID_AND_VERSION
            .delete_existing(txn, &(record.bpmn_process_id.clone(), record.version))?;
        debug!(
            bpmn_process_id = %record.bpmn_process_id,
            process_key = record.key,
            version = record.version,
            "process deleted"
        );
        Ok(())
    }

    fn previous_process_version_key(
        &self,
        txn: &Transaction,
        bpmn_process_id: &str,
        current_version: i32,
    ) -> StoreResult<Option<i64>> {
        let mut best: Option<(i32, i64)> = None;
        PROCESS_KEY_BY_ID_AND_VERSION.scan_prefix(
            txn,
            &bpmn_process_id.to_string(),
            |(_, version), process_key| {
                if version < current_version && best.map_or(true, |(v, _)| version > v) {
                    best = Some((version, process_key));
                }
                Ok(ScanControl::Continue)
            },
        )?;
        Ok(best.map(|(_, key)| key))
    }
}

impl Default for ProcessState {
    fn default() -> Self {
        Self::new()
    }
}
