//! Active-instance bookkeeping.
//!
//! The deletion guard only needs one predicate from element-instance state:
//! whether a process definition still has running instances. This store
//! keeps a count per process key, maintained by the instance lifecycle
//! events of the surrounding engine.

use operon_db::{StoreError, StoreResult, Transaction, TypedColumn};

use crate::families;

const ACTIVE_INSTANCE_COUNTS: TypedColumn<i64, u64> =
    TypedColumn::new(families::ACTIVE_INSTANCE_COUNTS);

/// Per-process active instance counts.
pub struct ElementInstanceState;

impl ElementInstanceState {
    pub fn new() -> Self {
        Self
    }

    /// Whether any instance of the process definition is still running.
    pub fn has_active_process_instances(
        &self,
        txn: &Transaction,
        process_key: i64,
    ) -> StoreResult<bool> {
        Ok(self.active_instance_count(txn, process_key)? > 0)
    }

    pub fn active_instance_count(&self, txn: &Transaction, process_key: i64) -> StoreResult<u64> {
        Ok(ACTIVE_INSTANCE_COUNTS.get(txn, &process_key)?.unwrap_or(0))
    }

    /// An instance of the process definition was activated.
    pub fn instance_activated(&self, txn: &Transaction, process_key: i64) -> StoreResult<()> {
        let count = self.active_instance_count(txn, process_key)? + 1;
        ACTIVE_INSTANCE_COUNTS.upsert(txn, &process_key, &count)
    }

    /// An instance of the process definition completed or was terminated.
    pub fn instance_finished(&self, txn: &Transaction, process_key: i64) -> StoreResult<()> {
        match self.active_instance_count(txn, process_key)? {
            0 => Err(StoreError::MissingPrimary {
                family: families::ACTIVE_INSTANCE_COUNTS,
            }),
            1 => {
                ACTIVE_INSTANCE_COUNTS.delete_existing(txn, &process_key)?;
                Ok(())
            }
            count => ACTIVE_INSTANCE_COUNTS.upsert(txn, &process_key, &(count - 1)),
        }
    }
}

impl Default for ElementInstanceState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use operon_db::StateDb;

    #[test]
    fn counts_rise_and_fall_with_instances() {
        let db = StateDb::open_in_memory().unwrap();
        let txn = db.begin().unwrap();
        let state = ElementInstanceState::new();

        assert!(!state.has_active_process_instances(&txn, 100).unwrap());

        state.instance_activated(&txn, 100).unwrap();
        state.instance_activated(&txn, 100).unwrap();
        assert!(state.has_active_process_instances(&txn, 100).unwrap());
        assert_eq!(state.active_instance_count(&txn, 100).unwrap(), 2);

        state.instance_finished(&txn, 100).unwrap();
        assert!(state.has_active_process_instances(&txn, 100).unwrap());

        state.instance_finished(&txn, 100).unwrap();
        assert!(!state.has_active_process_instances(&txn, 100).unwrap());
        txn.abort().unwrap();
    }

    #[test]
    fn finishing_an_untracked_instance_is_fatal() {
        let db = StateDb::open_in_memory().unwrap();
        let txn = db.begin().unwrap();
        let state = ElementInstanceState::new();

        assert!(state.instance_finished(&txn, 100).is_err());
        txn.abort().unwrap();
    }
}
