//! Decision and decision-requirements-graph state.
//!
//! Maintains the primary rows, the `(id, version)` index, the
//! latest-version pointers, and the DRG→decision join index, plus the
//! read-through caches fronting the hot lookups.

use operon_db::{ForeignKey, ScanControl, StoreResult, Transaction, TypedColumn};
use operon_protocol::{DecisionRecord, DecisionRequirementsRecord};
use tracing::debug;

use crate::cache::BoundedCache;
use crate::families;
use crate::records::{PersistedDecision, PersistedDecisionRequirements};

const DECISIONS_BY_KEY: TypedColumn<i64, PersistedDecision> =
    TypedColumn::new(families::DECISIONS_BY_KEY);
const LATEST_DECISION_KEY_BY_ID: TypedColumn<String, i64> =
    TypedColumn::new(families::LATEST_DECISION_KEY_BY_ID);
const DECISION_KEY_BY_ID_AND_VERSION: TypedColumn<(String, i32), i64> =
    TypedColumn::new(families::DECISION_KEY_BY_ID_AND_VERSION);
const DECISION_KEY_BY_DRG_KEY: TypedColumn<(i64, i64), ()> =
    TypedColumn::new(families::DECISION_KEY_BY_DRG_KEY);
const DRGS_BY_KEY: TypedColumn<i64, PersistedDecisionRequirements> =
    TypedColumn::new(families::DRGS_BY_KEY);
const LATEST_DRG_KEY_BY_ID: TypedColumn<String, i64> =
    TypedColumn::new(families::LATEST_DRG_KEY_BY_ID);
const DRG_KEY_BY_ID_AND_VERSION: TypedColumn<(String, i32), i64> =
    TypedColumn::new(families::DRG_KEY_BY_ID_AND_VERSION);

/// Store for deployed decisions and decision requirements graphs.
pub struct DecisionState {
    latest_decision_key_cache: BoundedCache<String, i64>,
    decision_cache: BoundedCache<i64, PersistedDecision>,
    latest_drg_key_cache: BoundedCache<String, i64>,
    drg_cache: BoundedCache<i64, PersistedDecisionRequirements>,
    decisions_by_drg_cache: BoundedCache<i64, Vec<PersistedDecision>>,
}

impl DecisionState {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            latest_decision_key_cache: BoundedCache::new("latest_decision_key_by_id", cache_capacity),
            decision_cache: BoundedCache::new("decision_by_key", cache_capacity),
            latest_drg_key_cache: BoundedCache::new("latest_drg_key_by_id", cache_capacity),
            drg_cache: BoundedCache::new("drg_by_key", cache_capacity),
            decisions_by_drg_cache: BoundedCache::new("decisions_by_drg_key", cache_capacity),
        }
    }

    // ── Lookups ────────────────────────────────────────────────────

    /// The decision with the highest deployed version for `decision_id`.
    pub fn find_latest_decision_by_id(
        &mut self,
        txn: &Transaction,
        decision_id: &str,
    ) -> StoreResult<Option<PersistedDecision>> {
        let id = decision_id.to_string();
        let key = match self.latest_decision_key_cache.get(&id) {
            Some(key) => Some(key),
            None => match LATEST_DECISION_KEY_BY_ID.get(txn, &id)? {
                Some(key) => {
                    self.latest_decision_key_cache.populate(id, key);
                    Some(key)
                }
                None => None,
            },
        };
        match key {
            Some(key) => self.find_decision_by_key(txn, key),
            None => Ok(None),
        }
    }

    /// The decision stored at `decision_key`.
    pub fn find_decision_by_key(
        &mut self,
        txn: &Transaction,
        decision_key: i64,
    ) -> StoreResult<Option<PersistedDecision>> {
        if let Some(decision) = self.decision_cache.get(&decision_key) {
            return Ok(Some(decision));
        }
        match DECISIONS_BY_KEY.get(txn, &decision_key)? {
            Some(decision) => {
                self.decision_cache.populate(decision_key, decision.clone());
                Ok(Some(decision))
            }
            None => Ok(None),
        }
    }

    /// The DRG with the highest deployed version for `drg_id`.
    pub fn find_latest_drg_by_id(
        &mut self,
        txn: &Transaction,
        drg_id: &str,
    ) -> StoreResult<Option<PersistedDecisionRequirements>> {
        let id = drg_id.to_string();
        let key = match self.latest_drg_key_cache.get(&id) {
            Some(key) => Some(key),
            None => match LATEST_DRG_KEY_BY_ID.get(txn, &id)? {
                Some(key) => {
                    self.latest_drg_key_cache.populate(id, key);
                    Some(key)
                }
                None => None,
            },
        };
        match key {
            Some(key) => self.find_drg_by_key(txn, key),
            None => Ok(None),
        }
    }

    /// The DRG stored at `drg_key`.
    pub fn find_drg_by_key(
        &mut self,
        txn: &Transaction,
        drg_key: i64,
    ) -> StoreResult<Option<PersistedDecisionRequirements>> {
        if let Some(drg) = self.drg_cache.get(&drg_key) {
            return Ok(Some(drg));
        }
        match DRGS_BY_KEY.get(txn, &drg_key)? {
            Some(drg) => {
                self.drg_cache.populate(drg_key, drg.clone());
                Ok(Some(drg))
            }
            None => Ok(None),
        }
    }

    /// All decisions belonging to the DRG, ascending by `decisionKey`.
    pub fn find_decisions_by_drg_key(
        &mut self,
        txn: &Transaction,
        drg_key: i64,
    ) -> StoreResult<Vec<PersistedDecision>> {
        if let Some(decisions) = self.decisions_by_drg_cache.get(&drg_key) {
            return Ok(decisions);
        }

        let mut decision_keys = Vec::new();
        DECISION_KEY_BY_DRG_KEY.scan_prefix(txn, &drg_key, |(_, decision_key), ()| {
            decision_keys.push(decision_key);
            Ok(ScanControl::Continue)
        })?;

        let mut decisions = Vec::with_capacity(decision_keys.len());
        for key in decision_keys {
            if let Some(decision) = self.find_decision_by_key(txn, key)? {
                decisions.push(decision);
            }
        }
        self.decisions_by_drg_cache.populate(drg_key, decisions.clone());
        Ok(decisions)
    }

    // ── Mutations ──────────────────────────────────────────────────

    /// Store a deployed decision and maintain its indexes.
    pub fn store_decision(&mut self, txn: &Transaction, record: &DecisionRecord) -> StoreResult<()> {
        let persisted = PersistedDecision::from_record(record);
        DECISIONS_BY_KEY.upsert(txn, &record.decision_key, &persisted)?;

        ForeignKey::new(families::DRGS_BY_KEY, record.drg_key).verify(txn)?;
        DECISION_KEY_BY_DRG_KEY.upsert(txn, &(record.drg_key, record.decision_key), &())?;
        DECISION_KEY_BY_ID_AND_VERSION.upsert(
            txn,
            &(record.decision_id.clone(), record.version),
            &record.decision_key,
        )?;

        self.update_latest_decision_version(txn, record)?;

        self.decision_cache.invalidate(&record.decision_key);
        self.latest_decision_key_cache.invalidate(&record.decision_id);
        self.decisions_by_drg_cache.invalidate(&record.drg_key);
        debug!(
            decision_id = %record.decision_id,
            decision_key = record.decision_key,
            version = record.version,
            "decision stored"
        );
        Ok(())
    }

    /// Store a deployed DRG and maintain its indexes.
    pub fn store_drg(
        &mut self,
        txn: &Transaction,
        record: &DecisionRequirementsRecord,
    ) -> StoreResult<()> {
        let persisted = PersistedDecisionRequirements::from_record(record);
        DRGS_BY_KEY.upsert(txn, &record.drg_key, &persisted)?;
        DRG_KEY_BY_ID_AND_VERSION.upsert(
            txn,
            &(record.drg_id.clone(), record.drg_version),
            &record.drg_key,
        )?;

        self.update_latest_drg_version(txn, record)?;

        self.drg_cache.invalidate(&record.drg_key);
        self.latest_drg_key_cache.invalidate(&record.drg_id);
        debug!(
            drg_id = %record.drg_id,
            drg_key = record.drg_key,
            version = record.drg_version,
            "decision requirements stored"
        );
        Ok(())
    }

    /// Delete a decision, repointing or clearing the latest-version pointer
    /// when the deleted row was the latest.
    pub fn delete_decision(
        &mut self,
        txn: &Transaction,
        record: &DecisionRecord,
    ) -> StoreResult<()> {
        if let Some(latest) = self.find_latest_decision_by_id(txn, &record.decision_id)? {
            if latest.version == record.version {
                match self.previous_decision_version_key(txn, &record.decision_id, record.version)? {
                    Some(previous_key) => {
                        ForeignKey::new(families::DECISIONS_BY_KEY, previous_key).verify(txn)?;
                        LATEST_DECISION_KEY_BY_ID.update(
                            txn,
                            &record.decision_id,
                            &previous_key,
                        )?;
                    }
                    None => {
                        LATEST_DECISION_KEY_BY_ID
                            .delete_existing(txn, &record.decision_id)?;
                    }
                }
            }
        }

        DECISION_KEY_BY_DRG_KEY.delete_existing(txn, &(record.drg_key, record.decision_key))?;
        DECISIONS_BY_KEY.delete_existing(txn, &record.decision_key)?;
        DECISION_KEY_BY_ID_AND_VERSION
            .delete_existing(txn, &(record.decision_id.clone(), record.version))?;

        self.decision_cache.invalidate(&record.decision_key);
        self.latest_decision_key_cache.invalidate(&record.decision_id);
        self.decisions_by_drg_cache.invalidate(&record.drg_key);
        debug!(
            decision_id = %record.decision_id,
            decision_key = record.decision_key,
            version = record.version,
            "decision deleted"
        );
        Ok(())
    }

    /// Delete a DRG, with the same latest-version maintenance as decisions.
    pub fn delete_drg(
        &mut self,
        txn: &Transaction,
        record: &DecisionRequirementsRecord,
    ) -> StoreResult<()> {
        if let Some(latest) = self.find_latest_drg_by_id(txn, &record.drg_id)? {
            if latest.drg_version == record.drg_version {
                match self.previous_drg_version_key(txn, &record.drg_id, record.drg_version)? {
                    Some(previous_key) => {
                        ForeignKey::new(families::DRGS_BY_KEY, previous_key).verify(txn)?;
                        LATEST_DRG_KEY_BY_ID.update(txn, &record.drg_id, &previous_key)?;
                    }
                    None => {
                        LATEST_DRG_KEY_BY_ID.delete_existing(txn, &record.drg_id)?;
                    }
                }
            }
        }

        DRGS_BY_KEY.delete_existing(txn, &record.drg_key)?;
        DRG_KEY_BY_ID_AND_VERSION
            .delete_existing(txn, &(record.drg_id.clone(), record.drg_version))?;

        self.drg_cache.invalidate(&record.drg_key);
        self.latest_drg_key_cache.invalidate(&record.drg_id);
        self.decisions_by_drg_cache.invalidate(&record.drg_key);
        debug!(
            drg_id = %record.drg_id,
            drg_key = record.drg_key,
            version = record.drg_version,
            "decision requirements deleted"
        );
        Ok(())
    }

    // ── Transaction boundaries ─────────────────────────────────────

    pub fn on_commit(&mut self) {
        self.latest_decision_key_cache.on_commit();
        self.decision_cache.on_commit();
        self.latest_drg_key_cache.on_commit();
        self.drg_cache.on_commit();
        self.decisions_by_drg_cache.on_commit();
    }

    pub fn on_abort(&mut self) {
        self.latest_decision_key_cache.on_abort();
        self.decision_cache.on_abort();
        self.latest_drg_key_cache.on_abort();
        self.drg_cache.on_abort();
        self.decisions_by_drg_cache.on_abort();
    }

    // ── Internal ───────────────────────────────────────────────────

    fn update_latest_decision_version(
        &mut self,
        txn: &Transaction,
        record: &DecisionRecord,
    ) -> StoreResult<()> {
        let fk = ForeignKey::new(families::DECISIONS_BY_KEY, record.decision_key);
        fk.verify(txn)?;
        match self.find_latest_decision_by_id(txn, &record.decision_id)? {
            Some(previous) => {
                if record.version > previous.version {
                    LATEST_DECISION_KEY_BY_ID.update(
                        txn,
                        &record.decision_id,
                        &record.decision_key,
                    )?;
                }
            }
            None => {
                LATEST_DECISION_KEY_BY_ID.insert(
                    txn,
                    &record.decision_id,
                    &record.decision_key,
                )?;
            }
        }
        Ok(())
    }

    fn update_latest_drg_version(
        &mut self,
        txn: &Transaction,
        record: &DecisionRequirementsRecord,
    ) -> StoreResult<()> {
        let fk = ForeignKey::new(families::DRGS_BY_KEY, record.drg_key);
        fk.verify(txn)?;
        match self.find_latest_drg_by_id(txn, &record.drg_id)? {
            Some(previous) => {
                if record.drg_version > previous.drg_version {
                    LATEST_DRG_KEY_BY_ID.update(txn, &record.drg_id, &record.drg_key)?;
                }
            }
            None => {
                LATEST_DRG_KEY_BY_ID.insert(txn, &record.drg_id, &record.drg_key)?;
            }
        }
        Ok(())
    }

    /// The key of the highest version of `decision_id` strictly below
    /// `current_version`, if any remains.
    fn previous_decision_version_key(
        &self,
        txn: &Transaction,
        decision_id: &str,
        current_version: i32,
    ) -> StoreResult<Option<i64>> {
        let mut best: Option<(i32, i64)> = None;
        DECISION_KEY_BY_ID_AND_VERSION.scan_prefix(
            txn,
            &decision_id.to_string(),
            |(_, version), decision_key| {
                if version < current_version && best.map_or(true, |(v, _)| version > v) {
                    best = Some((version, decision_key));
                }
                Ok(ScanControl::Continue)
            },
        )?;
        Ok(best.map(|(_, key)| key))
    }

    fn previous_drg_version_key(
        &self,
        txn: &Transaction,
        drg_id: &str,
        current_version: i32,
    ) -> StoreResult<Option<i64>> {
        let mut best: Option<(i32, i64)> = None;
        DRG_KEY_BY_ID_AND_VERSION.scan_prefix(
            txn,
            &drg_id.to_string(),
            |(_, version), drg_key| {
                if version < current_version && best.map_or(true, |(v, _)| version > v) {
                    best = Some((version, drg_key));
                }
                Ok(ScanControl::Continue)
            },
        )?;
        Ok(best.map(|(_, key)| key))
    }
}
