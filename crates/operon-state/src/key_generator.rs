//! Partition-scoped key generation.
//!
//! Keys are `partition_id << 51 | counter`, making every key globally
//! unique and attributable to the partition that allocated it. The counter
//! is persisted in its own column family and advances inside the same
//! transaction as the command that consumed the key, so a reprocessed
//! command regenerates identical keys.

use operon_db::{StoreResult, Transaction, TypedColumn};
use operon_protocol::PartitionId;

use crate::families;

/// Number of bits reserved for the per-partition counter.
const KEY_BITS: u32 = 51;
const COUNTER_MASK: u64 = (1u64 << KEY_BITS) - 1;

const NEXT_COUNTER: TypedColumn<(), u64> = TypedColumn::new(families::KEY_GENERATOR);

/// Monotonic key generator for one partition.
pub struct KeyGenerator {
    partition_id: PartitionId,
}

impl KeyGenerator {
    pub fn new(partition_id: PartitionId) -> Self {
        Self { partition_id }
    }

    /// Allocate the next key.
    pub fn next_key(&self, txn: &Transaction) -> StoreResult<u64> {
        let counter = NEXT_COUNTER.get(txn, &())?.unwrap_or(0) + 1;
        NEXT_COUNTER.upsert(txn, &(), &counter)?;
        Ok(self.make_key(counter))
    }

    /// Advance the counter past a key observed during replay, so that
    /// post-recovery allocation cannot collide with replayed records.
    pub fn note_past_key(&self, txn: &Transaction, key: u64) -> StoreResult<()> {
        let counter = key & COUNTER_MASK;
        if counter > NEXT_COUNTER.get(txn, &())?.unwrap_or(0) {
            NEXT_COUNTER.upsert(txn, &(), &counter)?;
        }
        Ok(())
    }

    fn make_key(&self, counter: u64) -> u64 {
        (u64::from(self.partition_id) << KEY_BITS) | counter
    }

    /// The partition encoded in a key.
    pub fn partition_of(key: u64) -> PartitionId {
        (key >> KEY_BITS) as PartitionId
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use operon_db::StateDb;

    #[test]
    fn keys_are_monotonic_and_partition_tagged() {
        let db = StateDb::open_in_memory().unwrap();
        let txn = db.begin().unwrap();
        let generator = KeyGenerator::new(3);

        let first = generator.next_key(&txn).unwrap();
        let second = generator.next_key(&txn).unwrap();

        assert!(second > first);
        assert_eq!(KeyGenerator::partition_of(first), 3);
        assert_eq!(first & COUNTER_MASK, 1);
        assert_eq!(second & COUNTER_MASK, 2);
        txn.abort().unwrap();
    }

    #[test]
    fn counter_survives_commit() {
        let db = StateDb::open_in_memory().unwrap();
        let generator = KeyGenerator::new(1);

        let txn = db.begin().unwrap();
        let first = generator.next_key(&txn).unwrap();
        txn.commit().unwrap();

        let txn = db.begin().unwrap();
        let second = generator.next_key(&txn).unwrap();
        assert_eq!(second, first + 1);
        txn.abort().unwrap();
    }

    #[test]
    fn aborted_allocations_are_reused() {
        let db = StateDb::open_in_memory().unwrap();
        let generator = KeyGenerator::new(1);

        let txn = db.begin().unwrap();
        let first = generator.next_key(&txn).unwrap();
        txn.abort().unwrap();

        let txn = db.begin().unwrap();
        let retried = generator.next_key(&txn).unwrap();
        assert_eq!(retried, first);
        txn.abort().unwrap();
    }

    #[test]
    fn note_past_key_only_moves_forward() {
        let db = StateDb::open_in_memory().unwrap();
        let generator = KeyGenerator::new(1);
        let txn = db.begin().unwrap();

        generator.note_past_key(&txn, generator.make_key(10)).unwrap();
        generator.note_past_key(&txn, generator.make_key(5)).unwrap();

        let next = generator.next_key(&txn).unwrap();
        assert_eq!(next & COUNTER_MASK, 11);
        txn.abort().unwrap();
    }
}
