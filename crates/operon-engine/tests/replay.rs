//! Replay determinism: logged events rebuild byte-identical state.

mod common;

use common::*;
use operon_engine::{Partition, PartitionConfig};
use operon_protocol::Record;

fn fresh_partition() -> Partition {
    Partition::open(&PartitionConfig::default()).unwrap()
}

fn replay_all(records: &[Record]) -> Partition {
    let mut partition = fresh_partition();
    for record in records {
        partition.replay(record).unwrap();
    }
    partition
}

/// Drive a mixed scenario and return the partition plus its full log.
fn processed_scenario() -> TestPartition {
    let mut partition = TestPartition::new(1, 1);
    partition.deploy_drg(7, "D", 1);
    partition.deploy_decision(70, "review", 1, 7);
    partition.deploy_decision(71, "approve", 1, 7);
    partition.deploy_process(100, "p", 1);
    partition.deploy_process(200, "p", 2);

    // A failed deletion, a DRG cascade, and a process deletion.
    partition.submit(delete_resource_command(42)).unwrap();
    partition.submit(delete_resource_command(7)).unwrap();
    partition.submit(delete_resource_command(200)).unwrap();
    partition
}

#[test]
fn replaying_the_full_log_reproduces_the_store_exactly() {
    let processed = processed_scenario();
    let replayed = replay_all(&processed.log);

    assert_eq!(
        replayed.export_state().unwrap(),
        processed.partition.export_state().unwrap()
    );
}

#[test]
fn replaying_any_prefix_is_well_formed() {
    let processed = processed_scenario();

    // Every prefix must replay without errors; the full prefix must match
    // the original store.
    for cut in 0..=processed.log.len() {
        let replayed = replay_all(&processed.log[..cut]);
        if cut == processed.log.len() {
            assert_eq!(
                replayed.export_state().unwrap(),
                processed.partition.export_state().unwrap()
            );
        }
    }
}

#[test]
fn key_generation_continues_after_replay_without_collisions() {
    let processed = processed_scenario();
    let max_event_key = processed
        .log
        .iter()
        .map(|r| r.key)
        .max()
        .unwrap();

    let mut replayed = TestPartition::new(1, 1);
    for record in &processed.log {
        replayed.partition.replay(record).unwrap();
    }
    replayed.deploy_process(300, "q", 1);

    let result = replayed.submit(delete_resource_command(300)).unwrap();
    for record in &result.records {
        assert!(
            record.key > max_event_key,
            "key {} collides with replayed log (max {})",
            record.key,
            max_event_key
        );
    }
}

#[test]
fn two_replicas_processing_the_same_log_are_byte_identical() {
    let first = processed_scenario();
    let second = processed_scenario();

    assert_eq!(first.log, second.log);
    assert_eq!(
        first.partition.export_state().unwrap(),
        second.partition.export_state().unwrap()
    );
}
