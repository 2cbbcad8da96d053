//! operon-state — the persisted state of a partition.
//!
//! Wraps [`operon_db`] columns into the domain stores the stream processor
//! consults and mutates: deployed decisions and decision requirements
//! graphs, deployed processes, the partition's key generator, the
//! active-instance counts backing the deletion guard, and the pending
//! cross-partition distribution table.
//!
//! Hot decision lookups are fronted by a bounded read-through cache
//! ([`cache::BoundedCache`]); see the module docs for its transactional
//! discipline.

pub mod cache;
pub mod decision_state;
pub mod distribution_state;
pub mod element_instances;
pub mod families;
pub mod key_generator;
pub mod process_state;
pub mod records;

pub use decision_state::DecisionState;
pub use distribution_state::DistributionState;
pub use element_instances::ElementInstanceState;
pub use key_generator::KeyGenerator;
pub use process_state::ProcessState;
pub use records::{
    PendingDistribution, PersistedDecision, PersistedDecisionRequirements, PersistedProcess,
    PersistedProcessState,
};

/// Default capacity of each read-through cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;
