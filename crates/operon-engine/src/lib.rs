//! operon-engine — the deterministic stream processor of a partition.
//!
//! A partition is a single-threaded actor: it consumes command records from
//! its replicated log strictly in order, mutates its embedded state store
//! through one transaction per command, and appends follow-up events that
//! are the authoritative source for replay. Cross-partition effects travel
//! as distributed commands and acknowledgement commands returned to the
//! caller as outbound records.
//!
//! The entry point is [`Partition`]: `process` for commands, `replay` for
//! rebuilding state from logged events, `pending_redelivery` for re-offering
//! unacknowledged distribution copies.

pub mod appliers;
pub mod config;
pub mod distribution;
pub mod error;
pub mod partition;
pub mod processors;
pub mod writers;

pub use config::PartitionConfig;
pub use distribution::{CommandDistribution, Topology};
pub use error::{EngineError, EngineResult};
pub use partition::{Partition, PartitionState, ProcessingResult};
pub use processors::{CommandProcessor, ProcessingContext, ProcessingError};
pub use writers::{CommandResponse, RecordBatch, Writers};
