//! Processor dispatch.
//!
//! Commands are routed to processors through a tagged-variant table: a
//! `match` over `(value type, intent)` selects the bound processor. Each
//! processor implements the small [`CommandProcessor`] capability set —
//! process a new command, process a distributed copy, and classify errors.

pub mod distribution_ack;
pub mod resource_deletion;

use operon_db::Transaction;
use operon_protocol::{
    CommandDistributionIntent, Intent, Record, ResourceDeletionIntent, ValueType,
};

use crate::distribution::CommandDistribution;
use crate::error::{EngineError, EngineResult};
use crate::partition::PartitionState;
use crate::writers::Writers;

pub use distribution_ack::DistributionAckProcessor;
pub use resource_deletion::ResourceDeletionProcessor;

/// Error classification returned by [`CommandProcessor::try_handle_error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingError {
    /// A known refusal: the rejection has been written and the command's
    /// batch (including events buffered before the failure) commits.
    Expected,
    /// Anything else: the transaction is aborted and the error surfaces.
    Unexpected,
}

/// Everything a processor touches while handling one command. All fields
/// live exactly as long as the command's transaction.
pub struct ProcessingContext<'a> {
    pub txn: &'a Transaction,
    pub state: &'a mut PartitionState,
    pub writers: &'a mut Writers,
    pub distribution: &'a CommandDistribution,
}

/// Capability set of a command processor.
pub trait CommandProcessor {
    /// Handle a command received from a client on this partition.
    fn process_new_command(
        &self,
        ctx: &mut ProcessingContext<'_>,
        command: &Record,
    ) -> EngineResult<()>;

    /// Handle a copy of a command replicated from another partition.
    fn process_distributed_command(
        &self,
        ctx: &mut ProcessingContext<'_>,
        command: &Record,
    ) -> EngineResult<()>;

    /// Classify an error raised by either processing path, writing the
    /// rejection and response for expected refusals.
    fn try_handle_error(
        &self,
        ctx: &mut ProcessingContext<'_>,
        command: &Record,
        error: &EngineError,
    ) -> ProcessingError;
}

/// The routing table of bound processors.
pub(crate) enum BoundProcessor {
    ResourceDeletion(ResourceDeletionProcessor),
    DistributionAck(DistributionAckProcessor),
}

impl BoundProcessor {
    pub(crate) fn process_new_command(
        &self,
        ctx: &mut ProcessingContext<'_>,
        command: &Record,
    ) -> EngineResult<()> {
        match self {
            BoundProcessor::ResourceDeletion(p) => p.process_new_command(ctx, command),
            BoundProcessor::DistributionAck(p) => p.process_new_command(ctx, command),
        }
    }

    pub(crate) fn process_distributed_command(
        &self,
        ctx: &mut ProcessingContext<'_>,
        command: &Record,
    ) -> EngineResult<()> {
        match self {
            BoundProcessor::ResourceDeletion(p) => p.process_distributed_command(ctx, command),
            BoundProcessor::DistributionAck(p) => p.process_distributed_command(ctx, command),
        }
    }

    pub(crate) fn try_handle_error(
        &self,
        ctx: &mut ProcessingContext<'_>,
        command: &Record,
        error: &EngineError,
    ) -> ProcessingError {
        match self {
            BoundProcessor::ResourceDeletion(p) => p.try_handle_error(ctx, command, error),
            BoundProcessor::DistributionAck(p) => p.try_handle_error(ctx, command, error),
        }
    }
}

/// Look up the processor bound to a command's `(value type, intent)` pair.
pub(crate) fn bound_processor(value_type: ValueType, intent: Intent) -> Option<BoundProcessor> {
    match (value_type, intent) {
        (
            ValueType::ResourceDeletion,
            Intent::ResourceDeletion(ResourceDeletionIntent::Delete),
        ) => Some(BoundProcessor::ResourceDeletion(ResourceDeletionProcessor)),
        (
            ValueType::CommandDistribution,
            Intent::CommandDistribution(CommandDistributionIntent::Acknowledge),
        ) => Some(BoundProcessor::DistributionAck(DistributionAckProcessor)),
        _ => None,
    }
}
