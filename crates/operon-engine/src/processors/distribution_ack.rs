//! The acknowledgement processor.
//!
//! Peers report an applied distributed command with a
//! `CommandDistribution:ACKNOWLEDGE` command addressed to the originating
//! partition. The processor appends the `ACKNOWLEDGED` follow-up event,
//! whose applier drops the pending-ack row. A re-delivered acknowledgement
//! finds no row and changes nothing, which is what makes retries safe.

use operon_protocol::{
    codec, CommandDistributionIntent, CommandDistributionRecord, Intent, Record,
};
use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::processors::{CommandProcessor, ProcessingContext, ProcessingError};

/// Processor bound to `CommandDistribution:ACKNOWLEDGE`.
pub struct DistributionAckProcessor;

impl CommandProcessor for DistributionAckProcessor {
    fn process_new_command(
        &self,
        ctx: &mut ProcessingContext<'_>,
        command: &Record,
    ) -> EngineResult<()> {
        let ack: CommandDistributionRecord = codec::decode(&command.value)?;
        ctx.writers.state().append_follow_up_event(
            ctx.txn,
            ctx.state,
            command.key,
            Intent::CommandDistribution(CommandDistributionIntent::Acknowledged),
            command.value.clone(),
        )?;
        info!(
            command_key = command.key,
            peer = ack.partition_id,
            "distributed command acknowledged"
        );
        Ok(())
    }

    fn process_distributed_command(
        &self,
        ctx: &mut ProcessingContext<'_>,
        command: &Record,
    ) -> EngineResult<()> {
        // Acknowledgements are always addressed directly to the originator.
        self.process_new_command(ctx, command)
    }

    fn try_handle_error(
        &self,
        _ctx: &mut ProcessingContext<'_>,
        _command: &Record,
        _error: &EngineError,
    ) -> ProcessingError {
        ProcessingError::Unexpected
    }
}
