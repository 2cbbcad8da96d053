//! The `DeleteResource` command processor.
//!
//! Classifies the target key as a process definition or a decision
//! requirements graph, emits the deletion lifecycle events, and replicates
//! the command to peer partitions. The outer `ResourceDeletion` events
//! bracket every inner event, and the outer `DELETED` is appended before
//! distribution or acknowledgement — that ordering is load-bearing for
//! replay determinism.

use operon_protocol::{
    codec, DecisionIntent, DecisionRequirementsIntent, Intent, ProcessIntent, Record,
    RejectionType, ResourceDeletionIntent, ResourceDeletionRecord,
};
use operon_state::{PersistedDecisionRequirements, PersistedProcess};
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::processors::{CommandProcessor, ProcessingContext, ProcessingError};

/// Processor bound to `ResourceDeletion:DELETE`.
pub struct ResourceDeletionProcessor;

/// What the resource key points at.
enum Classified {
    Process(Box<PersistedProcess>),
    Drg(Box<PersistedDecisionRequirements>),
    NotFound,
}

impl ResourceDeletionProcessor {
    fn classify(
        &self,
        ctx: &mut ProcessingContext<'_>,
        resource_key: i64,
    ) -> EngineResult<Classified> {
        if let Some(process) = ctx.state.processes.get_process_by_key(ctx.txn, resource_key)? {
            return Ok(Classified::Process(Box::new(process)));
        }
        if let Some(drg) = ctx.state.decisions.find_drg_by_key(ctx.txn, resource_key)? {
            return Ok(Classified::Drg(Box::new(drg)));
        }
        Ok(Classified::NotFound)
    }

    fn try_delete_resources(
        &self,
        ctx: &mut ProcessingContext<'_>,
        value: &ResourceDeletionRecord,
    ) -> EngineResult<()> {
        match self.classify(ctx, value.resource_key)? {
            Classified::Process(process) => self.delete_process(ctx, &process),
            Classified::Drg(drg) => self.delete_decision_requirements(ctx, &drg),
            Classified::NotFound => Err(EngineError::NoSuchResource(value.resource_key)),
        }
    }

    fn delete_process(
        &self,
        ctx: &mut ProcessingContext<'_>,
        process: &PersistedProcess,
    ) -> EngineResult<()> {
        // Checksum and resource are left out of the events to bound their
        // size.
        let record = process.to_deletion_record();
        let value = codec::encode(&record)?;

        let key = ctx.state.key_generator.next_key(ctx.txn)?;
        ctx.writers.state().append_follow_up_event(
            ctx.txn,
            ctx.state,
            key,
            Intent::Process(ProcessIntent::Deleting),
            value.clone(),
        )?;

        let has_running_instances = ctx
            .state
            .element_instances
            .has_active_process_instances(ctx.txn, process.key)?;
        if has_running_instances {
            return Err(EngineError::ActiveProcessInstances(process.key));
        }

        let key = ctx.state.key_generator.next_key(ctx.txn)?;
        ctx.writers.state().append_follow_up_event(
            ctx.txn,
            ctx.state,
            key,
            Intent::Process(ProcessIntent::Deleted),
            value,
        )?;
        Ok(())
    }

    fn delete_decision_requirements(
        &self,
        ctx: &mut ProcessingContext<'_>,
        drg: &PersistedDecisionRequirements,
    ) -> EngineResult<()> {
        // Child decisions go first, ascending by decision key; the graph
        // itself is deleted last.
        let decisions = ctx
            .state
            .decisions
            .find_decisions_by_drg_key(ctx.txn, drg.drg_key)?;
        for decision in decisions {
            let value = codec::encode(&decision.to_record())?;
            let key = ctx.state.key_generator.next_key(ctx.txn)?;
            ctx.writers.state().append_follow_up_event(
                ctx.txn,
                ctx.state,
                key,
                Intent::Decision(DecisionIntent::Deleted),
                value,
            )?;
        }

        let value = codec::encode(&drg.to_record())?;
        let key = ctx.state.key_generator.next_key(ctx.txn)?;
        ctx.writers.state().append_follow_up_event(
            ctx.txn,
            ctx.state,
            key,
            Intent::DecisionRequirements(DecisionRequirementsIntent::Deleted),
            value,
        )?;
        Ok(())
    }
}

impl CommandProcessor for ResourceDeletionProcessor {
    fn process_new_command(
        &self,
        ctx: &mut ProcessingContext<'_>,
        command: &Record,
    ) -> EngineResult<()> {
        let value: ResourceDeletionRecord = codec::decode(&command.value)?;
        debug!(resource_key = value.resource_key, "deleting resource");

        let event_key = ctx.state.key_generator.next_key(ctx.txn)?;
        ctx.writers.state().append_follow_up_event(
            ctx.txn,
            ctx.state,
            event_key,
            Intent::ResourceDeletion(ResourceDeletionIntent::Deleting),
            command.value.clone(),
        )?;

        self.try_delete_resources(ctx, &value)?;

        ctx.writers.state().append_follow_up_event(
            ctx.txn,
            ctx.state,
            event_key,
            Intent::ResourceDeletion(ResourceDeletionIntent::Deleted),
            command.value.clone(),
        )?;
        ctx.distribution
            .distribute_command(ctx.txn, ctx.state, ctx.writers, event_key, command)?;
        ctx.writers.response().write_event_on_command(
            event_key,
            Intent::ResourceDeletion(ResourceDeletionIntent::Deleting),
            command.value.clone(),
        );
        Ok(())
    }

    fn process_distributed_command(
        &self,
        ctx: &mut ProcessingContext<'_>,
        command: &Record,
    ) -> EngineResult<()> {
        let value: ResourceDeletionRecord = codec::decode(&command.value)?;
        debug!(
            resource_key = value.resource_key,
            originator = command.partition_id,
            "deleting resource from distributed command"
        );

        // Reusing the originator's key keeps the event stream identical on
        // every partition.
        let event_key = command.key;
        ctx.writers.state().append_follow_up_event(
            ctx.txn,
            ctx.state,
            event_key,
            Intent::ResourceDeletion(ResourceDeletionIntent::Deleting),
            command.value.clone(),
        )?;

        self.try_delete_resources(ctx, &value)?;

        ctx.writers.state().append_follow_up_event(
            ctx.txn,
            ctx.state,
            event_key,
            Intent::ResourceDeletion(ResourceDeletionIntent::Deleted),
            command.value.clone(),
        )?;
        ctx.distribution
            .acknowledge_command(ctx.writers, event_key, command)?;
        Ok(())
    }

    fn try_handle_error(
        &self,
        ctx: &mut ProcessingContext<'_>,
        command: &Record,
        error: &EngineError,
    ) -> ProcessingError {
        let rejection_type = match error {
            EngineError::NoSuchResource(_) => RejectionType::NotFound,
            EngineError::ActiveProcessInstances(_) => RejectionType::InvalidState,
            _ => return ProcessingError::Unexpected,
        };

        let reason = error.to_string();
        ctx.writers
            .rejection()
            .append_rejection(command, rejection_type, &reason);
        if !command.distributed {
            ctx.writers
                .response()
                .write_rejection_on_command(command, rejection_type, &reason);
        }
        ProcessingError::Expected
    }
}
