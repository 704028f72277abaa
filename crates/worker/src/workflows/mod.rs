//! Workflow definitions: the tenant orchestrator, resource lifecycle
//! workflows, shard convergence, and incident handling.
//!
//! Every workflow here is plain coroutine code written against `WfContext`;
//! none of it talks to a store or a queue directly. Registration with a
//! concrete `WorkflowExecutor` happens once, in `main`, via [`register_all`].

mod common;
mod converge;
mod incident;
mod resource;
mod tenant_provision;

pub use common::{fan_out, lifecycle_retry, no_retry, write_status};
pub use converge::ConvergeShardWorkflow;
pub use incident::{InvestigateIncidentWorkflow, ProcessIncidentQueueWorkflow};
pub use resource::{
    BackupCreateWorkflow, BackupRestoreWorkflow, DaemonCreateWorkflow, DaemonDeleteWorkflow,
    DatabaseUserSyncWorkflow, EgressRulesSyncWorkflow, NodeProvisionWorkflow,
    ZoneRecordCreateWorkflow, ZoneRecordDeleteWorkflow,
};
pub use tenant_provision::TenantProvisionWorkflow;

use hosting_durable::persistence::WorkflowEventStore;
use hosting_durable::WorkflowExecutor;

/// Register every workflow type this worker knows how to run. Split out of
/// `main` so tests can build an executor with the exact same registry.
pub fn register_all<S: WorkflowEventStore>(executor: &mut WorkflowExecutor<S>) {
    executor.register::<TenantProvisionWorkflow>();
    executor.register::<DaemonCreateWorkflow>();
    executor.register::<DaemonDeleteWorkflow>();
    executor.register::<BackupCreateWorkflow>();
    executor.register::<BackupRestoreWorkflow>();
    executor.register::<ZoneRecordCreateWorkflow>();
    executor.register::<ZoneRecordDeleteWorkflow>();
    executor.register::<EgressRulesSyncWorkflow>();
    executor.register::<DatabaseUserSyncWorkflow>();
    executor.register::<NodeProvisionWorkflow>();
    executor.register::<ConvergeShardWorkflow>();
    executor.register::<ProcessIncidentQueueWorkflow>();
    executor.register::<InvestigateIncidentWorkflow>();
}
