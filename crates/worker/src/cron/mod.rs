//! Periodic maintenance workflows: certificate expiry, capacity and
//! replication health, node health, convergence watchdog, stale incident
//! escalation, and retention sweeps.
//!
//! Each is a single long-lived workflow, started once at deploy time under
//! a deterministic id and kept alive indefinitely by continue-as-new: do
//! one pass, sleep on a timer, continue as new with the same config. None of
//! them take external signals, so there's nothing gained from modeling them
//! as anything fancier than "wake up, check, go back to sleep".

mod capacity;
mod certs;
mod common;
mod health;
mod incidents;
mod retention;

pub use capacity::{DiskPressureCronWorkflow, ReplicationHealthCronWorkflow};
pub use certs::CertExpiryCronWorkflow;
pub use common::CronConfig;
pub use health::{ConvergenceStuckCronWorkflow, NodeHealthCronWorkflow};
pub use incidents::StaleIncidentEscalationCronWorkflow;
pub use retention::{AuditLogRetentionCronWorkflow, BackupRetentionCronWorkflow, DeleteBackupWorkflow};

use hosting_durable::persistence::{deterministic_workflow_id, StoreError, WorkflowEventStore};
use hosting_durable::{ExecutorError, Workflow, WorkflowExecutor};

/// Register every cron workflow type so the executor can replay and drive
/// them, same as any other workflow.
pub fn register_all<S: WorkflowEventStore>(executor: &mut WorkflowExecutor<S>) {
    executor.register::<CertExpiryCronWorkflow>();
    executor.register::<DiskPressureCronWorkflow>();
    executor.register::<ReplicationHealthCronWorkflow>();
    executor.register::<NodeHealthCronWorkflow>();
    executor.register::<ConvergenceStuckCronWorkflow>();
    executor.register::<StaleIncidentEscalationCronWorkflow>();
    executor.register::<AuditLogRetentionCronWorkflow>();
    executor.register::<BackupRetentionCronWorkflow>();
    executor.register::<DeleteBackupWorkflow>();
}

/// Start every cron workflow under a name-derived id if it isn't already
/// running. Safe to call on every process boot: a cron that's already
/// mid-chain from a previous deploy is left alone, and a brand new
/// deployment gets each cron started exactly once.
pub async fn ensure_all_started<S: WorkflowEventStore>(
    executor: &WorkflowExecutor<S>,
    config: CronConfig,
) -> Result<(), ExecutorError> {
    ensure_started::<S, CertExpiryCronWorkflow>(executor, &config).await?;
    ensure_started::<S, DiskPressureCronWorkflow>(executor, &config).await?;
    ensure_started::<S, ReplicationHealthCronWorkflow>(executor, &config).await?;
    ensure_started::<S, NodeHealthCronWorkflow>(executor, &config).await?;
    ensure_started::<S, ConvergenceStuckCronWorkflow>(executor, &config).await?;
    ensure_started::<S, StaleIncidentEscalationCronWorkflow>(executor, &config).await?;
    ensure_started::<S, AuditLogRetentionCronWorkflow>(executor, &config).await?;
    ensure_started::<S, BackupRetentionCronWorkflow>(executor, &config).await?;
    Ok(())
}

async fn ensure_started<S, W>(executor: &WorkflowExecutor<S>, config: &CronConfig) -> Result<(), ExecutorError>
where
    S: WorkflowEventStore,
    W: Workflow<Input = CronConfig>,
{
    let id = deterministic_workflow_id(&format!("cron:{}", W::TYPE));

    match executor.store().get_workflow_status(id).await {
        Ok(_) => {
            tracing::debug!(workflow_type = W::TYPE, %id, "cron already running, leaving it alone");
            Ok(())
        }
        Err(StoreError::WorkflowNotFound(_)) => {
            executor.start_workflow_with_id::<W>(id, config.clone(), None).await?;
            tracing::info!(workflow_type = W::TYPE, %id, "started cron workflow");
            Ok(())
        }
        Err(e) => Err(ExecutorError::Store(e)),
    }
}
