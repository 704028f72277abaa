//! Retention sweeps: audit log pruning and expired backup cleanup
//!
//! Both run once a day against a retention window carried in [`CronConfig`]
//! rather than hardcoded, since retention periods are a deployment-level
//! policy decision, not a constant of the system. Backup deletion fans out
//! to one child workflow per backup so a slow or failing node agent on one
//! backup doesn't hold up the rest of the sweep.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use hosting_core::domain::Backup;
use hosting_durable::{ActivityOptions, Completion, WfContext, Workflow, WorkflowError};

use crate::activities::core_store::{
    DeleteAuditLogsOlderThan, DeleteResource, DeleteResourceInput, FindBackupsPastRetention, StaleSince,
};
use crate::activities::node_agent::{DeleteBackupFile, DeleteBackupFileInput};
use crate::workflows::{fan_out, lifecycle_retry};

use super::common::CronConfig;

const SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

fn to_wf_err(e: impl std::fmt::Display) -> WorkflowError {
    WorkflowError::new(e.to_string())
}

pub struct AuditLogRetentionCronWorkflow;

#[async_trait::async_trait(?Send)]
impl Workflow for AuditLogRetentionCronWorkflow {
    const TYPE: &'static str = "audit_log_retention_cron";
    type Input = CronConfig;
    type Output = CronConfig;

    async fn run(ctx: WfContext, input: Self::Input) -> Result<Completion<Self::Output>, WorkflowError> {
        let before = ctx.now() - chrono::Duration::days(input.audit_log_retention_days);

        let deleted = ctx
            .execute_activity::<DeleteAuditLogsOlderThan>(
                StaleSince { before },
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;

        tracing::info!(deleted, "pruned audit log rows past retention");

        ctx.new_timer(SWEEP_INTERVAL).await;
        ctx.request_continue_as_new(&input);
        let next = serde_json::to_value(&input).map_err(to_wf_err)?;
        Ok(Completion::ContinueAsNew(next))
    }
}

pub struct BackupRetentionCronWorkflow;

#[async_trait::async_trait(?Send)]
impl Workflow for BackupRetentionCronWorkflow {
    const TYPE: &'static str = "backup_retention_cron";
    type Input = CronConfig;
    type Output = CronConfig;

    async fn run(ctx: WfContext, input: Self::Input) -> Result<Completion<Self::Output>, WorkflowError> {
        let before = ctx.now() - chrono::Duration::days(input.backup_retention_days);

        let backups = ctx
            .execute_activity::<FindBackupsPastRetention>(
                StaleSince { before },
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;

        let results = fan_out(&ctx, backups, |ctx, backup| async move {
            let backup_id = backup.meta.id.clone();
            let input = serde_json::to_value(DeleteBackupInput { backup }).map_err(to_wf_err)?;
            ctx.execute_child_workflow_dyn(
                DeleteBackupWorkflow::TYPE,
                format!("delete-backup-{backup_id}"),
                input,
            )
            .await
            .map(|_| ())
        })
        .await;

        if let Some(Err(e)) = results.into_iter().find(|r| r.is_err()) {
            return Err(e);
        }

        ctx.new_timer(SWEEP_INTERVAL).await;
        ctx.request_continue_as_new(&input);
        let next = serde_json::to_value(&input).map_err(to_wf_err)?;
        Ok(Completion::ContinueAsNew(next))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteBackupInput {
    pub backup: Backup,
}

pub struct DeleteBackupWorkflow;

#[async_trait::async_trait(?Send)]
impl Workflow for DeleteBackupWorkflow {
    const TYPE: &'static str = "delete_backup";
    type Input = DeleteBackupInput;
    type Output = ();

    async fn run(ctx: WfContext, input: Self::Input) -> Result<Completion<Self::Output>, WorkflowError> {
        let backup = input.backup;

        if let Some(storage_path) = backup.storage_path.clone() {
            ctx.execute_activity::<DeleteBackupFile>(
                DeleteBackupFileInput { node_id: backup.node_id.clone(), storage_path },
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;
        }

        ctx.execute_activity::<DeleteResource>(
            DeleteResourceInput { table: "backups".to_string(), id: backup.meta.id.clone() },
            ActivityOptions::default().with_retry(lifecycle_retry()),
        )
        .await
        .map_err(to_wf_err)?;

        Ok(Completion::Complete(()))
    }
}
