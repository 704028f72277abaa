//! Resource lifecycle workflows: one workflow per resource kind, each
//! following the same shape — a single batched context read, a status
//! write to mark the transition starting, the node-agent/DNS/database work
//! itself, then a closing status write (or, for deletes, a hard delete of
//! the row once the node side is torn down).
//!
//! None of these run on a timer or a queue of their own; each is started as
//! a child workflow of a `TenantProvisionWorkflow` or a cron, keyed by the
//! resource's own id so retries and idempotent re-starts land on the same
//! run.

use serde::{Deserialize, Serialize};

use hosting_core::activities::{UpdateBackupResultInput, ZoneRecordContext};
use hosting_core::domain::{BackupKind, ResourceStatus, TenantEgressRule, ZoneRecordManagedBy};
use hosting_durable::persistence::node_task_queue;
use hosting_durable::{ActivityOptions, Completion, WfContext, Workflow, WorkflowError};

use crate::activities::core_store::{
    DeleteResource, DeleteResourceInput, GetBackupContext, GetDaemonContext, GetDatabaseUserContext,
    GetEgressContext, GetZoneRecordContext, UpdateBackupResult,
};
use crate::activities::dns_backend::{
    DeleteDNSRecord, DeleteDnsRecordInput, GetDNSZoneIDByName, WriteDNSRecord, WriteDnsRecordInput,
    ZoneNameInput,
};
use crate::activities::node_agent::{
    CreateDaemonConfig, CreateMysqlBackup, CreateWebBackup, DaemonConfigInput, DaemonRefInput,
    DeleteDaemonConfig, DisableDaemon, EnableDaemon, MysqlBackupInput, RestoreMysqlBackup,
    RestoreWebBackup, SyncDatabaseUserHosts, SyncDatabaseUserHostsInput, SyncEgressRules,
    SyncEgressRulesInput, WebBackupInput,
};

use super::common::{fan_out, lifecycle_retry, write_status};

fn to_wf_err(e: impl std::fmt::Display) -> WorkflowError {
    WorkflowError::new(e.to_string())
}

// ---------------------------------------------------------------------
// Daemon
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonIdInput {
    pub daemon_id: String,
}

pub struct DaemonCreateWorkflow;

#[async_trait::async_trait(?Send)]
impl Workflow for DaemonCreateWorkflow {
    const TYPE: &'static str = "daemon_create";
    type Input = DaemonIdInput;
    type Output = ();

    async fn run(ctx: WfContext, input: Self::Input) -> Result<Completion<Self::Output>, WorkflowError> {
        let context = ctx
            .execute_activity::<GetDaemonContext>(
                crate::activities::core_store::IdInput { id: input.daemon_id.clone() },
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;

        write_status(&ctx, "daemons", &input.daemon_id, ResourceStatus::Provisioning, None).await?;

        let queue = node_task_queue(&context.node.id);
        let outcome: Result<(), WorkflowError> = async {
            ctx.execute_activity::<CreateDaemonConfig>(
                DaemonConfigInput { node_id: context.node.id.clone(), daemon: context.daemon.clone() },
                ActivityOptions::default()
                    .with_retry(lifecycle_retry())
                    .with_task_queue(queue.clone()),
            )
            .await
            .map_err(to_wf_err)?;

            ctx.execute_activity::<EnableDaemon>(
                DaemonRefInput { node_id: context.node.id.clone(), daemon_id: input.daemon_id.clone() },
                ActivityOptions::default().with_retry(lifecycle_retry()).with_task_queue(queue),
            )
            .await
            .map_err(to_wf_err)
        }
        .await;

        match outcome {
            Ok(()) => {
                write_status(&ctx, "daemons", &input.daemon_id, ResourceStatus::Active, None).await?;
                Ok(Completion::Complete(()))
            }
            Err(e) => {
                write_status(
                    &ctx,
                    "daemons",
                    &input.daemon_id,
                    ResourceStatus::Failed,
                    Some(e.message.clone()),
                )
                .await?;
                Err(e)
            }
        }
    }
}

pub struct DaemonDeleteWorkflow;

#[async_trait::async_trait(?Send)]
impl Workflow for DaemonDeleteWorkflow {
    const TYPE: &'static str = "daemon_delete";
    type Input = DaemonIdInput;
    type Output = ();

    async fn run(ctx: WfContext, input: Self::Input) -> Result<Completion<Self::Output>, WorkflowError> {
        let context = ctx
            .execute_activity::<GetDaemonContext>(
                crate::activities::core_store::IdInput { id: input.daemon_id.clone() },
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;

        write_status(&ctx, "daemons", &input.daemon_id, ResourceStatus::Deleting, None).await?;

        let queue = node_task_queue(&context.node.id);
        ctx.execute_activity::<DisableDaemon>(
            DaemonRefInput { node_id: context.node.id.clone(), daemon_id: input.daemon_id.clone() },
            ActivityOptions::default().with_retry(lifecycle_retry()).with_task_queue(queue.clone()),
        )
        .await
        .map_err(to_wf_err)?;

        ctx.execute_activity::<DeleteDaemonConfig>(
            DaemonRefInput { node_id: context.node.id.clone(), daemon_id: input.daemon_id.clone() },
            ActivityOptions::default().with_retry(lifecycle_retry()).with_task_queue(queue),
        )
        .await
        .map_err(to_wf_err)?;

        ctx.execute_activity::<DeleteResource>(
            DeleteResourceInput { table: "daemons".to_string(), id: input.daemon_id },
            ActivityOptions::default().with_retry(lifecycle_retry()),
        )
        .await
        .map_err(to_wf_err)?;

        Ok(Completion::Complete(()))
    }
}

// ---------------------------------------------------------------------
// Backup
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupIdInput {
    pub backup_id: String,
}

pub struct BackupCreateWorkflow;

#[async_trait::async_trait(?Send)]
impl Workflow for BackupCreateWorkflow {
    const TYPE: &'static str = "backup_create";
    type Input = BackupIdInput;
    type Output = ();

    async fn run(ctx: WfContext, input: Self::Input) -> Result<Completion<Self::Output>, WorkflowError> {
        let context = ctx
            .execute_activity::<GetBackupContext>(
                crate::activities::core_store::IdInput { id: input.backup_id.clone() },
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;

        write_status(&ctx, "backups", &input.backup_id, ResourceStatus::Provisioning, None).await?;

        let started_at = ctx.now();
        let storage_path = hosting_core::domain::Backup::storage_path_for(
            &context.tenant.meta.id,
            &input.backup_id,
            context.backup.kind,
        );
        let queue = node_task_queue(&context.node.id);

        let size_bytes = match context.backup.kind {
            BackupKind::Database => {
                let database = context.database.clone().ok_or_else(|| {
                    WorkflowError::new("backup context missing database for a database backup")
                })?;
                ctx.execute_activity::<CreateMysqlBackup>(
                    MysqlBackupInput {
                        node_id: context.node.id.clone(),
                        database,
                        storage_path: storage_path.clone(),
                    },
                    ActivityOptions::default()
                        .with_retry(lifecycle_retry())
                        .with_task_queue(queue),
                )
                .await
                .map_err(to_wf_err)
            }
            BackupKind::Web => {
                let webroot = context.webroot.clone().ok_or_else(|| {
                    WorkflowError::new("backup context missing webroot for a web backup")
                })?;
                ctx.execute_activity::<CreateWebBackup>(
                    WebBackupInput {
                        node_id: context.node.id.clone(),
                        webroot,
                        storage_path: storage_path.clone(),
                    },
                    ActivityOptions::default()
                        .with_retry(lifecycle_retry())
                        .with_task_queue(queue),
                )
                .await
                .map_err(to_wf_err)
            }
        };

        let size_bytes = match size_bytes {
            Ok(size) => size,
            Err(e) => {
                write_status(
                    &ctx,
                    "backups",
                    &input.backup_id,
                    ResourceStatus::Failed,
                    Some(e.message.clone()),
                )
                .await?;
                return Err(e);
            }
        };

        ctx.execute_activity::<UpdateBackupResult>(
            UpdateBackupResultInput {
                backup_id: input.backup_id.clone(),
                storage_path,
                size_bytes,
                started_at,
                completed_at: ctx.now(),
            },
            ActivityOptions::default().with_retry(lifecycle_retry()),
        )
        .await
        .map_err(to_wf_err)?;

        write_status(&ctx, "backups", &input.backup_id, ResourceStatus::Active, None).await?;
        Ok(Completion::Complete(()))
    }
}

pub struct BackupRestoreWorkflow;

#[async_trait::async_trait(?Send)]
impl Workflow for BackupRestoreWorkflow {
    const TYPE: &'static str = "backup_restore";
    type Input = BackupIdInput;
    type Output = ();

    async fn run(ctx: WfContext, input: Self::Input) -> Result<Completion<Self::Output>, WorkflowError> {
        let context = ctx
            .execute_activity::<GetBackupContext>(
                crate::activities::core_store::IdInput { id: input.backup_id.clone() },
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;

        let storage_path = context.backup.storage_path.clone().ok_or_else(|| {
            WorkflowError::new(format!("backup {} has no storage_path to restore from", input.backup_id))
        })?;

        write_status(&ctx, "backups", &input.backup_id, ResourceStatus::Provisioning, None).await?;
        let queue = node_task_queue(&context.node.id);

        let result = match context.backup.kind {
            BackupKind::Database => {
                let database = context
                    .database
                    .clone()
                    .ok_or_else(|| WorkflowError::new("backup context missing database to restore into"))?;
                ctx.execute_activity::<RestoreMysqlBackup>(
                    MysqlBackupInput { node_id: context.node.id.clone(), database, storage_path },
                    ActivityOptions::default().with_retry(lifecycle_retry()).with_task_queue(queue),
                )
                .await
                .map_err(to_wf_err)
            }
            BackupKind::Web => {
                let webroot = context
                    .webroot
                    .clone()
                    .ok_or_else(|| WorkflowError::new("backup context missing webroot to restore into"))?;
                ctx.execute_activity::<RestoreWebBackup>(
                    WebBackupInput { node_id: context.node.id.clone(), webroot, storage_path },
                    ActivityOptions::default().with_retry(lifecycle_retry()).with_task_queue(queue),
                )
                .await
                .map_err(to_wf_err)
            }
        };

        match result {
            Ok(()) => {
                write_status(&ctx, "backups", &input.backup_id, ResourceStatus::Active, None).await?;
                Ok(Completion::Complete(()))
            }
            Err(e) => {
                write_status(
                    &ctx,
                    "backups",
                    &input.backup_id,
                    ResourceStatus::Failed,
                    Some(e.message.clone()),
                )
                .await?;
                Err(e)
            }
        }
    }
}

// ---------------------------------------------------------------------
// DNS zone record
// ---------------------------------------------------------------------
//
// A hostname's record set can carry both an `Auto` record (written by a
// resource workflow, e.g. a webroot's default A record) and a `Custom` one
// a tenant added by hand; custom always wins. `zone_record_active` decides
// whether an auto record should actually be written given its siblings.

fn zone_record_active(context: &ZoneRecordContext) -> bool {
    if context.record.managed_by == ZoneRecordManagedBy::Custom {
        return true;
    }
    !context
        .siblings
        .iter()
        .any(|s| s.managed_by == ZoneRecordManagedBy::Custom && s.record_type == context.record.record_type)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneRecordIdInput {
    pub record_id: String,
}

pub struct ZoneRecordCreateWorkflow;

#[async_trait::async_trait(?Send)]
impl Workflow for ZoneRecordCreateWorkflow {
    const TYPE: &'static str = "zone_record_create";
    type Input = ZoneRecordIdInput;
    type Output = ();

    async fn run(ctx: WfContext, input: Self::Input) -> Result<Completion<Self::Output>, WorkflowError> {
        let context = ctx
            .execute_activity::<GetZoneRecordContext>(
                crate::activities::core_store::IdInput { id: input.record_id.clone() },
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;

        write_status(&ctx, "zone_records", &input.record_id, ResourceStatus::Provisioning, None).await?;

        if !zone_record_active(&context) {
            write_status(
                &ctx,
                "zone_records",
                &input.record_id,
                ResourceStatus::Active,
                Some("superseded by a custom record with the same name and type".to_string()),
            )
            .await?;
            return Ok(Completion::Complete(()));
        }

        let backend_zone_id = ctx
            .execute_activity::<GetDNSZoneIDByName>(
                ZoneNameInput { zone_name: context.zone.name.clone() },
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;

        if backend_zone_id == 0 {
            let err = WorkflowError::new(format!("zone {} has no backend zone id", context.zone.name));
            write_status(
                &ctx,
                "zone_records",
                &input.record_id,
                ResourceStatus::Failed,
                Some(err.message.clone()),
            )
            .await?;
            return Err(err);
        }

        ctx.execute_activity::<WriteDNSRecord>(
            WriteDnsRecordInput { backend_zone_id, record: context.record.clone() },
            ActivityOptions::default().with_retry(lifecycle_retry()),
        )
        .await
        .map_err(to_wf_err)?;

        write_status(&ctx, "zone_records", &input.record_id, ResourceStatus::Active, None).await?;
        Ok(Completion::Complete(()))
    }
}

pub struct ZoneRecordDeleteWorkflow;

#[async_trait::async_trait(?Send)]
impl Workflow for ZoneRecordDeleteWorkflow {
    const TYPE: &'static str = "zone_record_delete";
    type Input = ZoneRecordIdInput;
    type Output = ();

    async fn run(ctx: WfContext, input: Self::Input) -> Result<Completion<Self::Output>, WorkflowError> {
        let context = ctx
            .execute_activity::<GetZoneRecordContext>(
                crate::activities::core_store::IdInput { id: input.record_id.clone() },
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;

        write_status(&ctx, "zone_records", &input.record_id, ResourceStatus::Deleting, None).await?;

        let backend_zone_id = ctx
            .execute_activity::<GetDNSZoneIDByName>(
                ZoneNameInput { zone_name: context.zone.name.clone() },
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;

        if backend_zone_id != 0 {
            ctx.execute_activity::<DeleteDNSRecord>(
                DeleteDnsRecordInput { backend_zone_id, record_id: context.record.meta.id.clone() },
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;
        }

        ctx.execute_activity::<DeleteResource>(
            DeleteResourceInput { table: "zone_records".to_string(), id: input.record_id },
            ActivityOptions::default().with_retry(lifecycle_retry()),
        )
        .await
        .map_err(to_wf_err)?;

        Ok(Completion::Complete(()))
    }
}

// ---------------------------------------------------------------------
// Egress rule sync
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantIdInput {
    pub tenant_id: String,
}

pub struct EgressRulesSyncWorkflow;

#[async_trait::async_trait(?Send)]
impl Workflow for EgressRulesSyncWorkflow {
    const TYPE: &'static str = "egress_rules_sync";
    type Input = TenantIdInput;
    type Output = ();

    async fn run(ctx: WfContext, input: Self::Input) -> Result<Completion<Self::Output>, WorkflowError> {
        let context = ctx
            .execute_activity::<GetEgressContext>(
                crate::activities::core_store::IdInput { id: input.tenant_id.clone() },
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;

        for rule in context.rules.iter().filter(|r| matches!(r.meta.status, ResourceStatus::Pending | ResourceStatus::Deleting)) {
            write_status(&ctx, "egress_rules", &rule.meta.id, ResourceStatus::Provisioning, None).await?;
        }

        let active_rules: Vec<TenantEgressRule> = context
            .rules
            .iter()
            .filter(|r| r.meta.status != ResourceStatus::Deleting)
            .cloned()
            .collect();

        let tenant_id = input.tenant_id.clone();
        let rules = active_rules;
        let results = fan_out(&ctx, context.shard_nodes.clone(), move |ctx, node| {
            let tenant_id = tenant_id.clone();
            let rules = rules.clone();
            async move {
                let queue = node_task_queue(&node.id);
                ctx.execute_activity::<SyncEgressRules>(
                    SyncEgressRulesInput { node_id: node.id, tenant_id, rules },
                    ActivityOptions::default().with_retry(lifecycle_retry()).with_task_queue(queue),
                )
                .await
                .map_err(to_wf_err)
            }
        })
        .await;

        first_error(results)?;

        for rule in &context.rules {
            if rule.meta.status == ResourceStatus::Deleting {
                ctx.execute_activity::<DeleteResource>(
                    DeleteResourceInput { table: "egress_rules".to_string(), id: rule.meta.id.clone() },
                    ActivityOptions::default().with_retry(lifecycle_retry()),
                )
                .await
                .map_err(to_wf_err)?;
            } else {
                write_status(&ctx, "egress_rules", &rule.meta.id, ResourceStatus::Active, None).await?;
            }
        }

        Ok(Completion::Complete(()))
    }
}

// ---------------------------------------------------------------------
// Database user sync
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseUserIdInput {
    pub user_id: String,
}

pub struct DatabaseUserSyncWorkflow;

#[async_trait::async_trait(?Send)]
impl Workflow for DatabaseUserSyncWorkflow {
    const TYPE: &'static str = "database_user_sync";
    type Input = DatabaseUserIdInput;
    type Output = ();

    async fn run(ctx: WfContext, input: Self::Input) -> Result<Completion<Self::Output>, WorkflowError> {
        let context = ctx
            .execute_activity::<GetDatabaseUserContext>(
                crate::activities::core_store::IdInput { id: input.user_id.clone() },
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;

        let active_sources: Vec<String> = context
            .rules
            .iter()
            .map(|rule| rule.source.clone())
            .collect();
        let mut user = context.user.clone();
        user.host_pattern = hosting_core::domain::rebuild_host_pattern(&active_sources);

        let user = user;
        let results = fan_out(&ctx, context.shard_nodes.clone(), move |ctx, node| {
            let user = user.clone();
            async move {
                let queue = node_task_queue(&node.id);
                ctx.execute_activity::<SyncDatabaseUserHosts>(
                    SyncDatabaseUserHostsInput { node_id: node.id, user },
                    ActivityOptions::default().with_retry(lifecycle_retry()).with_task_queue(queue),
                )
                .await
                .map_err(to_wf_err)
            }
        })
        .await;

        first_error(results)?;
        Ok(Completion::Complete(()))
    }
}

// ---------------------------------------------------------------------
// Node provisioning
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeProvisionInput {
    pub node_id: String,
    pub shard_id: String,
    pub image: String,
}

pub struct NodeProvisionWorkflow;

#[async_trait::async_trait(?Send)]
impl Workflow for NodeProvisionWorkflow {
    const TYPE: &'static str = "node_provision";
    type Input = NodeProvisionInput;
    type Output = ();

    async fn run(ctx: WfContext, input: Self::Input) -> Result<Completion<Self::Output>, WorkflowError> {
        use crate::activities::external::{
            ContainerRefInput, CreateContainer, CreateContainerInput, PullImage, PullImageInput,
            SelectHostForNode, SelectHostInput, WaitForHealthy,
        };
        use crate::activities::core_store::{GrpcAddressInput, UpdateNodeGrpcAddress};

        let host = ctx
            .execute_activity::<SelectHostForNode>(
                SelectHostInput { shard_id: input.shard_id.clone() },
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;

        ctx.execute_activity::<PullImage>(
            PullImageInput { host: host.hostname.clone(), image: input.image.clone() },
            ActivityOptions::default().with_retry(lifecycle_retry()),
        )
        .await
        .map_err(to_wf_err)?;

        let container_id = ctx
            .execute_activity::<CreateContainer>(
                CreateContainerInput {
                    host: host.hostname.clone(),
                    node_id: input.node_id.clone(),
                    image: input.image.clone(),
                },
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;

        ctx.execute_activity::<WaitForHealthy>(
            ContainerRefInput { host: host.hostname.clone(), container_id },
            ActivityOptions::default().with_retry(lifecycle_retry()),
        )
        .await
        .map_err(to_wf_err)?;

        ctx.execute_activity::<UpdateNodeGrpcAddress>(
            GrpcAddressInput { node_id: input.node_id.clone(), grpc_address: host.hostname },
            ActivityOptions::default().with_retry(lifecycle_retry()),
        )
        .await
        .map_err(to_wf_err)?;

        ctx.execute_child_workflow_dyn(
            "converge_shard",
            format!("converge-shard-{}", input.shard_id),
            serde_json::json!({ "shard_id": input.shard_id }),
        )
        .await
        .map_err(to_wf_err)?;

        Ok(Completion::Complete(()))
    }
}

fn first_error(results: Vec<Result<(), WorkflowError>>) -> Result<(), WorkflowError> {
    results.into_iter().find(|r| r.is_err()).unwrap_or(Ok(()))
}
