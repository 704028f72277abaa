//! Shard convergence
//!
//! One workflow per shard, started by a node-health cron whenever a shard's
//! actual state might have drifted from desired state (a node rejoined, a
//! new node was provisioned, a resource's create workflow finished). Every
//! shard role gets its own reconciliation pass against the nodes it runs
//! on; a shard with no nodes yet has nothing to converge against and fails
//! immediately rather than being marked active on an empty set.

use serde::{Deserialize, Serialize};

use hosting_core::activities::{ConfigureReplicationInput, ShardDesiredState, ValkeyShardContext};
use hosting_core::domain::{Database, Node, ResourceStatus, Shard, ShardRole};
use hosting_durable::persistence::node_task_queue;
use hosting_durable::{ActivityOptions, Completion, WfContext, Workflow, WorkflowError};

use crate::activities::core_store::{
    FqdnTarget, GetDatabaseShardContext, GetShardByID, GetShardDesiredState, GetValkeyShardContext,
    IdInput, ListActiveFqdnTargets, ListNodesByShard,
};
use crate::activities::node_agent::{
    CleanOrphanedConfigs, CleanOrphanedConfigsInput, CleanOrphanedFpmPools, CleanOrphanedFpmPoolsInput,
    ConfigureReplication, ConfigureReplicationWireInput, ConfigureTenantAddresses,
    ConfigureTenantAddressesInput, CreateCronJobUnits, CreateDaemonConfig, CreateDatabase,
    CreateDatabaseInput, CreateDatabaseUser, CreateDatabaseUserInput, CreateValkeyInstance,
    CreateValkeyInstanceInput, CreateValkeyUser, CreateValkeyUserInput, CreateWebroot, CronJobUnitsInput,
    DaemonConfigInput, DatabaseRefInput, GetReplicationStatus, NodeRefInput, ReloadNginx, ReloadPhpFpm,
    SetLbMapEntry, SetLbMapEntryInput, SetReadOnly, SetReadOnlyInput, SyncSshConfig, SyncSshConfigInput,
    WebrootInput,
};

use super::common::{fan_out, lifecycle_retry, truncate_joined_message, write_status};

const MAX_STATUS_MESSAGE_LEN: usize = 4000;
const REPLICATION_USER: &str = "replicator";
const REPLICATION_PORT: u16 = 3306;

fn to_wf_err(e: impl std::fmt::Display) -> WorkflowError {
    WorkflowError::new(e.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergeShardInput {
    pub shard_id: String,
}

pub struct ConvergeShardWorkflow;

#[async_trait::async_trait(?Send)]
impl Workflow for ConvergeShardWorkflow {
    const TYPE: &'static str = "converge_shard";
    type Input = ConvergeShardInput;
    type Output = ();

    async fn run(ctx: WfContext, input: Self::Input) -> Result<Completion<Self::Output>, WorkflowError> {
        let shard = ctx
            .execute_activity::<GetShardByID>(
                IdInput { id: input.shard_id.clone() },
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;

        write_status(&ctx, "shards", &input.shard_id, ResourceStatus::Converging, None).await?;

        let nodes = ctx
            .execute_activity::<ListNodesByShard>(
                IdInput { id: input.shard_id.clone() },
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;

        if nodes.is_empty() {
            let message = "shard has no nodes".to_string();
            write_status(
                &ctx,
                "shards",
                &input.shard_id,
                ResourceStatus::Failed,
                Some(message.clone()),
            )
            .await?;
            return Err(WorkflowError::new(message));
        }

        let errors = match shard.role {
            ShardRole::Web => converge_web_shard(&ctx, &input.shard_id, nodes).await,
            ShardRole::Database => converge_database_shard(&ctx, &input.shard_id, nodes).await,
            ShardRole::Valkey => converge_valkey_shard(&ctx, &input.shard_id, nodes).await,
            ShardRole::Lb => converge_lb_shard(&ctx, &shard, nodes).await,
            ShardRole::Dns | ShardRole::Email | ShardRole::Storage | ShardRole::Dbadmin => Vec::new(),
        };

        if errors.is_empty() {
            write_status(&ctx, "shards", &input.shard_id, ResourceStatus::Active, None).await?;
            Ok(Completion::Complete(()))
        } else {
            let message = truncate_joined_message(&errors, MAX_STATUS_MESSAGE_LEN);
            write_status(
                &ctx,
                "shards",
                &input.shard_id,
                ResourceStatus::Failed,
                Some(message.clone()),
            )
            .await?;
            Err(WorkflowError::new(message))
        }
    }
}

fn errors_from(results: Vec<Result<(), WorkflowError>>) -> Vec<String> {
    results.into_iter().filter_map(|r| r.err().map(|e| e.message)).collect()
}

async fn converge_web_shard(ctx: &WfContext, shard_id: &str, nodes: Vec<Node>) -> Vec<String> {
    let desired = match ctx
        .execute_activity::<GetShardDesiredState>(
            IdInput { id: shard_id.to_string() },
            ActivityOptions::default().with_retry(lifecycle_retry()),
        )
        .await
    {
        Ok(desired) => desired,
        Err(e) => return vec![e.message],
    };

    let results = fan_out(ctx, nodes, move |ctx, node| {
        let desired = desired.clone();
        async move { reconcile_node(&ctx, node, &desired).await }
    })
    .await;

    errors_from(results)
}

/// Push every tenant, webroot, daemon and cron job this shard's desired
/// state names onto one node, then sweep anything on the node that isn't
/// in that set. Node-agent create/update calls are idempotent upserts, so
/// a convergence pass can always re-push the full desired set rather than
/// diffing against what the node last reported.
async fn reconcile_node(
    ctx: &WfContext,
    node: Node,
    desired: &ShardDesiredState,
) -> Result<(), WorkflowError> {
    let queue = node_task_queue(&node.id);
    let mut live_webroot_ids = Vec::new();
    let mut live_config_ids = Vec::new();

    for tenant in &desired.tenants {
        ctx.execute_activity::<ConfigureTenantAddresses>(
            ConfigureTenantAddressesInput { node_id: node.id.clone(), tenant: tenant.clone() },
            ActivityOptions::default().with_retry(lifecycle_retry()).with_task_queue(queue.clone()),
        )
        .await
        .map_err(to_wf_err)?;

        ctx.execute_activity::<SyncSshConfig>(
            SyncSshConfigInput { node_id: node.id.clone(), tenant: tenant.clone() },
            ActivityOptions::default().with_retry(lifecycle_retry()).with_task_queue(queue.clone()),
        )
        .await
        .map_err(to_wf_err)?;

        let Some(webroots) = desired.webroots_by_tenant.get(&tenant.meta.id) else {
            continue;
        };

        for webroot in webroots {
            live_webroot_ids.push(webroot.meta.id.clone());

            ctx.execute_activity::<CreateWebroot>(
                WebrootInput { node_id: node.id.clone(), webroot: webroot.clone() },
                ActivityOptions::default().with_retry(lifecycle_retry()).with_task_queue(queue.clone()),
            )
            .await
            .map_err(to_wf_err)?;

            if let Some(daemons) = desired.daemons_by_webroot.get(&webroot.meta.id) {
                for daemon in daemons {
                    live_config_ids.push(daemon.meta.id.clone());
                    ctx.execute_activity::<CreateDaemonConfig>(
                        DaemonConfigInput { node_id: node.id.clone(), daemon: daemon.clone() },
                        ActivityOptions::default()
                            .with_retry(lifecycle_retry())
                            .with_task_queue(queue.clone()),
                    )
                    .await
                    .map_err(to_wf_err)?;
                }
            }

            if let Some(cronjobs) = desired.cronjobs_by_webroot.get(&webroot.meta.id) {
                for cronjob in cronjobs {
                    ctx.execute_activity::<CreateCronJobUnits>(
                        CronJobUnitsInput { node_id: node.id.clone(), job: cronjob.clone() },
                        ActivityOptions::default()
                            .with_retry(lifecycle_retry())
                            .with_task_queue(queue.clone()),
                    )
                    .await
                    .map_err(to_wf_err)?;
                }
            }
        }
    }

    ctx.execute_activity::<CleanOrphanedFpmPools>(
        CleanOrphanedFpmPoolsInput { node_id: node.id.clone(), live_webroot_ids },
        ActivityOptions::default().with_retry(lifecycle_retry()).with_task_queue(queue.clone()),
    )
    .await
    .map_err(to_wf_err)?;

    ctx.execute_activity::<CleanOrphanedConfigs>(
        CleanOrphanedConfigsInput { node_id: node.id.clone(), live_ids: live_config_ids },
        ActivityOptions::default().with_retry(lifecycle_retry()).with_task_queue(queue.clone()),
    )
    .await
    .map_err(to_wf_err)?;

    ctx.execute_activity::<ReloadNginx>(
        NodeRefInput { node_id: node.id.clone() },
        ActivityOptions::default().with_retry(lifecycle_retry()).with_task_queue(queue.clone()),
    )
    .await
    .map_err(to_wf_err)?;

    ctx.execute_activity::<ReloadPhpFpm>(
        NodeRefInput { node_id: node.id },
        ActivityOptions::default().with_retry(lifecycle_retry()).with_task_queue(queue),
    )
    .await
    .map_err(to_wf_err)?;

    Ok(())
}

/// Database shards designate `shard_index == 0` the primary by convention
/// (same rule `ReplicationHealthCronWorkflow` uses). The primary gets
/// databases and users created directly; every replica gets flipped
/// read-only and has its replication link checked and, if not fully
/// caught up, reconfigured from the primary.
async fn converge_database_shard(ctx: &WfContext, shard_id: &str, nodes: Vec<Node>) -> Vec<String> {
    let context = match ctx
        .execute_activity::<GetDatabaseShardContext>(
            IdInput { id: shard_id.to_string() },
            ActivityOptions::default().with_retry(lifecycle_retry()),
        )
        .await
    {
        Ok(context) => context,
        Err(e) => return vec![e.message],
    };

    let Some(primary) = nodes.iter().find(|n| n.shard_index == Some(0)).cloned() else {
        return vec!["database shard has no node at shard_index 0 to act as primary".to_string()];
    };
    let replicas: Vec<Node> = nodes.into_iter().filter(|n| n.shard_index != Some(0)).collect();

    let mut errors = Vec::new();

    for database in &context.databases {
        if let Err(e) = ctx
            .execute_activity::<SetReadOnly>(
                SetReadOnlyInput { node_id: primary.id.clone(), database_id: database.meta.id.clone(), read_only: false },
                ActivityOptions::default().with_retry(lifecycle_retry()).with_task_queue(node_task_queue(&primary.id)),
            )
            .await
        {
            errors.push(e.message);
        }

        if let Err(e) = ctx
            .execute_activity::<CreateDatabase>(
                CreateDatabaseInput { node_id: primary.id.clone(), database: database.clone() },
                ActivityOptions::default().with_retry(lifecycle_retry()).with_task_queue(node_task_queue(&primary.id)),
            )
            .await
        {
            errors.push(e.message);
            continue;
        }

        let Some(users) = context.users_by_database.get(&database.meta.id) else {
            continue;
        };
        for user in users {
            if let Err(e) = ctx
                .execute_activity::<CreateDatabaseUser>(
                    CreateDatabaseUserInput {
                        node_id: primary.id.clone(),
                        user: user.clone(),
                        password_ref: format!("db-user/{}", user.meta.id),
                    },
                    ActivityOptions::default().with_retry(lifecycle_retry()).with_task_queue(node_task_queue(&primary.id)),
                )
                .await
            {
                errors.push(e.message);
            }
        }
    }

    let primary_host = primary.ip_address.clone().unwrap_or_else(|| primary.hostname.clone());
    let results = fan_out(ctx, replicas, move |ctx, replica| {
        let primary_host = primary_host.clone();
        let databases = context.databases.clone();
        async move { converge_database_replica(&ctx, replica, &primary_host, &databases).await }
    })
    .await;

    errors.extend(errors_from(results));
    errors
}

async fn converge_database_replica(
    ctx: &WfContext,
    replica: Node,
    primary_host: &str,
    databases: &[Database],
) -> Result<(), WorkflowError> {
    let queue = node_task_queue(&replica.id);

    for database in databases {
        ctx.execute_activity::<SetReadOnly>(
            SetReadOnlyInput { node_id: replica.id.clone(), database_id: database.meta.id.clone(), read_only: true },
            ActivityOptions::default().with_retry(lifecycle_retry()).with_task_queue(queue.clone()),
        )
        .await
        .map_err(to_wf_err)?;

        let status = ctx
            .execute_activity::<GetReplicationStatus>(
                DatabaseRefInput { node_id: replica.id.clone(), database_id: database.meta.id.clone() },
                ActivityOptions::default().with_retry(lifecycle_retry()).with_task_queue(queue.clone()),
            )
            .await
            .map_err(to_wf_err)?;

        if status.io_running && status.sql_running {
            continue;
        }

        ctx.execute_activity::<ConfigureReplication>(
            ConfigureReplicationWireInput {
                node_id: replica.id.clone(),
                config: ConfigureReplicationInput {
                    replica_database_id: database.meta.id.clone(),
                    primary_host: primary_host.to_string(),
                    primary_port: REPLICATION_PORT,
                    replication_user: REPLICATION_USER.to_string(),
                    replication_password_ref: format!("mysql-replication/{}", database.shard_id),
                },
            },
            ActivityOptions::default().with_retry(lifecycle_retry()).with_task_queue(queue.clone()),
        )
        .await
        .map_err(to_wf_err)?;
    }

    Ok(())
}

/// Valkey shards have no primary/replica distinction: every active instance
/// and its users get pushed onto every node.
async fn converge_valkey_shard(ctx: &WfContext, shard_id: &str, nodes: Vec<Node>) -> Vec<String> {
    let context = match ctx
        .execute_activity::<GetValkeyShardContext>(
            IdInput { id: shard_id.to_string() },
            ActivityOptions::default().with_retry(lifecycle_retry()),
        )
        .await
    {
        Ok(context) => context,
        Err(e) => return vec![e.message],
    };

    let results = fan_out(ctx, nodes, move |ctx, node| {
        let context = context.clone();
        async move { converge_valkey_node(&ctx, node, &context).await }
    })
    .await;

    errors_from(results)
}

async fn converge_valkey_node(
    ctx: &WfContext,
    node: Node,
    context: &ValkeyShardContext,
) -> Result<(), WorkflowError> {
    let queue = node_task_queue(&node.id);

    for instance in &context.instances {
        ctx.execute_activity::<CreateValkeyInstance>(
            CreateValkeyInstanceInput { node_id: node.id.clone(), instance: instance.clone() },
            ActivityOptions::default().with_retry(lifecycle_retry()).with_task_queue(queue.clone()),
        )
        .await
        .map_err(to_wf_err)?;

        let Some(users) = context.users_by_instance.get(&instance.meta.id) else {
            continue;
        };
        for user in users {
            ctx.execute_activity::<CreateValkeyUser>(
                CreateValkeyUserInput {
                    node_id: node.id.clone(),
                    user: user.clone(),
                    password_ref: format!("valkey-user/{}", user.meta.id),
                },
                ActivityOptions::default().with_retry(lifecycle_retry()).with_task_queue(queue.clone()),
            )
            .await
            .map_err(to_wf_err)?;
        }
    }

    Ok(())
}

/// LB shards apply every active FQDN-to-backend mapping in the shard's
/// cluster onto every node in the shard's backend pool.
async fn converge_lb_shard(ctx: &WfContext, shard: &Shard, nodes: Vec<Node>) -> Vec<String> {
    let Some(backend) = shard.lb_backend.clone() else {
        return vec!["lb shard has no backend pool name configured".to_string()];
    };

    let targets = match ctx
        .execute_activity::<ListActiveFqdnTargets>(
            IdInput { id: shard.cluster_id.clone() },
            ActivityOptions::default().with_retry(lifecycle_retry()),
        )
        .await
    {
        Ok(targets) => targets,
        Err(e) => return vec![e.message],
    };

    let results = fan_out(ctx, nodes, move |ctx, node| {
        let backend = backend.clone();
        let targets = targets.clone();
        async move { converge_lb_node(&ctx, node, &backend, &targets).await }
    })
    .await;

    errors_from(results)
}

async fn converge_lb_node(
    ctx: &WfContext,
    node: Node,
    backend: &str,
    targets: &[FqdnTarget],
) -> Result<(), WorkflowError> {
    let queue = node_task_queue(&node.id);

    for target in targets {
        ctx.execute_activity::<SetLbMapEntry>(
            SetLbMapEntryInput {
                node_id: node.id.clone(),
                backend: backend.to_string(),
                hostname: target.hostname.clone(),
                target: target.target.clone(),
            },
            ActivityOptions::default().with_retry(lifecycle_retry()).with_task_queue(queue.clone()),
        )
        .await
        .map_err(to_wf_err)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_reconciling_roles_are_distinct_from_the_four_handled() {
        for role in [ShardRole::Dns, ShardRole::Email, ShardRole::Storage, ShardRole::Dbadmin] {
            assert!(!matches!(role, ShardRole::Web | ShardRole::Database | ShardRole::Valkey | ShardRole::Lb));
        }
    }

    #[test]
    fn truncate_joined_message_contains_expected_marker() {
        let msg = truncate_joined_message(&["node-1 failed".to_string()], 4000);
        assert!(msg.contains("convergence completed with"));
    }
}
