//! Disk and replication capacity sweeps
//!
//! Both walk every shard of a given role, fan out a per-node or
//! per-database check, and report whatever crosses a fixed threshold. They
//! share that shape but not a type, since the thing checked (disk usage vs.
//! replication lag) and the collaborator it's checked against differ.

use std::time::Duration;

use hosting_core::activities::CreateIncidentInput;
use hosting_core::domain::{IncidentSeverity, ShardRole};
use hosting_durable::{ActivityOptions, Completion, WfContext, Workflow, WorkflowError};

use crate::activities::core_store::{IdInput, ListDatabasesByShard, ListNodesByShard, ListShardsByRole, ShardRoleInput};
use crate::activities::node_agent::{DatabaseRefInput, GetDiskUsage, GetReplicationStatus, NodeRefInput};
use crate::workflows::lifecycle_retry;

use super::common::{report_incident, CronConfig};

const DISK_SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);
const DISK_PRESSURE_WARNING: f64 = 0.90;
const DISK_PRESSURE_CRITICAL: f64 = 0.95;

const REPLICATION_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);
const REPLICATION_LAG_THRESHOLD_SECS: f64 = 300.0;

fn to_wf_err(e: impl std::fmt::Display) -> WorkflowError {
    WorkflowError::new(e.to_string())
}

pub struct DiskPressureCronWorkflow;

#[async_trait::async_trait(?Send)]
impl Workflow for DiskPressureCronWorkflow {
    const TYPE: &'static str = "disk_pressure_cron";
    type Input = CronConfig;
    type Output = CronConfig;

    async fn run(ctx: WfContext, input: Self::Input) -> Result<Completion<Self::Output>, WorkflowError> {
        for role in [
            ShardRole::Web,
            ShardRole::Database,
            ShardRole::Valkey,
            ShardRole::Lb,
            ShardRole::Dns,
            ShardRole::Email,
            ShardRole::Storage,
            ShardRole::Dbadmin,
        ] {
            let shards = ctx
                .execute_activity::<ListShardsByRole>(
                    ShardRoleInput { role },
                    ActivityOptions::default().with_retry(lifecycle_retry()),
                )
                .await
                .map_err(to_wf_err)?;

            for shard in shards {
                let nodes = ctx
                    .execute_activity::<ListNodesByShard>(
                        IdInput { id: shard.meta.id.clone() },
                        ActivityOptions::default().with_retry(lifecycle_retry()),
                    )
                    .await
                    .map_err(to_wf_err)?;

                for node in nodes {
                    let usage = ctx
                        .execute_activity::<GetDiskUsage>(
                            NodeRefInput { node_id: node.id.clone() },
                            ActivityOptions::default().with_retry(lifecycle_retry()),
                        )
                        .await
                        .map_err(to_wf_err)?;

                    if usage.total_bytes == 0 {
                        continue;
                    }
                    let used_fraction = usage.used_bytes as f64 / usage.total_bytes as f64;
                    if used_fraction < DISK_PRESSURE_WARNING {
                        continue;
                    }
                    let severity = if used_fraction >= DISK_PRESSURE_CRITICAL {
                        IncidentSeverity::Critical
                    } else {
                        IncidentSeverity::Warning
                    };

                    report_incident(
                        &ctx,
                        &input,
                        CreateIncidentInput {
                            dedupe_key: format!("disk_pressure:{}", node.id),
                            incident_type: "disk_pressure".to_string(),
                            severity,
                            title: format!("node {} is low on disk", node.hostname),
                            detail: format!(
                                "{:.1}% of disk in use ({} / {} bytes)",
                                used_fraction * 100.0,
                                usage.used_bytes,
                                usage.total_bytes
                            ),
                            source: "disk_pressure_cron".to_string(),
                            resource_type: Some("node".to_string()),
                            resource_id: Some(node.id),
                        },
                    )
                    .await?;
                }
            }
        }

        ctx.new_timer(DISK_SWEEP_INTERVAL).await;
        ctx.request_continue_as_new(&input);
        let next = serde_json::to_value(&input).map_err(to_wf_err)?;
        Ok(Completion::ContinueAsNew(next))
    }
}

pub struct ReplicationHealthCronWorkflow;

#[async_trait::async_trait(?Send)]
impl Workflow for ReplicationHealthCronWorkflow {
    const TYPE: &'static str = "replication_health_cron";
    type Input = CronConfig;
    type Output = CronConfig;

    async fn run(ctx: WfContext, input: Self::Input) -> Result<Completion<Self::Output>, WorkflowError> {
        let shards = ctx
            .execute_activity::<ListShardsByRole>(
                ShardRoleInput { role: ShardRole::Database },
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;

        for shard in shards {
            let nodes = ctx
                .execute_activity::<ListNodesByShard>(
                    IdInput { id: shard.meta.id.clone() },
                    ActivityOptions::default().with_retry(lifecycle_retry()),
                )
                .await
                .map_err(to_wf_err)?;

            // shard_index 0 is the primary by convention; replicas are
            // everything else. A shard with no assigned indices yet (still
            // provisioning) has nothing to check.
            let replicas: Vec<_> = nodes.into_iter().filter(|n| n.shard_index != Some(0)).collect();
            if replicas.is_empty() {
                continue;
            }

            let databases = ctx
                .execute_activity::<ListDatabasesByShard>(
                    IdInput { id: shard.meta.id.clone() },
                    ActivityOptions::default().with_retry(lifecycle_retry()),
                )
                .await
                .map_err(to_wf_err)?;

            for database in &databases {
                for node in &replicas {
                    let status = ctx
                        .execute_activity::<GetReplicationStatus>(
                            DatabaseRefInput { node_id: node.id.clone(), database_id: database.meta.id.clone() },
                            ActivityOptions::default().with_retry(lifecycle_retry()),
                        )
                        .await
                        .map_err(to_wf_err)?;

                    let lagging = status.lag_seconds.map(|s| s > REPLICATION_LAG_THRESHOLD_SECS).unwrap_or(false);
                    if status.io_running && status.sql_running && !lagging {
                        continue;
                    }

                    report_incident(
                        &ctx,
                        &input,
                        CreateIncidentInput {
                            dedupe_key: format!("replication_unhealthy:{}:{}", node.id, database.meta.id),
                            incident_type: "replication_unhealthy".to_string(),
                            severity: IncidentSeverity::Critical,
                            title: format!("replication degraded for database {}", database.name),
                            detail: format!(
                                "node {}: io_running={} sql_running={} lag_seconds={:?}",
                                node.id, status.io_running, status.sql_running, status.lag_seconds
                            ),
                            source: "replication_health_cron".to_string(),
                            resource_type: Some("database".to_string()),
                            resource_id: Some(database.meta.id.clone()),
                        },
                    )
                    .await?;
                }
            }
        }

        ctx.new_timer(REPLICATION_SWEEP_INTERVAL).await;
        ctx.request_continue_as_new(&input);
        let next = serde_json::to_value(&input).map_err(to_wf_err)?;
        Ok(Completion::ContinueAsNew(next))
    }
}
