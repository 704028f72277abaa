//! Node and shard health sweeps
//!
//! Node health flags nodes the core store hasn't heard a heartbeat from
//! recently; convergence-stuck flags shards that have been sitting in
//! `converging` status long enough that whatever triggered the convergence
//! run likely failed partway rather than just taking a while.

use std::time::Duration;

use hosting_core::activities::CreateIncidentInput;
use hosting_core::domain::IncidentSeverity;
use hosting_durable::{ActivityOptions, Completion, WfContext, Workflow, WorkflowError};

use crate::activities::core_store::{FindStaleConvergingShards, FindUnhealthyNodes, StaleSince};
use crate::workflows::lifecycle_retry;

use super::common::{report_incident, CronConfig};

const NODE_HEALTH_SWEEP_INTERVAL: Duration = Duration::from_secs(2 * 60);
const NODE_UNHEALTHY_AFTER: chrono::Duration = chrono::Duration::minutes(5);

const CONVERGENCE_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);
const CONVERGENCE_STUCK_AFTER: chrono::Duration = chrono::Duration::minutes(15);

fn to_wf_err(e: impl std::fmt::Display) -> WorkflowError {
    WorkflowError::new(e.to_string())
}

pub struct NodeHealthCronWorkflow;

#[async_trait::async_trait(?Send)]
impl Workflow for NodeHealthCronWorkflow {
    const TYPE: &'static str = "node_health_cron";
    type Input = CronConfig;
    type Output = CronConfig;

    async fn run(ctx: WfContext, input: Self::Input) -> Result<Completion<Self::Output>, WorkflowError> {
        let nodes = ctx
            .execute_activity::<FindUnhealthyNodes>(
                StaleSince { before: ctx.now() - NODE_UNHEALTHY_AFTER },
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;

        for node in nodes {
            report_incident(
                &ctx,
                &input,
                CreateIncidentInput {
                    dedupe_key: format!("node_unhealthy:{}", node.id),
                    incident_type: "node_unhealthy".to_string(),
                    severity: IncidentSeverity::Critical,
                    title: format!("node {} missed its health check", node.hostname),
                    detail: format!("no heartbeat from node {} within the last check window", node.id),
                    source: "node_health_cron".to_string(),
                    resource_type: Some("node".to_string()),
                    resource_id: Some(node.id),
                },
            )
            .await?;
        }

        ctx.new_timer(NODE_HEALTH_SWEEP_INTERVAL).await;
        ctx.request_continue_as_new(&input);
        let next = serde_json::to_value(&input).map_err(to_wf_err)?;
        Ok(Completion::ContinueAsNew(next))
    }
}

pub struct ConvergenceStuckCronWorkflow;

#[async_trait::async_trait(?Send)]
impl Workflow for ConvergenceStuckCronWorkflow {
    const TYPE: &'static str = "convergence_stuck_cron";
    type Input = CronConfig;
    type Output = CronConfig;

    async fn run(ctx: WfContext, input: Self::Input) -> Result<Completion<Self::Output>, WorkflowError> {
        let shards = ctx
            .execute_activity::<FindStaleConvergingShards>(
                StaleSince { before: ctx.now() - CONVERGENCE_STUCK_AFTER },
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;

        for shard in shards {
            report_incident(
                &ctx,
                &input,
                CreateIncidentInput {
                    dedupe_key: format!("convergence_stuck:{}", shard.meta.id),
                    incident_type: "convergence_stuck".to_string(),
                    severity: IncidentSeverity::Warning,
                    title: format!("shard {} has been converging too long", shard.name),
                    detail: "shard has stayed in converging status past the expected window"
                        .to_string(),
                    source: "convergence_stuck_cron".to_string(),
                    resource_type: Some("shard".to_string()),
                    resource_id: Some(shard.meta.id),
                },
            )
            .await?;
        }

        ctx.new_timer(CONVERGENCE_SWEEP_INTERVAL).await;
        ctx.request_continue_as_new(&input);
        let next = serde_json::to_value(&input).map_err(to_wf_err)?;
        Ok(Completion::ContinueAsNew(next))
    }
}
