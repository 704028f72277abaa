//! Stale incident escalation
//!
//! Two ways an incident can go stale: nobody claims it (unassigned past the
//! severity-dependent window), or an agent claims it and then the
//! investigation itself stalls (still `investigating` half an hour later).
//! Either one most likely means the investigate-incident queue is backed up
//! or an agent is stuck, not that it's a low-priority fluke. Escalating
//! surfaces it to a human rather than leaving it to wait its turn.

use std::time::Duration;

use hosting_core::domain::IncidentSeverity;
use hosting_durable::{ActivityOptions, Completion, WfContext, Workflow, WorkflowError};

use crate::activities::core_store::{
    EscalateIncident, EscalateIncidentInput, FindStaleInvestigatingIncidents, ListUnassignedOpenIncidents, StaleSince,
};
use crate::workflows::lifecycle_retry;

use super::common::CronConfig;

const SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);
const CRITICAL_ESCALATE_AFTER: chrono::Duration = chrono::Duration::minutes(15);
const WARNING_ESCALATE_AFTER: chrono::Duration = chrono::Duration::hours(1);
const INVESTIGATING_ESCALATE_AFTER: chrono::Duration = chrono::Duration::minutes(30);

fn to_wf_err(e: impl std::fmt::Display) -> WorkflowError {
    WorkflowError::new(e.to_string())
}

pub struct StaleIncidentEscalationCronWorkflow;

#[async_trait::async_trait(?Send)]
impl Workflow for StaleIncidentEscalationCronWorkflow {
    const TYPE: &'static str = "stale_incident_escalation_cron";
    type Input = CronConfig;
    type Output = CronConfig;

    async fn run(ctx: WfContext, input: Self::Input) -> Result<Completion<Self::Output>, WorkflowError> {
        let incidents = ctx
            .execute_activity::<ListUnassignedOpenIncidents>(
                (),
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;

        let now = ctx.now();
        for incident in incidents {
            let cutoff = match incident.severity {
                IncidentSeverity::Critical => now - CRITICAL_ESCALATE_AFTER,
                IncidentSeverity::Warning => now - WARNING_ESCALATE_AFTER,
                IncidentSeverity::Info => continue,
            };
            if incident.created_at > cutoff {
                continue;
            }

            ctx.execute_activity::<EscalateIncident>(
                EscalateIncidentInput {
                    incident_id: incident.id,
                    reason: "unclaimed past the escalation window".to_string(),
                },
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;
        }

        let stuck = ctx
            .execute_activity::<FindStaleInvestigatingIncidents>(
                StaleSince { before: now - INVESTIGATING_ESCALATE_AFTER },
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;

        for incident in stuck {
            ctx.execute_activity::<EscalateIncident>(
                EscalateIncidentInput {
                    incident_id: incident.id,
                    reason: "stuck investigating past the escalation window".to_string(),
                },
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;
        }

        ctx.new_timer(SWEEP_INTERVAL).await;
        ctx.request_continue_as_new(&input);
        let next = serde_json::to_value(&input).map_err(to_wf_err)?;
        Ok(Completion::ContinueAsNew(next))
    }
}
