//! Incident triage
//!
//! A periodic sweep claims one unassigned incident per distinct
//! `(resource, type)` group — the leader — and hands it to an agent-backed
//! child workflow. Grouping exists because a single underlying fault (a
//! node losing connectivity, say) tends to fan out into many near-identical
//! incidents in the same sweep; the leader is investigated first and every
//! follower in its group is then investigated too, seeded with the leader's
//! resolution hint so the model isn't starting from nothing on what is
//! likely the same root cause.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use hosting_core::activities::{AgentConfig, AutoResolveIncidentsInput, IncidentContext};
use hosting_core::domain::{group_by_type, order_for_processing, Incident};
use hosting_durable::{ActivityOptions, Completion, Semaphore, WfContext, Workflow, WorkflowError};

use crate::activities::core_store::{
    AutoResolveIncidents, ClaimIncidentForAgent, EscalateIncident, EscalateIncidentInput, IdInput,
    ListUnassignedOpenIncidents,
};
use crate::activities::incident_agent::{
    AssembleIncidentContext, GetAgentConfig, InvestigateIncident,
    InvestigateIncidentInput as AgentCallInput,
};

use super::common::{fan_out, lifecycle_retry, no_retry};

fn to_wf_err(e: impl std::fmt::Display) -> WorkflowError {
    WorkflowError::new(e.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessIncidentQueueInput {
    /// How many `(resource, type)` groups get their leader investigated at
    /// once.
    pub max_concurrent: usize,
    /// Default follower concurrency within one group, overridden per
    /// incident type by `AgentConfig.type_concurrency`.
    pub follower_concurrent: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProcessIncidentQueueOutput {
    pub investigated: u32,
}

pub struct ProcessIncidentQueueWorkflow;

#[async_trait::async_trait(?Send)]
impl Workflow for ProcessIncidentQueueWorkflow {
    const TYPE: &'static str = "process_incident_queue";
    type Input = ProcessIncidentQueueInput;
    type Output = ProcessIncidentQueueOutput;

    async fn run(ctx: WfContext, input: Self::Input) -> Result<Completion<Self::Output>, WorkflowError> {
        let mut incidents = ctx
            .execute_activity::<ListUnassignedOpenIncidents>(
                (),
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;

        order_for_processing(&mut incidents);
        let groups = group_by_type(incidents);

        let config: AgentConfig = ctx
            .execute_activity::<GetAgentConfig>((), ActivityOptions::default().with_retry(lifecycle_retry()))
            .await
            .map_err(to_wf_err)?;

        let leader_sem = ctx.new_semaphore(input.max_concurrent.max(1));
        let default_follower_concurrent = input.follower_concurrent.max(1);
        let type_concurrency = Rc::new(config.type_concurrency.clone());
        let investigated = Rc::new(Cell::new(0u32));

        let results = fan_out(&ctx, groups, move |ctx, group| {
            let leader_sem = leader_sem.clone();
            let type_concurrency = type_concurrency.clone();
            let investigated = investigated.clone();
            async move {
                investigate_group(&ctx, group, &leader_sem, default_follower_concurrent, &type_concurrency, &investigated)
                    .await
            }
        })
        .await;

        match results.into_iter().find(|r| r.is_err()) {
            Some(Err(e)) => Err(e),
            _ => Ok(Completion::Complete(ProcessIncidentQueueOutput { investigated: investigated.get() })),
        }
    }
}

/// Investigate one `(resource, type)` group: claim and investigate the
/// leader under `leader_sem`, then — if the leader was actually claimed and
/// resolved a hint — fan its followers out under a semaphore sized by
/// `type_concurrency`'s override for this incident type, or
/// `default_follower_concurrent` otherwise.
async fn investigate_group(
    ctx: &WfContext,
    mut group: Vec<Incident>,
    leader_sem: &Semaphore,
    default_follower_concurrent: usize,
    type_concurrency: &HashMap<String, usize>,
    investigated: &Rc<Cell<u32>>,
) -> Result<(), WorkflowError> {
    if group.is_empty() {
        return Ok(());
    }
    let leader = group.remove(0);
    let followers = group;
    let incident_type = leader.incident_type.clone();

    let permit = leader_sem.acquire().await;
    let outcome = investigate_one(ctx, leader, Vec::new()).await;
    drop(permit);

    let Some(hint) = outcome? else {
        return Ok(());
    };
    investigated.set(investigated.get() + 1);

    if followers.is_empty() {
        return Ok(());
    }

    let follower_permits = type_concurrency.get(&incident_type).copied().unwrap_or(default_follower_concurrent);
    let follower_sem = ctx.new_semaphore(follower_permits.max(1));
    let investigated = investigated.clone();

    let results = fan_out(ctx, followers, move |ctx, follower| {
        let follower_sem = follower_sem.clone();
        let hint = hint.clone();
        let investigated = investigated.clone();
        async move {
            let permit = follower_sem.acquire().await;
            let outcome = investigate_one(&ctx, follower, vec![hint]).await;
            drop(permit);
            if outcome?.is_some() {
                investigated.set(investigated.get() + 1);
            }
            Ok(())
        }
    })
    .await;

    results.into_iter().find(|r| r.is_err()).unwrap_or(Ok(()))
}

/// Claim one incident and, if the claim succeeds, run
/// `InvestigateIncidentWorkflow` as a child. Returns `None` when the
/// incident was already claimed by another processor (the group is left
/// alone rather than investigated twice), `Some(resolution_hint)` — which
/// may be an empty string on escalation — otherwise.
async fn investigate_one(ctx: &WfContext, incident: Incident, hints: Vec<String>) -> Result<Option<String>, WorkflowError> {
    let claimed = ctx
        .execute_activity::<ClaimIncidentForAgent>(
            IdInput { id: incident.id.clone() },
            ActivityOptions::default().with_retry(lifecycle_retry()),
        )
        .await
        .map_err(to_wf_err)?;

    if !claimed {
        return Ok(None);
    }

    let input = serde_json::to_value(InvestigateIncidentInput {
        incident: incident.clone(),
        system_prompt: None,
        hints,
    })
    .map_err(to_wf_err)?;

    let hint: Option<String> = ctx
        .execute_child_workflow_dyn(
            InvestigateIncidentWorkflow::TYPE,
            format!("investigate-incident-{}", incident.id),
            input,
        )
        .await
        .and_then(|value| serde_json::from_value(value).map_err(to_wf_err))?;

    Ok(Some(hint.unwrap_or_default()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigateIncidentInput {
    pub incident: Incident,
    /// Overrides `AgentConfig.system_prompt` when set.
    pub system_prompt: Option<String>,
    /// Resolution hints from a leader investigation, threaded to a
    /// follower's context; empty when investigating a leader.
    #[serde(default)]
    pub hints: Vec<String>,
}

pub struct InvestigateIncidentWorkflow;

#[async_trait::async_trait(?Send)]
impl Workflow for InvestigateIncidentWorkflow {
    const TYPE: &'static str = "investigate_incident";
    type Input = InvestigateIncidentInput;
    /// The resolution hint (`recommended_action`) on a resolved incident,
    /// `None` on an escalated one.
    type Output = Option<String>;

    async fn run(ctx: WfContext, input: Self::Input) -> Result<Completion<Self::Output>, WorkflowError> {
        let mut config: AgentConfig = ctx
            .execute_activity::<GetAgentConfig>((), ActivityOptions::default().with_retry(lifecycle_retry()))
            .await
            .map_err(to_wf_err)?;
        if let Some(system_prompt) = input.system_prompt.clone() {
            config.system_prompt = system_prompt;
        }

        let context: Result<IncidentContext, WorkflowError> = ctx
            .execute_activity::<AssembleIncidentContext>(
                input.incident.clone(),
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err);

        let mut context = match context {
            Ok(context) => context,
            Err(e) => return escalate_and_complete(&ctx, &input.incident.id, &e.message).await,
        };
        context.hints = input.hints.clone();

        // A model call burns tokens per attempt; a transient failure here
        // should escalate to a human rather than retry blindly.
        let result = ctx
            .execute_activity::<InvestigateIncident>(
                AgentCallInput { config, context },
                ActivityOptions::default().with_retry(no_retry()),
            )
            .await
            .map_err(to_wf_err);

        let result = match result {
            Ok(result) => result,
            Err(e) => return escalate_and_complete(&ctx, &input.incident.id, &e.message).await,
        };

        if result.should_escalate {
            ctx.execute_activity::<EscalateIncident>(
                EscalateIncidentInput {
                    incident_id: input.incident.id.clone(),
                    reason: result.summary,
                },
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(to_wf_err)?;

            return Ok(Completion::Complete(None));
        }

        // Resolving by resource + type prefix clears this incident along
        // with any duplicate followers the same sweep skipped.
        ctx.execute_activity::<AutoResolveIncidents>(
            AutoResolveIncidentsInput {
                resource_type: input.incident.resource_type.clone().unwrap_or_default(),
                resource_id: input.incident.resource_id.clone().unwrap_or_default(),
                type_prefix: input.incident.incident_type.clone(),
                resolution: result.recommended_action.clone(),
            },
            ActivityOptions::default().with_retry(lifecycle_retry()),
        )
        .await
        .map_err(to_wf_err)?;

        Ok(Completion::Complete(Some(result.recommended_action)))
    }
}

async fn escalate_and_complete(
    ctx: &WfContext,
    incident_id: &str,
    reason: &str,
) -> Result<Completion<Option<String>>, WorkflowError> {
    ctx.execute_activity::<EscalateIncident>(
        EscalateIncidentInput { incident_id: incident_id.to_string(), reason: reason.to_string() },
        ActivityOptions::default().with_retry(lifecycle_retry()),
    )
    .await
    .map_err(to_wf_err)?;

    Ok(Completion::Complete(None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hosting_core::domain::{IncidentSeverity, IncidentStatus};

    fn incident(id: &str, kind: &str, severity: IncidentSeverity) -> Incident {
        let now = Utc::now();
        Incident {
            id: id.to_string(),
            dedupe_key: format!("{kind}:{id}"),
            incident_type: kind.to_string(),
            severity,
            status: IncidentStatus::Open,
            title: "test".to_string(),
            detail: "test".to_string(),
            source: "test".to_string(),
            resource_type: Some("node".to_string()),
            resource_id: Some(id.to_string()),
            assigned_to: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn groups_split_one_leader_and_its_followers() {
        let incidents = vec![
            incident("a", "disk_pressure", IncidentSeverity::Warning),
            incident("b", "disk_pressure", IncidentSeverity::Critical),
            incident("c", "cert_expiry", IncidentSeverity::Info),
        ];
        let mut sorted = incidents;
        order_for_processing(&mut sorted);
        let groups = group_by_type(sorted);
        assert_eq!(groups.len(), 2);
        let disk_group = groups.iter().find(|g| g[0].incident_type == "disk_pressure").unwrap();
        assert_eq!(disk_group.len(), 2);
        assert_eq!(disk_group[0].id, "b");
        assert_eq!(disk_group[1].id, "a");
    }
}
