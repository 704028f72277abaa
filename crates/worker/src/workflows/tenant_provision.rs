//! Tenant provisioning orchestrator
//!
//! One long-lived workflow per tenant, started under the workflow id
//! `tenant-provision-<tenant_id>` so a second provisioning request for the
//! same tenant finds the same run rather than starting a sibling. External
//! callers enqueue [`ProvisionTask`]s on its `provision` signal channel; the
//! workflow drains them one at a time, dispatching each as a child workflow
//! chosen by `task.workflow_name` — a runtime name, not a fixed type, since
//! one tenant's queue carries daemon creates, backup restores, and egress
//! syncs interleaved. When a task carries a `callback_url` the caller gets a
//! best-effort POST once the child resolves; the tenant's own queue isn't
//! blocked waiting for that delivery to succeed.
//!
//! Continues as new every 1000 drained tasks to keep history bounded, and
//! completes after five minutes of no signal so a tenant that has stopped
//! changing doesn't leave a workflow parked in the registry forever — a
//! later task simply starts a fresh run under the same id.

use serde::{Deserialize, Serialize};

use hosting_core::domain::ProvisionTask;
use hosting_durable::{ActivityOptions, Completion, RetryPolicy, WfContext, Workflow, WorkflowError};

use crate::activities::external::{SendCallback, WebhookInput};

const IDLE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(300);
const MAX_TASKS_PER_RUN: u32 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TenantProvisionInput {
    pub tenant_id: String,
}

enum Event {
    Task(Option<ProvisionTask>),
    Idle,
}

pub struct TenantProvisionWorkflow;

#[async_trait::async_trait(?Send)]
impl Workflow for TenantProvisionWorkflow {
    const TYPE: &'static str = "tenant_provision";
    type Input = TenantProvisionInput;
    type Output = ();

    async fn run(ctx: WfContext, input: Self::Input) -> Result<Completion<Self::Output>, WorkflowError> {
        let channel = ctx.get_signal_channel("provision");
        let mut processed = 0u32;

        loop {
            let event = ctx
                .new_selector::<Event>()
                .add({
                    let channel = channel.clone();
                    async move {
                        let signal = channel.recv().await;
                        Event::Task(serde_json::from_value(signal.payload).ok())
                    }
                })
                .add({
                    let timer = ctx.new_timer(IDLE_TIMEOUT);
                    async move {
                        timer.await;
                        Event::Idle
                    }
                })
                .select()
                .await;

            match event {
                Event::Idle => return Ok(Completion::Complete(())),
                Event::Task(None) => {
                    tracing::warn!(tenant_id = %input.tenant_id, "dropping malformed provision signal payload");
                }
                Event::Task(Some(task)) => {
                    run_task(&ctx, &task).await;
                    processed += 1;
                    if processed >= MAX_TASKS_PER_RUN {
                        ctx.request_continue_as_new(&input);
                        let next = serde_json::to_value(&input)
                            .expect("tenant provision input must serialize");
                        return Ok(Completion::ContinueAsNew(next));
                    }
                }
            }
        }
    }
}

async fn run_task(ctx: &WfContext, task: &ProvisionTask) {
    let result = ctx
        .execute_child_workflow_dyn(
            task.workflow_name.clone(),
            task.workflow_id.clone(),
            task.arg.clone(),
        )
        .await;

    if let Err(ref err) = result {
        tracing::warn!(
            workflow_id = %task.workflow_id,
            workflow_name = %task.workflow_name,
            error = %err.message,
            "provision task failed"
        );
    }

    let Some(callback_url) = task.callback_url.clone().filter(|u| !u.is_empty()) else {
        return;
    };

    let payload = match &result {
        Ok(_) => serde_json::json!({
            "resource_type": task.resource_type,
            "resource_id": task.resource_id,
            "status": "active",
            "status_message": "",
        }),
        Err(err) => serde_json::json!({
            "resource_type": task.resource_type,
            "resource_id": task.resource_id,
            "status": "failed",
            "status_message": err.message,
        }),
    };

    let outcome = ctx
        .execute_activity::<SendCallback>(
            WebhookInput { url: callback_url, payload },
            ActivityOptions::default().with_retry(callback_retry()),
        )
        .await;

    if let Err(err) = outcome {
        tracing::warn!(
            workflow_id = %task.workflow_id,
            error = %err.message,
            "provision callback delivery exhausted its retries"
        );
    }
}

fn callback_retry() -> RetryPolicy {
    RetryPolicy::exponential()
        .with_max_attempts(10)
        .with_initial_interval(std::time::Duration::from_secs(5))
        .with_max_interval(std::time::Duration::from_secs(300))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_retry_caps_at_ten_attempts() {
        let policy = callback_retry();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.initial_interval, std::time::Duration::from_secs(5));
        assert_eq!(policy.max_interval, std::time::Duration::from_secs(300));
    }
}
