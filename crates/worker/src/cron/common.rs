//! Shared shape for the periodic maintenance workflows in this module:
//! the config every cron carries across its own continue-as-new chain, and
//! the incident-reporting helper that ties a dedupe-keyed `CreateIncident`
//! call to a best-effort webhook notification.

use serde::{Deserialize, Serialize};

use hosting_core::activities::CreateIncidentInput;
use hosting_core::domain::IncidentSeverity;
use hosting_durable::{ActivityOptions, WfContext, WorkflowError};

use crate::activities::core_store::CreateIncident;
use crate::activities::external::{SendWebhook, WebhookInput};
use crate::workflows::lifecycle_retry;

/// Carried as the `Input`/`Output` of every self-perpetuating cron
/// workflow here so a single `ContinueAsNew` call preserves it without each
/// workflow needing its own input type. Loaded once from [`crate::config::WorkerConfig`]
/// when a cron is started; a config change takes effect on the next
/// deployment's restart of the cron's singleton run, not mid-chain.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CronConfig {
    pub platform_webhook_url: Option<String>,
    pub audit_log_retention_days: i64,
    pub backup_retention_days: i64,
}

/// Create (or match an existing open) incident, then best-effort notify
/// `config.platform_webhook_url` when the call actually created a new row —
/// a cron that runs every few minutes shouldn't re-notify on every pass
/// just because the underlying condition hasn't cleared yet.
pub async fn report_incident(
    ctx: &WfContext,
    config: &CronConfig,
    input: CreateIncidentInput,
) -> Result<(), WorkflowError> {
    let dedupe_key = input.dedupe_key.clone();
    let title = input.title.clone();
    let severity = input.severity;

    let result = ctx
        .execute_activity::<CreateIncident>(input, ActivityOptions::default().with_retry(lifecycle_retry()))
        .await
        .map_err(|e| WorkflowError::new(e.message))?;

    if !result.created {
        return Ok(());
    }

    tracing::info!(incident_id = %result.id, %dedupe_key, "cron created incident");

    let Some(url) = config.platform_webhook_url.clone().filter(|u| !u.is_empty()) else {
        return Ok(());
    };

    let payload = serde_json::json!({
        "incident_id": result.id,
        "dedupe_key": dedupe_key,
        "title": title,
        "severity": severity_label(severity),
    });

    let outcome = ctx
        .execute_activity::<SendWebhook>(
            WebhookInput { url, payload },
            ActivityOptions::default().with_retry(lifecycle_retry()),
        )
        .await;

    if let Err(e) = outcome {
        tracing::warn!(incident_id = %result.id, error = %e.message, "incident webhook delivery failed");
    }

    Ok(())
}

fn severity_label(severity: IncidentSeverity) -> &'static str {
    match severity {
        IncidentSeverity::Info => "info",
        IncidentSeverity::Warning => "warning",
        IncidentSeverity::Critical => "critical",
    }
}
