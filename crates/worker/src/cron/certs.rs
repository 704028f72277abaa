//! Certificate expiry sweep
//!
//! Runs once a day; flags any FQDN whose TLS certificate expires within the
//! renewal window with a warning-severity incident so the on-call rotation
//! has a few weeks' notice before a site actually breaks.

use std::time::Duration;

use hosting_durable::{ActivityOptions, Completion, WfContext, Workflow, WorkflowError};

use crate::activities::core_store::{FindCertsNearExpiry, StaleSince};
use crate::workflows::lifecycle_retry;

use super::common::{report_incident, CronConfig};

const SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
const RENEWAL_WINDOW_DAYS: i64 = 14;
const CRITICAL_WINDOW_DAYS: i64 = 7;

pub struct CertExpiryCronWorkflow;

#[async_trait::async_trait(?Send)]
impl Workflow for CertExpiryCronWorkflow {
    const TYPE: &'static str = "cert_expiry_cron";
    type Input = CronConfig;
    type Output = CronConfig;

    async fn run(ctx: WfContext, input: Self::Input) -> Result<Completion<Self::Output>, WorkflowError> {
        let now = ctx.now();
        let expiring_before = now + chrono::Duration::days(RENEWAL_WINDOW_DAYS);

        let fqdns = ctx
            .execute_activity::<FindCertsNearExpiry>(
                StaleSince { before: expiring_before },
                ActivityOptions::default().with_retry(lifecycle_retry()),
            )
            .await
            .map_err(|e| WorkflowError::new(e.message))?;

        for fqdn in fqdns {
            let days_remaining = fqdn
                .tls_cert_expires_at
                .map(|expires_at| (expires_at - now).num_days())
                .unwrap_or(0);
            let severity = if days_remaining <= CRITICAL_WINDOW_DAYS {
                hosting_core::domain::IncidentSeverity::Critical
            } else {
                hosting_core::domain::IncidentSeverity::Warning
            };

            report_incident(
                &ctx,
                &input,
                hosting_core::activities::CreateIncidentInput {
                    dedupe_key: format!("cert_expiry:{}", fqdn.meta.id),
                    incident_type: "cert_expiry".to_string(),
                    severity,
                    title: format!("TLS certificate for {} is nearing expiry", fqdn.hostname),
                    detail: format!(
                        "certificate for {} expires in {days_remaining} day(s)",
                        fqdn.hostname
                    ),
                    source: "cert_expiry_cron".to_string(),
                    resource_type: Some("fqdn".to_string()),
                    resource_id: Some(fqdn.meta.id),
                },
            )
            .await?;
        }

        ctx.new_timer(SWEEP_INTERVAL).await;
        ctx.request_continue_as_new(&input);
        let next = serde_json::to_value(&input).map_err(|e| WorkflowError::new(e.to_string()))?;
        Ok(Completion::ContinueAsNew(next))
    }
}
