use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hosting_durable::persistence::{node_task_queue, PostgresWorkflowEventStore, WorkflowEventStore};
use hosting_durable::worker::{WorkerPool, WorkerPoolConfig};
use hosting_durable::WorkflowExecutor;

use hosting_worker::activities::binding::activity_handler_driving;
use hosting_worker::activities::core_store::CoreStoreAdapter;
use hosting_worker::activities::dns_backend::DnsBackendAdapter;
use hosting_worker::activities::external::ExternalServicesAdapter;
use hosting_worker::activities::incident_agent::IncidentAgentAdapter;
use hosting_worker::activities::node_agent::NodeAgentAdapter;
use hosting_worker::activities::stalwart::StalwartAdapter;
use hosting_worker::activities::{core_store, dns_backend, external, incident_agent, node_agent, stalwart};
use hosting_worker::config::WorkerConfig;
use hosting_worker::cron::{self, CronConfig};
use hosting_worker::workflows;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "hosting_worker=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env()?;
    tracing::info!(worker_group = %config.worker_group, node_id = ?config.node_id, "hosting-worker starting");

    let pool = PgPoolOptions::new().max_connections(20).connect(&config.database_url).await?;
    let store = PostgresWorkflowEventStore::new(pool);

    let mut executor = WorkflowExecutor::new(store.clone());
    workflows::register_all(&mut executor);
    cron::register_all(&mut executor);
    let executor = Arc::new(executor);

    let cron_config = CronConfig {
        platform_webhook_url: config.platform_webhook_url.clone(),
        audit_log_retention_days: config.audit_log_retention_days,
        backup_retention_days: config.backup_retention_days,
    };
    cron::ensure_all_started(&executor, cron_config).await?;

    let core_store = Arc::new(CoreStoreAdapter::new(config.core_store_base_url.clone()));
    let dns_backend = Arc::new(DnsBackendAdapter::new(config.dns_backend_base_url.clone()));
    let external_services = Arc::new(ExternalServicesAdapter::new(config.external_services_base_url.clone()));
    let incident_agent = Arc::new(IncidentAgentAdapter::new(
        config.core_store_base_url.clone(),
        config.anthropic_api_key.clone(),
        config.anthropic_model.clone(),
    ));
    let stalwart = Arc::new(StalwartAdapter::new());

    let mut activity_types = core_store_activity_types();
    activity_types.extend(dns_backend_activity_types());
    activity_types.extend(external_activity_types());
    activity_types.extend(incident_agent_activity_types());
    activity_types.extend(stalwart_activity_types());

    let mut pool_config = WorkerPoolConfig::new(activity_types.clone())
        .with_worker_group(config.worker_group.clone())
        .with_max_concurrency(config.general_concurrency);

    let node_agent_adapter = match (&config.node_id, &config.node_agent_base_url) {
        (Some(node_id), Some(base_url)) => {
            let adapter = Arc::new(NodeAgentAdapter::new(base_url.clone()));
            pool_config = pool_config
                .with_task_queue(node_task_queue(node_id))
                .with_max_concurrency(config.general_concurrency + config.node_concurrency);
            Some(adapter)
        }
        _ => None,
    };
    if node_agent_adapter.is_some() {
        pool_config.activity_types.extend(node_agent_activity_types());
    }

    let worker_pool = WorkerPool::new(
        Arc::new(store.clone()) as Arc<dyn WorkflowEventStore>,
        pool_config,
    );

    register_core_store_handlers(&worker_pool, &core_store, &executor);
    register_dns_backend_handlers(&worker_pool, &dns_backend, &executor);
    register_external_handlers(&worker_pool, &external_services, &executor);
    register_incident_agent_handlers(&worker_pool, &incident_agent, &executor);
    register_stalwart_handlers(&worker_pool, &stalwart, &executor);
    if let Some(node_agent) = &node_agent_adapter {
        register_node_agent_handlers(&worker_pool, node_agent, &executor);
    }

    worker_pool.start().await?;
    tracing::info!("worker pool started");

    let timer_store = store.clone();
    let timer_executor = Arc::clone(&executor);
    let timer_poll_interval = config.timer_poll_interval;
    let timer_task = tokio::spawn(async move {
        loop {
            tokio::time::sleep(timer_poll_interval).await;
            let due = match timer_store.list_due_timers(Utc::now()).await {
                Ok(due) => due,
                Err(e) => {
                    tracing::error!("failed to list due timers: {e}");
                    continue;
                }
            };
            for (workflow_id, seq) in due {
                if let Err(e) = timer_executor.on_timer_fired(workflow_id, seq).await {
                    tracing::error!(%workflow_id, seq, "failed to fire timer: {e}");
                }
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    timer_task.abort();
    worker_pool.shutdown().await?;

    Ok(())
}

fn core_store_activity_types() -> Vec<String> {
    [
        <core_store::GetTenantByID as hosting_durable::ActivitySpec>::TYPE,
        <core_store::GetShardByID as hosting_durable::ActivitySpec>::TYPE,
        <core_store::ListNodesByShard as hosting_durable::ActivitySpec>::TYPE,
        <core_store::ListDatabasesByShard as hosting_durable::ActivitySpec>::TYPE,
        <core_store::GetShardDesiredState as hosting_durable::ActivitySpec>::TYPE,
        <core_store::GetDaemonContext as hosting_durable::ActivitySpec>::TYPE,
        <core_store::GetBackupContext as hosting_durable::ActivitySpec>::TYPE,
        <core_store::GetZoneRecordContext as hosting_durable::ActivitySpec>::TYPE,
        <core_store::GetStalwartContext as hosting_durable::ActivitySpec>::TYPE,
        <core_store::ListUnassignedOpenIncidents as hosting_durable::ActivitySpec>::TYPE,
        <core_store::FindStaleInvestigatingIncidents as hosting_durable::ActivitySpec>::TYPE,
        <core_store::FindStaleConvergingShards as hosting_durable::ActivitySpec>::TYPE,
        <core_store::FindUnhealthyNodes as hosting_durable::ActivitySpec>::TYPE,
        <core_store::FindCertsNearExpiry as hosting_durable::ActivitySpec>::TYPE,
        <core_store::FindBackupsPastRetention as hosting_durable::ActivitySpec>::TYPE,
        <core_store::GetDatabaseUserContext as hosting_durable::ActivitySpec>::TYPE,
        <core_store::GetEgressContext as hosting_durable::ActivitySpec>::TYPE,
        <core_store::GetDatabaseShardContext as hosting_durable::ActivitySpec>::TYPE,
        <core_store::GetValkeyShardContext as hosting_durable::ActivitySpec>::TYPE,
        <core_store::ListActiveFqdnTargets as hosting_durable::ActivitySpec>::TYPE,
        <core_store::ListShardsByRole as hosting_durable::ActivitySpec>::TYPE,
        <core_store::UpdateResourceStatus as hosting_durable::ActivitySpec>::TYPE,
        <core_store::UpdateTenantShardID as hosting_durable::ActivitySpec>::TYPE,
        <core_store::UpdateBackupResult as hosting_durable::ActivitySpec>::TYPE,
        <core_store::CreateIncident as hosting_durable::ActivitySpec>::TYPE,
        <core_store::AutoResolveIncidents as hosting_durable::ActivitySpec>::TYPE,
        <core_store::EscalateIncident as hosting_durable::ActivitySpec>::TYPE,
        <core_store::ClaimIncidentForAgent as hosting_durable::ActivitySpec>::TYPE,
        <core_store::UpdateNodeGrpcAddress as hosting_durable::ActivitySpec>::TYPE,
        <core_store::DeleteResource as hosting_durable::ActivitySpec>::TYPE,
        <core_store::DeleteAuditLogsOlderThan as hosting_durable::ActivitySpec>::TYPE,
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn dns_backend_activity_types() -> Vec<String> {
    [
        <dns_backend::GetDNSZoneIDByName as hosting_durable::ActivitySpec>::TYPE,
        <dns_backend::WriteDNSRecord as hosting_durable::ActivitySpec>::TYPE,
        <dns_backend::UpdateDNSRecord as hosting_durable::ActivitySpec>::TYPE,
        <dns_backend::DeleteDNSRecord as hosting_durable::ActivitySpec>::TYPE,
        <dns_backend::DeactivateAutoRecords as hosting_durable::ActivitySpec>::TYPE,
        <dns_backend::ReactivateAutoRecords as hosting_durable::ActivitySpec>::TYPE,
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn external_activity_types() -> Vec<String> {
    [
        <external::SendWebhook as hosting_durable::ActivitySpec>::TYPE,
        <external::SendCallback as hosting_durable::ActivitySpec>::TYPE,
        <external::SelectHostForNode as hosting_durable::ActivitySpec>::TYPE,
        <external::PullImage as hosting_durable::ActivitySpec>::TYPE,
        <external::CreateContainer as hosting_durable::ActivitySpec>::TYPE,
        <external::StopContainer as hosting_durable::ActivitySpec>::TYPE,
        <external::RemoveContainer as hosting_durable::ActivitySpec>::TYPE,
        <external::WaitForHealthy as hosting_durable::ActivitySpec>::TYPE,
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn incident_agent_activity_types() -> Vec<String> {
    [
        <incident_agent::GetAgentConfig as hosting_durable::ActivitySpec>::TYPE,
        <incident_agent::AssembleIncidentContext as hosting_durable::ActivitySpec>::TYPE,
        <incident_agent::InvestigateIncident as hosting_durable::ActivitySpec>::TYPE,
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn stalwart_activity_types() -> Vec<String> {
    [
        <stalwart::StalwartAddAlias as hosting_durable::ActivitySpec>::TYPE,
        <stalwart::StalwartRemoveAlias as hosting_durable::ActivitySpec>::TYPE,
        <stalwart::StalwartSyncForwardScript as hosting_durable::ActivitySpec>::TYPE,
        <stalwart::StalwartSetVacation as hosting_durable::ActivitySpec>::TYPE,
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn node_agent_activity_types() -> Vec<String> {
    [
        <node_agent::CreateTenant as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::CreateWebroot as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::UpdateWebroot as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::DeleteWebroot as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::CreateMysqlBackup as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::RestoreMysqlBackup as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::CreateWebBackup as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::RestoreWebBackup as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::DeleteBackupFile as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::CreateDatabase as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::CreateDatabaseUser as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::SyncDatabaseUserHosts as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::SetReadOnly as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::ConfigureReplication as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::GetReplicationStatus as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::CreateValkeyInstance as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::CreateValkeyUser as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::DeleteValkeyInstance as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::SyncSshKeys as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::SyncSshConfig as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::SyncEgressRules as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::ConfigureTenantAddresses as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::ConfigureUlaRoutes as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::CreateDaemonConfig as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::UpdateDaemonConfig as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::DeleteDaemonConfig as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::EnableDaemon as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::DisableDaemon as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::CreateCronJobUnits as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::EnableCronJobTimer as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::CleanOrphanedConfigs as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::CleanOrphanedFpmPools as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::ReloadNginx as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::ReloadPhpFpm as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::GetDiskUsage as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::CreateS3AccessKey as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::DeleteS3AccessKey as hosting_durable::ActivitySpec>::TYPE,
        <node_agent::SetLbMapEntry as hosting_durable::ActivitySpec>::TYPE,
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

macro_rules! register {
    ($pool:expr, $executor:expr, $adapter:expr, $marker:path) => {
        $pool.register_handler(
            <$marker as hosting_durable::ActivitySpec>::TYPE,
            activity_handler_driving(Arc::new($marker(Arc::clone($adapter))), Arc::clone($executor)),
        );
    };
}

fn register_core_store_handlers(
    pool: &WorkerPool,
    adapter: &Arc<CoreStoreAdapter>,
    executor: &Arc<WorkflowExecutor<PostgresWorkflowEventStore>>,
) {
    register!(pool, executor, adapter, core_store::GetTenantByID);
    register!(pool, executor, adapter, core_store::GetShardByID);
    register!(pool, executor, adapter, core_store::ListNodesByShard);
    register!(pool, executor, adapter, core_store::ListDatabasesByShard);
    register!(pool, executor, adapter, core_store::GetShardDesiredState);
    register!(pool, executor, adapter, core_store::GetDaemonContext);
    register!(pool, executor, adapter, core_store::GetBackupContext);
    register!(pool, executor, adapter, core_store::GetZoneRecordContext);
    register!(pool, executor, adapter, core_store::GetStalwartContext);
    register!(pool, executor, adapter, core_store::ListUnassignedOpenIncidents);
    register!(pool, executor, adapter, core_store::FindStaleInvestigatingIncidents);
    register!(pool, executor, adapter, core_store::FindStaleConvergingShards);
    register!(pool, executor, adapter, core_store::FindUnhealthyNodes);
    register!(pool, executor, adapter, core_store::FindCertsNearExpiry);
    register!(pool, executor, adapter, core_store::FindBackupsPastRetention);
    register!(pool, executor, adapter, core_store::GetDatabaseUserContext);
    register!(pool, executor, adapter, core_store::GetEgressContext);
    register!(pool, executor, adapter, core_store::GetDatabaseShardContext);
    register!(pool, executor, adapter, core_store::GetValkeyShardContext);
    register!(pool, executor, adapter, core_store::ListActiveFqdnTargets);
    register!(pool, executor, adapter, core_store::ListShardsByRole);
    register!(pool, executor, adapter, core_store::UpdateResourceStatus);
    register!(pool, executor, adapter, core_store::UpdateTenantShardID);
    register!(pool, executor, adapter, core_store::UpdateBackupResult);
    register!(pool, executor, adapter, core_store::CreateIncident);
    register!(pool, executor, adapter, core_store::AutoResolveIncidents);
    register!(pool, executor, adapter, core_store::EscalateIncident);
    register!(pool, executor, adapter, core_store::ClaimIncidentForAgent);
    register!(pool, executor, adapter, core_store::UpdateNodeGrpcAddress);
    register!(pool, executor, adapter, core_store::DeleteResource);
    register!(pool, executor, adapter, core_store::DeleteAuditLogsOlderThan);
}

fn register_dns_backend_handlers(
    pool: &WorkerPool,
    adapter: &Arc<DnsBackendAdapter>,
    executor: &Arc<WorkflowExecutor<PostgresWorkflowEventStore>>,
) {
    register!(pool, executor, adapter, dns_backend::GetDNSZoneIDByName);
    register!(pool, executor, adapter, dns_backend::WriteDNSRecord);
    register!(pool, executor, adapter, dns_backend::UpdateDNSRecord);
    register!(pool, executor, adapter, dns_backend::DeleteDNSRecord);
    register!(pool, executor, adapter, dns_backend::DeactivateAutoRecords);
    register!(pool, executor, adapter, dns_backend::ReactivateAutoRecords);
}

fn register_external_handlers(
    pool: &WorkerPool,
    adapter: &Arc<ExternalServicesAdapter>,
    executor: &Arc<WorkflowExecutor<PostgresWorkflowEventStore>>,
) {
    register!(pool, executor, adapter, external::SendWebhook);
    register!(pool, executor, adapter, external::SendCallback);
    register!(pool, executor, adapter, external::SelectHostForNode);
    register!(pool, executor, adapter, external::PullImage);
    register!(pool, executor, adapter, external::CreateContainer);
    register!(pool, executor, adapter, external::StopContainer);
    register!(pool, executor, adapter, external::RemoveContainer);
    register!(pool, executor, adapter, external::WaitForHealthy);
}

fn register_incident_agent_handlers(
    pool: &WorkerPool,
    adapter: &Arc<IncidentAgentAdapter>,
    executor: &Arc<WorkflowExecutor<PostgresWorkflowEventStore>>,
) {
    register!(pool, executor, adapter, incident_agent::GetAgentConfig);
    register!(pool, executor, adapter, incident_agent::AssembleIncidentContext);
    register!(pool, executor, adapter, incident_agent::InvestigateIncident);
}

fn register_stalwart_handlers(
    pool: &WorkerPool,
    adapter: &Arc<StalwartAdapter>,
    executor: &Arc<WorkflowExecutor<PostgresWorkflowEventStore>>,
) {
    register!(pool, executor, adapter, stalwart::StalwartAddAlias);
    register!(pool, executor, adapter, stalwart::StalwartRemoveAlias);
    register!(pool, executor, adapter, stalwart::StalwartSyncForwardScript);
    register!(pool, executor, adapter, stalwart::StalwartSetVacation);
}

fn register_node_agent_handlers(
    pool: &WorkerPool,
    adapter: &Arc<NodeAgentAdapter>,
    executor: &Arc<WorkflowExecutor<PostgresWorkflowEventStore>>,
) {
    register!(pool, executor, adapter, node_agent::CreateTenant);
    register!(pool, executor, adapter, node_agent::CreateWebroot);
    register!(pool, executor, adapter, node_agent::UpdateWebroot);
    register!(pool, executor, adapter, node_agent::DeleteWebroot);
    register!(pool, executor, adapter, node_agent::CreateMysqlBackup);
    register!(pool, executor, adapter, node_agent::RestoreMysqlBackup);
    register!(pool, executor, adapter, node_agent::CreateWebBackup);
    register!(pool, executor, adapter, node_agent::RestoreWebBackup);
    register!(pool, executor, adapter, node_agent::DeleteBackupFile);
    register!(pool, executor, adapter, node_agent::CreateDatabase);
    register!(pool, executor, adapter, node_agent::CreateDatabaseUser);
    register!(pool, executor, adapter, node_agent::SyncDatabaseUserHosts);
    register!(pool, executor, adapter, node_agent::SetReadOnly);
    register!(pool, executor, adapter, node_agent::ConfigureReplication);
    register!(pool, executor, adapter, node_agent::GetReplicationStatus);
    register!(pool, executor, adapter, node_agent::CreateValkeyInstance);
    register!(pool, executor, adapter, node_agent::CreateValkeyUser);
    register!(pool, executor, adapter, node_agent::DeleteValkeyInstance);
    register!(pool, executor, adapter, node_agent::SyncSshKeys);
    register!(pool, executor, adapter, node_agent::SyncSshConfig);
    register!(pool, executor, adapter, node_agent::SyncEgressRules);
    register!(pool, executor, adapter, node_agent::ConfigureTenantAddresses);
    register!(pool, executor, adapter, node_agent::ConfigureUlaRoutes);
    register!(pool, executor, adapter, node_agent::CreateDaemonConfig);
    register!(pool, executor, adapter, node_agent::UpdateDaemonConfig);
    register!(pool, executor, adapter, node_agent::DeleteDaemonConfig);
    register!(pool, executor, adapter, node_agent::EnableDaemon);
    register!(pool, executor, adapter, node_agent::DisableDaemon);
    register!(pool, executor, adapter, node_agent::CreateCronJobUnits);
    register!(pool, executor, adapter, node_agent::EnableCronJobTimer);
    register!(pool, executor, adapter, node_agent::CleanOrphanedConfigs);
    register!(pool, executor, adapter, node_agent::CleanOrphanedFpmPools);
    register!(pool, executor, adapter, node_agent::ReloadNginx);
    register!(pool, executor, adapter, node_agent::ReloadPhpFpm);
    register!(pool, executor, adapter, node_agent::GetDiskUsage);
    register!(pool, executor, adapter, node_agent::CreateS3AccessKey);
    register!(pool, executor, adapter, node_agent::DeleteS3AccessKey);
    register!(pool, executor, adapter, node_agent::SetLbMapEntry);
}
