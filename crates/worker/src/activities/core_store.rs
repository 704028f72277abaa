//! Core store adapter and activity bindings
//!
//! Unlike node agent calls, these always go to the general queue: the core
//! store is a single logical collaborator, not one per node.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hosting_core::activities::{
    AutoResolveIncidentsInput, BackupContext, CoreStoreReads, CoreStoreWrites, CreateIncidentInput,
    CreateIncidentResult, DaemonContext, DatabaseShardContext, DatabaseUserContext, EgressContext,
    FqdnTarget, ShardDesiredState, StalwartContext, UpdateBackupResultInput, UpdateResourceStatusInput,
    ValkeyShardContext, ZoneRecordContext,
};
use hosting_core::domain::{Backup, Database, Fqdn, Incident, Node, Shard, ShardRole, Tenant};
use hosting_core::error::CoreError;

use super::binding::rpc_activity;
use super::http::RpcClient;

pub struct CoreStoreAdapter {
    rpc: RpcClient,
}

impl CoreStoreAdapter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { rpc: RpcClient::new(base_url) }
    }
}

#[async_trait]
impl CoreStoreReads for CoreStoreAdapter {
    async fn get_tenant_by_id(&self, id: &str) -> Result<Tenant, CoreError> {
        self.rpc.call("get_tenant_by_id", &id).await
    }
    async fn get_shard_by_id(&self, id: &str) -> Result<Shard, CoreError> {
        self.rpc.call("get_shard_by_id", &id).await
    }
    async fn list_nodes_by_shard(&self, shard_id: &str) -> Result<Vec<Node>, CoreError> {
        self.rpc.call("list_nodes_by_shard", &shard_id).await
    }
    async fn list_databases_by_shard(&self, shard_id: &str) -> Result<Vec<Database>, CoreError> {
        self.rpc.call("list_databases_by_shard", &shard_id).await
    }
    async fn get_shard_desired_state(&self, shard_id: &str) -> Result<ShardDesiredState, CoreError> {
        self.rpc.call("get_shard_desired_state", &shard_id).await
    }
    async fn get_daemon_context(&self, daemon_id: &str) -> Result<DaemonContext, CoreError> {
        self.rpc.call("get_daemon_context", &daemon_id).await
    }
    async fn get_backup_context(&self, backup_id: &str) -> Result<BackupContext, CoreError> {
        self.rpc.call("get_backup_context", &backup_id).await
    }
    async fn get_zone_record_context(&self, record_id: &str) -> Result<ZoneRecordContext, CoreError> {
        self.rpc.call("get_zone_record_context", &record_id).await
    }
    async fn get_stalwart_context(&self, fqdn_id: &str) -> Result<StalwartContext, CoreError> {
        self.rpc.call("get_stalwart_context", &fqdn_id).await
    }
    async fn get_database_user_context(&self, user_id: &str) -> Result<DatabaseUserContext, CoreError> {
        self.rpc.call("get_database_user_context", &user_id).await
    }
    async fn get_egress_context(&self, tenant_id: &str) -> Result<EgressContext, CoreError> {
        self.rpc.call("get_egress_context", &tenant_id).await
    }
    async fn get_database_shard_context(&self, shard_id: &str) -> Result<DatabaseShardContext, CoreError> {
        self.rpc.call("get_database_shard_context", &shard_id).await
    }
    async fn get_valkey_shard_context(&self, shard_id: &str) -> Result<ValkeyShardContext, CoreError> {
        self.rpc.call("get_valkey_shard_context", &shard_id).await
    }
    async fn list_active_fqdn_targets(&self, cluster_id: &str) -> Result<Vec<FqdnTarget>, CoreError> {
        self.rpc.call("list_active_fqdn_targets", &cluster_id).await
    }
    async fn list_unassigned_open_incidents(&self) -> Result<Vec<Incident>, CoreError> {
        self.rpc.call("list_unassigned_open_incidents", &()).await
    }
    async fn find_stale_investigating_incidents(
        &self,
        claimed_before: DateTime<Utc>,
    ) -> Result<Vec<Incident>, CoreError> {
        self.rpc.call("find_stale_investigating_incidents", &claimed_before).await
    }
    async fn list_shards_by_role(&self, role: ShardRole) -> Result<Vec<Shard>, CoreError> {
        self.rpc.call("list_shards_by_role", &role).await
    }
    async fn find_stale_converging_shards(
        &self,
        converging_since_before: DateTime<Utc>,
    ) -> Result<Vec<Shard>, CoreError> {
        self.rpc.call("find_stale_converging_shards", &converging_since_before).await
    }
    async fn find_unhealthy_nodes(&self, last_health_before: DateTime<Utc>) -> Result<Vec<Node>, CoreError> {
        self.rpc.call("find_unhealthy_nodes", &last_health_before).await
    }
    async fn find_certs_near_expiry(&self, expiring_before: DateTime<Utc>) -> Result<Vec<Fqdn>, CoreError> {
        self.rpc.call("find_certs_near_expiry", &expiring_before).await
    }
    async fn find_backups_past_retention(&self, completed_before: DateTime<Utc>) -> Result<Vec<Backup>, CoreError> {
        self.rpc.call("find_backups_past_retention", &completed_before).await
    }
}

#[async_trait]
impl CoreStoreWrites for CoreStoreAdapter {
    async fn update_resource_status(&self, input: UpdateResourceStatusInput) -> Result<(), CoreError> {
        self.rpc.call("update_resource_status", &input).await
    }
    async fn update_tenant_shard_id(&self, tenant_id: &str, shard_id: &str) -> Result<(), CoreError> {
        self.rpc.call("update_tenant_shard_id", &(tenant_id, shard_id)).await
    }
    async fn update_backup_result(&self, input: UpdateBackupResultInput) -> Result<(), CoreError> {
        self.rpc.call("update_backup_result", &input).await
    }
    async fn update_node_grpc_address(&self, node_id: &str, grpc_address: &str) -> Result<(), CoreError> {
        self.rpc.call("update_node_grpc_address", &(node_id, grpc_address)).await
    }
    async fn delete_resource(&self, table: &str, id: &str) -> Result<(), CoreError> {
        self.rpc.call("delete_resource", &(table, id)).await
    }
    async fn delete_audit_logs_older_than(&self, before: DateTime<Utc>) -> Result<u64, CoreError> {
        self.rpc.call("delete_audit_logs_older_than", &before).await
    }
    async fn create_incident(&self, input: CreateIncidentInput) -> Result<CreateIncidentResult, CoreError> {
        self.rpc.call("create_incident", &input).await
    }
    async fn auto_resolve_incidents(&self, input: AutoResolveIncidentsInput) -> Result<(), CoreError> {
        self.rpc.call("auto_resolve_incidents", &input).await
    }
    async fn escalate_incident(&self, incident_id: &str, reason: &str) -> Result<(), CoreError> {
        self.rpc.call("escalate_incident", &(incident_id, reason)).await
    }
    async fn claim_incident_for_agent(&self, incident_id: &str) -> Result<bool, CoreError> {
        self.rpc.call("claim_incident_for_agent", &incident_id).await
    }
}

// ---------------------------------------------------------------------
// Wire input/output shapes and activity bindings
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdInput {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantShardInput {
    pub tenant_id: String,
    pub shard_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalateIncidentInput {
    pub incident_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaleSince {
    pub before: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardRoleInput {
    pub role: ShardRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrpcAddressInput {
    pub node_id: String,
    pub grpc_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResourceInput {
    pub table: String,
    pub id: String,
}

rpc_activity!(GetTenantByID, "get_tenant_by_id", CoreStoreAdapter, IdInput, Tenant, |c, i| c
    .get_tenant_by_id(&i.id));
rpc_activity!(GetShardByID, "get_shard_by_id", CoreStoreAdapter, IdInput, Shard, |c, i| c
    .get_shard_by_id(&i.id));
rpc_activity!(ListNodesByShard, "list_nodes_by_shard", CoreStoreAdapter, IdInput, Vec<Node>, |c, i| c
    .list_nodes_by_shard(&i.id));
rpc_activity!(
    ListDatabasesByShard,
    "list_databases_by_shard",
    CoreStoreAdapter,
    IdInput,
    Vec<Database>,
    |c, i| c.list_databases_by_shard(&i.id)
);
rpc_activity!(
    GetShardDesiredState,
    "get_shard_desired_state",
    CoreStoreAdapter,
    IdInput,
    ShardDesiredState,
    |c, i| c.get_shard_desired_state(&i.id)
);
rpc_activity!(GetDaemonContext, "get_daemon_context", CoreStoreAdapter, IdInput, DaemonContext, |c, i| c
    .get_daemon_context(&i.id));
rpc_activity!(GetBackupContext, "get_backup_context", CoreStoreAdapter, IdInput, BackupContext, |c, i| c
    .get_backup_context(&i.id));
rpc_activity!(
    GetZoneRecordContext,
    "get_zone_record_context",
    CoreStoreAdapter,
    IdInput,
    ZoneRecordContext,
    |c, i| c.get_zone_record_context(&i.id)
);
rpc_activity!(
    GetStalwartContext,
    "get_stalwart_context",
    CoreStoreAdapter,
    IdInput,
    StalwartContext,
    |c, i| c.get_stalwart_context(&i.id)
);
rpc_activity!(
    ListUnassignedOpenIncidents,
    "list_unassigned_open_incidents",
    CoreStoreAdapter,
    (),
    Vec<Incident>,
    |c, _i| c.list_unassigned_open_incidents()
);
rpc_activity!(
    FindStaleInvestigatingIncidents,
    "find_stale_investigating_incidents",
    CoreStoreAdapter,
    StaleSince,
    Vec<Incident>,
    |c, i| c.find_stale_investigating_incidents(i.before)
);
rpc_activity!(
    FindStaleConvergingShards,
    "find_stale_converging_shards",
    CoreStoreAdapter,
    StaleSince,
    Vec<Shard>,
    |c, i| c.find_stale_converging_shards(i.before)
);
rpc_activity!(
    FindUnhealthyNodes,
    "find_unhealthy_nodes",
    CoreStoreAdapter,
    StaleSince,
    Vec<Node>,
    |c, i| c.find_unhealthy_nodes(i.before)
);
rpc_activity!(
    FindCertsNearExpiry,
    "find_certs_near_expiry",
    CoreStoreAdapter,
    StaleSince,
    Vec<Fqdn>,
    |c, i| c.find_certs_near_expiry(i.before)
);
rpc_activity!(
    FindBackupsPastRetention,
    "find_backups_past_retention",
    CoreStoreAdapter,
    StaleSince,
    Vec<Backup>,
    |c, i| c.find_backups_past_retention(i.before)
);
rpc_activity!(
    GetDatabaseUserContext,
    "get_database_user_context",
    CoreStoreAdapter,
    IdInput,
    DatabaseUserContext,
    |c, i| c.get_database_user_context(&i.id)
);
rpc_activity!(
    GetEgressContext,
    "get_egress_context",
    CoreStoreAdapter,
    IdInput,
    EgressContext,
    |c, i| c.get_egress_context(&i.id)
);
rpc_activity!(
    GetDatabaseShardContext,
    "get_database_shard_context",
    CoreStoreAdapter,
    IdInput,
    DatabaseShardContext,
    |c, i| c.get_database_shard_context(&i.id)
);
rpc_activity!(
    GetValkeyShardContext,
    "get_valkey_shard_context",
    CoreStoreAdapter,
    IdInput,
    ValkeyShardContext,
    |c, i| c.get_valkey_shard_context(&i.id)
);
rpc_activity!(
    ListActiveFqdnTargets,
    "list_active_fqdn_targets",
    CoreStoreAdapter,
    IdInput,
    Vec<FqdnTarget>,
    |c, i| c.list_active_fqdn_targets(&i.id)
);
rpc_activity!(
    ListShardsByRole,
    "list_shards_by_role",
    CoreStoreAdapter,
    ShardRoleInput,
    Vec<Shard>,
    |c, i| c.list_shards_by_role(i.role)
);

rpc_activity!(
    UpdateResourceStatus,
    "update_resource_status",
    CoreStoreAdapter,
    UpdateResourceStatusInput,
    (),
    |c, i| c.update_resource_status(i)
);
rpc_activity!(
    UpdateTenantShardID,
    "update_tenant_shard_id",
    CoreStoreAdapter,
    TenantShardInput,
    (),
    |c, i| c.update_tenant_shard_id(&i.tenant_id, &i.shard_id)
);
rpc_activity!(
    UpdateBackupResult,
    "update_backup_result",
    CoreStoreAdapter,
    UpdateBackupResultInput,
    (),
    |c, i| c.update_backup_result(i)
);
rpc_activity!(
    CreateIncident,
    "create_incident",
    CoreStoreAdapter,
    CreateIncidentInput,
    CreateIncidentResult,
    |c, i| c.create_incident(i)
);
rpc_activity!(
    AutoResolveIncidents,
    "auto_resolve_incidents",
    CoreStoreAdapter,
    AutoResolveIncidentsInput,
    (),
    |c, i| c.auto_resolve_incidents(i)
);
rpc_activity!(
    EscalateIncident,
    "escalate_incident",
    CoreStoreAdapter,
    EscalateIncidentInput,
    (),
    |c, i| c.escalate_incident(&i.incident_id, &i.reason)
);
rpc_activity!(
    ClaimIncidentForAgent,
    "claim_incident_for_agent",
    CoreStoreAdapter,
    IdInput,
    bool,
    |c, i| c.claim_incident_for_agent(&i.id)
);
rpc_activity!(
    UpdateNodeGrpcAddress,
    "update_node_grpc_address",
    CoreStoreAdapter,
    GrpcAddressInput,
    (),
    |c, i| c.update_node_grpc_address(&i.node_id, &i.grpc_address)
);
rpc_activity!(
    DeleteResource,
    "delete_resource",
    CoreStoreAdapter,
    DeleteResourceInput,
    (),
    |c, i| c.delete_resource(&i.table, &i.id)
);
rpc_activity!(
    DeleteAuditLogsOlderThan,
    "delete_audit_logs_older_than",
    CoreStoreAdapter,
    StaleSince,
    u64,
    |c, i| c.delete_audit_logs_older_than(i.before)
);
