//! Core store activity surface
//!
//! Pure reads and idempotent writes against the relational store of
//! tenants, shards, nodes, and resources. On a missing row, reads return
//! `CoreError::validation` tagged as "not found" rather than panicking.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Backup, CronJob, Daemon, Database, DatabaseAccessRule, DatabaseUser, Fqdn, Incident, Node,
    Shard, ShardRole, Tenant, TenantEgressRule, ValkeyInstance, ValkeyUser, Webroot, Zone, ZoneRecord,
};
use crate::error::CoreError;

/// Everything a resource lifecycle workflow needs about a daemon in one
/// batched read: the daemon itself plus enough surrounding context to
/// validate and dispatch node-agent calls without a second round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonContext {
    pub daemon: Daemon,
    pub tenant: Tenant,
    pub webroot: Webroot,
    pub node: Node,
    pub shard_nodes: Vec<Node>,
    pub fqdns: Vec<Fqdn>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupContext {
    pub backup: Backup,
    pub tenant: Tenant,
    pub node: Node,
    pub shard_nodes: Vec<Node>,
    /// Present only for `BackupKind::Database` backups.
    pub database: Option<Database>,
    /// Present only for `BackupKind::Web` backups.
    pub webroot: Option<Webroot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseUserContext {
    pub user: DatabaseUser,
    pub database: Database,
    pub shard_nodes: Vec<Node>,
    pub rules: Vec<DatabaseAccessRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EgressContext {
    pub tenant: Tenant,
    pub shard_nodes: Vec<Node>,
    pub rules: Vec<TenantEgressRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneRecordContext {
    pub record: ZoneRecord,
    pub zone: Zone,
    pub siblings: Vec<ZoneRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StalwartContext {
    pub base_url: String,
    pub admin_token: String,
    pub fqdn: Fqdn,
}

/// Full desired state for a web shard's convergence hot path, loaded in one
/// round-trip rather than per-tenant/webroot queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardDesiredState {
    pub tenants: Vec<Tenant>,
    pub webroots_by_tenant: std::collections::HashMap<String, Vec<Webroot>>,
    pub fqdns_by_webroot: std::collections::HashMap<String, Vec<Fqdn>>,
    pub daemons_by_webroot: std::collections::HashMap<String, Vec<Daemon>>,
    pub cronjobs_by_webroot: std::collections::HashMap<String, Vec<CronJob>>,
}

/// Everything `ConvergeShardWorkflow` needs for a database shard's
/// primary-only create step and the per-replica replication check, loaded
/// in one round-trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseShardContext {
    pub databases: Vec<Database>,
    pub users_by_database: std::collections::HashMap<String, Vec<DatabaseUser>>,
}

/// Same shape for a valkey shard: every active instance plus its users,
/// all of which get pushed to every node in the shard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValkeyShardContext {
    pub instances: Vec<ValkeyInstance>,
    pub users_by_instance: std::collections::HashMap<String, Vec<ValkeyUser>>,
}

/// One FQDN's resolved LB target within a cluster: the hostname a
/// convergence pass maps to `target` (the webroot's node ULA, or another
/// stable address) on the LB shard's backend pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FqdnTarget {
    pub hostname: String,
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub system_prompt: String,
    /// Per-incident-type override of the follower concurrency cap.
    pub type_concurrency: std::collections::HashMap<String, usize>,
}

#[async_trait]
pub trait CoreStoreReads: Send + Sync {
    async fn get_tenant_by_id(&self, id: &str) -> Result<Tenant, CoreError>;
    async fn get_shard_by_id(&self, id: &str) -> Result<Shard, CoreError>;
    async fn list_nodes_by_shard(&self, shard_id: &str) -> Result<Vec<Node>, CoreError>;
    async fn list_databases_by_shard(&self, shard_id: &str) -> Result<Vec<Database>, CoreError>;
    async fn get_shard_desired_state(&self, shard_id: &str) -> Result<ShardDesiredState, CoreError>;
    async fn get_daemon_context(&self, daemon_id: &str) -> Result<DaemonContext, CoreError>;
    async fn get_backup_context(&self, backup_id: &str) -> Result<BackupContext, CoreError>;
    async fn get_zone_record_context(&self, record_id: &str) -> Result<ZoneRecordContext, CoreError>;
    async fn get_stalwart_context(&self, fqdn_id: &str) -> Result<StalwartContext, CoreError>;
    async fn get_database_user_context(&self, user_id: &str) -> Result<DatabaseUserContext, CoreError>;
    async fn get_egress_context(&self, tenant_id: &str) -> Result<EgressContext, CoreError>;
    async fn get_database_shard_context(&self, shard_id: &str) -> Result<DatabaseShardContext, CoreError>;
    async fn get_valkey_shard_context(&self, shard_id: &str) -> Result<ValkeyShardContext, CoreError>;
    async fn list_active_fqdn_targets(&self, cluster_id: &str) -> Result<Vec<FqdnTarget>, CoreError>;
    async fn list_unassigned_open_incidents(&self) -> Result<Vec<Incident>, CoreError>;
    async fn find_stale_investigating_incidents(
        &self,
        claimed_before: DateTime<Utc>,
    ) -> Result<Vec<Incident>, CoreError>;
    async fn list_shards_by_role(&self, role: ShardRole) -> Result<Vec<Shard>, CoreError>;
    async fn find_stale_converging_shards(
        &self,
        converging_since_before: DateTime<Utc>,
    ) -> Result<Vec<Shard>, CoreError>;
    async fn find_unhealthy_nodes(
        &self,
        last_health_before: DateTime<Utc>,
    ) -> Result<Vec<Node>, CoreError>;
    async fn find_certs_near_expiry(
        &self,
        expiring_before: DateTime<Utc>,
    ) -> Result<Vec<Fqdn>, CoreError>;
    async fn find_backups_past_retention(
        &self,
        completed_before: DateTime<Utc>,
    ) -> Result<Vec<Backup>, CoreError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateResourceStatusInput {
    pub table: String,
    pub id: String,
    pub status: crate::domain::ResourceStatus,
    pub status_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBackupResultInput {
    pub backup_id: String,
    pub storage_path: String,
    pub size_bytes: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIncidentInput {
    pub dedupe_key: String,
    pub incident_type: String,
    pub severity: crate::domain::IncidentSeverity,
    pub title: String,
    pub detail: String,
    pub source: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIncidentResult {
    pub id: String,
    /// `false` when the call matched an existing row by `dedupe_key`.
    pub created: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoResolveIncidentsInput {
    pub resource_type: String,
    pub resource_id: String,
    pub type_prefix: String,
    pub resolution: String,
}

#[async_trait]
pub trait CoreStoreWrites: Send + Sync {
    async fn update_resource_status(&self, input: UpdateResourceStatusInput) -> Result<(), CoreError>;
    async fn update_tenant_shard_id(&self, tenant_id: &str, shard_id: &str) -> Result<(), CoreError>;
    async fn update_backup_result(&self, input: UpdateBackupResultInput) -> Result<(), CoreError>;
    async fn update_node_grpc_address(&self, node_id: &str, grpc_address: &str) -> Result<(), CoreError>;

    /// Hard-delete a row rather than marking it `deleted`. Used where a
    /// soft-deleted row would otherwise keep colliding with dedupe/uniqueness
    /// rules (egress rules, superseded zone records).
    async fn delete_resource(&self, table: &str, id: &str) -> Result<(), CoreError>;
    async fn delete_audit_logs_older_than(&self, before: DateTime<Utc>) -> Result<u64, CoreError>;

    /// Must upsert on `dedupe_key`: two calls with the same key return the
    /// same `id`, and `created` is `true` on at most one of them.
    async fn create_incident(
        &self,
        input: CreateIncidentInput,
    ) -> Result<CreateIncidentResult, CoreError>;

    async fn auto_resolve_incidents(&self, input: AutoResolveIncidentsInput) -> Result<(), CoreError>;
    async fn escalate_incident(&self, incident_id: &str, reason: &str) -> Result<(), CoreError>;

    /// Linearizable single-winner claim: under N parallel claims of the
    /// same id, exactly one call returns `true`.
    async fn claim_incident_for_agent(&self, incident_id: &str) -> Result<bool, CoreError>;
}
