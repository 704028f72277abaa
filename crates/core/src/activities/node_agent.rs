//! Node agent activity surface
//!
//! Every method here is dispatched to a specific node's gRPC agent
//! (`node_task_queue(node_id)` in the worker's queue routing), never the
//! general queue: the agent is the only process with filesystem and
//! container runtime access on that host.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{
    CronJob, Daemon, Database, DatabaseUser, SshKey, Tenant, TenantEgressRule, ValkeyInstance,
    ValkeyUser, Webroot,
};
use crate::error::CoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskUsage {
    pub used_bytes: u64,
    pub total_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationStatus {
    pub lag_seconds: Option<f64>,
    pub io_running: bool,
    pub sql_running: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigureReplicationInput {
    pub replica_database_id: String,
    pub primary_host: String,
    pub primary_port: u16,
    pub replication_user: String,
    pub replication_password_ref: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedSecret {
    pub access_key_id: String,
    pub secret_ref: String,
}

#[async_trait]
pub trait NodeAgent: Send + Sync {
    async fn create_tenant(&self, node_id: &str, tenant: &Tenant) -> Result<(), CoreError>;

    async fn create_webroot(&self, node_id: &str, webroot: &Webroot) -> Result<(), CoreError>;
    async fn update_webroot(&self, node_id: &str, webroot: &Webroot) -> Result<(), CoreError>;
    async fn delete_webroot(&self, node_id: &str, webroot_id: &str) -> Result<(), CoreError>;

    async fn create_mysql_backup(
        &self,
        node_id: &str,
        database: &Database,
        storage_path: &str,
    ) -> Result<u64, CoreError>;
    async fn restore_mysql_backup(
        &self,
        node_id: &str,
        database: &Database,
        storage_path: &str,
    ) -> Result<(), CoreError>;
    async fn create_web_backup(
        &self,
        node_id: &str,
        webroot: &Webroot,
        storage_path: &str,
    ) -> Result<u64, CoreError>;
    async fn restore_web_backup(
        &self,
        node_id: &str,
        webroot: &Webroot,
        storage_path: &str,
    ) -> Result<(), CoreError>;
    async fn delete_backup_file(&self, node_id: &str, storage_path: &str) -> Result<(), CoreError>;

    async fn create_database(&self, node_id: &str, database: &Database) -> Result<(), CoreError>;
    async fn create_database_user(
        &self,
        node_id: &str,
        user: &DatabaseUser,
        password_ref: &str,
    ) -> Result<(), CoreError>;
    async fn sync_database_user_hosts(
        &self,
        node_id: &str,
        user: &DatabaseUser,
    ) -> Result<(), CoreError>;
    async fn set_read_only(&self, node_id: &str, database_id: &str, read_only: bool) -> Result<(), CoreError>;
    async fn configure_replication(
        &self,
        node_id: &str,
        input: ConfigureReplicationInput,
    ) -> Result<(), CoreError>;
    async fn get_replication_status(
        &self,
        node_id: &str,
        database_id: &str,
    ) -> Result<ReplicationStatus, CoreError>;

    async fn create_valkey_instance(
        &self,
        node_id: &str,
        instance: &ValkeyInstance,
    ) -> Result<(), CoreError>;
    async fn create_valkey_user(
        &self,
        node_id: &str,
        user: &ValkeyUser,
        password_ref: &str,
    ) -> Result<(), CoreError>;
    async fn delete_valkey_instance(&self, node_id: &str, instance_id: &str) -> Result<(), CoreError>;

    async fn sync_ssh_keys(&self, node_id: &str, tenant_id: &str, keys: &[SshKey]) -> Result<(), CoreError>;
    async fn sync_ssh_config(&self, node_id: &str, tenant: &Tenant) -> Result<(), CoreError>;

    async fn sync_egress_rules(
        &self,
        node_id: &str,
        tenant_id: &str,
        rules: &[TenantEgressRule],
    ) -> Result<(), CoreError>;
    async fn configure_tenant_addresses(&self, node_id: &str, tenant: &Tenant) -> Result<(), CoreError>;
    async fn configure_ula_routes(&self, node_id: &str, tenant_ula: &str) -> Result<(), CoreError>;

    async fn create_daemon_config(&self, node_id: &str, daemon: &Daemon) -> Result<(), CoreError>;
    async fn update_daemon_config(&self, node_id: &str, daemon: &Daemon) -> Result<(), CoreError>;
    async fn delete_daemon_config(&self, node_id: &str, daemon_id: &str) -> Result<(), CoreError>;
    async fn enable_daemon(&self, node_id: &str, daemon_id: &str) -> Result<(), CoreError>;
    async fn disable_daemon(&self, node_id: &str, daemon_id: &str) -> Result<(), CoreError>;

    async fn create_cron_job_units(&self, node_id: &str, job: &CronJob) -> Result<(), CoreError>;
    async fn enable_cron_job_timer(&self, node_id: &str, job_id: &str, enabled: bool) -> Result<(), CoreError>;

    /// Removes unit/config files for resources the node agent no longer
    /// recognizes from `live_ids`. Used by shard convergence to reconcile
    /// drift, never by a single-resource lifecycle workflow.
    async fn clean_orphaned_configs(&self, node_id: &str, live_ids: &[String]) -> Result<(), CoreError>;
    async fn clean_orphaned_fpm_pools(&self, node_id: &str, live_webroot_ids: &[String]) -> Result<(), CoreError>;

    async fn reload_nginx(&self, node_id: &str) -> Result<(), CoreError>;
    async fn reload_php_fpm(&self, node_id: &str) -> Result<(), CoreError>;

    async fn get_disk_usage(&self, node_id: &str) -> Result<DiskUsage, CoreError>;

    async fn create_s3_access_key(
        &self,
        node_id: &str,
        bucket_id: &str,
    ) -> Result<CreatedSecret, CoreError>;
    async fn delete_s3_access_key(&self, node_id: &str, access_key_id: &str) -> Result<(), CoreError>;

    async fn set_lb_map_entry(
        &self,
        node_id: &str,
        backend: &str,
        hostname: &str,
        target: &str,
    ) -> Result<(), CoreError>;
}
