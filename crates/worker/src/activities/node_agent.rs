//! Node agent adapter and activity bindings
//!
//! A worker process that claims tasks off a `node:<id>` queue talks to the
//! agent running on that same node over a fixed local address; `node_id` is
//! carried in each request body for the agent to assert against, not used
//! for routing (routing already happened at task-queue claim time).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use hosting_core::activities::{ConfigureReplicationInput, CreatedSecret, DiskUsage, NodeAgent, ReplicationStatus};
use hosting_core::domain::{
    CronJob, Daemon, Database, DatabaseUser, SshKey, Tenant, TenantEgressRule, ValkeyInstance,
    ValkeyUser, Webroot,
};
use hosting_core::error::CoreError;

use super::binding::rpc_activity;
use super::http::RpcClient;

pub struct NodeAgentAdapter {
    rpc: RpcClient,
}

impl NodeAgentAdapter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { rpc: RpcClient::new(base_url) }
    }
}

#[async_trait]
impl NodeAgent for NodeAgentAdapter {
    async fn create_tenant(&self, node_id: &str, tenant: &Tenant) -> Result<(), CoreError> {
        self.rpc.call("create_tenant", &(node_id, tenant)).await
    }

    async fn create_webroot(&self, node_id: &str, webroot: &Webroot) -> Result<(), CoreError> {
        self.rpc.call("create_webroot", &(node_id, webroot)).await
    }
    async fn update_webroot(&self, node_id: &str, webroot: &Webroot) -> Result<(), CoreError> {
        self.rpc.call("update_webroot", &(node_id, webroot)).await
    }
    async fn delete_webroot(&self, node_id: &str, webroot_id: &str) -> Result<(), CoreError> {
        self.rpc.call("delete_webroot", &(node_id, webroot_id)).await
    }

    async fn create_mysql_backup(
        &self,
        node_id: &str,
        database: &Database,
        storage_path: &str,
    ) -> Result<u64, CoreError> {
        self.rpc.call("create_mysql_backup", &(node_id, database, storage_path)).await
    }
    async fn restore_mysql_backup(
        &self,
        node_id: &str,
        database: &Database,
        storage_path: &str,
    ) -> Result<(), CoreError> {
        self.rpc.call("restore_mysql_backup", &(node_id, database, storage_path)).await
    }
    async fn create_web_backup(
        &self,
        node_id: &str,
        webroot: &Webroot,
        storage_path: &str,
    ) -> Result<u64, CoreError> {
        self.rpc.call("create_web_backup", &(node_id, webroot, storage_path)).await
    }
    async fn restore_web_backup(
        &self,
        node_id: &str,
        webroot: &Webroot,
        storage_path: &str,
    ) -> Result<(), CoreError> {
        self.rpc.call("restore_web_backup", &(node_id, webroot, storage_path)).await
    }
    async fn delete_backup_file(&self, node_id: &str, storage_path: &str) -> Result<(), CoreError> {
        self.rpc.call("delete_backup_file", &(node_id, storage_path)).await
    }

    async fn create_database(&self, node_id: &str, database: &Database) -> Result<(), CoreError> {
        self.rpc.call("create_database", &(node_id, database)).await
    }
    async fn create_database_user(
        &self,
        node_id: &str,
        user: &DatabaseUser,
        password_ref: &str,
    ) -> Result<(), CoreError> {
        self.rpc.call("create_database_user", &(node_id, user, password_ref)).await
    }
    async fn sync_database_user_hosts(&self, node_id: &str, user: &DatabaseUser) -> Result<(), CoreError> {
        self.rpc.call("sync_database_user_hosts", &(node_id, user)).await
    }
    async fn set_read_only(&self, node_id: &str, database_id: &str, read_only: bool) -> Result<(), CoreError> {
        self.rpc.call("set_read_only", &(node_id, database_id, read_only)).await
    }
    async fn configure_replication(
        &self,
        node_id: &str,
        input: ConfigureReplicationInput,
    ) -> Result<(), CoreError> {
        self.rpc.call("configure_replication", &(node_id, input)).await
    }
    async fn get_replication_status(
        &self,
        node_id: &str,
        database_id: &str,
    ) -> Result<ReplicationStatus, CoreError> {
        self.rpc.call("get_replication_status", &(node_id, database_id)).await
    }

    async fn create_valkey_instance(&self, node_id: &str, instance: &ValkeyInstance) -> Result<(), CoreError> {
        self.rpc.call("create_valkey_instance", &(node_id, instance)).await
    }
    async fn create_valkey_user(
        &self,
        node_id: &str,
        user: &ValkeyUser,
        password_ref: &str,
    ) -> Result<(), CoreError> {
        self.rpc.call("create_valkey_user", &(node_id, user, password_ref)).await
    }
    async fn delete_valkey_instance(&self, node_id: &str, instance_id: &str) -> Result<(), CoreError> {
        self.rpc.call("delete_valkey_instance", &(node_id, instance_id)).await
    }

    async fn sync_ssh_keys(&self, node_id: &str, tenant_id: &str, keys: &[SshKey]) -> Result<(), CoreError> {
        self.rpc.call("sync_ssh_keys", &(node_id, tenant_id, keys)).await
    }
    async fn sync_ssh_config(&self, node_id: &str, tenant: &Tenant) -> Result<(), CoreError> {
        self.rpc.call("sync_ssh_config", &(node_id, tenant)).await
    }

    async fn sync_egress_rules(
        &self,
        node_id: &str,
        tenant_id: &str,
        rules: &[TenantEgressRule],
    ) -> Result<(), CoreError> {
        self.rpc.call("sync_egress_rules", &(node_id, tenant_id, rules)).await
    }
    async fn configure_tenant_addresses(&self, node_id: &str, tenant: &Tenant) -> Result<(), CoreError> {
        self.rpc.call("configure_tenant_addresses", &(node_id, tenant)).await
    }
    async fn configure_ula_routes(&self, node_id: &str, tenant_ula: &str) -> Result<(), CoreError> {
        self.rpc.call("configure_ula_routes", &(node_id, tenant_ula)).await
    }

    async fn create_daemon_config(&self, node_id: &str, daemon: &Daemon) -> Result<(), CoreError> {
        self.rpc.call("create_daemon_config", &(node_id, daemon)).await
    }
    async fn update_daemon_config(&self, node_id: &str, daemon: &Daemon) -> Result<(), CoreError> {
        self.rpc.call("update_daemon_config", &(node_id, daemon)).await
    }
    async fn delete_daemon_config(&self, node_id: &str, daemon_id: &str) -> Result<(), CoreError> {
        self.rpc.call("delete_daemon_config", &(node_id, daemon_id)).await
    }
    async fn enable_daemon(&self, node_id: &str, daemon_id: &str) -> Result<(), CoreError> {
        self.rpc.call("enable_daemon", &(node_id, daemon_id)).await
    }
    async fn disable_daemon(&self, node_id: &str, daemon_id: &str) -> Result<(), CoreError> {
        self.rpc.call("disable_daemon", &(node_id, daemon_id)).await
    }

    async fn create_cron_job_units(&self, node_id: &str, job: &CronJob) -> Result<(), CoreError> {
        self.rpc.call("create_cron_job_units", &(node_id, job)).await
    }
    async fn enable_cron_job_timer(&self, node_id: &str, job_id: &str, enabled: bool) -> Result<(), CoreError> {
        self.rpc.call("enable_cron_job_timer", &(node_id, job_id, enabled)).await
    }

    async fn clean_orphaned_configs(&self, node_id: &str, live_ids: &[String]) -> Result<(), CoreError> {
        self.rpc.call("clean_orphaned_configs", &(node_id, live_ids)).await
    }
    async fn clean_orphaned_fpm_pools(&self, node_id: &str, live_webroot_ids: &[String]) -> Result<(), CoreError> {
        self.rpc.call("clean_orphaned_fpm_pools", &(node_id, live_webroot_ids)).await
    }

    async fn reload_nginx(&self, node_id: &str) -> Result<(), CoreError> {
        self.rpc.call("reload_nginx", &node_id).await
    }
    async fn reload_php_fpm(&self, node_id: &str) -> Result<(), CoreError> {
        self.rpc.call("reload_php_fpm", &node_id).await
    }

    async fn get_disk_usage(&self, node_id: &str) -> Result<DiskUsage, CoreError> {
        self.rpc.call("get_disk_usage", &node_id).await
    }

    async fn create_s3_access_key(&self, node_id: &str, bucket_id: &str) -> Result<CreatedSecret, CoreError> {
        self.rpc.call("create_s3_access_key", &(node_id, bucket_id)).await
    }
    async fn delete_s3_access_key(&self, node_id: &str, access_key_id: &str) -> Result<(), CoreError> {
        self.rpc.call("delete_s3_access_key", &(node_id, access_key_id)).await
    }

    async fn set_lb_map_entry(
        &self,
        node_id: &str,
        backend: &str,
        hostname: &str,
        target: &str,
    ) -> Result<(), CoreError> {
        self.rpc.call("set_lb_map_entry", &(node_id, backend, hostname, target)).await
    }
}

// ---------------------------------------------------------------------
// Wire input/output shapes and activity bindings
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTenantInput {
    pub node_id: String,
    pub tenant: Tenant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebrootInput {
    pub node_id: String,
    pub webroot: Webroot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteWebrootInput {
    pub node_id: String,
    pub webroot_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MysqlBackupInput {
    pub node_id: String,
    pub database: Database,
    pub storage_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebBackupInput {
    pub node_id: String,
    pub webroot: Webroot,
    pub storage_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteBackupFileInput {
    pub node_id: String,
    pub storage_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDatabaseInput {
    pub node_id: String,
    pub database: Database,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDatabaseUserInput {
    pub node_id: String,
    pub user: DatabaseUser,
    pub password_ref: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncDatabaseUserHostsInput {
    pub node_id: String,
    pub user: DatabaseUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetReadOnlyInput {
    pub node_id: String,
    pub database_id: String,
    pub read_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigureReplicationWireInput {
    pub node_id: String,
    pub config: ConfigureReplicationInput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseRefInput {
    pub node_id: String,
    pub database_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateValkeyInstanceInput {
    pub node_id: String,
    pub instance: ValkeyInstance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateValkeyUserInput {
    pub node_id: String,
    pub user: ValkeyUser,
    pub password_ref: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteValkeyInstanceInput {
    pub node_id: String,
    pub instance_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSshKeysInput {
    pub node_id: String,
    pub tenant_id: String,
    pub keys: Vec<SshKey>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSshConfigInput {
    pub node_id: String,
    pub tenant: Tenant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEgressRulesInput {
    pub node_id: String,
    pub tenant_id: String,
    pub rules: Vec<TenantEgressRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigureTenantAddressesInput {
    pub node_id: String,
    pub tenant: Tenant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigureUlaRoutesInput {
    pub node_id: String,
    pub tenant_ula: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfigInput {
    pub node_id: String,
    pub daemon: Daemon,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonRefInput {
    pub node_id: String,
    pub daemon_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronJobUnitsInput {
    pub node_id: String,
    pub job: CronJob,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnableCronJobTimerInput {
    pub node_id: String,
    pub job_id: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanOrphanedConfigsInput {
    pub node_id: String,
    pub live_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanOrphanedFpmPoolsInput {
    pub node_id: String,
    pub live_webroot_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRefInput {
    pub node_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateS3AccessKeyInput {
    pub node_id: String,
    pub bucket_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteS3AccessKeyInput {
    pub node_id: String,
    pub access_key_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetLbMapEntryInput {
    pub node_id: String,
    pub backend: String,
    pub hostname: String,
    pub target: String,
}

rpc_activity!(CreateTenant, "create_tenant", NodeAgentAdapter, CreateTenantInput, (), |c, i| c
    .create_tenant(&i.node_id, &i.tenant));

rpc_activity!(CreateWebroot, "create_webroot", NodeAgentAdapter, WebrootInput, (), |c, i| c
    .create_webroot(&i.node_id, &i.webroot));
rpc_activity!(UpdateWebroot, "update_webroot", NodeAgentAdapter, WebrootInput, (), |c, i| c
    .update_webroot(&i.node_id, &i.webroot));
rpc_activity!(DeleteWebroot, "delete_webroot", NodeAgentAdapter, DeleteWebrootInput, (), |c, i| c
    .delete_webroot(&i.node_id, &i.webroot_id));

rpc_activity!(CreateMysqlBackup, "create_mysql_backup", NodeAgentAdapter, MysqlBackupInput, u64, |c, i| c
    .create_mysql_backup(&i.node_id, &i.database, &i.storage_path));
rpc_activity!(RestoreMysqlBackup, "restore_mysql_backup", NodeAgentAdapter, MysqlBackupInput, (), |c, i| c
    .restore_mysql_backup(&i.node_id, &i.database, &i.storage_path));
rpc_activity!(CreateWebBackup, "create_web_backup", NodeAgentAdapter, WebBackupInput, u64, |c, i| c
    .create_web_backup(&i.node_id, &i.webroot, &i.storage_path));
rpc_activity!(RestoreWebBackup, "restore_web_backup", NodeAgentAdapter, WebBackupInput, (), |c, i| c
    .restore_web_backup(&i.node_id, &i.webroot, &i.storage_path));
rpc_activity!(DeleteBackupFile, "delete_backup_file", NodeAgentAdapter, DeleteBackupFileInput, (), |c, i| c
    .delete_backup_file(&i.node_id, &i.storage_path));

rpc_activity!(CreateDatabase, "create_database", NodeAgentAdapter, CreateDatabaseInput, (), |c, i| c
    .create_database(&i.node_id, &i.database));
rpc_activity!(CreateDatabaseUser, "create_database_user", NodeAgentAdapter, CreateDatabaseUserInput, (), |c, i| c
    .create_database_user(&i.node_id, &i.user, &i.password_ref));
rpc_activity!(
    SyncDatabaseUserHosts,
    "sync_database_user_hosts",
    NodeAgentAdapter,
    SyncDatabaseUserHostsInput,
    (),
    |c, i| c.sync_database_user_hosts(&i.node_id, &i.user)
);
rpc_activity!(SetReadOnly, "set_read_only", NodeAgentAdapter, SetReadOnlyInput, (), |c, i| c
    .set_read_only(&i.node_id, &i.database_id, i.read_only));
rpc_activity!(
    ConfigureReplication,
    "configure_replication",
    NodeAgentAdapter,
    ConfigureReplicationWireInput,
    (),
    |c, i| c.configure_replication(&i.node_id, i.config)
);
rpc_activity!(
    GetReplicationStatus,
    "get_replication_status",
    NodeAgentAdapter,
    DatabaseRefInput,
    ReplicationStatus,
    |c, i| c.get_replication_status(&i.node_id, &i.database_id)
);

rpc_activity!(
    CreateValkeyInstance,
    "create_valkey_instance",
    NodeAgentAdapter,
    CreateValkeyInstanceInput,
    (),
    |c, i| c.create_valkey_instance(&i.node_id, &i.instance)
);
rpc_activity!(CreateValkeyUser, "create_valkey_user", NodeAgentAdapter, CreateValkeyUserInput, (), |c, i| c
    .create_valkey_user(&i.node_id, &i.user, &i.password_ref));
rpc_activity!(
    DeleteValkeyInstance,
    "delete_valkey_instance",
    NodeAgentAdapter,
    DeleteValkeyInstanceInput,
    (),
    |c, i| c.delete_valkey_instance(&i.node_id, &i.instance_id)
);

rpc_activity!(SyncSshKeys, "sync_ssh_keys", NodeAgentAdapter, SyncSshKeysInput, (), |c, i| c
    .sync_ssh_keys(&i.node_id, &i.tenant_id, &i.keys));
rpc_activity!(SyncSshConfig, "sync_ssh_config", NodeAgentAdapter, SyncSshConfigInput, (), |c, i| c
    .sync_ssh_config(&i.node_id, &i.tenant));

rpc_activity!(SyncEgressRules, "sync_egress_rules", NodeAgentAdapter, SyncEgressRulesInput, (), |c, i| c
    .sync_egress_rules(&i.node_id, &i.tenant_id, &i.rules));
rpc_activity!(
    ConfigureTenantAddresses,
    "configure_tenant_addresses",
    NodeAgentAdapter,
    ConfigureTenantAddressesInput,
    (),
    |c, i| c.configure_tenant_addresses(&i.node_id, &i.tenant)
);
rpc_activity!(
    ConfigureUlaRoutes,
    "configure_ula_routes",
    NodeAgentAdapter,
    ConfigureUlaRoutesInput,
    (),
    |c, i| c.configure_ula_routes(&i.node_id, &i.tenant_ula)
);

rpc_activity!(CreateDaemonConfig, "create_daemon_config", NodeAgentAdapter, DaemonConfigInput, (), |c, i| c
    .create_daemon_config(&i.node_id, &i.daemon));
rpc_activity!(UpdateDaemonConfig, "update_daemon_config", NodeAgentAdapter, DaemonConfigInput, (), |c, i| c
    .update_daemon_config(&i.node_id, &i.daemon));
rpc_activity!(DeleteDaemonConfig, "delete_daemon_config", NodeAgentAdapter, DaemonRefInput, (), |c, i| c
    .delete_daemon_config(&i.node_id, &i.daemon_id));
rpc_activity!(EnableDaemon, "enable_daemon", NodeAgentAdapter, DaemonRefInput, (), |c, i| c
    .enable_daemon(&i.node_id, &i.daemon_id));
rpc_activity!(DisableDaemon, "disable_daemon", NodeAgentAdapter, DaemonRefInput, (), |c, i| c
    .disable_daemon(&i.node_id, &i.daemon_id));

rpc_activity!(CreateCronJobUnits, "create_cron_job_units", NodeAgentAdapter, CronJobUnitsInput, (), |c, i| c
    .create_cron_job_units(&i.node_id, &i.job));
rpc_activity!(
    EnableCronJobTimer,
    "enable_cron_job_timer",
    NodeAgentAdapter,
    EnableCronJobTimerInput,
    (),
    |c, i| c.enable_cron_job_timer(&i.node_id, &i.job_id, i.enabled)
);

rpc_activity!(
    CleanOrphanedConfigs,
    "clean_orphaned_configs",
    NodeAgentAdapter,
    CleanOrphanedConfigsInput,
    (),
    |c, i| c.clean_orphaned_configs(&i.node_id, &i.live_ids)
);
rpc_activity!(
    CleanOrphanedFpmPools,
    "clean_orphaned_fpm_pools",
    NodeAgentAdapter,
    CleanOrphanedFpmPoolsInput,
    (),
    |c, i| c.clean_orphaned_fpm_pools(&i.node_id, &i.live_webroot_ids)
);

rpc_activity!(ReloadNginx, "reload_nginx", NodeAgentAdapter, NodeRefInput, (), |c, i| c
    .reload_nginx(&i.node_id));
rpc_activity!(ReloadPhpFpm, "reload_php_fpm", NodeAgentAdapter, NodeRefInput, (), |c, i| c
    .reload_php_fpm(&i.node_id));

rpc_activity!(GetDiskUsage, "get_disk_usage", NodeAgentAdapter, NodeRefInput, DiskUsage, |c, i| c
    .get_disk_usage(&i.node_id));

rpc_activity!(
    CreateS3AccessKey,
    "create_s3_access_key",
    NodeAgentAdapter,
    CreateS3AccessKeyInput,
    CreatedSecret,
    |c, i| c.create_s3_access_key(&i.node_id, &i.bucket_id)
);
rpc_activity!(
    DeleteS3AccessKey,
    "delete_s3_access_key",
    NodeAgentAdapter,
    DeleteS3AccessKeyInput,
    (),
    |c, i| c.delete_s3_access_key(&i.node_id, &i.access_key_id)
);

rpc_activity!(SetLbMapEntry, "set_lb_map_entry", NodeAgentAdapter, SetLbMapEntryInput, (), |c, i| c
    .set_lb_map_entry(&i.node_id, &i.backend, &i.hostname, &i.target));
