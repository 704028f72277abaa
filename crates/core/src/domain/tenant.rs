use serde::{Deserialize, Serialize};

use super::{Resource, ResourceMeta, ResourceStatus};

/// A tenant may be unassigned (no shard); resource workflows on an
/// unassigned tenant fail fast with a validation error rather than blocking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub name: String,
    /// Numeric UID, used for ULA address derivation.
    pub uid: u32,
    pub shard_id: Option<String>,
    pub cluster_id: String,
    pub sftp_enabled: bool,
    pub ssh_enabled: bool,
    pub disk_quota_bytes: u64,
}

impl Resource for Tenant {
    fn id(&self) -> &str {
        &self.meta.id
    }
    fn status(&self) -> ResourceStatus {
        self.meta.status
    }
    fn status_message(&self) -> Option<&str> {
        self.meta.status_message.as_deref()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShardRole {
    Web,
    Database,
    Valkey,
    Lb,
    Dns,
    Email,
    Storage,
    Dbadmin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shard {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub name: String,
    pub role: ShardRole,
    pub cluster_id: String,
    /// Load balancer backend pool name, set only for `role == Lb`.
    pub lb_backend: Option<String>,
}

impl Resource for Shard {
    fn id(&self) -> &str {
        &self.meta.id
    }
    fn status(&self) -> ResourceStatus {
        self.meta.status
    }
    fn status_message(&self) -> Option<&str> {
        self.meta.status_message.as_deref()
    }
}

/// Nodes within a shard are interchangeable except where a shard role
/// designates a primary (database) or a daemon is pinned to a specific node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub cluster_id: String,
    pub shard_id: String,
    /// Small non-negative integer used in ULA derivation; `None` until the
    /// node has been assigned a position within its shard.
    pub shard_index: Option<u16>,
    pub hostname: String,
    pub ip_address: Option<String>,
    pub ip6_address: Option<String>,
    pub grpc_address: Option<String>,
    pub last_health_at: Option<chrono::DateTime<chrono::Utc>>,
}
