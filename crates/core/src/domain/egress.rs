use serde::{Deserialize, Serialize};

use super::{Resource, ResourceMeta, ResourceStatus};

/// Tenant-scoped nftables egress rule. The full active rule set for a
/// tenant is pushed to every shard node atomically per tenant UID; rules
/// marked `deleting` are hard-deleted on sync rather than soft-retired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantEgressRule {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub tenant_id: String,
    pub destination_cidr: String,
    pub port_range: Option<String>,
    pub protocol: String,
}

impl Resource for TenantEgressRule {
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
