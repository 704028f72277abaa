use serde::{Deserialize, Serialize};

use super::{Resource, ResourceMeta, ResourceStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub name: String,
    /// PowerDNS zone/domain id; `0` means the backend has no such zone.
    pub backend_domain_id: u64,
}

impl Resource for Zone {
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

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ZoneRecordManagedBy {
    /// Written by a provisioning workflow; overrides any auto record with
    /// the same `(name, type)`.
    Custom,
    /// Generated automatically (e.g. from webroot/FQDN creation); suppressed
    /// while a custom record with the same key is active.
    Auto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneRecord {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub zone_id: String,
    pub name: String,
    pub record_type: String,
    pub value: String,
    pub managed_by: ZoneRecordManagedBy,
    /// Auto records are deactivated (not deleted) while a custom override is
    /// active; this tracks that suppression independent of `status`.
    pub active: bool,
}

impl Resource for ZoneRecord {
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
