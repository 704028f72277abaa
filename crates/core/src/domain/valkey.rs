use serde::{Deserialize, Serialize};

use super::{Resource, ResourceMeta, ResourceStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValkeyInstance {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub tenant_id: String,
    pub shard_id: String,
    pub name: String,
    pub max_memory_mb: u32,
}

impl Resource for ValkeyInstance {
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
pub struct ValkeyUser {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub instance_id: String,
    pub username: String,
}

impl Resource for ValkeyUser {
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
