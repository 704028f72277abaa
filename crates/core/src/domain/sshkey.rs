use serde::{Deserialize, Serialize};

use super::{Resource, ResourceMeta, ResourceStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshKey {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub tenant_id: String,
    pub public_key: String,
    pub comment: Option<String>,
}

impl Resource for SshKey {
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
