use serde::{Deserialize, Serialize};

use super::{Resource, ResourceMeta, ResourceStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Bucket {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub tenant_id: String,
    pub shard_id: String,
    pub name: String,
}

impl Resource for S3Bucket {
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
pub struct S3AccessKey {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub bucket_id: String,
    /// The secret itself is never stored in the orchestrator's domain
    /// model; only the access key id and a reference to where the agent
    /// keeps the secret are tracked here.
    pub access_key_id: String,
}

impl Resource for S3AccessKey {
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
