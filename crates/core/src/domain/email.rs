use serde::{Deserialize, Serialize};

use super::{Resource, ResourceMeta, ResourceStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAccount {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub tenant_id: String,
    pub fqdn_id: String,
    pub local_part: String,
    pub quota_bytes: u64,
}

impl Resource for EmailAccount {
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
pub struct EmailAlias {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub account_id: String,
    pub alias: String,
}

impl Resource for EmailAlias {
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
pub struct EmailForward {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub account_id: String,
    pub destination: String,
    pub keep_copy: bool,
}

impl Resource for EmailForward {
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
pub struct EmailAutoReply {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub account_id: String,
    pub subject: String,
    pub body: String,
    pub enabled: bool,
}

impl Resource for EmailAutoReply {
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
