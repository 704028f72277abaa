use serde::{Deserialize, Serialize};

use super::{Resource, ResourceMeta, ResourceStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Webroot {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub tenant_id: String,
    pub name: String,
    pub runtime: String,
    pub runtime_version: String,
    /// Opaque runtime-specific configuration blob, passed through unparsed.
    pub runtime_config: serde_json::Value,
    pub public_folder: String,
    pub env_file_name: String,
    pub env_shell_source: bool,
}

impl Resource for Webroot {
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

/// Fully-qualified hostname, optionally bound to a webroot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fqdn {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub hostname: String,
    pub webroot_id: Option<String>,
    pub ssl_enabled: bool,
    /// `None` until a certificate has been issued.
    pub tls_cert_expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Resource for Fqdn {
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
