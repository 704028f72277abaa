use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Resource, ResourceMeta, ResourceStatus};

/// Long-running process bound to a tenant+webroot, pinned to a single node.
///
/// Invariant: `proxy_path` and `proxy_port` are both present or both
/// absent. When present, the webroot's reverse proxy must expose the
/// daemon at `proxy_path -> http://<tenant-ULA>:<proxy_port>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Daemon {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub tenant_id: String,
    pub webroot_id: String,
    pub node_id: String,
    pub command: String,
    pub num_procs: u32,
    pub stop_signal: String,
    pub stop_wait_secs: u32,
    pub max_memory_mb: Option<u32>,
    pub environment: HashMap<String, String>,
    pub proxy_path: Option<String>,
    pub proxy_port: Option<u16>,
}

impl Daemon {
    /// `proxy_path ⇔ proxy_port` (§3 invariant).
    pub fn has_consistent_proxy(&self) -> bool {
        self.proxy_path.is_some() == self.proxy_port.is_some()
    }
}

impl Resource for Daemon {
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

/// Schedule + command bound to a tenant+webroot, replicated to all shard
/// nodes. Single-execution is enforced on the agent side via a shared-FS
/// lock, not the orchestrator's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronJob {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub tenant_id: String,
    pub webroot_id: String,
    pub schedule: String,
    pub command: String,
    pub enabled: bool,
}

impl Resource for CronJob {
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn daemon_with(proxy_path: Option<&str>, proxy_port: Option<u16>) -> Daemon {
        Daemon {
            meta: super::ResourceMeta::new("d1", Utc::now()),
            tenant_id: "t1".into(),
            webroot_id: "wr1".into(),
            node_id: "n1".into(),
            command: "node server.js".into(),
            num_procs: 1,
            stop_signal: "SIGTERM".into(),
            stop_wait_secs: 10,
            max_memory_mb: None,
            environment: HashMap::new(),
            proxy_path: proxy_path.map(String::from),
            proxy_port,
        }
    }

    #[test]
    fn consistent_when_both_set() {
        assert!(daemon_with(Some("/api"), Some(3000)).has_consistent_proxy());
    }

    #[test]
    fn consistent_when_both_absent() {
        assert!(daemon_with(None, None).has_consistent_proxy());
    }

    #[test]
    fn inconsistent_when_only_one_set() {
        assert!(!daemon_with(Some("/api"), None).has_consistent_proxy());
        assert!(!daemon_with(None, Some(3000)).has_consistent_proxy());
    }
}
