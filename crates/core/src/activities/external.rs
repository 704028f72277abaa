//! External services activity surface
//!
//! Everything here talks to something other than a node agent, the core
//! store, DNS, or mail: tenant-facing webhooks, provisioning callbacks, and
//! the container lifecycle calls node provisioning drives before a node
//! exists to host an agent of its own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSelection {
    pub node_id: String,
    pub hostname: String,
}

#[async_trait]
pub trait ExternalServices: Send + Sync {
    async fn send_webhook(&self, url: &str, payload: serde_json::Value) -> Result<(), CoreError>;

    /// Delivers a `TenantProvisionWorkflow` callback. Callers apply their
    /// own exponential backoff around repeated calls; this method itself
    /// makes exactly one attempt.
    async fn send_callback(&self, url: &str, payload: serde_json::Value) -> Result<(), CoreError>;

    async fn select_host_for_node(&self, shard_id: &str) -> Result<HostSelection, CoreError>;

    async fn pull_image(&self, host: &str, image: &str) -> Result<(), CoreError>;
    async fn create_container(&self, host: &str, node_id: &str, image: &str) -> Result<String, CoreError>;
    async fn stop_container(&self, host: &str, container_id: &str) -> Result<(), CoreError>;
    async fn remove_container(&self, host: &str, container_id: &str) -> Result<(), CoreError>;
    async fn wait_for_healthy(&self, host: &str, container_id: &str) -> Result<(), CoreError>;
}
