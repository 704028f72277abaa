//! External services adapter and activity bindings
//!
//! Only `select_host_for_node` goes to a fixed collaborator (the scheduler);
//! everything else is addressed per call — a tenant's own webhook URL, a
//! callback URL handed out at provisioning time, or a specific Docker host
//! picked by `select_host_for_node` earlier in the same workflow.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use hosting_core::activities::{ExternalServices, HostSelection};
use hosting_core::error::CoreError;

use super::binding::rpc_activity;
use super::http::RpcClient;

pub struct ExternalServicesAdapter {
    rpc: RpcClient,
}

impl ExternalServicesAdapter {
    pub fn new(scheduler_base_url: impl Into<String>) -> Self {
        Self { rpc: RpcClient::new(scheduler_base_url) }
    }
}

#[async_trait]
impl ExternalServices for ExternalServicesAdapter {
    async fn send_webhook(&self, url: &str, payload: Value) -> Result<(), CoreError> {
        self.rpc.call_url(url, &payload).await
    }

    async fn send_callback(&self, url: &str, payload: Value) -> Result<(), CoreError> {
        self.rpc.call_url(url, &payload).await
    }

    async fn select_host_for_node(&self, shard_id: &str) -> Result<HostSelection, CoreError> {
        self.rpc.call("select_host_for_node", &shard_id).await
    }

    async fn pull_image(&self, host: &str, image: &str) -> Result<(), CoreError> {
        self.rpc.call_url(&format!("{host}/containers/pull"), &image).await
    }

    async fn create_container(&self, host: &str, node_id: &str, image: &str) -> Result<String, CoreError> {
        self.rpc
            .call_url(&format!("{host}/containers/create"), &(node_id, image))
            .await
    }

    async fn stop_container(&self, host: &str, container_id: &str) -> Result<(), CoreError> {
        self.rpc.call_url(&format!("{host}/containers/stop"), &container_id).await
    }

    async fn remove_container(&self, host: &str, container_id: &str) -> Result<(), CoreError> {
        self.rpc.call_url(&format!("{host}/containers/remove"), &container_id).await
    }

    async fn wait_for_healthy(&self, host: &str, container_id: &str) -> Result<(), CoreError> {
        self.rpc
            .call_url(&format!("{host}/containers/wait-healthy"), &container_id)
            .await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookInput {
    pub url: String,
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectHostInput {
    pub shard_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullImageInput {
    pub host: String,
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContainerInput {
    pub host: String,
    pub node_id: String,
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerRefInput {
    pub host: String,
    pub container_id: String,
}

rpc_activity!(SendWebhook, "send_webhook", ExternalServicesAdapter, WebhookInput, (), |c, i| c
    .send_webhook(&i.url, i.payload));
rpc_activity!(SendCallback, "send_callback", ExternalServicesAdapter, WebhookInput, (), |c, i| c
    .send_callback(&i.url, i.payload));
rpc_activity!(
    SelectHostForNode,
    "select_host_for_node",
    ExternalServicesAdapter,
    SelectHostInput,
    HostSelection,
    |c, i| c.select_host_for_node(&i.shard_id)
);
rpc_activity!(PullImage, "pull_image", ExternalServicesAdapter, PullImageInput, (), |c, i| c
    .pull_image(&i.host, &i.image));
rpc_activity!(
    CreateContainer,
    "create_container",
    ExternalServicesAdapter,
    CreateContainerInput,
    String,
    |c, i| c.create_container(&i.host, &i.node_id, &i.image)
);
rpc_activity!(
    StopContainer,
    "stop_container",
    ExternalServicesAdapter,
    ContainerRefInput,
    (),
    |c, i| c.stop_container(&i.host, &i.container_id)
);
rpc_activity!(
    RemoveContainer,
    "remove_container",
    ExternalServicesAdapter,
    ContainerRefInput,
    (),
    |c, i| c.remove_container(&i.host, &i.container_id)
);
rpc_activity!(
    WaitForHealthy,
    "wait_for_healthy",
    ExternalServicesAdapter,
    ContainerRefInput,
    (),
    |c, i| c.wait_for_healthy(&i.host, &i.container_id)
);
