use serde::{Deserialize, Serialize};

/// In-memory message enqueued on a `TenantProvisionWorkflow`'s `provision`
/// signal channel. This is the fixed payload schema for that signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionTask {
    pub workflow_name: String,
    pub workflow_id: String,
    pub arg: serde_json::Value,
    pub callback_url: Option<String>,
    pub resource_type: String,
    pub resource_id: String,
}
