//! Incident agent adapter and activity bindings
//!
//! `get_agent_config` and `assemble_incident_context` are core-store reads,
//! routed the same way every other core-store call is. `investigate_incident`
//! is the one LLM-backed call in the system, built the same way the old
//! chat-completion providers called out to a model API: a bare
//! `reqwest::Client`, an API key read once at startup, one POST per call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use hosting_core::activities::{
    AgentConfig, IncidentAgent, IncidentContext, InvestigationResult,
};
use hosting_core::domain::Incident;
use hosting_core::error::CoreError;

use super::binding::rpc_activity;
use super::http::RpcClient;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct IncidentAgentAdapter {
    core_store: RpcClient,
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl IncidentAgentAdapter {
    pub fn new(core_store_base_url: impl Into<String>, api_key: String, model: String) -> Self {
        Self {
            core_store: RpcClient::new(core_store_base_url),
            http: reqwest::Client::new(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl IncidentAgent for IncidentAgentAdapter {
    async fn get_agent_config(&self) -> Result<AgentConfig, CoreError> {
        self.core_store.call("get_agent_config", &()).await
    }

    async fn assemble_incident_context(&self, incident: &Incident) -> Result<IncidentContext, CoreError> {
        self.core_store.call("assemble_incident_context", &incident).await
    }

    async fn investigate_incident(
        &self,
        config: &AgentConfig,
        context: &IncidentContext,
    ) -> Result<InvestigationResult, CoreError> {
        let user_content = serde_json::to_string(context)
            .map_err(|e| CoreError::permanent(format!("investigate_incident: encode context: {e}")))?;

        let body = json!({
            "model": self.model,
            "max_tokens": 1024,
            "system": config.system_prompt,
            "messages": [{ "role": "user", "content": user_content }],
            "tools": [{
                "name": "report_investigation",
                "description": "Report the outcome of investigating this incident.",
                "input_schema": {
                    "type": "object",
                    "properties": {
                        "summary": { "type": "string" },
                        "recommended_action": { "type": "string" },
                        "confidence": { "type": "number" },
                        "should_escalate": { "type": "boolean" },
                    },
                    "required": ["summary", "recommended_action", "confidence", "should_escalate"],
                },
            }],
            "tool_choice": { "type": "tool", "name": "report_investigation" },
        });

        let response = self
            .http
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::transient(format!("investigate_incident: request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let err = format!("investigate_incident: {status}: {text}");
            return Err(if status.is_client_error() {
                CoreError::permanent(err)
            } else {
                CoreError::transient(err)
            });
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| CoreError::permanent(format!("investigate_incident: response decode: {e}")))?;

        parsed
            .content
            .into_iter()
            .find_map(|block| block.input)
            .ok_or_else(|| CoreError::permanent("investigate_incident: no tool_use block in response".into()))
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    input: Option<InvestigationResult>,
}

rpc_activity!(GetAgentConfig, "get_agent_config", IncidentAgentAdapter, (), AgentConfig, |c, _i| c
    .get_agent_config());
rpc_activity!(
    AssembleIncidentContext,
    "assemble_incident_context",
    IncidentAgentAdapter,
    Incident,
    IncidentContext,
    |c, i| c.assemble_incident_context(&i)
);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigateIncidentInput {
    pub config: AgentConfig,
    pub context: IncidentContext,
}

rpc_activity!(
    InvestigateIncident,
    "investigate_incident",
    IncidentAgentAdapter,
    InvestigateIncidentInput,
    InvestigationResult,
    |c, i| c.investigate_incident(&i.config, &i.context)
);
