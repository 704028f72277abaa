//! Incident investigation activity surface
//!
//! `InvestigateIncident` is the one opaque LLM-backed call in the system:
//! everything it needs is assembled ahead of time by
//! `assemble_incident_context` so the activity itself is a single
//! request/response round-trip with no further branching inside it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::Incident;
use crate::error::CoreError;

use super::core_store::AgentConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentContext {
    pub incident: Incident,
    pub related: Vec<Incident>,
    /// Free-form resource snapshot (the row named by `resource_type` /
    /// `resource_id`), opaque to the orchestrator.
    pub resource_snapshot: Option<serde_json::Value>,
    pub recent_log_excerpt: Option<String>,
    /// Resolution hints carried over from a prior investigation in the same
    /// group (the leader's outcome, for a follower; empty for a leader).
    #[serde(default)]
    pub hints: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigationResult {
    pub summary: String,
    pub recommended_action: String,
    pub confidence: f32,
    pub should_escalate: bool,
}

#[async_trait]
pub trait IncidentAgent: Send + Sync {
    async fn get_agent_config(&self) -> Result<AgentConfig, CoreError>;

    async fn assemble_incident_context(&self, incident: &Incident) -> Result<IncidentContext, CoreError>;

    async fn investigate_incident(
        &self,
        config: &AgentConfig,
        context: &IncidentContext,
    ) -> Result<InvestigationResult, CoreError>;
}
