//! Worker configuration, loaded from the environment
//!
//! Follows the same shape as the old agent worker's config: `dotenvy` loads
//! a `.env` file if present, then every setting is read from the real
//! environment with an explicit default rather than a derive macro, so a
//! misconfigured deployment fails at startup with a readable message.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub core_store_base_url: String,
    pub dns_backend_base_url: String,
    pub external_services_base_url: String,
    pub anthropic_api_key: String,
    pub anthropic_model: String,
    /// Set when this process is pinned to a node and should also claim
    /// activities off that node's `node:<id>` queue, talking to the agent
    /// at `node_agent_base_url`. Unset, it only serves the general queue.
    pub node_id: Option<String>,
    pub node_agent_base_url: Option<String>,
    pub worker_group: String,
    pub general_concurrency: usize,
    pub node_concurrency: usize,
    pub poll_min_interval: Duration,
    pub poll_max_interval: Duration,
    pub timer_poll_interval: Duration,
    /// Best-effort destination for newly-created critical incidents. Absent
    /// means the webhook step is silently skipped.
    pub platform_webhook_url: Option<String>,
    pub audit_log_retention_days: i64,
    pub backup_retention_days: i64,
}

impl WorkerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let node_id = std::env::var("NODE_ID").ok();
        let node_agent_base_url = std::env::var("NODE_AGENT_URL").ok();
        if node_id.is_some() != node_agent_base_url.is_some() {
            anyhow::bail!("NODE_ID and NODE_AGENT_URL must be set together");
        }

        Ok(Self {
            database_url: require_env("DATABASE_URL")?,
            core_store_base_url: require_env("CORE_STORE_URL")?,
            dns_backend_base_url: require_env("DNS_BACKEND_URL")?,
            external_services_base_url: require_env("EXTERNAL_SERVICES_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            anthropic_model: env_or("ANTHROPIC_MODEL", "claude-3-5-sonnet-20241022"),
            node_id,
            node_agent_base_url,
            worker_group: env_or("WORKER_GROUP", "hosting-worker"),
            general_concurrency: env_parse_or("GENERAL_CONCURRENCY", 20),
            node_concurrency: env_parse_or("NODE_CONCURRENCY", 4),
            poll_min_interval: Duration::from_millis(env_parse_or("POLL_MIN_INTERVAL_MS", 100)),
            poll_max_interval: Duration::from_millis(env_parse_or("POLL_MAX_INTERVAL_MS", 5_000)),
            timer_poll_interval: Duration::from_millis(env_parse_or("TIMER_POLL_INTERVAL_MS", 1_000)),
            platform_webhook_url: std::env::var("PLATFORM_WEBHOOK_URL").ok(),
            audit_log_retention_days: env_parse_or("AUDIT_LOG_RETENTION_DAYS", 90),
            backup_retention_days: env_parse_or("BACKUP_RETENTION_DAYS", 30),
        })
    }
}

fn require_env(key: &str) -> anyhow::Result<String> {
    std::env::var(key).map_err(|_| anyhow::anyhow!("missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
