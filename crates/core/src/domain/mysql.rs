use serde::{Deserialize, Serialize};

use super::{Resource, ResourceMeta, ResourceStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub tenant_id: String,
    pub shard_id: String,
    pub name: String,
}

impl Resource for Database {
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
pub struct DatabaseUser {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub database_id: String,
    pub username: String,
    /// MySQL host pattern, rebuilt from the active access rule set whenever
    /// a rule is added or removed; `%` when no rules exist.
    pub host_pattern: String,
}

impl Resource for DatabaseUser {
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
pub struct DatabaseAccessRule {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub database_user_id: String,
    /// CIDR or bare host pattern this rule grants access from.
    pub source: String,
}

impl Resource for DatabaseAccessRule {
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

/// Rebuild a MySQL host pattern string from the set of active access rule
/// sources. Pure function: the database-user workflow calls this after
/// loading the rule set via a batched context read, then pushes the result
/// through `SyncDatabaseUserHosts`.
pub fn rebuild_host_pattern(active_sources: &[String]) -> String {
    if active_sources.is_empty() {
        "%".to_string()
    } else {
        active_sources.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_rules_yield_wildcard_host() {
        assert_eq!(rebuild_host_pattern(&[]), "%");
    }

    #[test]
    fn rules_join_into_host_pattern() {
        let rules = vec!["10.0.0.0/24".to_string(), "192.168.1.1".to_string()];
        assert_eq!(rebuild_host_pattern(&rules), "10.0.0.0/24,192.168.1.1");
    }
}
