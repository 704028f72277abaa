use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum IncidentSeverity {
    // Ordered ascending so `Ord` sorts info < warning < critical; callers
    // that need "critical first" reverse the comparison explicitly rather
    // than relying on derive order, since this ordering also matches the
    // escalation-ladder tables in the cron thresholds.
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Open,
    Investigating,
    Remediating,
    Resolved,
    Escalated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    /// Unique; makes incident creation idempotent.
    pub dedupe_key: String,
    #[serde(rename = "type")]
    pub incident_type: String,
    pub severity: IncidentSeverity,
    pub status: IncidentStatus,
    pub title: String,
    pub detail: String,
    pub source: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order incidents the way the incident queue processor requires: severity
/// descending (critical first), then age ascending (oldest first) within a
/// severity band.
pub fn order_for_processing(incidents: &mut [Incident]) {
    incidents.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
}

/// Group already-ordered incidents by type, preserving relative order. The
/// first incident in each group is the leader; the rest are followers.
pub fn group_by_type(incidents: Vec<Incident>) -> Vec<Vec<Incident>> {
    let mut groups: Vec<Vec<Incident>> = Vec::new();
    for incident in incidents {
        match groups
            .iter_mut()
            .find(|g| g[0].incident_type == incident.incident_type)
        {
            Some(group) => group.push(incident),
            None => groups.push(vec![incident]),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn incident(id: &str, incident_type: &str, severity: IncidentSeverity, age_secs: i64) -> Incident {
        Incident {
            id: id.to_string(),
            dedupe_key: format!("dedupe-{id}"),
            incident_type: incident_type.to_string(),
            severity,
            status: IncidentStatus::Open,
            title: "title".into(),
            detail: "detail".into(),
            source: "cron".into(),
            resource_type: None,
            resource_id: None,
            assigned_to: None,
            created_at: Utc::now() - Duration::seconds(age_secs),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn orders_by_severity_then_age() {
        let mut incidents = vec![
            incident("a", "disk_pressure", IncidentSeverity::Warning, 100),
            incident("b", "disk_pressure", IncidentSeverity::Critical, 10),
            incident("c", "disk_pressure", IncidentSeverity::Critical, 200),
        ];
        order_for_processing(&mut incidents);
        assert_eq!(incidents[0].id, "c");
        assert_eq!(incidents[1].id, "b");
        assert_eq!(incidents[2].id, "a");
    }

    #[test]
    fn groups_preserve_relative_order_and_split_leader_followers() {
        let mut incidents = vec![
            incident("inc-1", "disk_pressure", IncidentSeverity::Critical, 10),
            incident("inc-2", "disk_pressure", IncidentSeverity::Warning, 5),
            incident("inc-3", "disk_pressure", IncidentSeverity::Warning, 1),
        ];
        order_for_processing(&mut incidents);
        let groups = group_by_type(incidents);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0][0].id, "inc-1");
        assert_eq!(groups[0][1].id, "inc-2");
        assert_eq!(groups[0][2].id, "inc-3");
    }

    #[test]
    fn distinct_types_form_distinct_groups() {
        let incidents = vec![
            incident("a", "disk_pressure", IncidentSeverity::Warning, 1),
            incident("b", "cert_expiry", IncidentSeverity::Warning, 1),
        ];
        let groups = group_by_type(incidents);
        assert_eq!(groups.len(), 2);
    }
}
