//! Resource domain model
//!
//! Every managed entity (tenant, webroot, database, ...) shares the same
//! lifecycle status vocabulary. Rather than a deep inheritance hierarchy,
//! each resource kind is a plain struct implementing the narrow [`Resource`]
//! trait; the lifecycle state machine logic in the worker crate is written
//! once against that trait and shared by composition across every kind.

mod backup;
mod daemon;
mod dns;
mod egress;
mod email;
mod incident;
mod mysql;
mod provision;
mod s3;
mod sshkey;
mod tenant;
mod valkey;
mod webroot;

pub use backup::Backup;
pub use daemon::{CronJob, Daemon};
pub use dns::{Zone, ZoneRecord, ZoneRecordManagedBy};
pub use egress::TenantEgressRule;
pub use email::{EmailAccount, EmailAlias, EmailAutoReply, EmailForward};
pub use incident::{group_by_type, order_for_processing, Incident, IncidentSeverity, IncidentStatus};
pub use mysql::{Database, DatabaseAccessRule, DatabaseUser};
pub use provision::ProvisionTask;
pub use s3::{S3AccessKey, S3Bucket};
pub use sshkey::SshKey;
pub use tenant::{Cluster, Node, Shard, ShardRole, Tenant};
pub use valkey::{ValkeyInstance, ValkeyUser};
pub use webroot::{Fqdn, Webroot};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Uniform lifecycle status shared by every resource kind.
///
/// Transitions are driven exclusively by workflows:
/// `pending -> provisioning -> active | failed`,
/// `active -> deleting -> deleted | failed`.
/// `failed` is recoverable: a later workflow may move it back to
/// `provisioning`. `deleted` and `failed` are the only terminal states in the
/// sense that no cron or monitor advances a resource out of them on its own.
/// `converging` and `degraded` are used by shards rather than individual
/// resources.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Pending,
    Provisioning,
    Active,
    Deleting,
    Deleted,
    Failed,
    Converging,
    Degraded,
}

impl ResourceStatus {
    /// `deleted`/`failed` end a workflow's responsibility for a resource
    /// until a new intent arrives; everything else expects further writes.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Deleted | Self::Failed)
    }
}

/// The narrow shared interface every resource kind implements. Lifecycle
/// bookkeeping (e.g. "never write a terminal status without a
/// non-initial status write first") is written once against this trait.
pub trait Resource {
    fn id(&self) -> &str;
    fn status(&self) -> ResourceStatus;
    fn status_message(&self) -> Option<&str>;
}

/// Fields common to every resource row, embedded rather than inherited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceMeta {
    pub id: String,
    pub status: ResourceStatus,
    pub status_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResourceMeta {
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            status: ResourceStatus::Pending,
            status_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(ResourceStatus::Deleted.is_terminal());
        assert!(ResourceStatus::Failed.is_terminal());
        assert!(!ResourceStatus::Active.is_terminal());
        assert!(!ResourceStatus::Provisioning.is_terminal());
    }
}
