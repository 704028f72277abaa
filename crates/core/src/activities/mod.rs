//! The activity RPC surface: the core-to-collaborator boundary
//!
//! Workflows invoke activities by stable string name (`hosting_durable`'s
//! `ActivitySpec::TYPE`); the marker structs that carry those names live in
//! the worker crate, alongside the adapters that implement the traits
//! below. Splitting it this way keeps the *contract* — what a collaborator
//! must support — independent of the DWR plumbing that dispatches to it.
//!
//! Every method here is pure I/O: no workflow-visible logic, no retries (the
//! worker's `ActivityOptions.retry_policy` handles that), just the typed
//! request/response shape a collaborator exposes.

mod core_store;
mod dns_backend;
mod external;
mod incident_agent;
mod node_agent;
mod stalwart;

pub use core_store::{
    AgentConfig, AutoResolveIncidentsInput, BackupContext, CoreStoreReads, CoreStoreWrites,
    CreateIncidentInput, CreateIncidentResult, DaemonContext, DatabaseShardContext, DatabaseUserContext,
    EgressContext, FqdnTarget, ShardDesiredState, StalwartContext, UpdateBackupResultInput,
    UpdateResourceStatusInput, ValkeyShardContext, ZoneRecordContext,
};
pub use dns_backend::DnsBackend;
pub use external::{ExternalServices, HostSelection};
pub use incident_agent::{IncidentAgent, IncidentContext, InvestigationResult};
pub use node_agent::{ConfigureReplicationInput, CreatedSecret, DiskUsage, NodeAgent, ReplicationStatus};
pub use stalwart::StalwartMail;
