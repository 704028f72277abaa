//! DNS backend activity surface
//!
//! Zone and record management against the external authoritative DNS
//! provider. Deletes are idempotent: deleting a record or zone that is
//! already gone is success, not an error, since convergence retries freely.

use async_trait::async_trait;

use crate::domain::ZoneRecord;
use crate::error::CoreError;

#[async_trait]
pub trait DnsBackend: Send + Sync {
    /// Returns `0` if the backend has no zone by this name (§3's "zero
    /// means absent" convention, not an error).
    async fn get_dns_zone_id_by_name(&self, zone_name: &str) -> Result<u64, CoreError>;

    async fn write_dns_record(&self, backend_zone_id: u64, record: &ZoneRecord) -> Result<(), CoreError>;
    async fn update_dns_record(&self, backend_zone_id: u64, record: &ZoneRecord) -> Result<(), CoreError>;
    async fn delete_dns_record(&self, backend_zone_id: u64, record_id: &str) -> Result<(), CoreError>;

    /// Deactivates every `managed_by == Auto` record for a zone without
    /// touching `Custom` records, used when a webroot is deleted and its
    /// auto FQDN records must go dormant but operator-authored records
    /// must survive.
    async fn deactivate_auto_records(&self, backend_zone_id: u64, zone_id: &str) -> Result<(), CoreError>;
    async fn reactivate_auto_records(&self, backend_zone_id: u64, zone_id: &str) -> Result<(), CoreError>;
}
