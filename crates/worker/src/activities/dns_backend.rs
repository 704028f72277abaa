//! DNS backend adapter and activity bindings

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use hosting_core::activities::DnsBackend;
use hosting_core::domain::ZoneRecord;
use hosting_core::error::CoreError;

use super::binding::rpc_activity;
use super::http::RpcClient;

pub struct DnsBackendAdapter {
    rpc: RpcClient,
}

impl DnsBackendAdapter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { rpc: RpcClient::new(base_url) }
    }
}

#[async_trait]
impl DnsBackend for DnsBackendAdapter {
    async fn get_dns_zone_id_by_name(&self, zone_name: &str) -> Result<u64, CoreError> {
        self.rpc.call("get_dns_zone_id_by_name", &zone_name).await
    }
    async fn write_dns_record(&self, backend_zone_id: u64, record: &ZoneRecord) -> Result<(), CoreError> {
        self.rpc.call("write_dns_record", &(backend_zone_id, record)).await
    }
    async fn update_dns_record(&self, backend_zone_id: u64, record: &ZoneRecord) -> Result<(), CoreError> {
        self.rpc.call("update_dns_record", &(backend_zone_id, record)).await
    }
    async fn delete_dns_record(&self, backend_zone_id: u64, record_id: &str) -> Result<(), CoreError> {
        self.rpc.call("delete_dns_record", &(backend_zone_id, record_id)).await
    }
    async fn deactivate_auto_records(&self, backend_zone_id: u64, zone_id: &str) -> Result<(), CoreError> {
        self.rpc.call("deactivate_auto_records", &(backend_zone_id, zone_id)).await
    }
    async fn reactivate_auto_records(&self, backend_zone_id: u64, zone_id: &str) -> Result<(), CoreError> {
        self.rpc.call("reactivate_auto_records", &(backend_zone_id, zone_id)).await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneNameInput {
    pub zone_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteDnsRecordInput {
    pub backend_zone_id: u64,
    pub record: ZoneRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteDnsRecordInput {
    pub backend_zone_id: u64,
    pub record_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneToggleInput {
    pub backend_zone_id: u64,
    pub zone_id: String,
}

rpc_activity!(
    GetDNSZoneIDByName,
    "get_dns_zone_id_by_name",
    DnsBackendAdapter,
    ZoneNameInput,
    u64,
    |c, i| c.get_dns_zone_id_by_name(&i.zone_name)
);
rpc_activity!(WriteDNSRecord, "write_dns_record", DnsBackendAdapter, WriteDnsRecordInput, (), |c, i| c
    .write_dns_record(i.backend_zone_id, &i.record));
rpc_activity!(UpdateDNSRecord, "update_dns_record", DnsBackendAdapter, WriteDnsRecordInput, (), |c, i| c
    .update_dns_record(i.backend_zone_id, &i.record));
rpc_activity!(DeleteDNSRecord, "delete_dns_record", DnsBackendAdapter, DeleteDnsRecordInput, (), |c, i| c
    .delete_dns_record(i.backend_zone_id, &i.record_id));
rpc_activity!(
    DeactivateAutoRecords,
    "deactivate_auto_records",
    DnsBackendAdapter,
    ZoneToggleInput,
    (),
    |c, i| c.deactivate_auto_records(i.backend_zone_id, &i.zone_id)
);
rpc_activity!(
    ReactivateAutoRecords,
    "reactivate_auto_records",
    DnsBackendAdapter,
    ZoneToggleInput,
    (),
    |c, i| c.reactivate_auto_records(i.backend_zone_id, &i.zone_id)
);
