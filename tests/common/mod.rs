//! In-memory management API that records every call

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use zonectl::api::{
    ApiError, ApiResult, BulkOperation, BulkRequestHandle, BulkResult, BulkStatus, DnsApi,
    RecordSetFilter, ZoneListFilter,
};
use zonectl::dns::recordset::{
    ContractInfo, RecordKey, Recordset, ZoneCreateSpec, ZoneInfo, ZoneType,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    GetZone(String),
    ListZones,
    CreateZone(String),
    UpdateZone(ZoneCreateSpec),
    InitializeZone(String),
    GetRecordSets(String),
    CreateRecordSet(String, Recordset),
    CreateRecordSets(String, Vec<Recordset>),
    UpdateRecordSet(String, Recordset),
    UpdateRecordSets(String, Vec<Recordset>),
    DeleteRecord(String, String, String),
    CreateBulkZones(Vec<String>),
    DeleteBulkZones(Vec<String>, bool),
    GetBulkStatus(BulkOperation, String),
    GetBulkResult(BulkOperation, String),
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Call::GetZone(_)
                | Call::ListZones
                | Call::GetRecordSets(_)
                | Call::GetBulkStatus(..)
                | Call::GetBulkResult(..)
        )
    }
}

#[derive(Default)]
pub struct MockApi {
    zones: RefCell<HashMap<String, ZoneInfo>>,
    recordsets: RefCell<HashMap<String, Vec<Recordset>>>,
    statuses: HashMap<String, BulkStatus>,
    results: HashMap<String, BulkResult>,
    /// Zero-based bulk create call that fails
    fail_bulk_batch: Option<usize>,
    bulk_calls: Cell<usize>,
    pub calls: RefCell<Vec<Call>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zone(self, zone: &str, zone_type: ZoneType, recordsets: Vec<Recordset>) -> Self {
        self.zones.borrow_mut().insert(
            zone.to_string(),
            ZoneInfo {
                zone: zone.to_string(),
                zone_type,
                ..Default::default()
            },
        );
        self.recordsets.borrow_mut().insert(zone.to_string(), recordsets);
        self
    }

    pub fn with_status(mut self, status: BulkStatus) -> Self {
        self.statuses.insert(status.request_id.clone(), status);
        self
    }

    pub fn with_result(mut self, result: BulkResult) -> Self {
        self.results.insert(result.request_id.clone(), result);
        self
    }

    pub fn failing_bulk_batch(mut self, index: usize) -> Self {
        self.fail_bulk_batch = Some(index);
        self
    }

    pub fn with_zone_info(self, info: ZoneInfo) -> Self {
        self.recordsets.borrow_mut().entry(info.zone.clone()).or_default();
        self.zones.borrow_mut().insert(info.zone.clone(), info);
        self
    }

    pub fn zone(&self, zone: &str) -> Option<ZoneInfo> {
        self.zones.borrow().get(zone).cloned()
    }

    pub fn recordsets(&self, zone: &str) -> Vec<Recordset> {
        self.recordsets.borrow().get(zone).cloned().unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn zone_exists(&self, zone: &str) -> ApiResult<()> {
        if self.zones.borrow().contains_key(zone) {
            Ok(())
        } else {
            Err(ApiError::NotFound(format!("zone {}", zone)))
        }
    }
}

impl DnsApi for MockApi {
    fn get_zone(&self, zone: &str) -> ApiResult<ZoneInfo> {
        self.record(Call::GetZone(zone.to_string()));
        self.zones
            .borrow()
            .get(zone)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("zone {}", zone)))
    }

    fn list_zones(&self, filter: &ZoneListFilter) -> ApiResult<Vec<ZoneInfo>> {
        self.record(Call::ListZones);
        let mut zones: Vec<ZoneInfo> = self
            .zones
            .borrow()
            .values()
            .filter(|z| filter.types.is_empty() || filter.types.contains(&z.zone_type))
            .filter(|z| {
                filter.contract_ids.is_empty()
                    || z.contract_id
                        .as_ref()
                        .map_or(false, |c| filter.contract_ids.contains(c))
            })
            .filter(|z| filter.search.as_ref().map_or(true, |s| z.zone.contains(s.as_str())))
            .cloned()
            .collect();
        zones.sort_by(|a, b| a.zone.cmp(&b.zone));
        Ok(zones)
    }

    fn create_zone(&self, spec: &ZoneCreateSpec, contract: &ContractInfo) -> ApiResult<()> {
        self.record(Call::CreateZone(spec.zone.clone()));
        if self.zones.borrow().contains_key(&spec.zone) {
            return Err(ApiError::Conflict(format!("zone {}", spec.zone)));
        }
        self.zones.borrow_mut().insert(
            spec.zone.clone(),
            ZoneInfo {
                zone: spec.zone.clone(),
                zone_type: spec.zone_type,
                contract_id: Some(contract.contract_id.clone()),
                comment: spec.comment.clone(),
                masters: spec.masters.clone(),
                target: spec.target.clone(),
                activation_state: Some("NEW".to_string()),
                ..Default::default()
            },
        );
        self.recordsets.borrow_mut().insert(spec.zone.clone(), Vec::new());
        Ok(())
    }

    fn update_zone(&self, spec: &ZoneCreateSpec) -> ApiResult<()> {
        self.record(Call::UpdateZone(spec.clone()));
        let mut zones = self.zones.borrow_mut();
        let info = zones
            .get_mut(&spec.zone)
            .ok_or_else(|| ApiError::NotFound(format!("zone {}", spec.zone)))?;

        info.zone_type = spec.zone_type;
        if spec.contract_id.is_some() {
            info.contract_id = spec.contract_id.clone();
        }
        info.comment = spec.comment.clone();
        info.masters = spec.masters.clone();
        info.sign_and_serve = spec.sign_and_serve.unwrap_or(false);
        info.sign_and_serve_algorithm = spec.sign_and_serve_algorithm.clone();
        info.target = spec.target.clone();
        info.end_customer_id = spec.end_customer_id.clone();
        Ok(())
    }

    fn initialize_zone(&self, zone: &str) -> ApiResult<()> {
        self.record(Call::InitializeZone(zone.to_string()));
        self.zone_exists(zone)?;

        let mut all = self.recordsets.borrow_mut();
        let list = all.entry(zone.to_string()).or_default();
        if !list.iter().any(Recordset::is_soa) {
            list.push(soa(zone, 1));
            list.push(Recordset::new(
                zone,
                "NS",
                86400,
                vec![format!("a1.ns.{}.", zone), format!("a2.ns.{}.", zone)],
            ));
        }
        Ok(())
    }

    fn get_record_sets(&self, zone: &str, filter: &RecordSetFilter) -> ApiResult<Vec<Recordset>> {
        self.record(Call::GetRecordSets(zone.to_string()));
        self.zone_exists(zone)?;

        let search = filter.search.as_ref().map(|s| s.to_ascii_lowercase());
        Ok(self
            .recordsets(zone)
            .into_iter()
            .filter(|rs| filter.types.is_empty() || filter.types.contains(&rs.record_type))
            .filter(|rs| match &search {
                Some(search) => rs.name.to_ascii_lowercase().contains(search.trim_end_matches('.')),
                None => true,
            })
            .collect())
    }

    fn create_record_set(&self, zone: &str, recordset: &Recordset) -> ApiResult<()> {
        self.record(Call::CreateRecordSet(zone.to_string(), recordset.clone()));
        self.zone_exists(zone)?;

        let key = recordset.key();
        let mut all = self.recordsets.borrow_mut();
        let list = all.entry(zone.to_string()).or_default();
        if list.iter().any(|rs| rs.has_key(&key)) {
            return Err(ApiError::Conflict(key.to_string()));
        }
        list.push(recordset.clone());
        Ok(())
    }

    fn create_record_sets(&self, zone: &str, recordsets: &[Recordset]) -> ApiResult<()> {
        self.record(Call::CreateRecordSets(zone.to_string(), recordsets.to_vec()));
        self.zone_exists(zone)?;

        let mut all = self.recordsets.borrow_mut();
        let list = all.entry(zone.to_string()).or_default();
        for recordset in recordsets {
            if list.iter().any(|rs| rs.has_key(&recordset.key())) {
                return Err(ApiError::Conflict(recordset.key().to_string()));
            }
        }
        list.extend(recordsets.iter().cloned());
        Ok(())
    }

    fn update_record_set(&self, zone: &str, recordset: &Recordset) -> ApiResult<()> {
        self.record(Call::UpdateRecordSet(zone.to_string(), recordset.clone()));
        self.zone_exists(zone)?;

        let key = recordset.key();
        let mut all = self.recordsets.borrow_mut();
        let list = all.entry(zone.to_string()).or_default();
        match list.iter_mut().find(|rs| rs.has_key(&key)) {
            Some(current) => {
                *current = recordset.clone();
                Ok(())
            }
            None => Err(ApiError::NotFound(key.to_string())),
        }
    }

    fn update_record_sets(&self, zone: &str, recordsets: &[Recordset]) -> ApiResult<()> {
        self.record(Call::UpdateRecordSets(zone.to_string(), recordsets.to_vec()));
        self.zone_exists(zone)?;
        self.recordsets
            .borrow_mut()
            .insert(zone.to_string(), recordsets.to_vec());
        Ok(())
    }

    fn delete_record(&self, zone: &str, name: &str, record_type: &str) -> ApiResult<()> {
        self.record(Call::DeleteRecord(
            zone.to_string(),
            name.to_string(),
            record_type.to_string(),
        ));
        self.zone_exists(zone)?;

        // like the service, every recordset under the key goes
        let key = RecordKey::new(name, record_type);
        let mut all = self.recordsets.borrow_mut();
        let list = all.entry(zone.to_string()).or_default();
        let before = list.len();
        list.retain(|rs| !rs.has_key(&key));
        if list.len() == before {
            return Err(ApiError::NotFound(key.to_string()));
        }
        Ok(())
    }

    fn create_bulk_zones(
        &self,
        batch: &[ZoneCreateSpec],
        _contract: &ContractInfo,
    ) -> ApiResult<BulkRequestHandle> {
        self.record(Call::CreateBulkZones(
            batch.iter().map(|spec| spec.zone.clone()).collect(),
        ));

        let index = self.bulk_calls.get();
        self.bulk_calls.set(index + 1);
        if self.fail_bulk_batch == Some(index) {
            return Err(ApiError::Http {
                status: 400,
                body: "invalid zone in batch".to_string(),
            });
        }

        Ok(BulkRequestHandle::new(
            format!("create-{}", index + 1),
            "2026-11-01T00:00:00Z",
        ))
    }

    fn delete_bulk_zones(&self, zones: &[String], bypass_safety: bool) -> ApiResult<BulkRequestHandle> {
        self.record(Call::DeleteBulkZones(zones.to_vec(), bypass_safety));
        Ok(BulkRequestHandle::new("delete-1", "2026-11-01T00:00:00Z"))
    }

    fn get_bulk_status(&self, operation: BulkOperation, request_id: &str) -> ApiResult<BulkStatus> {
        self.record(Call::GetBulkStatus(operation, request_id.to_string()));
        self.statuses
            .get(request_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("bulk request {}", request_id)))
    }

    fn get_bulk_result(&self, operation: BulkOperation, request_id: &str) -> ApiResult<BulkResult> {
        self.record(Call::GetBulkResult(operation, request_id.to_string()));
        self.results
            .get(request_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("bulk request {}", request_id)))
    }
}

pub fn soa(zone: &str, serial: u32) -> Recordset {
    Recordset::new(
        zone,
        "SOA",
        86400,
        vec![format!(
            "ns1.{zone}. hostmaster.{zone}. {serial} 3600 600 604800 300",
            zone = zone,
            serial = serial
        )],
    )
}

pub fn a(name: &str, ttl: u32, targets: &[&str]) -> Recordset {
    Recordset::new(name, "A", ttl, targets.iter().map(|t| t.to_string()).collect())
}
