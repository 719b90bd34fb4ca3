//! Blocking HTTP client for the Config DNS v2 REST API

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::api::retry::RetryConfig;
use crate::api::{
    ApiError, ApiResult, BulkOperation, BulkRequestHandle, BulkResult, BulkStatus, DnsApi,
    RecordSetFilter, ZoneListFilter,
};
use crate::dns::recordset::{ContractInfo, Recordset, RecordsetList, ZoneCreateSpec, ZoneInfo};

const API_ROOT: &str = "/config-dns/v2";

/// Talks to the management API over HTTPS, authenticating with an API key
pub struct HttpDnsApi {
    base_url: String,
    api_key: Option<String>,
    client: Client,
    retry: RetryConfig,
}

#[derive(Serialize)]
struct RecordsetsBody<'a> {
    recordsets: &'a [Recordset],
}

#[derive(Deserialize)]
struct ZoneList {
    #[serde(default)]
    zones: Vec<ZoneInfo>,
}

#[derive(Serialize)]
struct BulkCreateBody<'a> {
    zones: &'a [ZoneCreateSpec],
}

#[derive(Serialize)]
struct BulkDeleteBody<'a> {
    zones: &'a [String],
}

impl HttpDnsApi {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
        retry: RetryConfig,
    ) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("zonectl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
            retry,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_ROOT, path)
    }

    /// Sends one request under the retry policy and returns the body of a
    /// successful response. `what` names the resource for error messages.
    fn call(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Vec<u8>>,
        what: &str,
    ) -> ApiResult<String> {
        let url = self.url(path);
        let description = format!("{} {}", method, path);
        self.retry.run_if(&description, retry_predicate(&method), || {
            let mut request = self.client.request(method.clone(), &url).query(query);

            if let Some(api_key) = &self.api_key {
                request = request.header("X-API-Key", api_key);
            }
            if let Some(body) = &body {
                request = request
                    .header(CONTENT_TYPE, "application/json")
                    .body(body.clone());
            }

            log::debug!("{}", description);
            let response = request.send()?;
            let status = response.status().as_u16();
            let text = response.text()?;

            if (200..300).contains(&status) {
                Ok(text)
            } else {
                Err(error_for_status(status, what, text))
            }
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)], what: &str) -> ApiResult<T> {
        let text = self.call(Method::GET, path, query, None, what)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn send_json<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: &B,
        what: &str,
    ) -> ApiResult<String> {
        let body = serde_json::to_vec(body)?;
        self.call(method, path, query, Some(body), what)
    }
}

/// POSTs create resources, so they are only resent when the service cannot
/// have acted on them. Every other verb is idempotent.
fn retry_predicate(method: &Method) -> fn(&ApiError) -> bool {
    if *method == Method::POST {
        ApiError::is_safe_to_resend
    } else {
        ApiError::is_retryable
    }
}

/// Maps a non-success status onto the error taxonomy.
pub fn error_for_status(status: u16, what: &str, body: String) -> ApiError {
    match status {
        404 => ApiError::NotFound(what.to_string()),
        409 => ApiError::Conflict(what.to_string()),
        _ => ApiError::Http { status, body },
    }
}

fn zone_path(zone: &str) -> String {
    format!("/zones/{}", zone)
}

fn record_path(zone: &str, name: &str, record_type: &str) -> String {
    format!("/zones/{}/names/{}/types/{}", zone, name, record_type.to_ascii_uppercase())
}

fn bulk_path(operation: BulkOperation) -> &'static str {
    match operation {
        BulkOperation::Create => "/zones/create-requests",
        BulkOperation::Delete => "/zones/delete-requests",
    }
}

fn contract_query(contract: &ContractInfo) -> Vec<(&'static str, String)> {
    let mut query = vec![("contractId", contract.contract_id.clone())];
    if let Some(group_id) = &contract.group_id {
        query.push(("gid", group_id.clone()));
    }
    query
}

fn zone_list_query(filter: &ZoneListFilter) -> Vec<(&'static str, String)> {
    let mut query = vec![("showAll", "true".to_string()), ("sortBy", "zone".to_string())];
    if !filter.contract_ids.is_empty() {
        query.push(("contractIds", filter.contract_ids.join(",")));
    }
    if !filter.types.is_empty() {
        let types: Vec<String> = filter.types.iter().map(|t| t.to_string()).collect();
        query.push(("types", types.join(",")));
    }
    if let Some(search) = &filter.search {
        query.push(("search", search.clone()));
    }
    query
}

fn filter_query(filter: &RecordSetFilter) -> Vec<(&'static str, String)> {
    let mut query = vec![("showAll", "true".to_string())];
    if !filter.types.is_empty() {
        query.push(("types", filter.types.join(",")));
    }
    if let Some(search) = &filter.search {
        query.push(("search", search.clone()));
    }
    query
}

impl DnsApi for HttpDnsApi {
    fn get_zone(&self, zone: &str) -> ApiResult<ZoneInfo> {
        self.get(&zone_path(zone), &[], &format!("zone {}", zone))
    }

    fn list_zones(&self, filter: &ZoneListFilter) -> ApiResult<Vec<ZoneInfo>> {
        let list: ZoneList = self.get("/zones", &zone_list_query(filter), "zone list")?;
        Ok(list.zones)
    }

    fn update_zone(&self, spec: &ZoneCreateSpec) -> ApiResult<()> {
        self.send_json(
            Method::PUT,
            &zone_path(&spec.zone),
            &[],
            spec,
            &format!("zone {}", spec.zone),
        )
        .map(|_| ())
    }

    fn initialize_zone(&self, zone: &str) -> ApiResult<()> {
        let what = format!("change list of zone {}", zone);
        self.call(Method::POST, "/changelists", &[("zone", zone.to_string())], None, &what)?;
        self.call(
            Method::POST,
            &format!("/changelists/{}/submit", zone),
            &[],
            None,
            &what,
        )
        .map(|_| ())
    }

    fn create_zone(&self, spec: &ZoneCreateSpec, contract: &ContractInfo) -> ApiResult<()> {
        self.send_json(
            Method::POST,
            "/zones",
            &contract_query(contract),
            spec,
            &format!("zone {}", spec.zone),
        )
        .map(|_| ())
    }

    fn get_record_sets(&self, zone: &str, filter: &RecordSetFilter) -> ApiResult<Vec<Recordset>> {
        let list: RecordsetList = self.get(
            &format!("{}/recordsets", zone_path(zone)),
            &filter_query(filter),
            &format!("zone {}", zone),
        )?;
        Ok(list.recordsets)
    }

    fn create_record_set(&self, zone: &str, recordset: &Recordset) -> ApiResult<()> {
        self.send_json(
            Method::POST,
            &record_path(zone, &recordset.name, &recordset.record_type),
            &[],
            recordset,
            &format!("{} in zone {}", recordset.key(), zone),
        )
        .map(|_| ())
    }

    fn create_record_sets(&self, zone: &str, recordsets: &[Recordset]) -> ApiResult<()> {
        self.send_json(
            Method::POST,
            &format!("{}/recordsets", zone_path(zone)),
            &[],
            &RecordsetsBody { recordsets },
            &format!("recordsets in zone {}", zone),
        )
        .map(|_| ())
    }

    fn update_record_set(&self, zone: &str, recordset: &Recordset) -> ApiResult<()> {
        self.send_json(
            Method::PUT,
            &record_path(zone, &recordset.name, &recordset.record_type),
            &[],
            recordset,
            &format!("{} in zone {}", recordset.key(), zone),
        )
        .map(|_| ())
    }

    fn update_record_sets(&self, zone: &str, recordsets: &[Recordset]) -> ApiResult<()> {
        self.send_json(
            Method::PUT,
            &format!("{}/recordsets", zone_path(zone)),
            &[],
            &RecordsetsBody { recordsets },
            &format!("recordsets in zone {}", zone),
        )
        .map(|_| ())
    }

    fn delete_record(&self, zone: &str, name: &str, record_type: &str) -> ApiResult<()> {
        self.call(
            Method::DELETE,
            &record_path(zone, name, record_type),
            &[],
            None,
            &format!("{} {} in zone {}", name, record_type, zone),
        )
        .map(|_| ())
    }

    fn create_bulk_zones(
        &self,
        batch: &[ZoneCreateSpec],
        contract: &ContractInfo,
    ) -> ApiResult<BulkRequestHandle> {
        let text = self.send_json(
            Method::POST,
            bulk_path(BulkOperation::Create),
            &contract_query(contract),
            &BulkCreateBody { zones: batch },
            "bulk create request",
        )?;
        Ok(serde_json::from_str(&text)?)
    }

    fn delete_bulk_zones(&self, zones: &[String], bypass_safety: bool) -> ApiResult<BulkRequestHandle> {
        let query = [("bypassSafetyChecks", bypass_safety.to_string())];
        let text = self.send_json(
            Method::POST,
            bulk_path(BulkOperation::Delete),
            &query,
            &BulkDeleteBody { zones },
            "bulk delete request",
        )?;
        Ok(serde_json::from_str(&text)?)
    }

    fn get_bulk_status(&self, operation: BulkOperation, request_id: &str) -> ApiResult<BulkStatus> {
        self.get(
            &format!("{}/{}", bulk_path(operation), request_id),
            &[],
            &format!("bulk {} request {}", operation, request_id),
        )
    }

    fn get_bulk_result(&self, operation: BulkOperation, request_id: &str) -> ApiResult<BulkResult> {
        self.get(
            &format!("{}/{}/result", bulk_path(operation), request_id),
            &[],
            &format!("bulk {} request {}", operation, request_id),
        )
    }
}
