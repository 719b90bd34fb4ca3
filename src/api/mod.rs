//! Remote DNS management API
//!
//! The [`DnsApi`] trait is the only way the rest of the crate reaches the
//! network. Operations take an explicit `&dyn DnsApi` handle, so tests inject
//! an in-memory double and the binary injects [`client::HttpDnsApi`].
//!
//! # Module Structure
//!
//! * `client` - `reqwest` implementation against the Config DNS v2 REST API
//! * `retry` - backoff policy applied by the HTTP client

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dns::recordset::{ContractInfo, RecordKey, Recordset, ZoneCreateSpec, ZoneInfo, ZoneType};

/// HTTP implementation of the management API
pub mod client;

/// Retry policy with exponential backoff
pub mod retry;

#[derive(Debug)]
pub enum ApiError {
    /// Zone, recordset or bulk request does not exist (HTTP 404)
    NotFound(String),
    /// Resource already exists (HTTP 409)
    Conflict(String),
    /// Any other non-success status
    Http { status: u16, body: String },
    /// Connection, TLS or timeout failure
    Transport(reqwest::Error),
    /// JSON body could not be encoded, or the response did not match the
    /// expected shape
    Decode(serde_json::Error),
}

impl ApiError {
    /// Errors worth retrying: transport failures, throttling and server errors.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ApiError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Errors after which a non-idempotent request may be sent again: the
    /// request never reached the service, or the service throttled it.
    pub fn is_safe_to_resend(&self) -> bool {
        match self {
            ApiError::Transport(e) => e.is_connect(),
            ApiError::Http { status, .. } => *status == 429,
            _ => false,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(what) => write!(f, "Not found: {}", what),
            ApiError::Conflict(what) => write!(f, "Already exists: {}", what),
            ApiError::Http { status, body } => write!(f, "HTTP {}: {}", status, body),
            ApiError::Transport(e) => write!(f, "Transport error: {}", e),
            ApiError::Decode(e) => write!(f, "Malformed JSON: {}", e),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Transport(e) => Some(e),
            ApiError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err)
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Kind of bulk zone request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkOperation {
    Create,
    Delete,
}

impl fmt::Display for BulkOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulkOperation::Create => write!(f, "create"),
            BulkOperation::Delete => write!(f, "delete"),
        }
    }
}

/// Identifier and expiry of a submitted bulk request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequestHandle {
    pub request_id: String,
    pub expiration_date: String,
}

impl BulkRequestHandle {
    pub fn new(request_id: impl Into<String>, expiration_date: impl Into<String>) -> Self {
        BulkRequestHandle {
            request_id: request_id.into(),
            expiration_date: expiration_date.into(),
        }
    }

    /// Expiration as a timestamp, if the service sent RFC 3339.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        parse_expiration(&self.expiration_date)
    }
}

/// Progress counters of a bulk request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkStatus {
    pub request_id: String,
    #[serde(default)]
    pub zones_submitted: u32,
    #[serde(default)]
    pub success_count: u32,
    #[serde(default)]
    pub failure_count: u32,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub expiration_date: String,
}

impl BulkStatus {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        parse_expiration(&self.expiration_date)
    }
}

/// A zone the service could not create or delete
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkFailure {
    pub zone: String,
    pub failure_reason: String,
}

/// Final per-zone result of a bulk request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkResult {
    pub request_id: String,
    /// Zones created (create requests) or deleted (delete requests)
    #[serde(
        default,
        rename = "successfullySubmittedZones",
        alias = "successfullyDeletedZones"
    )]
    pub succeeded_zones: Vec<String>,
    #[serde(default)]
    pub failed_zones: Vec<BulkFailure>,
}

/// Outcome for a single zone of a bulk request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BulkOutcome {
    Succeeded,
    Failed { reason: String },
}

impl BulkResult {
    /// Per-zone outcomes, successes first, each group in service order.
    pub fn outcomes(&self) -> Vec<(String, BulkOutcome)> {
        let succeeded = self
            .succeeded_zones
            .iter()
            .map(|zone| (zone.clone(), BulkOutcome::Succeeded));
        let failed = self.failed_zones.iter().map(|failure| {
            (
                failure.zone.clone(),
                BulkOutcome::Failed {
                    reason: failure.failure_reason.clone(),
                },
            )
        });

        succeeded.chain(failed).collect()
    }
}

fn parse_expiration(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Optional narrowing of a recordset listing
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordSetFilter {
    /// Only these record types
    pub types: Vec<String>,
    /// Substring match on owner name or RDATA
    pub search: Option<String>,
}

impl RecordSetFilter {
    pub fn for_key(key: &RecordKey) -> Self {
        RecordSetFilter {
            types: vec![key.record_type.clone()],
            search: Some(key.name.clone()),
        }
    }

    pub fn for_type(record_type: &str) -> Self {
        RecordSetFilter {
            types: vec![record_type.to_ascii_uppercase()],
            search: None,
        }
    }
}

/// Optional narrowing of a zone listing
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ZoneListFilter {
    /// Only zones under these contracts
    pub contract_ids: Vec<String>,
    /// Only zones of these types
    pub types: Vec<ZoneType>,
    /// Substring match on the zone name
    pub search: Option<String>,
}

/// Remote DNS management service
///
/// Implementations own transport, authentication and retry behaviour. None
/// of the core operations add timeouts of their own.
pub trait DnsApi {
    fn get_zone(&self, zone: &str) -> ApiResult<ZoneInfo>;

    /// Zones visible to the caller, sorted by name.
    fn list_zones(&self, filter: &ZoneListFilter) -> ApiResult<Vec<ZoneInfo>>;

    fn create_zone(&self, spec: &ZoneCreateSpec, contract: &ContractInfo) -> ApiResult<()>;

    /// Replaces the configuration of the existing zone `spec.zone`.
    fn update_zone(&self, spec: &ZoneCreateSpec) -> ApiResult<()>;

    /// Populates a new primary zone with the service's default SOA and NS
    /// recordsets.
    fn initialize_zone(&self, zone: &str) -> ApiResult<()>;

    fn get_record_sets(&self, zone: &str, filter: &RecordSetFilter) -> ApiResult<Vec<Recordset>>;

    fn create_record_set(&self, zone: &str, recordset: &Recordset) -> ApiResult<()>;

    fn create_record_sets(&self, zone: &str, recordsets: &[Recordset]) -> ApiResult<()>;

    fn update_record_set(&self, zone: &str, recordset: &Recordset) -> ApiResult<()>;

    /// Replaces the zone's full recordset collection in one request.
    fn update_record_sets(&self, zone: &str, recordsets: &[Recordset]) -> ApiResult<()>;

    fn delete_record(&self, zone: &str, name: &str, record_type: &str) -> ApiResult<()>;

    fn create_bulk_zones(
        &self,
        batch: &[ZoneCreateSpec],
        contract: &ContractInfo,
    ) -> ApiResult<BulkRequestHandle>;

    fn delete_bulk_zones(&self, zones: &[String], bypass_safety: bool) -> ApiResult<BulkRequestHandle>;

    fn get_bulk_status(&self, operation: BulkOperation, request_id: &str) -> ApiResult<BulkStatus>;

    fn get_bulk_result(&self, operation: BulkOperation, request_id: &str) -> ApiResult<BulkResult>;
}
