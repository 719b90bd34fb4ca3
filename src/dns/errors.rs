//! Error types for zone and recordset operations
//!
//! Every variant carries the context needed to act on it (zone, record key,
//! batch index or request ID) so callers never have to re-derive it.

use std::error::Error;
use std::fmt;

use crate::api::{ApiError, BulkRequestHandle};
use crate::dns::recordset::RecordKey;
use crate::dns::schema::ValidationError;

#[derive(Debug)]
pub enum DnsError {
    /// Missing, malformed or unknown record fields
    Validation(ValidationError),
    /// Record type not present in the schema registry
    UnsupportedRecordType(String),
    /// ALIAS zones cannot carry recordsets
    AliasZone { zone: String },
    /// Recordset already exists
    Conflict { zone: String, key: RecordKey },
    /// Zone (key = None) or recordset absent
    NotFound { zone: String, key: Option<RecordKey> },
    /// A zone of that name already exists
    ZoneExists { zone: String },
    /// Zone configuration is inconsistent with its type
    InvalidZone { zone: String, reason: String },
    /// Several recordsets match and no safe choice can be made
    AmbiguousDeletion {
        zone: String,
        key: RecordKey,
        candidates: usize,
    },
    /// Interactive selection could not be parsed or is out of range
    InvalidSelection { input: String, reason: String },
    /// A bulk batch failed after earlier batches were accepted
    Submission {
        batch_index: usize,
        handles: Vec<BulkRequestHandle>,
        source: ApiError,
    },
    /// Removing the requested targets would leave no RDATA
    EmptyRecordset { zone: String, key: RecordKey },
    /// Merge needs to bump a serial but the zone has no SOA
    MissingSoa { zone: String },
    /// SOA RDATA has no parsable serial field
    MalformedSoa { zone: String, rdata: String },
    /// Any other remote failure
    Api { context: String, source: ApiError },
}

impl DnsError {
    pub fn api(context: impl Into<String>, source: ApiError) -> Self {
        DnsError::Api {
            context: context.into(),
            source,
        }
    }

    /// Maps a remote failure on `key` in `zone` into the taxonomy, turning
    /// 404 and 409 into their typed counterparts.
    pub fn from_api(zone: &str, key: Option<&RecordKey>, source: ApiError) -> Self {
        match (source, key) {
            (ApiError::NotFound(_), key) => DnsError::NotFound {
                zone: zone.to_string(),
                key: key.cloned(),
            },
            (ApiError::Conflict(_), Some(key)) => DnsError::Conflict {
                zone: zone.to_string(),
                key: key.clone(),
            },
            (source, Some(key)) => DnsError::api(format!("{} in zone {}", key, zone), source),
            (source, None) => DnsError::api(format!("zone {}", zone), source),
        }
    }
}

impl fmt::Display for DnsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DnsError::Validation(e) => write!(f, "{}", e),
            DnsError::UnsupportedRecordType(t) => write!(f, "Unsupported record type: {}", t),
            DnsError::AliasZone { zone } => {
                write!(f, "Zone {} is an ALIAS zone and cannot hold recordsets", zone)
            }
            DnsError::Conflict { zone, key } => {
                write!(f, "Recordset {} already exists in zone {}", key, zone)
            }
            DnsError::NotFound { zone, key: None } => write!(f, "Zone {} not found", zone),
            DnsError::NotFound {
                zone,
                key: Some(key),
            } => write!(f, "No matching records for {} in zone {}", key, zone),
            DnsError::ZoneExists { zone } => write!(f, "Zone {} already exists", zone),
            DnsError::InvalidZone { zone, reason } => {
                write!(f, "Invalid configuration for zone {}: {}", zone, reason)
            }
            DnsError::AmbiguousDeletion {
                zone,
                key,
                candidates,
            } => write!(
                f,
                "{} recordsets match {} in zone {}; refusing to choose without --force-multiple",
                candidates, key, zone
            ),
            DnsError::InvalidSelection { input, reason } => {
                write!(f, "Invalid selection '{}': {}", input, reason)
            }
            DnsError::Submission {
                batch_index,
                handles,
                source,
            } => {
                write!(f, "Bulk batch {} failed: {}", batch_index + 1, source)?;
                if !handles.is_empty() {
                    let ids: Vec<&str> = handles.iter().map(|h| h.request_id.as_str()).collect();
                    write!(
                        f,
                        " ({} earlier batch(es) were accepted: {})",
                        handles.len(),
                        ids.join(", ")
                    )?;
                }
                Ok(())
            }
            DnsError::EmptyRecordset { zone, key } => write!(
                f,
                "Removing these targets would leave {} in zone {} empty; delete the recordset explicitly",
                key, zone
            ),
            DnsError::MissingSoa { zone } => write!(f, "Zone {} has no SOA recordset", zone),
            DnsError::MalformedSoa { zone, rdata } => {
                write!(f, "SOA of zone {} has no valid serial: '{}'", zone, rdata)
            }
            DnsError::Api { context, source } => write!(f, "{}: {}", context, source),
        }
    }
}

impl Error for DnsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DnsError::Validation(e) => Some(e),
            DnsError::Submission { source, .. } | DnsError::Api { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ValidationError> for DnsError {
    fn from(err: ValidationError) -> Self {
        DnsError::Validation(err)
    }
}

/// Result type alias for zone and recordset operations
pub type DnsResult<T> = Result<T, DnsError>;
