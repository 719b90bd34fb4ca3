//! Zone and recordset management core
//!
//! # Module Structure
//!
//! * `recordset` - zone, recordset and key types plus SOA serial helpers
//! * `schema` - per record type field registry and typed RDATA
//! * `merge` - single record merge engine and record-level operations
//! * `reconcile` - whole-zone recordset reconciliation
//! * `resolver` - safe deletion when several recordsets match
//! * `bulk` - batched bulk zone submission
//! * `bulk_results` - aggregation of bulk request status and results
//! * `zoneconfig` - zone listing, creation and configuration updates
//! * `errors` - error taxonomy shared by all of the above

use crate::api::{DnsApi, RecordSetFilter};
use crate::dns::errors::{DnsError, DnsResult};
use crate::dns::recordset::{RecordKey, Recordset, ZoneInfo};

pub mod bulk;
pub mod bulk_results;
pub mod errors;
pub mod merge;
pub mod reconcile;
pub mod recordset;
pub mod resolver;
pub mod schema;
pub mod zoneconfig;

/// Fetches `zone` and rejects zone types that cannot hold recordsets.
pub fn require_record_zone(api: &dyn DnsApi, zone: &str) -> DnsResult<ZoneInfo> {
    let info = api
        .get_zone(zone)
        .map_err(|e| DnsError::from_api(zone, None, e))?;

    if !info.zone_type.holds_recordsets() {
        return Err(DnsError::AliasZone {
            zone: zone.to_string(),
        });
    }

    Ok(info)
}

/// Every recordset in `zone` whose identity equals `key`.
///
/// The remote filter narrows by substring, so results are matched again
/// locally.
pub fn find_recordsets(api: &dyn DnsApi, zone: &str, key: &RecordKey) -> DnsResult<Vec<Recordset>> {
    let found = api
        .get_record_sets(zone, &RecordSetFilter::for_key(key))
        .map_err(|e| DnsError::from_api(zone, None, e))?;

    Ok(found.into_iter().filter(|rs| rs.has_key(key)).collect())
}
