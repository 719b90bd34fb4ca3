//! Record merge engine
//!
//! Pure functions computing the effect of adding or removing individual
//! records against an existing recordset, plus the record-level operations
//! that apply them through a [`DnsApi`] handle. An operation whose merge
//! reports no change never reaches the network.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::api::DnsApi;
use crate::dns::errors::{DnsError, DnsResult};
use crate::dns::recordset::{qualify_name, RecordKey, Recordset};
use crate::dns::schema::{self, FieldKind, InvalidField, ValidationError};
use crate::dns::{find_recordsets, require_record_zone};

/// Result of merging one incoming recordset
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Merged {
    pub result: Recordset,
    /// False when `result` is identical in content to what already exists
    pub changed: bool,
}

/// What a record-level operation did remotely
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordChange {
    Created(Recordset),
    Updated(Recordset),
    Deleted(RecordKey),
    /// Nothing to do; no request was sent
    Unchanged(Recordset),
}

impl RecordChange {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, RecordChange::Unchanged(_))
    }
}

/// Merges `incoming` into `existing`.
///
/// With no existing recordset the incoming one is a create. Otherwise the
/// TTL is replaced and the RDATA becomes the sorted, deduplicated union of
/// both. An unchanged merge hands back `existing` untouched.
pub fn merge_record(existing: Option<&Recordset>, incoming: &Recordset) -> Merged {
    let existing = match existing {
        Some(existing) => existing,
        None => {
            return Merged {
                result: incoming.clone(),
                changed: true,
            }
        }
    };

    let union: BTreeSet<&str> = existing.rdata_set().union(&incoming.rdata_set()).copied().collect();

    let changed = incoming.ttl != existing.ttl || union != existing.rdata_set();
    if !changed {
        return Merged {
            result: existing.clone(),
            changed,
        };
    }

    Merged {
        result: Recordset {
            name: existing.name.clone(),
            record_type: existing.record_type.clone(),
            ttl: incoming.ttl,
            rdata: union.into_iter().map(str::to_string).collect(),
        },
        changed,
    }
}

/// Drops `targets` from the RDATA of `existing`.
///
/// Returns `None` when nothing would remain, meaning the recordset has to be
/// deleted instead.
pub fn remove_targets(existing: &Recordset, targets: &BTreeSet<String>) -> Option<Recordset> {
    let rdata: Vec<String> = existing
        .rdata
        .iter()
        .filter(|value| !targets.contains(value.as_str()))
        .cloned()
        .collect();

    if rdata.is_empty() {
        return None;
    }

    Some(Recordset {
        rdata,
        ..existing.clone()
    })
}

/// Overlays a new TTL and/or RDATA list onto `existing`.
pub fn apply_patch(existing: &Recordset, ttl: Option<u32>, rdata: Option<&[String]>) -> Merged {
    let mut result = existing.clone();
    if let Some(ttl) = ttl {
        result.ttl = ttl;
    }
    if let Some(rdata) = rdata {
        result.rdata = rdata.to_vec();
    }

    let changed = !result.same_content(existing);
    Merged {
        result: if changed { result } else { existing.clone() },
        changed,
    }
}

/// Checks the shape invariants of a recordset headed for the API: a
/// supported type, a positive TTL and at least one RDATA value.
pub fn check_recordset(recordset: &Recordset) -> DnsResult<()> {
    if schema::fields_for(&recordset.record_type).is_none() {
        return Err(DnsError::UnsupportedRecordType(recordset.record_type.clone()));
    }

    let mut err = ValidationError {
        record_type: recordset.record_type.clone(),
        ..Default::default()
    };
    if recordset.name.trim().is_empty() {
        err.missing.push("name".to_string());
    }
    if recordset.rdata.is_empty() {
        err.missing.push("rdata".to_string());
    }
    if recordset.ttl == 0 {
        err.invalid.push(InvalidField {
            name: "ttl".to_string(),
            value: "0".to_string(),
            expected: FieldKind::Uint,
        });
    }

    if err.missing.is_empty() && err.invalid.is_empty() {
        Ok(())
    } else {
        Err(DnsError::Validation(err))
    }
}

/// Builds a single-record recordset for `zone` from raw `field=value`
/// pairs, qualifying the owner name into the zone.
pub fn record_from_fields(
    zone: &str,
    record_type: &str,
    provided: &BTreeMap<String, String>,
) -> DnsResult<Recordset> {
    if schema::fields_for(record_type).is_none() {
        return Err(DnsError::UnsupportedRecordType(record_type.to_ascii_uppercase()));
    }

    let mut recordset = Recordset::from_fields(record_type, provided)?;
    recordset.name = qualify_name(&recordset.name, zone)
        .ok_or_else(|| name_outside_zone(&recordset.record_type, &recordset.name))?;

    Ok(recordset)
}

/// Key for a command line owner name and type, qualified into `zone`.
pub fn qualified_key(zone: &str, name: &str, record_type: &str) -> DnsResult<RecordKey> {
    if schema::fields_for(record_type).is_none() {
        return Err(DnsError::UnsupportedRecordType(record_type.to_ascii_uppercase()));
    }
    let name = qualify_name(name, zone).ok_or_else(|| name_outside_zone(record_type, name))?;
    Ok(RecordKey::new(name, record_type))
}

fn name_outside_zone(record_type: &str, name: &str) -> DnsError {
    DnsError::Validation(ValidationError {
        record_type: record_type.to_ascii_uppercase(),
        invalid: vec![InvalidField {
            name: "name".to_string(),
            value: name.to_string(),
            expected: FieldKind::String,
        }],
        ..Default::default()
    })
}

/// Adds the RDATA of `incoming` to the recordset with the same key,
/// creating it if absent.
pub fn add_record(api: &dyn DnsApi, zone: &str, incoming: &Recordset) -> DnsResult<RecordChange> {
    check_recordset(incoming)?;
    require_record_zone(api, zone)?;

    let key = incoming.key();
    let existing = find_recordsets(api, zone, &key)?;
    let merged = merge_record(existing.first(), incoming);

    if !merged.changed {
        log::info!("{} in zone {} already up to date", key, zone);
        return Ok(RecordChange::Unchanged(merged.result));
    }

    if existing.is_empty() {
        log::debug!("Creating {} in zone {}", key, zone);
        api.create_record_set(zone, &merged.result)
            .map_err(|e| DnsError::from_api(zone, Some(&key), e))?;
        Ok(RecordChange::Created(merged.result))
    } else {
        log::debug!("Updating {} in zone {}", key, zone);
        api.update_record_set(zone, &merged.result)
            .map_err(|e| DnsError::from_api(zone, Some(&key), e))?;
        Ok(RecordChange::Updated(merged.result))
    }
}

/// Removes individual RDATA values from a recordset.
///
/// Emptying the recordset deletes it only when `allow_delete` is set.
pub fn remove_record_targets(
    api: &dyn DnsApi,
    zone: &str,
    key: &RecordKey,
    targets: &BTreeSet<String>,
    allow_delete: bool,
) -> DnsResult<RecordChange> {
    let existing = find_recordsets(api, zone, key)?
        .into_iter()
        .next()
        .ok_or_else(|| DnsError::NotFound {
            zone: zone.to_string(),
            key: Some(key.clone()),
        })?;

    if !existing.rdata.iter().any(|value| targets.contains(value)) {
        log::info!("None of the targets are present in {} of zone {}", key, zone);
        return Ok(RecordChange::Unchanged(existing));
    }

    match remove_targets(&existing, targets) {
        Some(remaining) => {
            api.update_record_set(zone, &remaining)
                .map_err(|e| DnsError::from_api(zone, Some(key), e))?;
            Ok(RecordChange::Updated(remaining))
        }
        None if allow_delete => {
            api.delete_record(zone, &existing.name, &existing.record_type)
                .map_err(|e| DnsError::from_api(zone, Some(key), e))?;
            Ok(RecordChange::Deleted(existing.key()))
        }
        None => Err(DnsError::EmptyRecordset {
            zone: zone.to_string(),
            key: key.clone(),
        }),
    }
}

/// Updates the TTL and/or RDATA of one existing recordset.
pub fn patch_record(
    api: &dyn DnsApi,
    zone: &str,
    key: &RecordKey,
    ttl: Option<u32>,
    rdata: Option<&[String]>,
) -> DnsResult<RecordChange> {
    if rdata.map_or(false, |values| values.is_empty()) {
        return Err(DnsError::EmptyRecordset {
            zone: zone.to_string(),
            key: key.clone(),
        });
    }
    require_record_zone(api, zone)?;

    let existing = find_recordsets(api, zone, key)?
        .into_iter()
        .next()
        .ok_or_else(|| DnsError::NotFound {
            zone: zone.to_string(),
            key: Some(key.clone()),
        })?;

    let patched = apply_patch(&existing, ttl, rdata);
    if !patched.changed {
        return Ok(RecordChange::Unchanged(patched.result));
    }
    check_recordset(&patched.result)?;

    api.update_record_set(zone, &patched.result)
        .map_err(|e| DnsError::from_api(zone, Some(key), e))?;
    Ok(RecordChange::Updated(patched.result))
}

/// Creates a recordset that must not already exist.
pub fn create_record_set(api: &dyn DnsApi, zone: &str, recordset: &Recordset) -> DnsResult<()> {
    check_recordset(recordset)?;
    require_record_zone(api, zone)?;

    let key = recordset.key();
    if !find_recordsets(api, zone, &key)?.is_empty() {
        return Err(DnsError::Conflict {
            zone: zone.to_string(),
            key,
        });
    }

    api.create_record_set(zone, recordset)
        .map_err(|e| DnsError::from_api(zone, Some(&key), e))
}

/// Creates several recordsets in a single request.
pub fn create_record_sets(api: &dyn DnsApi, zone: &str, recordsets: &[Recordset]) -> DnsResult<()> {
    let mut seen = HashSet::new();
    for recordset in recordsets {
        check_recordset(recordset)?;
        let key = recordset.key();
        let canonical = (key.name.trim_end_matches('.').to_ascii_lowercase(), key.record_type.clone());
        if !seen.insert(canonical) {
            return Err(DnsError::Conflict {
                zone: zone.to_string(),
                key,
            });
        }
    }
    require_record_zone(api, zone)?;

    log::debug!("Creating {} recordsets in zone {}", recordsets.len(), zone);
    api.create_record_sets(zone, recordsets)
        .map_err(|e| DnsError::api(format!("create recordsets in zone {}", zone), e))
}

/// Deletes the recordset with `key`.
pub fn delete_record_set(api: &dyn DnsApi, zone: &str, key: &RecordKey) -> DnsResult<()> {
    api.delete_record(zone, &key.name, &key.record_type)
        .map_err(|e| DnsError::from_api(zone, Some(key), e))
}
