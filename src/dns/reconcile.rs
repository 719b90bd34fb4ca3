//! Recordset reconciliation
//!
//! Applies a batch of incoming recordsets to a zone's full recordset
//! collection. In merge mode entries are replaced by key or appended, and
//! the SOA serial is advanced by one whenever some other recordset changed
//! and the batch did not carry its own SOA. A key held by several existing
//! recordsets collapses to the incoming one. Overwrite mode submits the
//! incoming batch as the complete new collection.

use std::fmt;

use crate::api::{DnsApi, RecordSetFilter};
use crate::dns::errors::{DnsError, DnsResult};
use crate::dns::merge::check_recordset;
use crate::dns::recordset::{bump_soa_serial, RecordKey, Recordset, ZoneInfo};
use crate::dns::require_record_zone;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Incoming recordsets replace the whole collection, SOA included
    Overwrite,
    /// Incoming recordsets are merged into the existing collection by key
    Merge,
}

impl Default for ReconcileMode {
    fn default() -> Self {
        ReconcileMode::Merge
    }
}

impl fmt::Display for ReconcileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileMode::Overwrite => write!(f, "overwrite"),
            ReconcileMode::Merge => write!(f, "merge"),
        }
    }
}

/// SOA serial before and after an automatic increment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SerialBump {
    pub old: u32,
    pub new: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Collection to submit
    pub recordsets: Vec<Recordset>,
    /// Whether the collection differs from what the zone holds
    pub changed: bool,
    pub serial_bump: Option<SerialBump>,
}

/// Computes the collection to submit for `zone`.
///
/// `existing` is ignored in overwrite mode. Existing order is preserved;
/// new keys are appended in incoming order.
pub fn reconcile(
    zone: &ZoneInfo,
    existing: &[Recordset],
    incoming: &[Recordset],
    mode: ReconcileMode,
) -> DnsResult<ReconcileOutcome> {
    if !zone.zone_type.holds_recordsets() {
        return Err(DnsError::AliasZone {
            zone: zone.zone.clone(),
        });
    }
    for recordset in incoming {
        check_recordset(recordset)?;
    }

    if mode == ReconcileMode::Overwrite {
        return Ok(ReconcileOutcome {
            recordsets: incoming.to_vec(),
            changed: true,
            serial_bump: None,
        });
    }

    let mut result = existing.to_vec();
    let mut soa_explicit = false;
    let mut soa_changed = false;
    let mut other_changed = false;

    for recordset in incoming {
        let is_soa = recordset.is_soa();
        soa_explicit |= is_soa;

        let key = recordset.key();
        let mut changed = match result.iter().position(|current| current.has_key(&key)) {
            Some(index) if result[index].same_content(recordset) => false,
            Some(index) => {
                result[index] = recordset.clone();
                true
            }
            None => {
                result.push(recordset.clone());
                true
            }
        };
        if drop_later_duplicates(&mut result, &key) > 0 {
            changed = true;
        }

        if changed {
            log::debug!("{} changes in zone {}", key, zone.zone);
            if is_soa {
                soa_changed = true;
            } else {
                other_changed = true;
            }
        }
    }

    let mut serial_bump = None;
    if other_changed && !soa_explicit {
        serial_bump = Some(bump_serial(&zone.zone, &mut result)?);
    }

    Ok(ReconcileOutcome {
        recordsets: result,
        changed: other_changed || soa_changed,
        serial_bump,
    })
}

/// Keeps only the first recordset under `key`; returns how many were dropped.
fn drop_later_duplicates(recordsets: &mut Vec<Recordset>, key: &RecordKey) -> usize {
    let before = recordsets.len();
    let mut seen = false;
    recordsets.retain(|current| {
        if !current.has_key(key) {
            return true;
        }
        let keep = !seen;
        seen = true;
        keep
    });
    before - recordsets.len()
}

pub(crate) fn bump_serial(zone: &str, recordsets: &mut [Recordset]) -> DnsResult<SerialBump> {
    let soa = recordsets
        .iter_mut()
        .find(|rs| rs.is_soa())
        .ok_or_else(|| DnsError::MissingSoa {
            zone: zone.to_string(),
        })?;

    let rdata = soa.rdata.first().cloned().unwrap_or_default();
    let (bumped, old, new) = bump_soa_serial(&rdata).ok_or_else(|| DnsError::MalformedSoa {
        zone: zone.to_string(),
        rdata: rdata.clone(),
    })?;

    soa.rdata[0] = bumped;
    log::info!("SOA serial of zone {} advanced from {} to {}", zone, old, new);
    Ok(SerialBump { old, new })
}

/// Reconciles `incoming` against the live zone and submits the result as a
/// single update. In merge mode nothing is sent when nothing changed.
pub fn update_record_sets(
    api: &dyn DnsApi,
    zone: &str,
    incoming: &[Recordset],
    mode: ReconcileMode,
) -> DnsResult<ReconcileOutcome> {
    let info = require_record_zone(api, zone)?;

    let existing = match mode {
        ReconcileMode::Merge => api
            .get_record_sets(zone, &RecordSetFilter::default())
            .map_err(|e| DnsError::from_api(zone, None, e))?,
        ReconcileMode::Overwrite => Vec::new(),
    };

    let outcome = reconcile(&info, &existing, incoming, mode)?;
    if !outcome.changed {
        log::info!("Recordsets of zone {} already up to date", zone);
        return Ok(outcome);
    }

    log::debug!(
        "Submitting {} recordsets to zone {} ({} mode)",
        outcome.recordsets.len(),
        zone,
        mode
    );
    api.update_record_sets(zone, &outcome.recordsets)
        .map_err(|e| DnsError::api(format!("update recordsets in zone {}", zone), e))?;

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::recordset::{soa_serial, ZoneType};

    fn zone(zone_type: ZoneType) -> ZoneInfo {
        ZoneInfo {
            zone: "example.com".to_string(),
            zone_type,
            ..Default::default()
        }
    }

    fn soa(serial: u32) -> Recordset {
        Recordset::new(
            "example.com",
            "SOA",
            86400,
            vec![format!(
                "ns1.example.com. hostmaster.example.com. {} 3600 600 604800 300",
                serial
            )],
        )
    }

    fn a(name: &str, ttl: u32, target: &str) -> Recordset {
        Recordset::new(name, "A", ttl, vec![target.to_string()])
    }

    fn serial_of(recordsets: &[Recordset]) -> u32 {
        let soa = recordsets.iter().find(|rs| rs.is_soa()).unwrap();
        soa_serial(&soa.rdata[0]).unwrap()
    }

    #[test]
    fn test_ttl_change_bumps_serial() {
        let existing = vec![soa(5), a("www.example.com", 300, "1.1.1.1")];
        let incoming = vec![a("www.example.com", 600, "1.1.1.1")];

        let outcome = reconcile(&zone(ZoneType::Primary), &existing, &incoming, ReconcileMode::Merge).unwrap();

        assert!(outcome.changed);
        assert_eq!(outcome.recordsets[1].ttl, 600);
        assert_eq!(serial_of(&outcome.recordsets), 6);
        assert_eq!(outcome.serial_bump, Some(SerialBump { old: 5, new: 6 }));
    }

    #[test]
    fn test_explicit_soa_is_not_bumped_again() {
        let existing = vec![soa(5), a("www.example.com", 300, "1.1.1.1")];
        let incoming = vec![soa(5), a("www.example.com", 600, "1.1.1.1")];

        let outcome = reconcile(&zone(ZoneType::Primary), &existing, &incoming, ReconcileMode::Merge).unwrap();

        assert!(outcome.changed);
        assert_eq!(serial_of(&outcome.recordsets), 5);
        assert_eq!(outcome.serial_bump, None);
    }

    #[test]
    fn test_unchanged_input_leaves_soa_alone() {
        let existing = vec![soa(5), a("www.example.com", 300, "1.1.1.1")];
        let incoming = vec![a("WWW.example.com.", 300, "1.1.1.1")];

        let outcome = reconcile(&zone(ZoneType::Primary), &existing, &incoming, ReconcileMode::Merge).unwrap();

        assert!(!outcome.changed);
        assert_eq!(outcome.recordsets, existing);
    }

    #[test]
    fn test_new_keys_are_appended_in_order() {
        let existing = vec![a("a.example.com", 300, "192.0.2.1"), soa(1)];
        let incoming = vec![
            a("c.example.com", 300, "192.0.2.3"),
            a("a.example.com", 60, "192.0.2.1"),
            a("b.example.com", 300, "192.0.2.2"),
        ];

        let outcome = reconcile(&zone(ZoneType::Primary), &existing, &incoming, ReconcileMode::Merge).unwrap();
        let names: Vec<&str> = outcome.recordsets.iter().map(|rs| rs.name.as_str()).collect();

        assert_eq!(
            names,
            vec!["a.example.com", "example.com", "c.example.com", "b.example.com"]
        );
        assert_eq!(outcome.recordsets[0].ttl, 60);
    }

    #[test]
    fn test_alias_zone_rejected_before_merging() {
        // even an empty batch is rejected
        let err = reconcile(&zone(ZoneType::Alias), &[], &[], ReconcileMode::Merge).unwrap_err();
        assert!(matches!(err, DnsError::AliasZone { .. }));

        let err = reconcile(
            &zone(ZoneType::Alias),
            &[],
            &[a("www.example.com", 300, "1.1.1.1")],
            ReconcileMode::Overwrite,
        )
        .unwrap_err();
        assert!(matches!(err, DnsError::AliasZone { .. }));
    }

    #[test]
    fn test_overwrite_is_verbatim() {
        let existing = vec![soa(5), a("www.example.com", 300, "1.1.1.1")];
        let incoming = vec![soa(9), a("mail.example.com", 300, "192.0.2.25")];

        let outcome = reconcile(&zone(ZoneType::Primary), &existing, &incoming, ReconcileMode::Overwrite).unwrap();

        assert_eq!(outcome.recordsets, incoming);
        assert_eq!(outcome.serial_bump, None);
    }

    #[test]
    fn test_missing_and_malformed_soa() {
        let incoming = vec![a("www.example.com", 300, "1.1.1.1")];

        let err = reconcile(&zone(ZoneType::Primary), &[], &incoming, ReconcileMode::Merge).unwrap_err();
        assert!(matches!(err, DnsError::MissingSoa { .. }));

        let broken = vec![Recordset::new("example.com", "SOA", 300, vec!["ns1. host.".into()])];
        let err = reconcile(&zone(ZoneType::Primary), &broken, &incoming, ReconcileMode::Merge).unwrap_err();
        assert!(matches!(err, DnsError::MalformedSoa { .. }));
    }

    #[test]
    fn test_duplicate_keys_collapse_to_incoming() {
        let existing = vec![
            soa(5),
            a("www.example.com", 300, "1.1.1.1"),
            a("mail.example.com", 300, "192.0.2.25"),
            a("www.example.com", 600, "1.1.1.2"),
        ];
        let incoming = vec![a("www.example.com", 900, "1.1.1.3")];

        let outcome = reconcile(&zone(ZoneType::Primary), &existing, &incoming, ReconcileMode::Merge).unwrap();
        let www: Vec<u32> = outcome
            .recordsets
            .iter()
            .filter(|rs| rs.name == "www.example.com")
            .map(|rs| rs.ttl)
            .collect();

        assert_eq!(www, vec![900]);
        assert_eq!(outcome.recordsets[1].ttl, 900);
        assert_eq!(outcome.recordsets.len(), 3);
        assert_eq!(serial_of(&outcome.recordsets), 6);
    }

    #[test]
    fn test_dropping_duplicates_counts_as_change() {
        // the first entry already matches, only the stale duplicate goes
        let existing = vec![
            soa(5),
            a("www.example.com", 300, "1.1.1.1"),
            a("www.example.com", 600, "1.1.1.2"),
        ];
        let incoming = vec![a("www.example.com", 300, "1.1.1.1")];

        let outcome = reconcile(&zone(ZoneType::Primary), &existing, &incoming, ReconcileMode::Merge).unwrap();

        assert!(outcome.changed);
        assert_eq!(outcome.recordsets.len(), 2);
        assert_eq!(outcome.serial_bump, Some(SerialBump { old: 5, new: 6 }));
    }

    #[test]
    fn test_serial_wraps() {
        let existing = vec![soa(u32::MAX)];
        let incoming = vec![a("www.example.com", 300, "1.1.1.1")];

        let outcome = reconcile(&zone(ZoneType::Secondary), &existing, &incoming, ReconcileMode::Merge).unwrap();
        assert_eq!(serial_of(&outcome.recordsets), 0);
    }
}
