//! Zone configuration operations
//!
//! Listing, creating and updating zones. A new PRIMARY zone can be
//! initialized with the service's default SOA and NS recordsets. Updates
//! overlay the requested changes onto the zone's current configuration and
//! send nothing when the result equals what the zone already has.

use serde::Serialize;

use crate::api::{ApiError, DnsApi, ZoneListFilter};
use crate::dns::errors::{DnsError, DnsResult};
use crate::dns::recordset::{ContractInfo, ZoneCreateSpec, ZoneInfo, ZoneType};

/// One row of a short zone listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneSummary {
    pub zone: String,
    #[serde(rename = "type")]
    pub zone_type: ZoneType,
    pub activation_state: String,
    pub contract_id: String,
}

impl From<&ZoneInfo> for ZoneSummary {
    fn from(info: &ZoneInfo) -> Self {
        ZoneSummary {
            zone: info.zone.clone(),
            zone_type: info.zone_type,
            activation_state: info.activation_state.clone().unwrap_or_default(),
            contract_id: info.contract_id.clone().unwrap_or_default(),
        }
    }
}

/// Changes to an existing zone; `None` keeps the current value
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ZoneUpdate {
    pub zone_type: Option<ZoneType>,
    pub contract_id: Option<String>,
    pub comment: Option<String>,
    pub masters: Option<Vec<String>>,
    pub sign_and_serve: Option<bool>,
    pub sign_and_serve_algorithm: Option<String>,
    pub target: Option<String>,
    pub end_customer_id: Option<String>,
}

impl ZoneUpdate {
    pub fn apply(&self, mut spec: ZoneCreateSpec) -> ZoneCreateSpec {
        if let Some(zone_type) = self.zone_type {
            spec.zone_type = zone_type;
        }
        if let Some(contract_id) = &self.contract_id {
            spec.contract_id = Some(contract_id.clone());
        }
        if let Some(comment) = &self.comment {
            spec.comment = Some(comment.clone());
        }
        if let Some(masters) = &self.masters {
            spec.masters = masters.clone();
        }
        if let Some(sign_and_serve) = self.sign_and_serve {
            spec.sign_and_serve = Some(sign_and_serve);
        }
        if let Some(algorithm) = &self.sign_and_serve_algorithm {
            spec.sign_and_serve_algorithm = Some(algorithm.to_ascii_uppercase());
        }
        if let Some(target) = &self.target {
            spec.target = Some(target.clone());
        }
        if let Some(end_customer_id) = &self.end_customer_id {
            spec.end_customer_id = Some(end_customer_id.clone());
        }
        spec
    }
}

/// Result of a zone update
#[derive(Clone, Debug, PartialEq)]
pub struct ZoneChange {
    /// Configuration as read back after the update
    pub zone: ZoneInfo,
    pub changed: bool,
}

/// Checks that the fields of `spec` fit its zone type.
pub fn validate_zone_spec(spec: &ZoneCreateSpec) -> DnsResult<()> {
    let invalid = |reason: &str| DnsError::InvalidZone {
        zone: spec.zone.clone(),
        reason: reason.to_string(),
    };

    if spec.zone.trim().is_empty() {
        return Err(invalid("zone name is required"));
    }
    match spec.zone_type {
        ZoneType::Secondary if spec.masters.is_empty() => {
            return Err(invalid("SECONDARY zones need at least one master"));
        }
        ZoneType::Primary | ZoneType::Alias if !spec.masters.is_empty() => {
            return Err(invalid("only SECONDARY zones take masters"));
        }
        _ => {}
    }
    let has_target = spec.target.as_deref().map_or(false, |t| !t.trim().is_empty());
    match spec.zone_type {
        ZoneType::Alias if !has_target => Err(invalid("ALIAS zones need a target zone")),
        ZoneType::Primary | ZoneType::Secondary if has_target => {
            Err(invalid("only ALIAS zones take a target"))
        }
        _ => Ok(()),
    }
}

/// Zones matching `filter`, ordered by name.
pub fn list_zones(api: &dyn DnsApi, filter: &ZoneListFilter) -> DnsResult<Vec<ZoneInfo>> {
    let mut zones = api
        .list_zones(filter)
        .map_err(|e| DnsError::api("list zones", e))?;
    zones.sort_by_key(|z| z.zone.to_ascii_lowercase());
    log::debug!("{} zone(s) listed", zones.len());
    Ok(zones)
}

/// Creates `spec` under `contract` and returns the zone as the service
/// reports it. With `initialize`, a PRIMARY zone also gets the default SOA
/// and NS recordsets.
pub fn create_zone(
    api: &dyn DnsApi,
    spec: &ZoneCreateSpec,
    contract: &ContractInfo,
    initialize: bool,
) -> DnsResult<ZoneInfo> {
    validate_zone_spec(spec)?;
    let zone = spec.zone.as_str();

    match api.get_zone(zone) {
        Ok(_) => {
            return Err(DnsError::ZoneExists {
                zone: zone.to_string(),
            })
        }
        Err(ApiError::NotFound(_)) => {}
        Err(e) => return Err(DnsError::api(format!("check for zone {}", zone), e)),
    }

    api.create_zone(spec, contract).map_err(|e| match e {
        ApiError::Conflict(_) => DnsError::ZoneExists {
            zone: zone.to_string(),
        },
        e => DnsError::api(format!("create zone {}", zone), e),
    })?;
    log::info!("Created {} zone {} under contract {}", spec.zone_type, zone, contract.contract_id);

    if initialize {
        if spec.zone_type == ZoneType::Primary {
            api.initialize_zone(zone)
                .map_err(|e| DnsError::api(format!("initialize zone {}", zone), e))?;
            log::info!("Initialized zone {} with default SOA and NS recordsets", zone);
        } else {
            log::warn!("Zone {} is {}; only PRIMARY zones are initialized", zone, spec.zone_type);
        }
    }

    api.get_zone(zone).map_err(|e| DnsError::from_api(zone, None, e))
}

/// Applies `update` to the current configuration of `zone`.
pub fn update_zone(api: &dyn DnsApi, zone: &str, update: &ZoneUpdate) -> DnsResult<ZoneChange> {
    let current = api
        .get_zone(zone)
        .map_err(|e| DnsError::from_api(zone, None, e))?;
    let base = ZoneCreateSpec::from(&current);
    let wanted = update.apply(base.clone());
    submit_zone_update(api, current, &base, wanted)
}

/// Replaces the configuration of the zone named in `spec`. A missing
/// contract is taken from the zone.
pub fn replace_zone(api: &dyn DnsApi, mut spec: ZoneCreateSpec) -> DnsResult<ZoneChange> {
    spec.zone = spec.zone.trim().to_ascii_lowercase();
    let current = api
        .get_zone(&spec.zone)
        .map_err(|e| DnsError::from_api(&spec.zone, None, e))?;
    if spec.contract_id.is_none() {
        spec.contract_id = current.contract_id.clone();
    }
    let base = ZoneCreateSpec::from(&current);
    submit_zone_update(api, current, &base, spec)
}

fn submit_zone_update(
    api: &dyn DnsApi,
    current: ZoneInfo,
    base: &ZoneCreateSpec,
    wanted: ZoneCreateSpec,
) -> DnsResult<ZoneChange> {
    validate_zone_spec(&wanted)?;
    if wanted == *base {
        log::info!("Zone {} already has the requested configuration", current.zone);
        return Ok(ZoneChange {
            zone: current,
            changed: false,
        });
    }

    let name = wanted.zone.as_str();
    api.update_zone(&wanted)
        .map_err(|e| DnsError::from_api(name, None, e))?;
    log::info!("Updated configuration of zone {}", name);

    let zone = api
        .get_zone(name)
        .map_err(|e| DnsError::from_api(name, None, e))?;
    Ok(ZoneChange {
        zone,
        changed: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(zone_type: ZoneType) -> ZoneCreateSpec {
        ZoneCreateSpec::new("example.com", zone_type)
    }

    #[test]
    fn test_zone_spec_rules() {
        assert!(validate_zone_spec(&spec(ZoneType::Primary)).is_ok());

        let err = validate_zone_spec(&spec(ZoneType::Secondary)).unwrap_err();
        assert!(matches!(err, DnsError::InvalidZone { .. }));

        let mut secondary = spec(ZoneType::Secondary);
        secondary.masters = vec!["192.0.2.53".into()];
        assert!(validate_zone_spec(&secondary).is_ok());

        let mut primary = spec(ZoneType::Primary);
        primary.masters = vec!["192.0.2.53".into()];
        assert!(validate_zone_spec(&primary).is_err());

        assert!(validate_zone_spec(&spec(ZoneType::Alias)).is_err());
        let mut alias = spec(ZoneType::Alias);
        alias.target = Some("example.net".into());
        assert!(validate_zone_spec(&alias).is_ok());

        assert!(validate_zone_spec(&ZoneCreateSpec::new(" ", ZoneType::Primary)).is_err());
    }

    #[test]
    fn test_update_overlays_only_given_fields() {
        let mut base = spec(ZoneType::Primary);
        base.comment = Some("old".into());
        base.contract_id = Some("C-1".into());

        let update = ZoneUpdate {
            comment: Some("new".into()),
            sign_and_serve: Some(true),
            sign_and_serve_algorithm: Some("rsa_sha256".into()),
            ..Default::default()
        };
        let applied = update.apply(base.clone());

        assert_eq!(applied.comment.as_deref(), Some("new"));
        assert_eq!(applied.contract_id.as_deref(), Some("C-1"));
        assert_eq!(applied.sign_and_serve, Some(true));
        assert_eq!(applied.sign_and_serve_algorithm.as_deref(), Some("RSA_SHA256"));
        assert_eq!(ZoneUpdate::default().apply(base.clone()), base);
    }

    #[test]
    fn test_summary_row() {
        let info = ZoneInfo {
            zone: "example.com".into(),
            contract_id: Some("C-1".into()),
            ..Default::default()
        };
        let row = serde_json::to_value(ZoneSummary::from(&info)).unwrap();
        assert_eq!(
            row,
            serde_json::json!({
                "zone": "example.com",
                "type": "PRIMARY",
                "activationState": "",
                "contractId": "C-1"
            })
        );
    }
}
