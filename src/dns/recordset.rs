//! Zone and recordset data model shared by every management operation
//!
//! A recordset is identified inside its zone by a [`RecordKey`], the
//! `(name, type)` pair. Names compare case-insensitively and ignore a trailing
//! dot, types are always upper case. All merge and reconciliation code keys
//! on this type so that no two recordsets in a zone ever share a key.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Type of a zone as reported by the management API
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ZoneType {
    #[serde(alias = "primary", alias = "Primary")]
    Primary,
    #[serde(alias = "secondary", alias = "Secondary")]
    Secondary,
    #[serde(alias = "alias", alias = "Alias")]
    Alias,
}

impl ZoneType {
    /// ALIAS zones point at another zone's content and never own recordsets.
    pub fn holds_recordsets(self) -> bool {
        self != ZoneType::Alias
    }
}

impl Default for ZoneType {
    fn default() -> Self {
        ZoneType::Primary
    }
}

impl fmt::Display for ZoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneType::Primary => write!(f, "PRIMARY"),
            ZoneType::Secondary => write!(f, "SECONDARY"),
            ZoneType::Alias => write!(f, "ALIAS"),
        }
    }
}

/// Zone metadata returned by the management API
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneInfo {
    /// Zone name
    pub zone: String,
    /// Zone type
    #[serde(rename = "type")]
    pub zone_type: ZoneType,
    /// Owning contract
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<String>,
    /// Masters for SECONDARY zones
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub masters: Vec<String>,
    /// Free-form comment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// DNSSEC signing enabled
    #[serde(default)]
    pub sign_and_serve: bool,
    /// DNSSEC signing algorithm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_and_serve_algorithm: Option<String>,
    /// Target zone for ALIAS zones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_date: Option<String>,
    /// Remaining service fields, such as the TSIG key of a secondary zone
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Specification of one zone to create, as submitted in bulk or singly
///
/// Fields the tool does not interpret are kept in `extra` and sent back
/// untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneCreateSpec {
    /// Zone name
    pub zone: String,
    /// Zone type
    #[serde(rename = "type")]
    pub zone_type: ZoneType,
    /// Owning contract; single creates take it from the query instead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub masters: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_and_serve: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_and_serve_algorithm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_customer_id: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ZoneCreateSpec {
    pub fn new(zone: impl Into<String>, zone_type: ZoneType) -> Self {
        ZoneCreateSpec {
            zone: zone.into(),
            zone_type,
            contract_id: None,
            comment: None,
            masters: Vec::new(),
            sign_and_serve: None,
            sign_and_serve_algorithm: None,
            target: None,
            end_customer_id: None,
            extra: BTreeMap::new(),
        }
    }
}

/// Writable zone field the model keeps only as raw JSON
const TSIG_KEY_FIELD: &str = "tsigKey";

impl From<&ZoneInfo> for ZoneCreateSpec {
    /// The writable part of a zone's current configuration.
    fn from(info: &ZoneInfo) -> Self {
        ZoneCreateSpec {
            zone: info.zone.clone(),
            zone_type: info.zone_type,
            contract_id: info.contract_id.clone(),
            comment: info.comment.clone(),
            masters: info.masters.clone(),
            sign_and_serve: Some(info.sign_and_serve),
            sign_and_serve_algorithm: info.sign_and_serve_algorithm.clone(),
            target: info.target.clone(),
            end_customer_id: info.end_customer_id.clone(),
            extra: info
                .extra
                .iter()
                .filter(|(key, _)| key.as_str() == TSIG_KEY_FIELD)
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }
}

/// Contract under which zones are created
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInfo {
    pub contract_id: String,
    pub group_id: Option<String>,
}

impl ContractInfo {
    pub fn new(contract_id: impl Into<String>) -> Self {
        ContractInfo {
            contract_id: contract_id.into(),
            group_id: None,
        }
    }

    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }
}

/// Identity of a recordset within its zone
#[derive(Clone, Debug, Eq, Serialize, Deserialize)]
pub struct RecordKey {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
}

impl RecordKey {
    pub fn new(name: impl Into<String>, record_type: impl AsRef<str>) -> Self {
        RecordKey {
            name: name.into(),
            record_type: record_type.as_ref().trim().to_ascii_uppercase(),
        }
    }

    fn canonical_name(&self) -> String {
        self.name.trim_end_matches('.').to_ascii_lowercase()
    }

    pub fn is_soa(&self) -> bool {
        self.record_type == "SOA"
    }
}

impl PartialEq for RecordKey {
    fn eq(&self, other: &Self) -> bool {
        self.record_type == other.record_type && self.canonical_name() == other.canonical_name()
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.record_type)
    }
}

/// A (name, type) keyed group of RDATA values sharing one TTL
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recordset {
    /// Fully qualified owner name
    pub name: String,
    /// Record type, upper case
    #[serde(rename = "type")]
    pub record_type: String,
    /// Time to live in seconds
    pub ttl: u32,
    /// RDATA in presentation format
    pub rdata: Vec<String>,
}

impl Recordset {
    pub fn new(
        name: impl Into<String>,
        record_type: impl AsRef<str>,
        ttl: u32,
        rdata: Vec<String>,
    ) -> Self {
        Recordset {
            name: name.into(),
            record_type: record_type.as_ref().trim().to_ascii_uppercase(),
            ttl,
            rdata,
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.name.clone(), &self.record_type)
    }

    pub fn has_key(&self, key: &RecordKey) -> bool {
        self.key() == *key
    }

    pub fn is_soa(&self) -> bool {
        self.record_type.eq_ignore_ascii_case("SOA")
    }

    /// RDATA as a set, for order-independent comparison
    pub fn rdata_set(&self) -> BTreeSet<&str> {
        self.rdata.iter().map(String::as_str).collect()
    }

    /// True when TTL and the RDATA set match, ignoring RDATA order and
    /// duplicates.
    pub fn same_content(&self, other: &Recordset) -> bool {
        self.ttl == other.ttl && self.rdata_set() == other.rdata_set()
    }
}

/// Wire wrapper for recordset collections
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RecordsetList {
    #[serde(rename = "recordsets", default)]
    pub recordsets: Vec<Recordset>,
}

/// Field of the SOA RDATA holding the serial number
const SOA_SERIAL_FIELD: usize = 2;

/// Reads the serial number out of SOA RDATA
/// (`mname rname serial refresh retry expire minimum`).
pub fn soa_serial(rdata: &str) -> Option<u32> {
    rdata
        .split_whitespace()
        .nth(SOA_SERIAL_FIELD)
        .and_then(|serial| serial.parse().ok())
}

/// Rewrites SOA RDATA with the serial advanced by one, leaving every other
/// field untouched. Serial arithmetic wraps at 2^32 (RFC 1982).
pub fn bump_soa_serial(rdata: &str) -> Option<(String, u32, u32)> {
    let mut fields: Vec<String> = rdata.split_whitespace().map(str::to_string).collect();
    let old: u32 = fields.get(SOA_SERIAL_FIELD)?.parse().ok()?;
    let new = old.wrapping_add(1);
    fields[SOA_SERIAL_FIELD] = new.to_string();

    Some((fields.join(" "), old, new))
}

/// Qualifies a command line owner name into `zone`.
///
/// `@` and the bare zone name map to the apex, relative names get the zone
/// appended. Returns `None` for a fully qualified name outside the zone.
pub fn qualify_name(name: &str, zone: &str) -> Option<String> {
    let zone = zone.trim_end_matches('.');
    let name = name.trim();

    if name == "@" || name.trim_end_matches('.').eq_ignore_ascii_case(zone) {
        return Some(zone.to_string());
    }

    let suffix = format!(".{}", zone.to_ascii_lowercase());
    let bare = name.trim_end_matches('.');
    if bare.to_ascii_lowercase().ends_with(&suffix) {
        return Some(bare.to_string());
    }

    if name.ends_with('.') {
        // absolute name that is not below the zone
        return None;
    }

    Some(format!("{}.{}", bare, zone))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_key_equality() {
        let a = RecordKey::new("WWW.Example.com.", "a");
        let b = RecordKey::new("www.example.com", "A");
        assert_eq!(a, b);
        assert_ne!(a, RecordKey::new("www.example.com", "AAAA"));
    }

    #[test]
    fn test_same_content_ignores_order() {
        let a = Recordset::new("www.example.com", "A", 300, vec!["1.1.1.1".into(), "2.2.2.2".into()]);
        let b = Recordset::new("www.example.com", "A", 300, vec!["2.2.2.2".into(), "1.1.1.1".into()]);
        assert!(a.same_content(&b));

        let c = Recordset::new("www.example.com", "A", 600, b.rdata.clone());
        assert!(!a.same_content(&c));
    }

    #[test]
    fn test_soa_serial_bump() {
        let rdata = "ns1.example.com. hostmaster.example.com. 5 3600 600 604800 300";
        assert_eq!(soa_serial(rdata), Some(5));

        let (bumped, old, new) = bump_soa_serial(rdata).unwrap();
        assert_eq!((old, new), (5, 6));
        assert_eq!(bumped, "ns1.example.com. hostmaster.example.com. 6 3600 600 604800 300");
    }

    #[test]
    fn test_soa_serial_wraps() {
        let rdata = "ns1. host. 4294967295 1 1 1 1";
        let (bumped, _, new) = bump_soa_serial(rdata).unwrap();
        assert_eq!(new, 0);
        assert_eq!(soa_serial(&bumped), Some(0));
    }

    #[test]
    fn test_soa_serial_malformed() {
        assert_eq!(bump_soa_serial("ns1. host."), None);
        assert_eq!(bump_soa_serial("ns1. host. notanumber 1 1 1 1"), None);
    }

    #[test]
    fn test_qualify_name() {
        assert_eq!(qualify_name("www", "example.com").as_deref(), Some("www.example.com"));
        assert_eq!(qualify_name("@", "example.com").as_deref(), Some("example.com"));
        assert_eq!(qualify_name("example.com.", "example.com").as_deref(), Some("example.com"));
        assert_eq!(
            qualify_name("mail.example.com", "example.com").as_deref(),
            Some("mail.example.com")
        );
        assert_eq!(qualify_name("www.other.org.", "example.com"), None);
    }

    #[test]
    fn test_zone_type_wire_format() {
        let zone: ZoneInfo = serde_json::from_str(r#"{"zone":"example.com","type":"ALIAS","target":"other.com"}"#).unwrap();
        assert_eq!(zone.zone_type, ZoneType::Alias);
        assert!(!zone.zone_type.holds_recordsets());
    }

    #[test]
    fn test_zone_info_to_spec_keeps_writable_fields() {
        let json = r#"{
            "zone": "sec.example", "type": "SECONDARY", "contractId": "C-1",
            "masters": ["192.0.2.53"], "versionId": "v-9", "aliasCount": 2,
            "tsigKey": {"name": "k", "algorithm": "hmac-sha256", "secret": "s"}
        }"#;
        let info: ZoneInfo = serde_json::from_str(json).unwrap();
        let spec = ZoneCreateSpec::from(&info);

        assert_eq!(spec.contract_id.as_deref(), Some("C-1"));
        assert_eq!(spec.masters, vec!["192.0.2.53"]);
        assert_eq!(spec.extra.keys().collect::<Vec<_>>(), vec!["tsigKey"]);

        let body = serde_json::to_value(&spec).unwrap();
        assert!(body.get("versionId").is_none());
        assert_eq!(body["tsigKey"]["name"], "k");
    }

    #[test]
    fn test_zone_create_spec_keeps_unknown_fields() {
        let json = r#"{"zone":"a.com","type":"PRIMARY","tsigKey":{"name":"k"}}"#;
        let spec: ZoneCreateSpec = serde_json::from_str(json).unwrap();
        assert!(spec.extra.contains_key("tsigKey"));

        let back = serde_json::to_value(&spec).unwrap();
        assert_eq!(back["tsigKey"]["name"], "k");
    }
}
