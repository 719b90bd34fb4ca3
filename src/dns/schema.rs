//! Record type schema registry
//!
//! A static table describing, for every supported record type, which fields a
//! record-level mutation accepts, which of them are required and what
//! primitive kind each value has. Validation turns raw `field=value` pairs
//! into typed [`Fields`], and [`RecordData`] turns those into presentation
//! RDATA.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::dns::recordset::Recordset;

/// TTL applied when a record-level request does not give one
pub const DEFAULT_TTL: u32 = 7200;

/// Primitive kind of a field value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Int,
    Uint,
    Uint16,
    Bool,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::String => "string",
            FieldKind::Int => "int",
            FieldKind::Uint => "uint",
            FieldKind::Uint16 => "uint16",
            FieldKind::Bool => "bool",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

const fn req(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        required: true,
        kind,
    }
}

const fn opt(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        required: false,
        kind,
    }
}

use FieldKind::{Int as I, String as S, Uint as U, Uint16 as U16};

const NAME: FieldSpec = req("name", S);
const TTL: FieldSpec = opt("ttl", I);
const TARGET: FieldSpec = req("target", S);

const ADDRESS_LIKE: &[FieldSpec] = &[NAME, TTL, TARGET];
const AFSDB: &[FieldSpec] = &[NAME, TTL, req("subtype", I), TARGET];
const DNSKEY: &[FieldSpec] = &[
    NAME,
    TTL,
    req("flags", I),
    req("protocol", I),
    req("algorithm", I),
    req("key", S),
];
const DS: &[FieldSpec] = &[
    NAME,
    TTL,
    req("keytag", I),
    req("algorithm", I),
    req("digest-type", I),
    req("digest", S),
];
const HINFO: &[FieldSpec] = &[NAME, TTL, req("hardware", S), req("software", S)];
const MX: &[FieldSpec] = &[NAME, TTL, req("priority", I), TARGET];
const NAPTR: &[FieldSpec] = &[
    NAME,
    TTL,
    req("order", U16),
    req("preference", U16),
    req("flags", S),
    req("service", S),
    req("regexp", S),
    req("replacement", S),
];
const NSEC3: &[FieldSpec] = &[
    NAME,
    TTL,
    req("algorithm", I),
    req("flags", I),
    req("iterations", I),
    req("salt", S),
    req("next-hashed-owner-name", S),
    req("type-bitmaps", S),
];
const NSEC3PARAM: &[FieldSpec] = &[
    NAME,
    TTL,
    req("algorithm", I),
    req("flags", I),
    req("iterations", I),
    req("salt", S),
];
const RP: &[FieldSpec] = &[NAME, TTL, req("mailbox", S), req("txt", S)];
const RRSIG: &[FieldSpec] = &[
    NAME,
    TTL,
    req("type-covered", S),
    req("algorithm", I),
    req("labels", I),
    req("original-ttl", I),
    req("expiration", S),
    req("inception", S),
    req("keytag", I),
    req("signer", S),
    req("signature", S),
];
const SOA: &[FieldSpec] = &[
    NAME,
    TTL,
    req("originserver", S),
    req("contact", S),
    opt("serial", U),
    req("refresh", I),
    req("retry", I),
    req("expire", I),
    req("minimum", U),
];
const SRV: &[FieldSpec] = &[
    NAME,
    TTL,
    req("priority", I),
    req("weight", U16),
    req("port", U16),
    TARGET,
];
const SSHFP: &[FieldSpec] = &[
    NAME,
    TTL,
    req("algorithm", I),
    req("fingerprint-type", I),
    req("fingerprint", S),
];

/// Every record type the management API accepts
pub const RECORD_TYPES: &[&str] = &[
    "A", "AAAA", "AFSDB", "CNAME", "DNSKEY", "DS", "HINFO", "LOC", "MX", "NAPTR", "NS", "NSEC3",
    "NSEC3PARAM", "PTR", "RP", "RRSIG", "SOA", "SPF", "SRV", "SSHFP", "TXT",
];

/// Field table for `record_type`, `None` when the type is unsupported.
pub fn fields_for(record_type: &str) -> Option<&'static [FieldSpec]> {
    let table = match record_type.to_ascii_uppercase().as_str() {
        "A" | "AAAA" | "CNAME" | "LOC" | "NS" | "PTR" | "SPF" | "TXT" => ADDRESS_LIKE,
        "AFSDB" => AFSDB,
        "DNSKEY" => DNSKEY,
        "DS" => DS,
        "HINFO" => HINFO,
        "MX" => MX,
        "NAPTR" => NAPTR,
        "NSEC3" => NSEC3,
        "NSEC3PARAM" => NSEC3PARAM,
        "RP" => RP,
        "RRSIG" => RRSIG,
        "SOA" => SOA,
        "SRV" => SRV,
        "SSHFP" => SSHFP,
        _ => return None,
    };
    Some(table)
}

/// A field whose value did not parse as its declared kind
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidField {
    pub name: String,
    pub value: String,
    pub expected: FieldKind,
}

/// Rejected record-level request
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationError {
    pub record_type: String,
    pub missing: Vec<String>,
    pub invalid: Vec<InvalidField>,
    pub unknown: Vec<String>,
}

impl ValidationError {
    fn new(record_type: &str) -> Self {
        ValidationError {
            record_type: record_type.to_ascii_uppercase(),
            ..Default::default()
        }
    }

    fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.invalid.is_empty() && self.unknown.is_empty()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut problems = Vec::new();
        if !self.missing.is_empty() {
            problems.push(format!("missing required field(s): {}", self.missing.join(", ")));
        }
        for field in &self.invalid {
            problems.push(format!(
                "field '{}' expects {} but got '{}'",
                field.name, field.expected, field.value
            ));
        }
        if !self.unknown.is_empty() {
            problems.push(format!("unknown field(s): {}", self.unknown.join(", ")));
        }
        write!(f, "Invalid {} record: {}", self.record_type, problems.join("; "))
    }
}

impl std::error::Error for ValidationError {}

/// Typed field value
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Uint(u32),
    Uint16(u16),
    Bool(bool),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(v) => f.write_str(v),
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Uint(v) => write!(f, "{}", v),
            FieldValue::Uint16(v) => write!(f, "{}", v),
            FieldValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

fn parse_value(kind: FieldKind, raw: &str) -> Option<FieldValue> {
    let raw = raw.trim();
    match kind {
        FieldKind::String if !raw.is_empty() => Some(FieldValue::Str(raw.to_string())),
        FieldKind::String => None,
        FieldKind::Int => i64::from_str(raw).ok().map(FieldValue::Int),
        FieldKind::Uint => u32::from_str(raw).ok().map(FieldValue::Uint),
        FieldKind::Uint16 => u16::from_str(raw).ok().map(FieldValue::Uint16),
        FieldKind::Bool => bool::from_str(raw).ok().map(FieldValue::Bool),
    }
}

/// Validated, typed fields of one record-level request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fields {
    values: BTreeMap<&'static str, FieldValue>,
}

impl Fields {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Presentation text of a field; empty for absent optional fields.
    fn text(&self, name: &str) -> String {
        self.get(name).map(|v| v.to_string()).unwrap_or_default()
    }

    fn int(&self, name: &str) -> i64 {
        match self.get(name) {
            Some(FieldValue::Int(v)) => *v,
            _ => 0,
        }
    }

    fn uint(&self, name: &str) -> Option<u32> {
        match self.get(name) {
            Some(FieldValue::Uint(v)) => Some(*v),
            _ => None,
        }
    }

    fn uint16(&self, name: &str) -> u16 {
        match self.get(name) {
            Some(FieldValue::Uint16(v)) => *v,
            _ => 0,
        }
    }

    pub fn name(&self) -> String {
        self.text("name")
    }

    pub fn ttl(&self) -> Option<i64> {
        match self.get("ttl") {
            Some(FieldValue::Int(v)) => Some(*v),
            _ => None,
        }
    }
}

/// Checks `provided` against the field table of `record_type`.
///
/// Every problem found is reported at once: absent required fields, values
/// that do not parse as their kind, and fields the type does not define.
pub fn validate(
    record_type: &str,
    provided: &BTreeMap<String, String>,
) -> Result<Fields, ValidationError> {
    let table = match fields_for(record_type) {
        Some(table) => table,
        None => {
            let mut err = ValidationError::new(record_type);
            err.unknown.push(format!("record type {}", record_type));
            return Err(err);
        }
    };

    let mut err = ValidationError::new(record_type);
    let mut values = BTreeMap::new();

    for spec in table {
        match provided.get(spec.name) {
            Some(raw) => match parse_value(spec.kind, raw) {
                Some(value) => {
                    values.insert(spec.name, value);
                }
                None => err.invalid.push(InvalidField {
                    name: spec.name.to_string(),
                    value: raw.clone(),
                    expected: spec.kind,
                }),
            },
            None if spec.required => err.missing.push(spec.name.to_string()),
            None => {}
        }
    }

    for name in provided.keys() {
        if !table.iter().any(|spec| spec.name == name.as_str()) {
            err.unknown.push(name.clone());
        }
    }

    if err.is_empty() {
        Ok(Fields { values })
    } else {
        Err(err)
    }
}

/// Typed RDATA, one variant per supported record type
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordData {
    A { target: String },
    Aaaa { target: String },
    Afsdb { subtype: i64, target: String },
    Cname { target: String },
    Dnskey { flags: i64, protocol: i64, algorithm: i64, key: String },
    Ds { keytag: i64, algorithm: i64, digest_type: i64, digest: String },
    Hinfo { hardware: String, software: String },
    Loc { target: String },
    Mx { priority: i64, target: String },
    Naptr {
        order: u16,
        preference: u16,
        flags: String,
        service: String,
        regexp: String,
        replacement: String,
    },
    Ns { target: String },
    Nsec3 {
        algorithm: i64,
        flags: i64,
        iterations: i64,
        salt: String,
        next_hashed_owner_name: String,
        type_bitmaps: String,
    },
    Nsec3param { algorithm: i64, flags: i64, iterations: i64, salt: String },
    Ptr { target: String },
    Rp { mailbox: String, txt: String },
    Rrsig {
        type_covered: String,
        algorithm: i64,
        labels: i64,
        original_ttl: i64,
        expiration: String,
        inception: String,
        keytag: i64,
        signer: String,
        signature: String,
    },
    Soa {
        originserver: String,
        contact: String,
        serial: u32,
        refresh: i64,
        retry: i64,
        expire: i64,
        minimum: u32,
    },
    Spf { target: String },
    Srv { priority: i64, weight: u16, port: u16, target: String },
    Sshfp { algorithm: i64, fingerprint_type: i64, fingerprint: String },
    Txt { target: String },
}

impl RecordData {
    /// Builds typed RDATA from fields validated for `record_type`.
    pub fn from_fields(record_type: &str, f: &Fields) -> Option<RecordData> {
        let data = match record_type.to_ascii_uppercase().as_str() {
            "A" => RecordData::A { target: f.text("target") },
            "AAAA" => RecordData::Aaaa { target: f.text("target") },
            "AFSDB" => RecordData::Afsdb {
                subtype: f.int("subtype"),
                target: f.text("target"),
            },
            "CNAME" => RecordData::Cname { target: f.text("target") },
            "DNSKEY" => RecordData::Dnskey {
                flags: f.int("flags"),
                protocol: f.int("protocol"),
                algorithm: f.int("algorithm"),
                key: f.text("key"),
            },
            "DS" => RecordData::Ds {
                keytag: f.int("keytag"),
                algorithm: f.int("algorithm"),
                digest_type: f.int("digest-type"),
                digest: f.text("digest"),
            },
            "HINFO" => RecordData::Hinfo {
                hardware: f.text("hardware"),
                software: f.text("software"),
            },
            "LOC" => RecordData::Loc { target: f.text("target") },
            "MX" => RecordData::Mx {
                priority: f.int("priority"),
                target: f.text("target"),
            },
            "NAPTR" => RecordData::Naptr {
                order: f.uint16("order"),
                preference: f.uint16("preference"),
                flags: f.text("flags"),
                service: f.text("service"),
                regexp: f.text("regexp"),
                replacement: f.text("replacement"),
            },
            "NS" => RecordData::Ns { target: f.text("target") },
            "NSEC3" => RecordData::Nsec3 {
                algorithm: f.int("algorithm"),
                flags: f.int("flags"),
                iterations: f.int("iterations"),
                salt: f.text("salt"),
                next_hashed_owner_name: f.text("next-hashed-owner-name"),
                type_bitmaps: f.text("type-bitmaps"),
            },
            "NSEC3PARAM" => RecordData::Nsec3param {
                algorithm: f.int("algorithm"),
                flags: f.int("flags"),
                iterations: f.int("iterations"),
                salt: f.text("salt"),
            },
            "PTR" => RecordData::Ptr { target: f.text("target") },
            "RP" => RecordData::Rp {
                mailbox: f.text("mailbox"),
                txt: f.text("txt"),
            },
            "RRSIG" => RecordData::Rrsig {
                type_covered: f.text("type-covered"),
                algorithm: f.int("algorithm"),
                labels: f.int("labels"),
                original_ttl: f.int("original-ttl"),
                expiration: f.text("expiration"),
                inception: f.text("inception"),
                keytag: f.int("keytag"),
                signer: f.text("signer"),
                signature: f.text("signature"),
            },
            "SOA" => RecordData::Soa {
                originserver: f.text("originserver"),
                contact: f.text("contact"),
                serial: f.uint("serial").unwrap_or(1),
                refresh: f.int("refresh"),
                retry: f.int("retry"),
                expire: f.int("expire"),
                minimum: f.uint("minimum").unwrap_or(0),
            },
            "SPF" => RecordData::Spf { target: f.text("target") },
            "SRV" => RecordData::Srv {
                priority: f.int("priority"),
                weight: f.uint16("weight"),
                port: f.uint16("port"),
                target: f.text("target"),
            },
            "SSHFP" => RecordData::Sshfp {
                algorithm: f.int("algorithm"),
                fingerprint_type: f.int("fingerprint-type"),
                fingerprint: f.text("fingerprint"),
            },
            "TXT" => RecordData::Txt { target: f.text("target") },
            _ => return None,
        };
        Some(data)
    }

    /// RDATA in presentation format
    pub fn rdata(&self) -> String {
        match self {
            RecordData::A { target }
            | RecordData::Aaaa { target }
            | RecordData::Cname { target }
            | RecordData::Loc { target }
            | RecordData::Ns { target }
            | RecordData::Ptr { target }
            | RecordData::Spf { target }
            | RecordData::Txt { target } => target.clone(),
            RecordData::Afsdb { subtype, target } => format!("{} {}", subtype, target),
            RecordData::Dnskey {
                flags,
                protocol,
                algorithm,
                key,
            } => format!("{} {} {} {}", flags, protocol, algorithm, key),
            RecordData::Ds {
                keytag,
                algorithm,
                digest_type,
                digest,
            } => format!("{} {} {} {}", keytag, algorithm, digest_type, digest),
            RecordData::Hinfo { hardware, software } => {
                format!("\"{}\" \"{}\"", hardware, software)
            }
            RecordData::Mx { priority, target } => format!("{} {}", priority, target),
            RecordData::Naptr {
                order,
                preference,
                flags,
                service,
                regexp,
                replacement,
            } => format!(
                "{} {} \"{}\" \"{}\" \"{}\" {}",
                order, preference, flags, service, regexp, replacement
            ),
            RecordData::Nsec3 {
                algorithm,
                flags,
                iterations,
                salt,
                next_hashed_owner_name,
                type_bitmaps,
            } => format!(
                "{} {} {} {} {} {}",
                algorithm, flags, iterations, salt, next_hashed_owner_name, type_bitmaps
            ),
            RecordData::Nsec3param {
                algorithm,
                flags,
                iterations,
                salt,
            } => format!("{} {} {} {}", algorithm, flags, iterations, salt),
            RecordData::Rp { mailbox, txt } => format!("{} {}", mailbox, txt),
            RecordData::Rrsig {
                type_covered,
                algorithm,
                labels,
                original_ttl,
                expiration,
                inception,
                keytag,
                signer,
                signature,
            } => format!(
                "{} {} {} {} {} {} {} {} {}",
                type_covered,
                algorithm,
                labels,
                original_ttl,
                expiration,
                inception,
                keytag,
                signer,
                signature
            ),
            RecordData::Soa {
                originserver,
                contact,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => format!(
                "{} {} {} {} {} {} {}",
                originserver, contact, serial, refresh, retry, expire, minimum
            ),
            RecordData::Srv {
                priority,
                weight,
                port,
                target,
            } => format!("{} {} {} {}", priority, weight, port, target),
            RecordData::Sshfp {
                algorithm,
                fingerprint_type,
                fingerprint,
            } => format!("{} {} {}", algorithm, fingerprint_type, fingerprint),
        }
    }
}

impl Recordset {
    /// Uniform constructor for record-level requests: validates `provided`
    /// through the registry and renders a single-RDATA recordset. The owner
    /// name is taken as given; callers qualify it into the zone first.
    pub fn from_fields(
        record_type: &str,
        provided: &BTreeMap<String, String>,
    ) -> Result<Recordset, ValidationError> {
        let fields = validate(record_type, provided)?;

        let ttl = match fields.ttl() {
            None => DEFAULT_TTL,
            Some(ttl) if ttl > 0 && ttl <= i64::from(u32::MAX) => ttl as u32,
            Some(ttl) => {
                let mut err = ValidationError::new(record_type);
                err.invalid.push(InvalidField {
                    name: "ttl".to_string(),
                    value: ttl.to_string(),
                    expected: FieldKind::Uint,
                });
                return Err(err);
            }
        };

        let data = match RecordData::from_fields(record_type, &fields) {
            Some(data) => data,
            None => {
                let mut err = ValidationError::new(record_type);
                err.unknown.push(format!("record type {}", record_type));
                return Err(err);
            }
        };

        Ok(Recordset::new(fields.name(), record_type, ttl, vec![data.rdata()]))
    }
}
