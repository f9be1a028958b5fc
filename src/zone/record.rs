use super::constants::{SOA_EXPIRE, SOA_MINIMUM, SOA_REFRESH, SOA_RETRY};
use super::{Result, ZoneError};
use crate::dns::common::check_name;
use crate::dns::resource::check_record;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Resource record kinds that can be stored and served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    A,
    AAAA,
    CNAME,
    NS,
    PTR,
    SOA,
    SRV,
    TXT,
    MX,
    CAA,
}

impl RecordKind {
    pub const ALL: [RecordKind; 10] = [
        RecordKind::A,
        RecordKind::AAAA,
        RecordKind::CNAME,
        RecordKind::NS,
        RecordKind::PTR,
        RecordKind::SOA,
        RecordKind::SRV,
        RecordKind::TXT,
        RecordKind::MX,
        RecordKind::CAA,
    ];

    /// Name used in stored descriptors
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::A => "A",
            RecordKind::AAAA => "AAAA",
            RecordKind::CNAME => "CNAME",
            RecordKind::NS => "NS",
            RecordKind::PTR => "PTR",
            RecordKind::SOA => "SOA",
            RecordKind::SRV => "SRV",
            RecordKind::TXT => "TXT",
            RecordKind::MX => "MX",
            RecordKind::CAA => "CAA",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Start-of-authority data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoaRecord {
    pub primary_host: String,
    pub admin: String,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

impl SoaRecord {
    /// Copy of this SOA carrying a different serial
    pub fn with_serial(&self, serial: u32) -> Self {
        Self {
            serial,
            ..self.clone()
        }
    }
}

/// A resource record with its RFC-defined fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    CNAME(String),
    NS(String),
    PTR(String),
    TXT(String),
    MX {
        priority: u16,
        exchange: String,
    },
    SRV {
        priority: u16,
        weight: u16,
        port: u16,
        target: String,
    },
    CAA {
        flags: u8,
        tag: String,
        value: String,
    },
    SOA(SoaRecord),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::A(_) => RecordKind::A,
            Record::AAAA(_) => RecordKind::AAAA,
            Record::CNAME(_) => RecordKind::CNAME,
            Record::NS(_) => RecordKind::NS,
            Record::PTR(_) => RecordKind::PTR,
            Record::TXT(_) => RecordKind::TXT,
            Record::MX { .. } => RecordKind::MX,
            Record::SRV { .. } => RecordKind::SRV,
            Record::CAA { .. } => RecordKind::CAA,
            Record::SOA(_) => RecordKind::SOA,
        }
    }

    /// Serial of an SOA record
    pub fn serial(&self) -> Option<u32> {
        match self {
            Record::SOA(soa) => Some(soa.serial),
            _ => None,
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::A(addr) => write!(f, "A {}", addr),
            Record::AAAA(addr) => write!(f, "AAAA {}", addr),
            Record::CNAME(target) => write!(f, "CNAME {}", target),
            Record::NS(target) => write!(f, "NS {}", target),
            Record::PTR(target) => write!(f, "PTR {}", target),
            Record::TXT(text) => write!(f, "TXT {:?}", text),
            Record::MX { priority, exchange } => write!(f, "MX {} {}", priority, exchange),
            Record::SRV {
                priority,
                weight,
                port,
                target,
            } => write!(f, "SRV {} {} {} {}", priority, weight, port, target),
            Record::CAA { flags, tag, value } => write!(f, "CAA {} {} {:?}", flags, tag, value),
            Record::SOA(soa) => write!(
                f,
                "SOA {} {} {} {} {} {} {}",
                soa.primary_host,
                soa.admin,
                soa.serial,
                soa.refresh,
                soa.retry,
                soa.expire,
                soa.minimum
            ),
        }
    }
}

/// Flattened record as written by the ingestion pipeline
///
/// The pipeline names the kind field `constructor`; `kind` is accepted too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDescriptor {
    #[serde(alias = "constructor")]
    pub kind: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl RecordDescriptor {
    pub fn new(kind: RecordKind, args: Vec<Value>) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            args,
        }
    }

    pub fn is_kind(&self, kind: RecordKind) -> bool {
        self.kind == kind.as_str()
    }

    /// Build the typed record through the builder table
    ///
    /// Records that could not be written into a response are rejected here.
    pub fn build(&self) -> Result<Record> {
        let kind = RecordKind::from_name(&self.kind)
            .ok_or_else(|| ZoneError::UnknownRecordKind(self.kind.clone()))?;
        let builder =
            builder_for(kind).ok_or_else(|| ZoneError::UnknownRecordKind(self.kind.clone()))?;
        let args = Args {
            kind,
            values: &self.args,
        };
        let record = builder(&args)?;
        check_record(&record).map_err(|e| args.invalid(format!("not encodable: {}", e)))?;
        Ok(record)
    }
}

impl From<&Record> for RecordDescriptor {
    fn from(record: &Record) -> Self {
        let args = match record {
            Record::A(addr) => vec![json!(addr.to_string())],
            Record::AAAA(addr) => vec![json!(addr.to_string())],
            Record::CNAME(target) | Record::NS(target) | Record::PTR(target) => {
                vec![json!(target)]
            }
            Record::TXT(text) => vec![json!(text)],
            Record::MX { priority, exchange } => {
                vec![json!(exchange), json!({ "priority": priority })]
            }
            Record::SRV {
                priority,
                weight,
                port,
                target,
            } => vec![
                json!(target),
                json!(port),
                json!({ "priority": priority, "weight": weight }),
            ],
            Record::CAA { flags, tag, value } => vec![json!(flags), json!(tag), json!(value)],
            Record::SOA(soa) => vec![
                json!(soa.primary_host),
                json!({
                    "serial": soa.serial,
                    "admin": soa.admin,
                    "refresh": soa.refresh,
                    "retry": soa.retry,
                    "expire": soa.expire,
                    "ttl": soa.minimum,
                }),
            ],
        };
        Self::new(record.kind(), args)
    }
}

/// One `{name, record}` entry of a diff list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub name: String,
    pub record: RecordDescriptor,
}

impl DiffEntry {
    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// The JSON record list stored under one owner label
///
/// Entries are decoded one by one so a malformed descriptor only costs itself.
#[derive(Debug, Clone)]
pub struct RecordList {
    entries: Vec<Value>,
}

impl RecordList {
    pub fn parse(json: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(json)? {
            Value::Array(entries) => Ok(Self { entries }),
            other => Err(ZoneError::Decode(format!(
                "expected a JSON array of records, got {}",
                json_type(&other)
            ))),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = Result<RecordDescriptor>> + '_ {
        self.entries
            .iter()
            .map(|entry| RecordDescriptor::deserialize(entry).map_err(ZoneError::from))
    }
}

type RecordBuilder = fn(&Args<'_>) -> Result<Record>;

/// Kind -> constructor table used when rehydrating stored records
const BUILDERS: [(RecordKind, RecordBuilder); 10] = [
    (RecordKind::A, build_a),
    (RecordKind::AAAA, build_aaaa),
    (RecordKind::CNAME, build_cname),
    (RecordKind::NS, build_ns),
    (RecordKind::PTR, build_ptr),
    (RecordKind::SOA, build_soa),
    (RecordKind::SRV, build_srv),
    (RecordKind::TXT, build_txt),
    (RecordKind::MX, build_mx),
    (RecordKind::CAA, build_caa),
];

fn builder_for(kind: RecordKind) -> Option<RecordBuilder> {
    BUILDERS
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, builder)| *builder)
}

/// Positional constructor arguments of a descriptor
struct Args<'a> {
    kind: RecordKind,
    values: &'a [Value],
}

impl Args<'_> {
    fn invalid(&self, reason: impl Into<String>) -> ZoneError {
        ZoneError::InvalidRecord {
            kind: self.kind.to_string(),
            reason: reason.into(),
        }
    }

    fn value(&self, idx: usize) -> Result<&Value> {
        self.values
            .get(idx)
            .ok_or_else(|| self.invalid(format!("missing argument {}", idx)))
    }

    fn string(&self, idx: usize) -> Result<String> {
        match self.value(idx)? {
            Value::String(s) => Ok(s.clone()),
            other => Err(self.invalid(format!(
                "argument {} must be a string, got {}",
                idx,
                json_type(other)
            ))),
        }
    }

    /// String argument holding a domain name
    fn name(&self, idx: usize) -> Result<String> {
        let name = self.string(idx)?;
        check_name(&name).map_err(|e| self.invalid(format!("bad name {:?}: {}", name, e)))?;
        Ok(name)
    }

    fn number<T: TryFrom<u64>>(&self, value: &Value, what: &str) -> Result<T> {
        let n = match value {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        n.and_then(|n| T::try_from(n).ok())
            .ok_or_else(|| self.invalid(format!("{} is out of range or not a number", what)))
    }

    /// Trailing options object; absent or `null` means defaults
    fn options(&self, idx: usize) -> Result<Option<&Map<String, Value>>> {
        match self.values.get(idx) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(other) => Err(self.invalid(format!(
                "argument {} must be an object, got {}",
                idx,
                json_type(other)
            ))),
        }
    }

    fn option_number<T: TryFrom<u64>>(
        &self,
        options: Option<&Map<String, Value>>,
        names: &[&str],
        default: T,
    ) -> Result<T> {
        let found = options.and_then(|map| names.iter().find_map(|name| map.get(*name)));
        match found {
            None | Some(Value::Null) => Ok(default),
            Some(value) => self.number(value, names[0]),
        }
    }
}

fn build_a(args: &Args<'_>) -> Result<Record> {
    let text = args.string(0)?;
    let addr = text
        .parse::<Ipv4Addr>()
        .map_err(|_| args.invalid(format!("invalid IPv4 address: {}", text)))?;
    Ok(Record::A(addr))
}

fn build_aaaa(args: &Args<'_>) -> Result<Record> {
    let text = args.string(0)?;
    let addr = text
        .parse::<Ipv6Addr>()
        .map_err(|_| args.invalid(format!("invalid IPv6 address: {}", text)))?;
    Ok(Record::AAAA(addr))
}

fn build_cname(args: &Args<'_>) -> Result<Record> {
    Ok(Record::CNAME(args.name(0)?))
}

fn build_ns(args: &Args<'_>) -> Result<Record> {
    Ok(Record::NS(args.name(0)?))
}

fn build_ptr(args: &Args<'_>) -> Result<Record> {
    Ok(Record::PTR(args.name(0)?))
}

fn build_txt(args: &Args<'_>) -> Result<Record> {
    Ok(Record::TXT(args.string(0)?))
}

fn build_mx(args: &Args<'_>) -> Result<Record> {
    let exchange = args.name(0)?;
    let options = args.options(1)?;
    Ok(Record::MX {
        priority: args.option_number(options, &["priority"], 0)?,
        exchange,
    })
}

fn build_srv(args: &Args<'_>) -> Result<Record> {
    let target = args.name(0)?;
    let port = args.number(args.value(1)?, "port")?;
    let options = args.options(2)?;
    Ok(Record::SRV {
        priority: args.option_number(options, &["priority"], 0)?,
        weight: args.option_number(options, &["weight"], 0)?,
        port,
        target,
    })
}

fn build_caa(args: &Args<'_>) -> Result<Record> {
    Ok(Record::CAA {
        flags: args.number(args.value(0)?, "flags")?,
        tag: args.string(1)?,
        value: args.string(2)?,
    })
}

fn build_soa(args: &Args<'_>) -> Result<Record> {
    let primary_host = args.name(0)?;
    let options = args.options(1)?;
    let admin = match options.and_then(|map| map.get("admin")) {
        Some(Value::String(admin)) => admin.clone(),
        Some(other) => {
            return Err(args.invalid(format!("admin must be a string, got {}", json_type(other))));
        }
        None => format!("hostmaster.{}", primary_host),
    };
    Ok(Record::SOA(SoaRecord {
        serial: args.option_number(options, &["serial"], 0)?,
        refresh: args.option_number(options, &["refresh"], SOA_REFRESH)?,
        retry: args.option_number(options, &["retry"], SOA_RETRY)?,
        expire: args.option_number(options, &["expire"], SOA_EXPIRE)?,
        minimum: args.option_number(options, &["ttl", "minimum"], SOA_MINIMUM)?,
        primary_host,
        admin,
    }))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
