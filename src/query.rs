//! Inbound queries and their per-query logging context

use crate::dns::DNSPacket;
use crate::dns::constants::Opcode;
use crate::dns::enums::{DNSResourceType, ResponseCode};
use crate::zone::RecordKind;
use std::fmt;
use std::net::SocketAddr;
use tracing::{Span, field, info_span};

/// What a query asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Record(RecordKind),
    AXFR,
    IXFR,
    /// Any type this server holds no records for
    Other(u16),
}

impl QueryType {
    pub fn record_kind(self) -> Option<RecordKind> {
        match self {
            QueryType::Record(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn is_transfer(self) -> bool {
        matches!(self, QueryType::AXFR | QueryType::IXFR)
    }
}

impl From<DNSResourceType> for QueryType {
    fn from(rtype: DNSResourceType) -> Self {
        match rtype {
            DNSResourceType::A => QueryType::Record(RecordKind::A),
            DNSResourceType::NS => QueryType::Record(RecordKind::NS),
            DNSResourceType::CNAME => QueryType::Record(RecordKind::CNAME),
            DNSResourceType::SOA => QueryType::Record(RecordKind::SOA),
            DNSResourceType::PTR => QueryType::Record(RecordKind::PTR),
            DNSResourceType::MX => QueryType::Record(RecordKind::MX),
            DNSResourceType::TXT => QueryType::Record(RecordKind::TXT),
            DNSResourceType::AAAA => QueryType::Record(RecordKind::AAAA),
            DNSResourceType::SRV => QueryType::Record(RecordKind::SRV),
            DNSResourceType::CAA => QueryType::Record(RecordKind::CAA),
            DNSResourceType::AXFR => QueryType::AXFR,
            DNSResourceType::IXFR => QueryType::IXFR,
            other => QueryType::Other(other.into()),
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryType::Record(kind) => write!(f, "{}", kind),
            QueryType::AXFR => write!(f, "AXFR"),
            QueryType::IXFR => write!(f, "IXFR"),
            QueryType::Other(code) => write!(f, "TYPE{}", code),
        }
    }
}

/// A parsed query as seen by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Lowercase name without the trailing dot
    pub name: String,
    pub qtype: QueryType,
    pub source: SocketAddr,
    pub id: u16,
    /// Client serial carried in the authority section of an IXFR query
    pub ixfr_base: Option<u32>,
}

impl Query {
    pub fn new(name: &str, qtype: QueryType, source: SocketAddr, id: u16) -> Self {
        Self {
            name: normalize_name(name),
            qtype,
            source,
            id,
            ixfr_base: None,
        }
    }

    pub fn with_ixfr_base(mut self, serial: u32) -> Self {
        self.ixfr_base = Some(serial);
        self
    }

    /// Build a query from a decoded packet
    ///
    /// Returns the response code to reply with when the packet is not a
    /// standard query this server can answer.
    pub fn from_packet(packet: &DNSPacket, source: SocketAddr) -> Result<Self, ResponseCode> {
        if Opcode::from(packet.header.opcode) != Opcode::QUERY {
            return Err(ResponseCode::NotImplemented);
        }
        let question = packet.questions.first().ok_or(ResponseCode::FormatError)?;

        let mut query = Query::new(
            &question.name(),
            question.qtype.into(),
            source,
            packet.header.id,
        );
        if query.qtype == QueryType::IXFR {
            query.ixfr_base = packet.ixfr_serial();
        }
        Ok(query)
    }
}

fn normalize_name(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

/// Correlation context of a single query
///
/// Every component a query passes through receives this context and logs
/// under its span, so all events of one query share source endpoint, id,
/// name, type and, once resolved, zone.
#[derive(Debug, Clone)]
pub struct QueryContext {
    span: Span,
}

impl QueryContext {
    pub fn new(query: &Query) -> Self {
        let span = info_span!(
            "query",
            from = %query.source,
            q_id = query.id,
            q_name = %query.name,
            q_type = %query.qtype,
            zone = field::Empty,
        );
        Self { span }
    }

    pub fn record_zone(&self, zone: &str) {
        self.span.record("zone", zone);
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Default for QueryContext {
    /// Context that is not attached to any query
    fn default() -> Self {
        Self { span: Span::none() }
    }
}
