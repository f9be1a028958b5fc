//! DNS wire format
//!
//! Only what an authoritative server needs: decoding queries (including the
//! SOA an IXFR client sends in the authority section) and encoding responses.
//! Names are written uncompressed.

pub mod common;
pub mod constants;
pub mod enums;
pub mod header;
pub mod question;
pub mod resource;

use bitstream_io::{BigEndian, BitReader, BitWriter};
use common::PacketComponent;
use enums::{DNSResourceType, ResponseCode};
use header::DNSHeader;
use question::DNSQuestion;
use resource::DNSResource;
use tracing::trace;

use crate::response::{ResourceEntry, ResponseMessage};
use crate::zone::{Record, SoaRecord};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DNSPacket {
    pub header: DNSHeader,
    pub questions: Vec<DNSQuestion>,
    pub answers: Vec<DNSResource>,
    pub authorities: Vec<DNSResource>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    InvalidLabel,
    NameTooLong,
    PointerLoop,
    InvalidRdata,
    Truncated,
    UnsupportedType(u16),
    SectionTooLarge(usize),
    InvalidBitStream(String),
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ParseError::Truncated
        } else {
            ParseError::InvalidBitStream(e.to_string())
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::InvalidLabel => write!(f, "Invalid DNS label"),
            ParseError::NameTooLong => write!(f, "Domain name exceeds 255 octets"),
            ParseError::PointerLoop => write!(f, "Compression pointer loop"),
            ParseError::InvalidRdata => write!(f, "Invalid resource data"),
            ParseError::Truncated => write!(f, "Message truncated"),
            ParseError::UnsupportedType(rtype) => write!(f, "Unsupported record type {}", rtype),
            ParseError::SectionTooLarge(count) => {
                write!(f, "Section holds too many records: {}", count)
            }
            ParseError::InvalidBitStream(e) => write!(f, "Invalid bit stream: {}", e),
        }
    }
}

impl std::error::Error for ParseError {}

impl DNSPacket {
    /// A standard query for `name`
    pub fn query(id: u16, name: &str, qtype: DNSResourceType) -> Self {
        DNSPacket {
            header: DNSHeader {
                id,
                qdcount: 1,
                ..Default::default()
            },
            questions: vec![DNSQuestion::new(name, qtype)],
            ..Default::default()
        }
    }

    /// Attach the client's current SOA, as an IXFR query carries it
    ///
    /// Only the serial is filled in; host and admin are the root name.
    pub fn with_ixfr_serial(mut self, serial: u32) -> Result<Self, ParseError> {
        let zone = self.questions.first().map(|q| q.name()).unwrap_or_default();
        let soa = Record::SOA(SoaRecord {
            primary_host: String::new(),
            admin: String::new(),
            serial,
            refresh: 0,
            retry: 0,
            expire: 0,
            minimum: 0,
        });
        let entry = ResourceEntry {
            owner: zone,
            record: soa,
            ttl: 0,
        };
        self.authorities.push(DNSResource::from_entry(&entry)?);
        self.header.nscount = section_len(self.authorities.len())?;
        Ok(self)
    }

    /// Decode header, question, answer and authority sections
    ///
    /// The additional section is not read.
    pub fn parse(buf: &[u8]) -> Result<Self, ParseError> {
        trace!("Parsing DNS packet, size: {} bytes", buf.len());
        let mut reader = BitReader::<_, BigEndian>::new(buf);
        let mut packet = DNSPacket::default();
        packet.header.read(&mut reader, buf)?;

        for _ in 0..packet.header.qdcount {
            let mut question = DNSQuestion::default();
            question.read(&mut reader, buf)?;
            packet.questions.push(question);
        }

        for _ in 0..packet.header.ancount {
            let mut answer = DNSResource::default();
            answer.read(&mut reader, buf)?;
            packet.answers.push(answer);
        }

        for _ in 0..packet.header.nscount {
            let mut authority = DNSResource::default();
            authority.read(&mut reader, buf)?;
            packet.authorities.push(authority);
        }

        Ok(packet)
    }

    pub fn serialize(&self) -> Result<Vec<u8>, ParseError> {
        let mut buf = Vec::new();
        let mut writer: BitWriter<&mut Vec<u8>, BigEndian> = BitWriter::new(&mut buf);

        let mut header = self.header.clone();
        header.qdcount = section_len(self.questions.len())?;
        header.ancount = section_len(self.answers.len())?;
        header.nscount = section_len(self.authorities.len())?;
        header.arcount = 0;
        header.write(&mut writer)?;

        for question in &self.questions {
            question.write(&mut writer)?;
        }
        for answer in &self.answers {
            answer.write(&mut writer)?;
        }
        for authority in &self.authorities {
            authority.write(&mut writer)?;
        }

        Ok(buf)
    }

    /// Serial of the first SOA in the authority section
    pub fn ixfr_serial(&self) -> Option<u32> {
        self.authorities
            .iter()
            .find(|rr| rr.rtype == DNSResourceType::SOA)
            .and_then(|rr| rr.soa_serial().ok())
    }

    /// Authoritative response to this query carrying `message`
    pub fn response(&self, message: &ResponseMessage) -> Result<Self, ParseError> {
        let mut header = DNSHeader::reply_to(&self.header, message.error.rcode().into());
        header.aa = true;

        Ok(DNSPacket {
            header,
            questions: self.questions.iter().take(1).cloned().collect(),
            answers: message
                .answers
                .iter()
                .map(DNSResource::from_entry)
                .collect::<Result<_, _>>()?,
            authorities: message
                .authority
                .iter()
                .map(DNSResource::from_entry)
                .collect::<Result<_, _>>()?,
        })
    }

    /// Bare error reply, such as FORMERR or NOTIMP
    pub fn error_response(&self, rcode: ResponseCode) -> Self {
        DNSPacket {
            header: DNSHeader::reply_to(&self.header, rcode.into()),
            questions: self.questions.iter().take(1).cloned().collect(),
            ..Default::default()
        }
    }
}

fn section_len(len: usize) -> Result<u16, ParseError> {
    u16::try_from(len).map_err(|_| ParseError::SectionTooLarge(len))
}
