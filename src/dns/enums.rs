use crate::zone::RecordKind;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DNSResourceType {
    #[default]
    A,
    NS,
    CNAME,
    SOA,
    PTR,
    HINFO,
    MX,
    TXT,
    AAAA,
    SRV,
    OPT,
    IXFR,
    AXFR,
    ANY,
    CAA,
    Unknown(u16),
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DNSResourceClass {
    #[default]
    IN,
    CS,
    CH,
    HS,
    Unknown(u16),
}

impl From<u16> for DNSResourceClass {
    fn from(value: u16) -> Self {
        match value {
            1 => DNSResourceClass::IN,
            2 => DNSResourceClass::CS,
            3 => DNSResourceClass::CH,
            4 => DNSResourceClass::HS,
            x => DNSResourceClass::Unknown(x),
        }
    }
}

impl From<DNSResourceClass> for u16 {
    fn from(class: DNSResourceClass) -> Self {
        match class {
            DNSResourceClass::IN => 1,
            DNSResourceClass::CS => 2,
            DNSResourceClass::CH => 3,
            DNSResourceClass::HS => 4,
            DNSResourceClass::Unknown(x) => x,
        }
    }
}

impl From<u16> for DNSResourceType {
    fn from(value: u16) -> Self {
        match value {
            1 => DNSResourceType::A,
            2 => DNSResourceType::NS,
            5 => DNSResourceType::CNAME,
            6 => DNSResourceType::SOA,
            12 => DNSResourceType::PTR,
            13 => DNSResourceType::HINFO,
            15 => DNSResourceType::MX,
            16 => DNSResourceType::TXT,
            28 => DNSResourceType::AAAA,
            33 => DNSResourceType::SRV,
            41 => DNSResourceType::OPT,
            251 => DNSResourceType::IXFR,
            252 => DNSResourceType::AXFR,
            255 => DNSResourceType::ANY,
            257 => DNSResourceType::CAA,
            x => DNSResourceType::Unknown(x),
        }
    }
}

impl From<DNSResourceType> for u16 {
    fn from(rtype: DNSResourceType) -> Self {
        match rtype {
            DNSResourceType::A => 1,
            DNSResourceType::NS => 2,
            DNSResourceType::CNAME => 5,
            DNSResourceType::SOA => 6,
            DNSResourceType::PTR => 12,
            DNSResourceType::HINFO => 13,
            DNSResourceType::MX => 15,
            DNSResourceType::TXT => 16,
            DNSResourceType::AAAA => 28,
            DNSResourceType::SRV => 33,
            DNSResourceType::OPT => 41,
            DNSResourceType::IXFR => 251,
            DNSResourceType::AXFR => 252,
            DNSResourceType::ANY => 255,
            DNSResourceType::CAA => 257,
            DNSResourceType::Unknown(x) => x,
        }
    }
}

impl From<RecordKind> for DNSResourceType {
    fn from(kind: RecordKind) -> Self {
        match kind {
            RecordKind::A => DNSResourceType::A,
            RecordKind::AAAA => DNSResourceType::AAAA,
            RecordKind::CNAME => DNSResourceType::CNAME,
            RecordKind::NS => DNSResourceType::NS,
            RecordKind::PTR => DNSResourceType::PTR,
            RecordKind::SOA => DNSResourceType::SOA,
            RecordKind::SRV => DNSResourceType::SRV,
            RecordKind::TXT => DNSResourceType::TXT,
            RecordKind::MX => DNSResourceType::MX,
            RecordKind::CAA => DNSResourceType::CAA,
        }
    }
}

/// Response codes from RFC 1035 section 4.1.1
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResponseCode {
    NoError,
    FormatError,
    ServerFailure,
    NameError,
    NotImplemented,
    Refused,
}

impl From<ResponseCode> for u8 {
    fn from(rcode: ResponseCode) -> Self {
        match rcode {
            ResponseCode::NoError => 0,
            ResponseCode::FormatError => 1,
            ResponseCode::ServerFailure => 2,
            ResponseCode::NameError => 3,
            ResponseCode::NotImplemented => 4,
            ResponseCode::Refused => 5,
        }
    }
}
