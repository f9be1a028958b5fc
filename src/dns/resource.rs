use bitstream_io::{BitRead, BitReader, BitWrite, BitWriter, Endianness};
use bytes::{Buf, BufMut};
use std::net::{Ipv4Addr, Ipv6Addr};

use super::{
    ParseError,
    common::{PacketComponent, get_name, get_u8, get_u16, get_u32, name_labels, put_name, skip_name},
    enums::{DNSResourceClass, DNSResourceType},
};
use crate::response::ResourceEntry;
use crate::zone::{Record, SoaRecord};

/// Longest character-string in TXT RDATA
const MAX_CHARACTER_STRING: usize = 255;

/// RDLENGTH is a 16-bit field
const MAX_RDATA_LENGTH: usize = u16::MAX as usize;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DNSResource {
    pub labels: Vec<String>,
    pub rtype: DNSResourceType,
    pub rclass: DNSResourceClass,
    pub ttl: u32,
    pub rdata: Vec<u8>,
}

impl DNSResource {
    /// Wire form of a response entry, class IN
    pub fn from_entry(entry: &ResourceEntry) -> Result<Self, ParseError> {
        Ok(Self {
            labels: name_labels(&entry.owner),
            rtype: entry.record.kind().into(),
            rclass: DNSResourceClass::IN,
            ttl: entry.ttl,
            rdata: encode_rdata(&entry.record)?,
        })
    }

    pub fn name(&self) -> String {
        self.labels.join(".")
    }

    /// Decode the RDATA into a typed record
    ///
    /// Names inside the RDATA must be uncompressed, which holds for
    /// everything this server writes.
    pub fn record(&self) -> Result<Record, ParseError> {
        let mut buf = self.rdata.as_slice();
        let record = match self.rtype {
            DNSResourceType::A => {
                let octets: [u8; 4] = buf.try_into().map_err(|_| ParseError::InvalidRdata)?;
                buf = &[];
                Record::A(Ipv4Addr::from(octets))
            }
            DNSResourceType::AAAA => {
                let octets: [u8; 16] = buf.try_into().map_err(|_| ParseError::InvalidRdata)?;
                buf = &[];
                Record::AAAA(Ipv6Addr::from(octets))
            }
            DNSResourceType::NS => Record::NS(get_name(&mut buf)?),
            DNSResourceType::CNAME => Record::CNAME(get_name(&mut buf)?),
            DNSResourceType::PTR => Record::PTR(get_name(&mut buf)?),
            DNSResourceType::MX => Record::MX {
                priority: get_u16(&mut buf)?,
                exchange: get_name(&mut buf)?,
            },
            DNSResourceType::TXT => {
                let mut text = Vec::new();
                while buf.has_remaining() {
                    let len = usize::from(get_u8(&mut buf)?);
                    if buf.remaining() < len {
                        return Err(ParseError::InvalidRdata);
                    }
                    text.extend_from_slice(&buf[..len]);
                    buf.advance(len);
                }
                Record::TXT(String::from_utf8(text).map_err(|_| ParseError::InvalidRdata)?)
            }
            DNSResourceType::SRV => Record::SRV {
                priority: get_u16(&mut buf)?,
                weight: get_u16(&mut buf)?,
                port: get_u16(&mut buf)?,
                target: get_name(&mut buf)?,
            },
            DNSResourceType::CAA => {
                let flags = get_u8(&mut buf)?;
                let tag_len = usize::from(get_u8(&mut buf)?);
                if buf.remaining() < tag_len {
                    return Err(ParseError::InvalidRdata);
                }
                let tag = String::from_utf8(buf[..tag_len].to_vec())
                    .map_err(|_| ParseError::InvalidRdata)?;
                buf.advance(tag_len);
                let value =
                    String::from_utf8(buf.to_vec()).map_err(|_| ParseError::InvalidRdata)?;
                buf = &[];
                Record::CAA { flags, tag, value }
            }
            DNSResourceType::SOA => Record::SOA(SoaRecord {
                primary_host: get_name(&mut buf)?,
                admin: get_name(&mut buf)?,
                serial: get_u32(&mut buf)?,
                refresh: get_u32(&mut buf)?,
                retry: get_u32(&mut buf)?,
                expire: get_u32(&mut buf)?,
                minimum: get_u32(&mut buf)?,
            }),
            _ => return Err(ParseError::UnsupportedType(self.rtype.into())),
        };

        if buf.has_remaining() {
            return Err(ParseError::InvalidRdata);
        }
        Ok(record)
    }

    /// Serial of an SOA resource; the names before it may be compressed
    pub fn soa_serial(&self) -> Result<u32, ParseError> {
        if self.rtype != DNSResourceType::SOA {
            return Err(ParseError::InvalidRdata);
        }
        let mut buf = self.rdata.as_slice();
        skip_name(&mut buf)?;
        skip_name(&mut buf)?;
        get_u32(&mut buf)
    }
}

impl PacketComponent for DNSResource {
    fn write<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError> {
        let rdlength = u16::try_from(self.rdata.len()).map_err(|_| ParseError::InvalidRdata)?;
        self.write_labels(writer, &self.labels)?;
        writer.write_var::<u16>(16, self.rtype.into())?;
        writer.write_var::<u16>(16, self.rclass.into())?;
        writer.write_var::<u32>(32, self.ttl)?;
        writer.write_var::<u16>(16, rdlength)?;
        writer.write_bytes(&self.rdata)?;
        Ok(())
    }

    fn read<E: Endianness>(
        &mut self,
        reader: &mut BitReader<&[u8], E>,
        packet: &[u8],
    ) -> Result<(), ParseError> {
        self.labels = self.read_labels(reader, packet)?;
        self.rtype = reader.read_var::<u16>(16)?.into();
        self.rclass = reader.read_var::<u16>(16)?.into();
        self.ttl = reader.read_var::<u32>(32)?;
        let rdlength = reader.read_var::<u16>(16)?;
        let mut buf = vec![0_u8; rdlength as usize];
        reader.read_bytes(&mut buf)?;
        self.rdata = buf;

        Ok(())
    }
}

fn encode_rdata(record: &Record) -> Result<Vec<u8>, ParseError> {
    let mut buf = Vec::new();
    match record {
        Record::A(addr) => buf.put_slice(&addr.octets()),
        Record::AAAA(addr) => buf.put_slice(&addr.octets()),
        Record::NS(name) | Record::CNAME(name) | Record::PTR(name) => put_name(&mut buf, name)?,
        Record::MX { priority, exchange } => {
            buf.put_u16(*priority);
            put_name(&mut buf, exchange)?;
        }
        Record::TXT(text) => {
            let bytes = text.as_bytes();
            if bytes.is_empty() {
                buf.put_u8(0);
            }
            for chunk in bytes.chunks(MAX_CHARACTER_STRING) {
                buf.put_u8(chunk.len() as u8);
                buf.put_slice(chunk);
            }
        }
        Record::SRV {
            priority,
            weight,
            port,
            target,
        } => {
            buf.put_u16(*priority);
            buf.put_u16(*weight);
            buf.put_u16(*port);
            put_name(&mut buf, target)?;
        }
        Record::CAA { flags, tag, value } => {
            let tag_len = u8::try_from(tag.len()).map_err(|_| ParseError::InvalidRdata)?;
            buf.put_u8(*flags);
            buf.put_u8(tag_len);
            buf.put_slice(tag.as_bytes());
            buf.put_slice(value.as_bytes());
        }
        Record::SOA(soa) => {
            put_name(&mut buf, &soa.primary_host)?;
            put_name(&mut buf, &soa.admin)?;
            buf.put_u32(soa.serial);
            buf.put_u32(soa.refresh);
            buf.put_u32(soa.retry);
            buf.put_u32(soa.expire);
            buf.put_u32(soa.minimum);
        }
    }
    if buf.len() > MAX_RDATA_LENGTH {
        return Err(ParseError::InvalidRdata);
    }
    Ok(buf)
}

/// Check that `record` has a wire encoding
pub fn check_record(record: &Record) -> Result<(), ParseError> {
    encode_rdata(record).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(record: Record) -> ResourceEntry {
        ResourceEntry {
            owner: "www.example.com".to_string(),
            record,
            ttl: 60,
        }
    }

    #[test]
    fn test_rdata_layout() {
        let a = DNSResource::from_entry(&entry(Record::A("192.0.2.1".parse().unwrap()))).unwrap();
        assert_eq!(a.rdata, vec![192, 0, 2, 1]);
        assert_eq!(a.rtype, DNSResourceType::A);
        assert_eq!(a.labels, vec!["www", "example", "com"]);

        let mx = DNSResource::from_entry(&entry(Record::MX {
            priority: 10,
            exchange: "mx.example.com".to_string(),
        }))
        .unwrap();
        assert_eq!(&mx.rdata[..2], &[0, 10]);
        assert_eq!(mx.rdata.len(), 2 + 16);
    }

    #[test]
    fn test_long_txt_is_split() {
        let text = "x".repeat(300);
        let txt = DNSResource::from_entry(&entry(Record::TXT(text.clone()))).unwrap();
        assert_eq!(txt.rdata.len(), 302);
        assert_eq!(txt.rdata[0], 255);
        assert_eq!(txt.rdata[256], 45);
        assert_eq!(txt.record().unwrap(), Record::TXT(text));
    }

    #[test]
    fn test_unencodable_records() {
        let long_label = format!("{}.example.net", "a".repeat(64));
        assert_eq!(
            check_record(&Record::CNAME(long_label.clone())),
            Err(ParseError::InvalidLabel)
        );
        assert!(check_record(&Record::MX {
            priority: 0,
            exchange: long_label,
        })
        .is_err());

        // 257 chunks of 255 plus their length octets overflow RDLENGTH
        assert_eq!(
            check_record(&Record::TXT("t".repeat(255 * 257))),
            Err(ParseError::InvalidRdata)
        );
        assert!(check_record(&Record::TXT("t".repeat(255 * 255))).is_ok());

        assert!(check_record(&Record::CAA {
            flags: 0,
            tag: "x".repeat(256),
            value: "v".to_string(),
        })
        .is_err());
    }

    #[test]
    fn test_decode_matches_encode() {
        let records = [
            Record::AAAA("2001:db8::1".parse().unwrap()),
            Record::SRV {
                priority: 1,
                weight: 2,
                port: 5060,
                target: "sip.example.com".to_string(),
            },
            Record::CAA {
                flags: 128,
                tag: "issue".to_string(),
                value: "ca.example.net".to_string(),
            },
            Record::SOA(SoaRecord {
                primary_host: "ns.example.com".to_string(),
                admin: "hostmaster.example.com".to_string(),
                serial: 42,
                refresh: 60,
                retry: 60,
                expire: 181_440,
                minimum: 60,
            }),
        ];
        for record in records {
            let resource = DNSResource::from_entry(&entry(record.clone())).unwrap();
            assert_eq!(resource.record().unwrap(), record);
        }
    }

    #[test]
    fn test_soa_serial_skips_compressed_names() {
        let mut rdata = vec![0xC0, 0x0C, 0xC0, 0x0C];
        rdata.extend_from_slice(&1234_u32.to_be_bytes());
        rdata.extend_from_slice(&[0; 16]);
        let resource = DNSResource {
            rtype: DNSResourceType::SOA,
            rdata,
            ..Default::default()
        };
        assert_eq!(resource.soa_serial().unwrap(), 1234);
    }
}
