use bitstream_io::{BitRead, BitReader, BitWrite, BitWriter, Endianness};
use bytes::{Buf, BufMut};

use super::ParseError;
use super::constants::{MAX_LABEL_LENGTH, MAX_NAME_LENGTH, MAX_POINTER_HOPS};

const POINTER_MASK: u8 = 0xC0;

pub trait PacketComponent {
    fn write<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError>;

    /// Read the component; `packet` is the whole message, for name compression
    fn read<E: Endianness>(
        &mut self,
        reader: &mut BitReader<&[u8], E>,
        packet: &[u8],
    ) -> Result<(), ParseError>;

    fn read_labels<E: Endianness>(
        &mut self,
        reader: &mut BitReader<&[u8], E>,
        packet: &[u8],
    ) -> Result<Vec<String>, ParseError> {
        let mut labels = Vec::new();
        loop {
            let label_len = reader.read_var::<u8>(8)?;
            if label_len == 0 {
                break;
            }
            if label_len & POINTER_MASK == POINTER_MASK {
                let low = reader.read_var::<u8>(8)?;
                let offset = (usize::from(label_len & !POINTER_MASK) << 8) | usize::from(low);
                labels.extend(labels_at(packet, offset)?);
                break;
            }
            if usize::from(label_len) > MAX_LABEL_LENGTH {
                return Err(ParseError::InvalidLabel);
            }
            let mut buf = vec![0; label_len as usize];
            reader.read_bytes(&mut buf)?;
            labels.push(String::from_utf8(buf).map_err(|_| ParseError::InvalidLabel)?);
        }

        check_name_length(&labels)?;
        Ok(labels)
    }

    fn write_labels<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
        labels: &[String],
    ) -> Result<(), ParseError> {
        check_name_length(labels)?;
        for label in labels {
            if label.is_empty() || label.len() > MAX_LABEL_LENGTH {
                return Err(ParseError::InvalidLabel);
            }
            writer.write_var::<u8>(8, label.len() as u8)?;
            writer.write_bytes(label.as_bytes())?;
        }
        writer.write_var::<u8>(8, 0)?;

        Ok(())
    }
}

/// Labels of the name starting at `offset`, following compression pointers
pub fn labels_at(packet: &[u8], mut offset: usize) -> Result<Vec<String>, ParseError> {
    let mut labels = Vec::new();
    let mut hops = 0;
    loop {
        let label_len = *packet.get(offset).ok_or(ParseError::InvalidLabel)?;
        if label_len == 0 {
            break;
        }
        if label_len & POINTER_MASK == POINTER_MASK {
            hops += 1;
            if hops > MAX_POINTER_HOPS {
                return Err(ParseError::PointerLoop);
            }
            let low = *packet.get(offset + 1).ok_or(ParseError::InvalidLabel)?;
            offset = (usize::from(label_len & !POINTER_MASK) << 8) | usize::from(low);
            continue;
        }
        let start = offset + 1;
        let end = start + usize::from(label_len);
        let bytes = packet.get(start..end).ok_or(ParseError::InvalidLabel)?;
        labels.push(String::from_utf8(bytes.to_vec()).map_err(|_| ParseError::InvalidLabel)?);
        offset = end;
    }
    Ok(labels)
}

/// Split a dotted name into labels; the root (empty name) has none
pub fn name_labels(name: &str) -> Vec<String> {
    name.trim_end_matches('.')
        .split('.')
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

/// Check that `name` fits the wire limits on label and name length
pub fn check_name(name: &str) -> Result<(), ParseError> {
    check_labels(&name_labels(name))
}

fn check_labels(labels: &[String]) -> Result<(), ParseError> {
    if labels.iter().any(|label| label.len() > MAX_LABEL_LENGTH) {
        return Err(ParseError::InvalidLabel);
    }
    check_name_length(labels)
}

/// Append `name` uncompressed
pub fn put_name(buf: &mut impl BufMut, name: &str) -> Result<(), ParseError> {
    let labels = name_labels(name);
    check_labels(&labels)?;
    for label in &labels {
        buf.put_u8(label.len() as u8);
        buf.put_slice(label.as_bytes());
    }
    buf.put_u8(0);
    Ok(())
}

/// Read an uncompressed name
pub fn get_name(buf: &mut &[u8]) -> Result<String, ParseError> {
    let mut labels = Vec::new();
    loop {
        let label_len = usize::from(get_u8(buf)?);
        if label_len == 0 {
            break;
        }
        if label_len > MAX_LABEL_LENGTH || buf.remaining() < label_len {
            return Err(ParseError::InvalidLabel);
        }
        let label = String::from_utf8((*buf)[..label_len].to_vec())
            .map_err(|_| ParseError::InvalidLabel)?;
        buf.advance(label_len);
        labels.push(label);
    }
    Ok(labels.join("."))
}

/// Step over a name that may end in a compression pointer
pub fn skip_name(buf: &mut &[u8]) -> Result<(), ParseError> {
    loop {
        let label_len = get_u8(buf)?;
        if label_len == 0 {
            return Ok(());
        }
        if label_len & POINTER_MASK == POINTER_MASK {
            get_u8(buf)?;
            return Ok(());
        }
        let label_len = usize::from(label_len);
        if buf.remaining() < label_len {
            return Err(ParseError::InvalidLabel);
        }
        buf.advance(label_len);
    }
}

pub fn get_u8(buf: &mut &[u8]) -> Result<u8, ParseError> {
    if buf.remaining() < 1 {
        return Err(ParseError::Truncated);
    }
    Ok(buf.get_u8())
}

pub fn get_u16(buf: &mut &[u8]) -> Result<u16, ParseError> {
    if buf.remaining() < 2 {
        return Err(ParseError::Truncated);
    }
    Ok(buf.get_u16())
}

pub fn get_u32(buf: &mut &[u8]) -> Result<u32, ParseError> {
    if buf.remaining() < 4 {
        return Err(ParseError::Truncated);
    }
    Ok(buf.get_u32())
}

fn check_name_length(labels: &[String]) -> Result<(), ParseError> {
    let encoded: usize = labels.iter().map(|label| label.len() + 1).sum::<usize>() + 1;
    if encoded > MAX_NAME_LENGTH {
        return Err(ParseError::NameTooLong);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_at_follows_pointers() {
        // "example.com" at offset 0, "www" + pointer to 0 at offset 13
        let mut packet = vec![7];
        packet.extend_from_slice(b"example");
        packet.push(3);
        packet.extend_from_slice(b"com");
        packet.push(0);
        packet.push(3);
        packet.extend_from_slice(b"www");
        packet.extend_from_slice(&[0xC0, 0x00]);

        assert_eq!(labels_at(&packet, 13).unwrap(), vec!["www", "example", "com"]);
    }

    #[test]
    fn test_pointer_loop_is_rejected() {
        let packet = [0xC0, 0x00];
        assert!(matches!(labels_at(&packet, 0), Err(ParseError::PointerLoop)));
    }

    #[test]
    fn test_name_encoding() {
        let mut buf = Vec::new();
        put_name(&mut buf, "www.example.com.").unwrap();
        assert_eq!(buf.len(), 17);

        let mut slice = buf.as_slice();
        assert_eq!(get_name(&mut slice).unwrap(), "www.example.com");
        assert!(slice.is_empty());

        let mut root = Vec::new();
        put_name(&mut root, "").unwrap();
        assert_eq!(root, vec![0]);

        let long = format!("{}.com", "a".repeat(64));
        assert!(matches!(put_name(&mut Vec::<u8>::new(), &long), Err(ParseError::InvalidLabel)));
    }

    #[test]
    fn test_check_name() {
        assert!(check_name("www.example.com").is_ok());
        assert!(check_name("").is_ok());
        assert!(check_name(&format!("{}.com", "a".repeat(63))).is_ok());
        assert_eq!(
            check_name(&format!("{}.com", "a".repeat(64))),
            Err(ParseError::InvalidLabel)
        );

        // 5 labels of 50 octets encode to 256 octets with the root
        let long = vec!["b".repeat(50); 5].join(".");
        assert_eq!(check_name(&long), Err(ParseError::NameTooLong));
        let fits = vec!["b".repeat(50); 4].join(".");
        assert!(check_name(&fits).is_ok());
    }

    #[test]
    fn test_skip_name() {
        let data = [3, b'f', b'o', b'o', 0xC0, 0x0C, 0xAA];
        let mut slice = &data[..];
        skip_name(&mut slice).unwrap();
        assert_eq!(slice, &[0xAA]);
    }
}
