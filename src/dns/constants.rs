/// DNS Opcode values from RFC 1035 and RFC 2136
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Opcode {
    QUERY,
    IQUERY,
    STATUS,
    NOTIFY,
    UPDATE,
    DSO,
    Unassigned(u8),
}

impl From<u8> for Opcode {
    fn from(value: u8) -> Self {
        match value {
            0 => Opcode::QUERY,
            1 => Opcode::IQUERY,
            2 => Opcode::STATUS,
            4 => Opcode::NOTIFY,
            5 => Opcode::UPDATE,
            6 => Opcode::DSO,
            x => Opcode::Unassigned(x),
        }
    }
}

/// Largest message accepted over UDP
pub const MAX_UDP_MESSAGE: usize = 4096;

/// Largest UDP payload that can be sent over IPv4
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// Largest message a 2-byte TCP length prefix can carry
pub const MAX_TCP_MESSAGE: usize = u16::MAX as usize;

/// Longest encoded domain name (RFC 1035 section 2.3.4)
pub const MAX_NAME_LENGTH: usize = 255;

/// Longest single label
pub const MAX_LABEL_LENGTH: usize = 63;

/// Compression pointers followed before a name is rejected
pub const MAX_POINTER_HOPS: usize = 32;
