//! Zone resolution, record synthesis and zone transfer

pub mod errors;
pub mod lookup;
pub mod ns;
pub mod record;
pub mod resolver;
pub mod serial;
pub mod soa;
pub mod transfer;

pub use errors::{Result, ZoneError};
pub use lookup::RecordLookup;
pub use ns::NsSetBuilder;
pub use record::{DiffEntry, Record, RecordDescriptor, RecordKind, RecordList, SoaRecord};
pub use resolver::ZoneResolver;
pub use soa::SoaGenerator;
pub use transfer::ZoneTransferEngine;

/// Zone constants
pub mod constants {
    /// SOA refresh interval (seconds)
    pub const SOA_REFRESH: u32 = 60;
    /// SOA retry interval (seconds)
    pub const SOA_RETRY: u32 = 60;
    /// SOA expire interval (seconds)
    pub const SOA_EXPIRE: u32 = 181_440;
    /// SOA minimum, which resolvers use as the negative-cache TTL
    pub const SOA_MINIMUM: u32 = 60;

    /// TTL of SOA records, in answers and as negative-response authority
    pub const SOA_TTL: u32 = 60;
    /// TTL of NS records
    pub const NS_TTL: u32 = 3600;
    /// TTL of records served from the store
    pub const RECORD_TTL: u32 = 60;
}

/// Fully-qualified name of an owner label inside a zone
///
/// The apex (empty label) is the zone name itself.
pub fn qualify(owner: &str, zone: &str) -> String {
    if owner.is_empty() {
        zone.to_string()
    } else {
        format!("{}.{}", owner, zone)
    }
}

/// Owner label of `name` inside `zone`
///
/// `zone` must be a suffix of `name`; the character before the suffix is
/// taken to be the separating dot and dropped.
pub fn owner_label<'a>(name: &'a str, zone: &str) -> &'a str {
    let end = name.len().saturating_sub(zone.len()).saturating_sub(1);
    name.get(..end).unwrap_or("")
}
