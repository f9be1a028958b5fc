//! Key layout shared with the ingestion pipeline
//!
//! | Key | Type |
//! |---|---|
//! | `zone:<zone>` | hash, owner label -> JSON record list |
//! | `zone:<zone>:latest` | string, current serial |
//! | `zone:<zone>:all` | list, serials retained for diffing |
//! | `zone:<zone>:<from>:<to>:remove` | list, JSON `{name, record}` |
//! | `zone:<zone>:<from>:<to>:add` | list, JSON `{name, record}` |

use std::fmt;

/// Pattern used to discover reverse zones
pub const REVERSE_ZONE_PATTERN: &str = "zone:*.arpa";

const PREFIX: &str = "zone";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffSide {
    Remove,
    Add,
}

impl fmt::Display for DiffSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffSide::Remove => write!(f, "remove"),
            DiffSide::Add => write!(f, "add"),
        }
    }
}

pub fn zone_key(zone: &str) -> String {
    format!("{}:{}", PREFIX, zone)
}

pub fn latest_key(zone: &str) -> String {
    format!("{}:{}:latest", PREFIX, zone)
}

pub fn history_key(zone: &str) -> String {
    format!("{}:{}:all", PREFIX, zone)
}

pub fn diff_key(zone: &str, from: u32, to: u32, side: DiffSide) -> String {
    format!("{}:{}:{}:{}:{}", PREFIX, zone, from, to, side)
}

/// Extract the zone name from a `zone:<zone>` key
pub fn zone_from_key(key: &str) -> Option<&str> {
    let mut parts = key.split(':');
    match (parts.next(), parts.next()) {
        (Some(PREFIX), Some(zone)) if !zone.is_empty() => Some(zone),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(zone_key("example.com"), "zone:example.com");
        assert_eq!(latest_key("example.com"), "zone:example.com:latest");
        assert_eq!(history_key("example.com"), "zone:example.com:all");
        assert_eq!(
            diff_key("example.com", 4, 5, DiffSide::Remove),
            "zone:example.com:4:5:remove"
        );
        assert_eq!(
            diff_key("example.com", 4, 5, DiffSide::Add),
            "zone:example.com:4:5:add"
        );
    }

    #[test]
    fn test_zone_from_key() {
        assert_eq!(
            zone_from_key("zone:2.0.192.in-addr.arpa"),
            Some("2.0.192.in-addr.arpa")
        );
        assert_eq!(zone_from_key("zone:example.com:latest"), Some("example.com"));
        assert_eq!(zone_from_key("other:example.com"), None);
        assert_eq!(zone_from_key("zone:"), None);
    }
}
