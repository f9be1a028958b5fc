use crate::store::StoreError;
use std::fmt;

/// Zone-related errors
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneError {
    /// Stored JSON could not be decoded
    Decode(String),
    /// Record kind has no builder
    UnknownRecordKind(String),
    /// Descriptor arguments do not fit the record kind
    InvalidRecord { kind: String, reason: String },
    /// Record store read failed
    Store(StoreError),
}

impl fmt::Display for ZoneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(msg) => write!(f, "Failed to decode stored record: {}", msg),
            Self::UnknownRecordKind(kind) => write!(f, "Unknown record kind: {}", kind),
            Self::InvalidRecord { kind, reason } => {
                write!(f, "Invalid {} record: {}", kind, reason)
            }
            Self::Store(err) => write!(f, "Store error: {}", err),
        }
    }
}

impl std::error::Error for ZoneError {}

impl From<StoreError> for ZoneError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<serde_json::Error> for ZoneError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ZoneError>;
