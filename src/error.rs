use thiserror::Error;

use crate::dns::ParseError;

#[derive(Error, Debug, Clone)]
pub enum DnsError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Message of {0} bytes does not fit a TCP frame")]
    MessageTooLarge(usize),
}

impl From<std::io::Error> for DnsError {
    fn from(err: std::io::Error) -> Self {
        DnsError::Io(err.to_string())
    }
}

impl From<ParseError> for DnsError {
    fn from(err: ParseError) -> Self {
        DnsError::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DnsError>;

/// Errors raised while loading or validating the server configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Invalid primary hostname: {0}")]
    InvalidPrimaryHostname(String),

    #[error("Invalid hostmaster contact: {0}")]
    InvalidHostmaster(String),

    #[error("Invalid zone name: {0}")]
    InvalidZone(String),

    #[error("Invalid name server {0}")]
    InvalidNameServer(String),

    #[error("Forward zone configured twice: {0}")]
    DuplicateZone(String),

    #[error("Invalid redis settings: {0}")]
    InvalidRedis(String),
}
