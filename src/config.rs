use crate::dns::common::check_name;
use crate::error::ConfigError;
use crate::zone::soa::admin_contact;
use serde::Deserialize;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;

const DEFAULT_DNS_PORT: u16 = 53;
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_REDIS_MAX_RETRIES: usize = 5;

/// Server configuration, read from a TOML file with environment overrides
///
/// ```toml
/// primary_hostname = "ns0.example.com"
/// hostmaster = "hostmaster@example.com"
///
/// [redis]
/// url = "redis://127.0.0.1:6379"
///
/// [[forward_zones]]
/// name = "example.com"
/// slaves = ["ns1.example.net"]
///
/// [reverse_zones]
/// hidden_master = true
/// slaves = ["ns1.example.net"]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the UDP and TCP listeners bind to
    pub bind_addr: SocketAddr,

    /// Hostname of this server, used as the SOA primary and default NS
    pub primary_hostname: String,

    /// Zone contact in `user@host` form
    pub hostmaster: String,

    pub redis: RedisSettings,

    /// Statically served zones; the first matching entry wins
    pub forward_zones: Vec<ForwardZone>,

    /// Settings shared by every reverse (`.arpa`) zone found in the store
    pub reverse_zones: ZoneSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisSettings {
    pub url: String,

    /// Connection attempts at startup before giving up
    pub max_retries: usize,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_REDIS_URL.to_string(),
            max_retries: DEFAULT_REDIS_MAX_RETRIES,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForwardZone {
    pub name: String,
    #[serde(flatten)]
    pub settings: ZoneSettings,
}

/// Name server layout of a zone
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ZoneSettings {
    /// Leave the primary out of the advertised NS set
    pub hidden_master: bool,

    /// Secondary name servers, in advertised order
    pub slaves: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_DNS_PORT)),
            primary_hostname: String::new(),
            hostmaster: String::new(),
            redis: RedisSettings::default(),
            forward_zones: Vec::new(),
            reverse_zones: ZoneSettings::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(primary_hostname: impl Into<String>, hostmaster: impl Into<String>) -> Self {
        Self {
            primary_hostname: primary_hostname.into(),
            hostmaster: hostmaster.into(),
            ..Default::default()
        }
    }

    pub fn with_forward_zone(mut self, name: impl Into<String>, settings: ZoneSettings) -> Self {
        self.forward_zones.push(ForwardZone {
            name: normalize_name(&name.into()),
            settings,
        });
        self
    }

    pub fn with_reverse_zones(mut self, settings: ZoneSettings) -> Self {
        self.reverse_zones = settings;
        self
    }

    /// Load, override from the environment, normalize and validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let mut config = Self::from_toml_str(&text)?;
        config.apply_env_overrides()?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `REDZONE_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind_addr) = lookup("REDZONE_BIND_ADDR") {
            self.bind_addr = bind_addr
                .parse()
                .map_err(|_| ConfigError::InvalidBindAddress(bind_addr))?;
        }

        if let Some(url) = lookup("REDZONE_REDIS_URL") {
            self.redis.url = url;
        }

        if let Some(retries) = lookup("REDZONE_REDIS_MAX_RETRIES") {
            self.redis.max_retries = retries.parse().map_err(|_| {
                ConfigError::InvalidRedis(format!("Invalid max retries: {}", retries))
            })?;
        }

        if let Some(hostname) = lookup("REDZONE_PRIMARY_HOSTNAME") {
            self.primary_hostname = hostname;
        }

        if let Some(hostmaster) = lookup("REDZONE_HOSTMASTER") {
            self.hostmaster = hostmaster;
        }

        Ok(())
    }

    /// Lowercase zone names and strip trailing dots from every hostname
    pub fn normalize(&mut self) {
        self.primary_hostname = self.primary_hostname.trim_end_matches('.').to_string();
        for zone in &mut self.forward_zones {
            zone.name = normalize_name(&zone.name);
            trim_hostnames(&mut zone.settings.slaves);
        }
        trim_hostnames(&mut self.reverse_zones.slaves);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_hostname(&self.primary_hostname) {
            return Err(ConfigError::InvalidPrimaryHostname(
                self.primary_hostname.clone(),
            ));
        }

        if !self.hostmaster.contains('@') || !is_hostname(&admin_contact(&self.hostmaster)) {
            return Err(ConfigError::InvalidHostmaster(self.hostmaster.clone()));
        }

        let valid_scheme = ["redis://", "rediss://", "unix://"]
            .iter()
            .any(|scheme| self.redis.url.starts_with(scheme));
        if !valid_scheme {
            return Err(ConfigError::InvalidRedis(format!(
                "Unsupported url: {}",
                self.redis.url
            )));
        }

        let mut seen = HashSet::new();
        for zone in &self.forward_zones {
            if !is_hostname(&zone.name) {
                return Err(ConfigError::InvalidZone(zone.name.clone()));
            }
            if !seen.insert(zone.name.as_str()) {
                return Err(ConfigError::DuplicateZone(zone.name.clone()));
            }
        }

        let slaves = self
            .forward_zones
            .iter()
            .flat_map(|zone| &zone.settings.slaves)
            .chain(&self.reverse_zones.slaves);
        for slave in slaves {
            if !is_hostname(slave) {
                return Err(ConfigError::InvalidNameServer(slave.clone()));
            }
        }

        Ok(())
    }

    /// Settings of a zone: its forward entry, or the reverse block for
    /// `.arpa` zones
    pub fn zone_settings(&self, zone: &str) -> Option<&ZoneSettings> {
        if let Some(forward) = self.forward_zones.iter().find(|z| z.name == zone) {
            return Some(&forward.settings);
        }
        zone.rsplit('.')
            .next()
            .is_some_and(|label| label.eq_ignore_ascii_case("arpa"))
            .then_some(&self.reverse_zones)
    }
}

/// Non-empty, no whitespace, and within the wire limits for names
fn is_hostname(name: &str) -> bool {
    !name.is_empty() && !name.contains(char::is_whitespace) && check_name(name).is_ok()
}

fn normalize_name(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

fn trim_hostnames(hosts: &mut [String]) {
    for host in hosts {
        if host.ends_with('.') {
            *host = host.trim_end_matches('.').to_string();
        }
    }
}
