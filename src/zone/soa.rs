use super::Result;
use super::constants::{SOA_EXPIRE, SOA_MINIMUM, SOA_REFRESH, SOA_RETRY};
use super::record::SoaRecord;
use super::serial::current_serial;
use crate::config::ServerConfig;
use crate::query::QueryContext;
use crate::store::ZoneData;
use tracing::{trace, warn};

/// Builds the SOA record of a zone from its stored serial
#[derive(Clone)]
pub struct SoaGenerator {
    primary_hostname: String,
    admin: String,
    data: ZoneData,
}

impl SoaGenerator {
    pub fn new(config: &ServerConfig, data: ZoneData) -> Self {
        Self {
            primary_hostname: config.primary_hostname.clone(),
            admin: admin_contact(&config.hostmaster),
            data,
        }
    }

    /// Generate the SOA for `zone`
    ///
    /// A missing or unreadable serial falls back to the wall-clock serial, so
    /// this currently always succeeds; callers still treat an error as a
    /// server failure.
    pub async fn generate(&self, ctx: &QueryContext, zone: &str) -> Result<SoaRecord> {
        let serial = match self.data.latest_serial(zone).await {
            Ok(Some(serial)) => serial,
            Ok(None) => {
                let serial = current_serial();
                warn!(
                    parent: ctx.span(),
                    zone,
                    serial,
                    "no serial stored for zone, using default"
                );
                serial
            }
            Err(e) => {
                let serial = current_serial();
                warn!(
                    parent: ctx.span(),
                    zone,
                    serial,
                    error = %e,
                    "failed getting serial for zone, using default"
                );
                serial
            }
        };
        trace!(parent: ctx.span(), zone, serial, "generated soa");

        Ok(SoaRecord {
            primary_host: self.primary_hostname.clone(),
            admin: self.admin.clone(),
            serial,
            refresh: SOA_REFRESH,
            retry: SOA_RETRY,
            expire: SOA_EXPIRE,
            minimum: SOA_MINIMUM,
        })
    }
}

/// RFC 1035 mailbox encoding of a contact address (`user@host` -> `user.host`)
pub fn admin_contact(hostmaster: &str) -> String {
    hostmaster.replacen('@', ".", 1)
}
