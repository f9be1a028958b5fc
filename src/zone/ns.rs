use super::record::Record;
use crate::config::{ServerConfig, ZoneSettings};
use std::sync::Arc;

/// Derives the advertised NS set of a zone from configuration
#[derive(Clone)]
pub struct NsSetBuilder {
    config: Arc<ServerConfig>,
}

impl NsSetBuilder {
    pub fn new(config: Arc<ServerConfig>) -> Self {
        Self { config }
    }

    /// The primary (unless it is a hidden master) followed by every slave, in
    /// configuration order
    pub fn build(&self, zone: &str) -> Vec<Record> {
        let default_settings = ZoneSettings::default();
        let settings = self
            .config
            .zone_settings(zone)
            .unwrap_or(&default_settings);

        let primary = (!settings.hidden_master)
            .then(|| Record::NS(self.config.primary_hostname.clone()));

        primary
            .into_iter()
            .chain(settings.slaves.iter().cloned().map(Record::NS))
            .collect()
    }
}
