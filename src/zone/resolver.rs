use crate::config::ServerConfig;
use crate::query::QueryContext;
use crate::store::ZoneData;
use std::sync::Arc;
use tracing::{trace, warn};

/// Maps query names to the zone that serves them
pub struct ZoneResolver {
    config: Arc<ServerConfig>,
    data: ZoneData,
}

impl ZoneResolver {
    pub fn new(config: Arc<ServerConfig>, data: ZoneData) -> Self {
        Self { config, data }
    }

    /// Find the zone for `name`
    ///
    /// Forward zones are checked in configuration order, then, for names under
    /// `arpa`, the reverse zones present in the store. A zone matches when its
    /// name is a trailing substring of `name`; label boundaries are not checked.
    pub async fn resolve(&self, ctx: &QueryContext, name: &str) -> Option<String> {
        if let Some(zone) = self
            .config
            .forward_zones
            .iter()
            .find(|zone| name.ends_with(zone.name.as_str()))
        {
            trace!(parent: ctx.span(), zone = %zone.name, "matched forward zone");
            return Some(zone.name.clone());
        }

        if !is_reverse_name(name) {
            return None;
        }

        match self.data.reverse_zones().await {
            Ok(zones) => {
                let zone = zones.into_iter().find(|zone| name.ends_with(zone.as_str()));
                trace!(parent: ctx.span(), zone = ?zone, "searched reverse zones");
                zone
            }
            Err(e) => {
                warn!(parent: ctx.span(), error = %e, "failed to list reverse zones");
                None
            }
        }
    }
}

fn is_reverse_name(name: &str) -> bool {
    name.rsplit('.')
        .next()
        .is_some_and(|label| label.eq_ignore_ascii_case("arpa"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ZoneSettings;
    use crate::store::{MemoryStore, RecordStore};

    fn resolver(store: MemoryStore) -> ZoneResolver {
        let config = ServerConfig::new("ns.example.com", "hostmaster@example.com")
            .with_forward_zone("example.com", ZoneSettings::default())
            .with_forward_zone("sub.example.com", ZoneSettings::default())
            .with_forward_zone("example.org", ZoneSettings::default());
        let store: Arc<dyn RecordStore> = Arc::new(store);
        ZoneResolver::new(Arc::new(config), ZoneData::new(store))
    }

    async fn resolve(resolver: &ZoneResolver, name: &str) -> Option<String> {
        resolver.resolve(&QueryContext::default(), name).await
    }

    #[tokio::test]
    async fn test_forward_zones() {
        let resolver = resolver(MemoryStore::new());
        assert_eq!(resolve(&resolver, "example.com").await.as_deref(), Some("example.com"));
        assert_eq!(
            resolve(&resolver, "www.example.org").await.as_deref(),
            Some("example.org")
        );
        assert_eq!(resolve(&resolver, "example.net").await, None);
    }

    #[tokio::test]
    async fn test_first_configured_zone_wins() {
        let resolver = resolver(MemoryStore::new());
        assert_eq!(
            resolve(&resolver, "a.sub.example.com").await.as_deref(),
            Some("example.com")
        );
    }

    #[tokio::test]
    async fn test_match_ignores_label_boundaries() {
        let resolver = resolver(MemoryStore::new());
        assert_eq!(
            resolve(&resolver, "badexample.com").await.as_deref(),
            Some("example.com")
        );
    }

    #[tokio::test]
    async fn test_reverse_zone_discovery() {
        let store = MemoryStore::new();
        store.hset("zone:2.0.192.in-addr.arpa", "5", "[]");
        let resolver = resolver(store);

        assert_eq!(
            resolve(&resolver, "5.2.0.192.in-addr.arpa").await.as_deref(),
            Some("2.0.192.in-addr.arpa")
        );
        assert_eq!(resolve(&resolver, "5.3.0.192.in-addr.arpa").await, None);
    }

    #[tokio::test]
    async fn test_reverse_scan_failure_is_not_found() {
        let store = MemoryStore::new();
        store.hset("zone:2.0.192.in-addr.arpa", "5", "[]");
        store.set_unavailable(true);
        let resolver = resolver(store);

        assert_eq!(resolve(&resolver, "5.2.0.192.in-addr.arpa").await, None);
    }

    #[test]
    fn test_is_reverse_name() {
        assert!(is_reverse_name("1.2.in-addr.arpa"));
        assert!(is_reverse_name("1.2.IN-ADDR.ARPA"));
        assert!(!is_reverse_name("arpa.example.com"));
    }
}
