use super::keys::{self, DiffSide, REVERSE_ZONE_PATTERN};
use super::{RecordStore, StoreError, StoreResult};
use std::sync::Arc;

/// Typed access to the zone keys of a [`RecordStore`]
///
/// Values are returned as stored; decoding record JSON is left to the zone
/// layer so a malformed entry only affects the record it belongs to.
#[derive(Clone)]
pub struct ZoneData {
    store: Arc<dyn RecordStore>,
}

impl ZoneData {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Current serial of a zone, `None` when the key is absent
    pub async fn latest_serial(&self, zone: &str) -> StoreResult<Option<u32>> {
        let key = keys::latest_key(zone);
        match self.store.get(&key).await? {
            Some(value) => parse_serial(&key, &value).map(Some),
            None => Ok(None),
        }
    }

    /// Serials retained for diffing, in stored (ascending) order
    pub async fn serial_history(&self, zone: &str) -> StoreResult<Vec<u32>> {
        let key = keys::history_key(zone);
        self.store
            .lrange_all(&key)
            .await?
            .iter()
            .map(|value| parse_serial(&key, value))
            .collect()
    }

    /// Raw record list JSON stored for one owner label
    pub async fn owner_records(&self, zone: &str, owner: &str) -> StoreResult<Option<String>> {
        self.store.hget(&keys::zone_key(zone), owner).await
    }

    /// Every owner label of a zone with its raw record list JSON
    pub async fn all_owners(&self, zone: &str) -> StoreResult<Vec<(String, String)>> {
        self.store.hgetall(&keys::zone_key(zone)).await
    }

    /// Raw `{name, record}` entries of one half of a diff step
    pub async fn diff_entries(
        &self,
        zone: &str,
        from: u32,
        to: u32,
        side: DiffSide,
    ) -> StoreResult<Vec<String>> {
        self.store
            .lrange_all(&keys::diff_key(zone, from, to, side))
            .await
    }

    /// Names of every reverse zone present in the store
    pub async fn reverse_zones(&self) -> StoreResult<Vec<String>> {
        Ok(self
            .store
            .keys(REVERSE_ZONE_PATTERN)
            .await?
            .iter()
            .filter_map(|key| keys::zone_from_key(key))
            .map(str::to_string)
            .collect())
    }
}

fn parse_serial(key: &str, value: &str) -> StoreResult<u32> {
    value.trim().parse::<u32>().map_err(|_| StoreError::Corrupt {
        key: key.to_string(),
        reason: format!("serial {:?} is not a decimal u32", value),
    })
}
