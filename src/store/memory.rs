use super::{RecordStore, StoreError, StoreResult};
use async_trait::async_trait;
use glob::Pattern;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// In-process record store
///
/// Hash fields and list entries keep insertion order. Individual keys, or the
/// whole store, can be marked unreachable to exercise failure handling.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<MemoryData>,
}

#[derive(Default)]
struct MemoryData {
    strings: HashMap<String, String>,
    hashes: HashMap<String, Vec<(String, String)>>,
    lists: HashMap<String, Vec<String>>,
    failing_keys: HashSet<String>,
    unavailable: bool,
}

impl MemoryData {
    fn check(&self, key: &str) -> StoreResult<()> {
        if self.unavailable || self.failing_keys.contains(key) {
            return Err(StoreError::Unavailable(format!(
                "simulated failure reading {}",
                key
            )));
        }
        Ok(())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.data.write().strings.insert(key.into(), value.into());
    }

    /// Set a hash field, replacing an existing value in place
    pub fn hset(&self, key: impl Into<String>, field: impl Into<String>, value: impl Into<String>) {
        let field = field.into();
        let value = value.into();
        let mut data = self.data.write();
        let hash = data.hashes.entry(key.into()).or_default();
        match hash.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = value,
            None => hash.push((field, value)),
        }
    }

    pub fn rpush(&self, key: impl Into<String>, value: impl Into<String>) {
        self.data
            .write()
            .lists
            .entry(key.into())
            .or_default()
            .push(value.into());
    }

    pub fn delete(&self, key: &str) {
        let mut data = self.data.write();
        data.strings.remove(key);
        data.hashes.remove(key);
        data.lists.remove(key);
    }

    /// Make every read of `key` fail as if the store were unreachable
    pub fn fail_key(&self, key: impl Into<String>) {
        self.data.write().failing_keys.insert(key.into());
    }

    /// Make every read fail
    pub fn set_unavailable(&self, unavailable: bool) {
        self.data.write().unavailable = unavailable;
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let data = self.data.read();
        data.check(key)?;
        Ok(data.strings.get(key).cloned())
    }

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let data = self.data.read();
        data.check(key)?;
        Ok(data
            .hashes
            .get(key)
            .and_then(|hash| hash.iter().find(|(f, _)| f == field))
            .map(|(_, v)| v.clone()))
    }

    async fn hgetall(&self, key: &str) -> StoreResult<Vec<(String, String)>> {
        let data = self.data.read();
        data.check(key)?;
        Ok(data.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn lrange_all(&self, key: &str) -> StoreResult<Vec<String>> {
        let data = self.data.read();
        data.check(key)?;
        Ok(data.lists.get(key).cloned().unwrap_or_default())
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let pattern = Pattern::new(pattern)
            .map_err(|e| StoreError::InvalidPattern(format!("{}: {}", pattern, e)))?;
        let data = self.data.read();
        if data.unavailable {
            return Err(StoreError::Unavailable("simulated failure scanning keys".to_string()));
        }
        let mut keys: Vec<String> = data
            .strings
            .keys()
            .chain(data.hashes.keys())
            .chain(data.lists.keys())
            .filter(|key| pattern.matches(key))
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}
