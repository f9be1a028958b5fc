use super::{RecordStore, StoreError, StoreResult};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::collections::HashSet;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, warn};

/// Number of keys requested per SCAN round trip
const SCAN_COUNT: usize = 1000;

/// Redis-backed record store
#[derive(Clone)]
pub struct RedisStore {
    client: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis, retrying with exponential backoff
    pub async fn connect(redis_url: &str, max_retries: usize) -> StoreResult<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| StoreError::Unavailable(format!("Invalid Redis URL: {}", e)))?;

        let strategy = ExponentialBackoff::from_millis(100)
            .max_delay(std::time::Duration::from_secs(5))
            .map(jitter)
            .take(max_retries);

        let mut attempt = 0;
        let connection_manager = Retry::spawn(strategy, || {
            attempt += 1;
            let client = client.clone();
            let current = attempt;
            async move {
                ConnectionManager::new(client).await.inspect_err(|e| {
                    warn!(
                        "Failed to connect to Redis (attempt {}/{}): {}",
                        current,
                        max_retries + 1,
                        e
                    );
                })
            }
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("Failed to connect to Redis: {}", e)))?;

        info!("Connected to Redis at {}", redis_url);

        Ok(Self {
            client: connection_manager,
        })
    }

    /// Ping Redis to check connectivity
    pub async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.client.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.client.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let mut conn = self.client.clone();
        let value: Option<String> = conn.hget(key, field).await?;
        Ok(value)
    }

    async fn hgetall(&self, key: &str) -> StoreResult<Vec<(String, String)>> {
        let mut conn = self.client.clone();
        let pairs: Vec<(String, String)> = conn.hgetall(key).await?;
        Ok(pairs)
    }

    async fn lrange_all(&self, key: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.client.clone();
        let values: Vec<String> = conn.lrange(key, 0, -1).await?;
        Ok(values)
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.client.clone();
        let mut found = ScanResults::default();
        let mut cursor: u64 = 0;

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;

            found.extend(keys);

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        debug!("SCAN {} matched {} keys", pattern, found.keys.len());
        Ok(found.keys)
    }
}

/// Keys gathered over SCAN rounds
///
/// SCAN may return a key more than once; the first occurrence wins.
#[derive(Default)]
struct ScanResults {
    keys: Vec<String>,
    seen: HashSet<String>,
}

impl ScanResults {
    fn extend(&mut self, batch: Vec<String>) {
        for key in batch {
            if self.seen.insert(key.clone()) {
                self.keys.push(key);
            }
        }
    }
}
