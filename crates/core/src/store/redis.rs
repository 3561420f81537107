//! Redis store backend.
//!
//! Targets are read with `LRANGE <targets_key> 0 -1`; counts are written with
//! `HSET <target> <count_field> <count>`.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError};
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::registry::{RegistryError, Target, TargetRegistry, TargetSet};
use crate::writer::{FollowerCount, ResultWriter, WriteError};

/// Redis-backed registry and writer.
///
/// Cloning is cheap; clones share the underlying multiplexed connection,
/// which reconnects on its own after a dropped link.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    targets_key: String,
    count_field: String,
}

impl RedisStore {
    /// Connect to the store described by `config`.
    ///
    /// Fails if the server cannot be reached right now.
    pub async fn connect(config: &StoreConfig) -> Result<Self, RegistryError> {
        let client = redis::Client::open(config.url.as_str()).map_err(describe)?;
        let conn = ConnectionManager::new(client).await.map_err(describe)?;

        Ok(Self {
            conn,
            targets_key: config.targets_key.clone(),
            count_field: config.count_field.clone(),
        })
    }

    /// Key of the list holding the target set.
    pub fn targets_key(&self) -> &str {
        &self.targets_key
    }
}

fn describe(e: RedisError) -> RegistryError {
    RegistryError::Unavailable(error_detail(&e))
}

fn error_detail(e: &RedisError) -> String {
    if e.is_timeout() {
        format!("timeout: {}", e)
    } else if e.is_connection_refusal() || e.is_connection_dropped() || e.is_io_error() {
        format!("connection: {}", e)
    } else {
        e.to_string()
    }
}

/// Decode raw list entries into targets.
///
/// Entries that are not valid UTF-8 are skipped with a warning rather than
/// failing the whole load.
pub fn decode_entries(raw: Vec<Vec<u8>>) -> TargetSet {
    raw.into_iter()
        .enumerate()
        .filter_map(|(idx, bytes)| match String::from_utf8(bytes) {
            Ok(s) => Some(Target::new(s)),
            Err(e) => {
                warn!(index = idx, error = %e, "Skipping non UTF-8 registry entry");
                None
            }
        })
        .collect()
}

#[async_trait]
impl TargetRegistry for RedisStore {
    fn name(&self) -> &str {
        "redis"
    }

    async fn load_targets(&self) -> Result<TargetSet, RegistryError> {
        let mut conn = self.conn.clone();
        let raw: Vec<Vec<u8>> = conn
            .lrange(&self.targets_key, 0, -1)
            .await
            .map_err(describe)?;

        let targets = decode_entries(raw);
        debug!(key = %self.targets_key, count = targets.len(), "Loaded targets");
        Ok(targets)
    }
}

#[async_trait]
impl ResultWriter for RedisStore {
    async fn write_count(
        &self,
        target: &Target,
        count: &FollowerCount,
    ) -> Result<(), WriteError> {
        let mut conn = self.conn.clone();
        conn.hset::<_, _, _, ()>(target.as_str(), &self.count_field, count.as_str())
            .await
            .map_err(|e| WriteError::StoreUnavailable(error_detail(&e)))
    }
}
