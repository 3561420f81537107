//! In-memory target registry and result writer for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::registry::{RegistryError, Target, TargetRegistry, TargetSet};
use crate::writer::{FollowerCount, ResultWriter, WriteError, DEFAULT_COUNT_FIELD};

/// A recorded write for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub target: Target,
    pub count: FollowerCount,
}

/// Stand-in for the key-value store, implementing both store traits.
///
/// Targets live in an ordered list, counts in per-target hashes, mirroring
/// the Redis layout. Registry and writer availability toggle independently.
#[derive(Debug)]
pub struct MemoryStore {
    targets: Arc<RwLock<TargetSet>>,
    hashes: Arc<RwLock<HashMap<String, HashMap<String, String>>>>,
    writes: Arc<RwLock<Vec<RecordedWrite>>>,
    registry_available: Arc<RwLock<bool>>,
    writer_available: Arc<RwLock<bool>>,
    loads: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            targets: Arc::new(RwLock::new(Vec::new())),
            hashes: Arc::new(RwLock::new(HashMap::new())),
            writes: Arc::new(RwLock::new(Vec::new())),
            registry_available: Arc::new(RwLock::new(true)),
            writer_available: Arc::new(RwLock::new(true)),
            loads: AtomicUsize::new(0),
        }
    }

    /// Replace the target list.
    pub async fn set_targets<I, S>(&self, targets: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.targets.write().await = targets.into_iter().map(Target::new).collect();
    }

    pub async fn set_registry_available(&self, available: bool) {
        *self.registry_available.write().await = available;
    }

    pub async fn set_writer_available(&self, available: bool) {
        *self.writer_available.write().await = available;
    }

    /// Toggle both registry reads and writes.
    pub async fn set_available(&self, available: bool) {
        self.set_registry_available(available).await;
        self.set_writer_available(available).await;
    }

    /// Read a hash field directly.
    pub async fn get_field(&self, key: &str, field: &str) -> Option<String> {
        self.hashes
            .read()
            .await
            .get(key)
            .and_then(|hash| hash.get(field))
            .cloned()
    }

    /// The stored count for `target`, if any.
    pub async fn count_for(&self, target: &str) -> Option<String> {
        self.get_field(target, DEFAULT_COUNT_FIELD).await
    }

    pub async fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.read().await.clone()
    }

    pub async fn writes_for(&self, target: &str) -> Vec<RecordedWrite> {
        self.writes
            .read()
            .await
            .iter()
            .filter(|w| w.target.as_str() == target)
            .cloned()
            .collect()
    }

    /// Number of successful writes.
    pub async fn total_writes(&self) -> usize {
        self.writes.read().await.len()
    }

    /// Number of `load_targets` calls, failed ones included.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TargetRegistry for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load_targets(&self) -> Result<TargetSet, RegistryError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !*self.registry_available.read().await {
            return Err(RegistryError::Unavailable(
                "connection refused".to_string(),
            ));
        }
        Ok(self.targets.read().await.clone())
    }
}

#[async_trait]
impl ResultWriter for MemoryStore {
    async fn write_count(&self, target: &Target, count: &FollowerCount) -> Result<(), WriteError> {
        if !*self.writer_available.read().await {
            return Err(WriteError::StoreUnavailable(
                "connection refused".to_string(),
            ));
        }

        self.hashes
            .write()
            .await
            .entry(target.as_str().to_string())
            .or_default()
            .insert(DEFAULT_COUNT_FIELD.to_string(), count.as_str().to_string());
        self.writes.write().await.push(RecordedWrite {
            target: target.clone(),
            count: count.clone(),
        });
        Ok(())
    }
}
