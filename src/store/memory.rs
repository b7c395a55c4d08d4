use std::collections::HashMap as StdHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::store::KvStore;

/// Value variants supported by the in-memory KV store.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum KvValue {
    Str(String),
    /// Ordered list; index 0 is the head (newest entry).
    List(Vec<String>),
}

/// Embedded, thread-safe KV engine. All state lives in one map behind a
/// `parking_lot::RwLock`, so every trait operation is naturally atomic.
/// Optionally snapshots to a JSON file so credentials survive restarts.
#[derive(Clone)]
pub struct MemoryStore {
    map: Arc<parking_lot::RwLock<StdHashMap<String, KvValue>>>,
    snapshot_path: Option<PathBuf>,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    entries: Vec<(String, KvValue)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { map: Arc::new(parking_lot::RwLock::new(StdHashMap::new())), snapshot_path: None }
    }

    /// Create a store that snapshots to `path`. Loads an existing snapshot if
    /// one is present; a missing or unreadable snapshot is logged, not fatal.
    pub fn with_snapshot(path: impl AsRef<Path>) -> Self {
        let s = Self {
            map: Arc::new(parking_lot::RwLock::new(StdHashMap::new())),
            snapshot_path: Some(path.as_ref().to_path_buf()),
        };
        if let Err(e) = s.load_snapshot() {
            tracing::warn!("snapshot load skipped: {}", e);
        }
        s
    }

    pub fn save_snapshot(&self) -> anyhow::Result<()> {
        let Some(path) = &self.snapshot_path else { return Ok(()) };
        let entries: Vec<(String, KvValue)> = {
            let r = self.map.read();
            r.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };
        let snap = Snapshot { version: 1, entries };
        let bytes = serde_json::to_vec(&snap)?;
        // Write-then-rename keeps a crash from truncating the previous snapshot.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(tmp, path)?;
        Ok(())
    }

    fn load_snapshot(&self) -> anyhow::Result<()> {
        let Some(path) = &self.snapshot_path else { return Ok(()) };
        if !path.exists() {
            return Ok(());
        }
        let bytes = std::fs::read(path)?;
        let snap: Snapshot = serde_json::from_slice(&bytes)?;
        let mut w = self.map.write();
        w.clear();
        for (k, v) in snap.entries {
            w.insert(k, v);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.map.read().contains_key(key))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.map.read().get(key) {
            None => Ok(None),
            Some(KvValue::Str(s)) => Ok(Some(s.clone())),
            Some(KvValue::List(_)) => Err(StoreError::WrongKind(key.to_string())),
        }
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let mut w = self.map.write();
        if w.contains_key(key) {
            return Ok(false);
        }
        w.insert(key.to_string(), KvValue::Str(value.to_string()));
        Ok(true)
    }

    async fn list_push_front(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut w = self.map.write();
        match w.get_mut(key) {
            None => {
                w.insert(key.to_string(), KvValue::List(vec![value.to_string()]));
                Ok(())
            }
            Some(KvValue::List(items)) => {
                items.insert(0, value.to_string());
                Ok(())
            }
            Some(KvValue::Str(_)) => Err(StoreError::WrongKind(key.to_string())),
        }
    }

    async fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError> {
        match self.map.read().get(key) {
            None => Ok(Vec::new()),
            Some(KvValue::List(items)) => Ok(items.clone()),
            Some(KvValue::Str(_)) => Err(StoreError::WrongKind(key.to_string())),
        }
    }
}
