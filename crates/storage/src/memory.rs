use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use sho_common::{LANDING_PATH, ROOT_KEY, StorageError};

use crate::entry::{Expiry, MappingEntry, unix_now};
use crate::store::MappingStore;

/// Store in-memory sobre DashMap, com a mesma semântica do SQLite.
/// Nada sobrevive ao processo: serve para execuções efêmeras e testes.
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<DashMap<String, MappingEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grava uma entrada pronta, com expiração absoluta.
    pub fn insert(&self, entry: MappingEntry) {
        self.data.insert(entry.key.clone(), entry);
    }
}

impl MappingStore for MemoryStore {
    async fn initialize(&self) -> Result<(), StorageError> {
        self.data
            .entry(ROOT_KEY.to_string())
            .or_insert_with(|| MappingEntry::new(ROOT_KEY, LANDING_PATH, Expiry::Never));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<MappingEntry>, StorageError> {
        Ok(self.data.get(key).map(|e| e.value().clone()))
    }

    async fn put(&self, key: &str, destination: &str, ttl: u64) -> Result<(), StorageError> {
        let entry = MappingEntry::new(key, destination, Expiry::from_ttl(ttl, unix_now()));
        self.data.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete_expired(&self, now: i64) -> Result<usize, StorageError> {
        let before = self.data.len();
        self.data.retain(|key, entry| {
            let expired = entry.expiry.is_sweepable(now);
            if expired {
                debug!("mapeamento expirado removido: {key}");
            }
            !expired
        });
        Ok(before.saturating_sub(self.data.len()))
    }

    async fn len(&self) -> Result<usize, StorageError> {
        Ok(self.data.len())
    }
}
