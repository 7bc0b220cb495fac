use std::future::Future;

use sho_common::StorageError;

use crate::MappingEntry;

/// Tabela durável chave → (destino, expiração).
///
/// O store não garante unicidade de chave: quem chama `put` garante que a
/// chave ainda não existe (ver `MappingCoordinator`).
pub trait MappingStore: Clone + Send + Sync + 'static {
    /// Cria a tabela se preciso e garante a entrada raiz `/`. Idempotente.
    fn initialize(&self) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Busca sem filtrar por expiração.
    fn get(&self, key: &str)
    -> impl Future<Output = Result<Option<MappingEntry>, StorageError>> + Send;

    /// Insere uma linha nova. `ttl == 0` grava expiração `Never`.
    fn put(
        &self,
        key: &str,
        destination: &str,
        ttl: u64,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Remove toda linha com expiração em (0, now]. Retorna quantas saíram.
    fn delete_expired(&self, now: i64) -> impl Future<Output = Result<usize, StorageError>> + Send;

    /// Número de linhas, expiradas ou não.
    fn len(&self) -> impl Future<Output = Result<usize, StorageError>> + Send;

    fn contains(&self, key: &str) -> impl Future<Output = Result<bool, StorageError>> + Send {
        async move { Ok(self.get(key).await?.is_some()) }
    }
}
