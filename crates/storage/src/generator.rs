use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::debug;

use sho_common::{ROOT_KEY, SHORT_KEY_LEN, StorageError};

use crate::store::MappingStore;

/// Gera chaves curtas aleatórias (`/` + N símbolos de [A-Za-z0-9]).
#[derive(Debug, Clone)]
pub struct ShortKeyGenerator {
    len: usize,
}

impl Default for ShortKeyGenerator {
    fn default() -> Self {
        Self::new(SHORT_KEY_LEN)
    }
}

impl ShortKeyGenerator {
    pub fn new(len: usize) -> Self {
        Self { len }
    }

    /// Uma chave candidata, sem consultar o store.
    pub fn candidate(&self) -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.len)
            .map(char::from)
            .collect();
        format!("{ROOT_KEY}{suffix}")
    }

    /// Sorteia até achar uma chave livre. Uma consulta ao store por tentativa,
    /// sem limite de tentativas; não insere nada.
    pub async fn generate<S: MappingStore>(&self, store: &S) -> Result<String, StorageError> {
        let mut attempts = 1u64;
        loop {
            let key = self.candidate();
            if !store.contains(&key).await? {
                if attempts > 1 {
                    debug!("chave {key} gerada após {attempts} tentativas");
                }
                return Ok(key);
            }
            attempts += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Expiry, MappingEntry, MemoryStore};

    const ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

    #[test]
    fn candidate_shape() {
        let generator = ShortKeyGenerator::default();
        for _ in 0..100 {
            let key = generator.candidate();
            assert_eq!(key.len(), 7);
            assert!(key.starts_with('/'));
            assert!(key[1..].chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[tokio::test]
    async fn generate_on_empty_store() {
        let store = MemoryStore::new();
        let key = ShortKeyGenerator::default().generate(&store).await.unwrap();
        assert_eq!(key.len(), 7);
        // Gerar não insere
        assert!(!store.contains(&key).await.unwrap());
    }

    #[tokio::test]
    async fn generate_skips_taken_keys() {
        // Com chaves de 1 símbolo, ocupa 61 das 62 possíveis: só resta "/9".
        let store = MemoryStore::new();
        for c in ALPHABET.chars().filter(|&c| c != '9') {
            store.insert(MappingEntry::new(format!("/{c}"), "http://x", Expiry::Never));
        }

        let generator = ShortKeyGenerator::new(1);
        for _ in 0..20 {
            assert_eq!(generator.generate(&store).await.unwrap(), "/9");
        }
    }

    #[tokio::test]
    async fn generated_keys_never_collide_with_store() {
        let store = MemoryStore::new();
        let generator = ShortKeyGenerator::new(2);
        for _ in 0..500 {
            let key = generator.generate(&store).await.unwrap();
            assert!(!store.contains(&key).await.unwrap());
            store.put(&key, "http://x", 0).await.unwrap();
        }
        assert_eq!(store.len().await.unwrap(), 500);
    }
}
