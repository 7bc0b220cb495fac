use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use sho_common::StorageError;
use sho_protocol::CreateRequest;

use crate::entry::unix_now;
use crate::generator::ShortKeyGenerator;
use crate::store::MappingStore;

/// Resultado de um pedido de criação.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Destino vazio.
    InvalidInput,
    /// A chave personalizada pedida já existe.
    NameCollision(String),
    Created { key: String, destination: String },
}

struct Inner<S> {
    store: S,
    generator: ShortKeyGenerator,
    // Única trava do sistema: cobre checagem de colisão + geração + insert.
    create_lock: Mutex<()>,
}

/// Serializa as criações de mapeamento. Consultas de redirecionamento não
/// passam pela trava.
pub struct MappingCoordinator<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for MappingCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: MappingStore> MappingCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self::with_generator(store, ShortKeyGenerator::default())
    }

    pub fn with_generator(store: S, generator: ShortKeyGenerator) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                generator,
                create_lock: Mutex::new(()),
            }),
        }
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Cria um mapeamento. Toda a sequência checa-e-grava roda sob a trava,
    /// então duas criações com a mesma chave nunca passam juntas pela checagem.
    pub async fn create_mapping(&self, request: CreateRequest) -> Result<Outcome, StorageError> {
        let destination = normalize_destination(&request.destination);

        let _guard = self.inner.create_lock.lock().await;

        if destination.is_empty() {
            return Ok(Outcome::InvalidInput);
        }

        let key = match request.custom_key {
            Some(key) => {
                if self.inner.store.contains(&key).await? {
                    debug!("colisão de nome: {key}");
                    return Ok(Outcome::NameCollision(key));
                }
                key
            }
            None => self.inner.generator.generate(&self.inner.store).await?,
        };

        self.inner
            .store
            .put(&key, &destination, request.ttl)
            .await?;
        info!(ttl = request.ttl, "mapeamento criado: {key} -> {destination}");

        Ok(Outcome::Created { key, destination })
    }

    /// Resolve uma chave para o destino. Linhas já vencidas que a varredura
    /// ainda não removeu contam como ausentes.
    pub async fn resolve(&self, key: &str) -> Result<Option<String>, StorageError> {
        let Some(entry) = self.inner.store.get(key).await? else {
            return Ok(None);
        };
        if entry.expiry.is_expired(unix_now()) {
            debug!("chave {key} vencida aguardando varredura");
            return Ok(None);
        }
        Ok(Some(entry.destination))
    }
}

/// Prefixa `http://` a menos que o destino já comece com `http://` ou
/// `https://`. Qualquer outro esquema também recebe o prefixo.
pub fn normalize_destination(url: &str) -> String {
    if url.is_empty() || url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    format!("http://{url}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Expiry, MappingEntry, MemoryStore, SqliteStore};
    use tempfile::tempdir;

    async fn coordinator() -> MappingCoordinator<MemoryStore> {
        let store = MemoryStore::new();
        store.initialize().await.unwrap();
        MappingCoordinator::new(store)
    }

    #[test]
    fn normalize_prepends_scheme() {
        assert_eq!(normalize_destination("example.org"), "http://example.org");
        assert_eq!(normalize_destination("http://a.b"), "http://a.b");
        assert_eq!(normalize_destination("https://a.b"), "https://a.b");
        assert_eq!(normalize_destination(""), "");
    }

    #[test]
    fn normalize_is_literal_about_other_schemes() {
        assert_eq!(normalize_destination("ftp://a.b"), "http://ftp://a.b");
        assert_eq!(normalize_destination("HTTP://a.b"), "http://HTTP://a.b");
    }

    #[tokio::test]
    async fn create_with_generated_key() {
        let coord = coordinator().await;
        let outcome = coord
            .create_mapping(CreateRequest::new("example.org", None, 0))
            .await
            .unwrap();

        let Outcome::Created { key, destination } = outcome else {
            panic!("expected Created, got {outcome:?}");
        };
        assert_eq!(key.len(), 7);
        assert!(key.starts_with('/'));
        assert_eq!(destination, "http://example.org");

        let entry = coord.store().get(&key).await.unwrap().unwrap();
        assert_eq!(entry, MappingEntry::new(key, "http://example.org", Expiry::Never));
    }

    #[tokio::test]
    async fn create_with_custom_key() {
        let coord = coordinator().await;
        let outcome = coord
            .create_mapping(CreateRequest::new("https://rust-lang.org", Some("rust"), 0))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Created {
                key: "/rust".into(),
                destination: "https://rust-lang.org".into(),
            }
        );
        assert_eq!(
            coord.resolve("/rust").await.unwrap().as_deref(),
            Some("https://rust-lang.org")
        );
    }

    #[tokio::test]
    async fn empty_destination_is_invalid() {
        let coord = coordinator().await;
        let outcome = coord
            .create_mapping(CreateRequest::new("", Some("x"), 0))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::InvalidInput);
        assert!(!coord.store().contains("/x").await.unwrap());
        assert_eq!(coord.store().len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn custom_key_collision() {
        let coord = coordinator().await;
        coord
            .store()
            .put("/bonjour", "http://hello", 0)
            .await
            .unwrap();

        let outcome = coord
            .create_mapping(CreateRequest::new("hello", Some("bonjour"), 4))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::NameCollision("/bonjour".into()));
        assert_eq!(
            coord.store().get("/bonjour").await.unwrap().unwrap().destination,
            "http://hello"
        );
    }

    #[tokio::test]
    async fn root_key_cannot_be_claimed() {
        let coord = coordinator().await;
        // SEO vazio vira chave gerada, nunca "/"
        let outcome = coord
            .create_mapping(CreateRequest::new("evil.example", Some(""), 0))
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Created { ref key, .. } if key != "/"));
        assert_eq!(coord.resolve("/").await.unwrap().as_deref(), Some("/index.html"));
    }

    #[tokio::test]
    async fn resolve_hides_expired_rows() {
        let coord = coordinator().await;
        coord
            .store()
            .insert(MappingEntry::new("/old", "http://old", Expiry::At(1)));
        assert_eq!(coord.resolve("/old").await.unwrap(), None);
        // Continua no store até a varredura passar
        assert!(coord.store().contains("/old").await.unwrap());
    }

    #[tokio::test]
    async fn expired_custom_key_is_swept() {
        let coord = coordinator().await;
        coord
            .create_mapping(CreateRequest::new("example.org", Some("promo"), 10))
            .await
            .unwrap();
        assert!(coord.resolve("/promo").await.unwrap().is_some());

        let removed = coord.store().delete_expired(unix_now() + 11).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(coord.store().get("/promo").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creations_same_key() {
        let coord = coordinator().await;

        let mut handles = Vec::new();
        for i in 0..32 {
            let coord = coord.clone();
            handles.push(tokio::spawn(async move {
                coord
                    .create_mapping(CreateRequest::new(format!("site{i}.org"), Some("hot"), 0))
                    .await
                    .unwrap()
            }));
        }

        let mut created = 0;
        let mut collisions = 0;
        for h in handles {
            match h.await.unwrap() {
                Outcome::Created { key, .. } => {
                    assert_eq!(key, "/hot");
                    created += 1;
                }
                Outcome::NameCollision(key) => {
                    assert_eq!(key, "/hot");
                    collisions += 1;
                }
                Outcome::InvalidInput => panic!("unexpected InvalidInput"),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(collisions, 31);
        assert_eq!(coord.store().len().await.unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creations_same_key_sqlite() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("race.db")).await.unwrap();
        store.initialize().await.unwrap();
        let coord = MappingCoordinator::new(store);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let coord = coord.clone();
            handles.push(tokio::spawn(async move {
                coord
                    .create_mapping(CreateRequest::new("example.org", Some("promo"), 0))
                    .await
                    .unwrap()
            }));
        }

        let mut created = 0;
        for h in handles {
            if matches!(h.await.unwrap(), Outcome::Created { .. }) {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(coord.store().len().await.unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_generated_keys_are_distinct() {
        let store = MemoryStore::new();
        let coord = MappingCoordinator::with_generator(store, ShortKeyGenerator::new(2));

        let mut handles = Vec::new();
        for i in 0..200 {
            let coord = coord.clone();
            handles.push(tokio::spawn(async move {
                coord
                    .create_mapping(CreateRequest::new(format!("n{i}.org"), None, 0))
                    .await
                    .unwrap()
            }));
        }

        let mut keys = std::collections::HashSet::new();
        for h in handles {
            let Outcome::Created { key, .. } = h.await.unwrap() else {
                panic!("expected Created");
            };
            assert!(keys.insert(key));
        }
        assert_eq!(coord.store().len().await.unwrap(), 200);
    }
}
