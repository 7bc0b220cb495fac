use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use sho_common::{LANDING_PATH, ROOT_KEY, StorageError};

use crate::entry::{Expiry, MappingEntry, unix_now};
use crate::store::MappingStore;

const CREATE_TABLE: &str =
    "CREATE TABLE IF NOT EXISTS mappings (short_url TEXT, long_url TEXT, end_time INTEGER)";

// Um único statement: atômico mesmo com dois processos inicializando juntos.
const INSERT_ROOT: &str = "INSERT INTO mappings (short_url, long_url, end_time) \
     SELECT ?1, ?2, ?3 WHERE NOT EXISTS (SELECT 1 FROM mappings WHERE short_url = ?1)";

const SELECT_ONE: &str =
    "SELECT short_url, long_url, end_time FROM mappings WHERE short_url = ? LIMIT 1";

const INSERT_ONE: &str = "INSERT INTO mappings (short_url, long_url, end_time) VALUES (?, ?, ?)";

const DELETE_EXPIRED: &str = "DELETE FROM mappings WHERE end_time > 0 AND end_time <= ?";

const MAX_POOL_CONNECTIONS: u32 = 8;

/// Store durável sobre SQLite. Não há cache: toda chamada vai ao banco.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Abre (criando se preciso) o arquivo do banco.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_POOL_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        info!("banco de mapeamentos aberto: {:?}", path);
        Ok(Self { pool })
    }

    /// Fecha o pool esperando as conexões em uso.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn db_err(e: sqlx::Error) -> StorageError {
    StorageError::Database(e.to_string())
}

impl MappingStore for SqliteStore {
    async fn initialize(&self) -> Result<(), StorageError> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        let inserted = sqlx::query(INSERT_ROOT)
            .bind(ROOT_KEY)
            .bind(LANDING_PATH)
            .bind(Expiry::Never.to_column())
            .execute(&self.pool)
            .await
            .map_err(db_err)?
            .rows_affected();

        if inserted > 0 {
            info!("entrada raiz criada: {ROOT_KEY} -> {LANDING_PATH}");
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<MappingEntry>, StorageError> {
        let row: Option<(String, String, i64)> = sqlx::query_as(SELECT_ONE)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(row.map(|(key, destination, end_time)| {
            MappingEntry::new(key, destination, Expiry::from_column(end_time))
        }))
    }

    async fn put(&self, key: &str, destination: &str, ttl: u64) -> Result<(), StorageError> {
        let expiry = Expiry::from_ttl(ttl, unix_now());
        sqlx::query(INSERT_ONE)
            .bind(key)
            .bind(destination)
            .bind(expiry.to_column())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete_expired(&self, now: i64) -> Result<usize, StorageError> {
        let removed = sqlx::query(DELETE_EXPIRED)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(db_err)?
            .rows_affected();

        if removed > 0 {
            debug!("{removed} mapeamentos expirados removidos");
        }
        Ok(removed as usize)
    }

    async fn len(&self) -> Result<usize, StorageError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM mappings")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(count as usize)
    }
}
