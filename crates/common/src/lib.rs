#![forbid(unsafe_code)]

mod error;

pub use error::*;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_DB_PATH: &str = "mappings.db";
pub const MAX_CONNECTIONS: usize = 1024;
pub const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024; // 4 KB
pub const MAX_REQUEST_SIZE: usize = 1024 * 1024; // 1 MB

/// Intervalo padrão entre varreduras de expiração, em segundos.
pub const SWEEP_INTERVAL_SECS: u64 = 10;

/// Chave reservada da raiz e o recurso de entrada para onde ela aponta.
pub const ROOT_KEY: &str = "/";
pub const LANDING_PATH: &str = "/index.html";

pub const SHORT_KEY_LEN: usize = 6;
