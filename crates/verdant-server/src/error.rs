//! Startup errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("failed to read .env: {0}")]
    EnvFile(#[from] dotenvy::Error),

    #[error("database error: {0}")]
    Database(#[from] verdant_db::DbError),

    #[error("failed to connect to SurrealDB: {0}")]
    Connect(#[from] surrealdb::Error),

    #[error("failed to initialise logging: {0}")]
    Logging(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
