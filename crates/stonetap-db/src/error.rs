//! Shared error types for the data layer.

use thiserror::Error;

/// Errors produced by the `PostgreSQL` and `Dragonfly` stores.
#[derive(Debug, Error)]
pub enum DbError {
    /// `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Database migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// `Dragonfly` operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row holds a value the domain types cannot represent.
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    /// Configuration error (bad URL, missing credentials).
    #[error("Configuration error: {0}")]
    Config(String),
}
