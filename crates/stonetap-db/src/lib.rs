//! Data layer for the Stonetap economy (`Dragonfly` + `PostgreSQL`).
//!
//! `PostgreSQL` is the system of record: one row per player, updated at
//! the end of every reconciliation with only the fields that changed.
//! `Dragonfly` carries a small per-player balance projection so hot read
//! paths never hit the relational store.
//!
//! # Architecture
//!
//! ```text
//! Reconciliation
//!     |
//!     +-- Load record ---------> PostgreSQL (PlayerStore)
//!     |
//!     +-- Persist changed fields --> PostgreSQL (PlayerStore::update_player)
//!     |
//!     +-- Refresh projection ----> Dragonfly  (player:{id}:hot)
//! ```
//!
//! # Modules
//!
//! - [`dragonfly`] -- `Dragonfly` (Redis-compatible) balance projection cache
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`player_store`] -- Player row persistence and partial updates
//! - [`error`] -- Shared error types

pub mod dragonfly;
pub mod error;
pub mod player_store;
pub mod postgres;

// Re-export primary types for convenience.
pub use dragonfly::DragonflyPool;
pub use error::DbError;
pub use player_store::{PlayerRow, PlayerStore};
pub use postgres::{PostgresConfig, PostgresPool};
