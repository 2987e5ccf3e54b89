//! `Dragonfly` (Redis-compatible) hot balance cache.
//!
//! `Dragonfly` holds a small projection of each player's balance so read
//! paths (league boards, balance polls) never touch `PostgreSQL`. The
//! projection is refreshed at the end of every reconciliation and evicted
//! when a session ends.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `player:{id}:hot` | JSON | Balance projection (stones, idle rate, league) |

use fred::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use stonetap_types::{PlayerId, PlayerProjection};

use crate::error::DbError;

/// How long a cached projection lives without being refreshed.
///
/// Reconciliations rewrite the key on every player action, so the TTL
/// only has to outlast one idle day. It keeps players who stopped
/// playing from pinning cache memory forever.
pub const PROJECTION_TTL_SECS: i64 = 86_400;

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
///
/// Wraps a [`fred::prelude::Client`] and provides typed operations for
/// the hot balance key pattern above.
#[derive(Clone)]
pub struct DragonflyPool {
    client: Client,
}

impl DragonflyPool {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let config = Config::from_url(url)
            .map_err(|e| DbError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Dragonfly");
        Ok(Self { client })
    }

    // =========================================================================
    // Generic JSON get/set/delete
    // =========================================================================

    /// Serialize `value` as JSON and store it at `key`.
    ///
    /// A key written with `ttl_secs: Some(n)` expires after `n` seconds;
    /// `None` keeps it until deleted.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if serialization fails.
    /// Returns [`DbError::Dragonfly`] if the write fails.
    pub async fn set_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: Option<i64>,
    ) -> Result<(), DbError> {
        let json = serde_json::to_string(value)?;
        let expiration = ttl_secs.map(Expiration::EX);
        let _: () = self
            .client
            .set(key, json.as_str(), expiration, None, false)
            .await?;
        Ok(())
    }

    /// Read and deserialize the JSON value at `key`.
    ///
    /// Returns `None` if the key does not exist. A cache miss is a normal
    /// outcome here, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if deserialization fails.
    /// Returns [`DbError::Dragonfly`] if the read fails.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DbError> {
        let value: Option<String> = self.client.get(key).await?;
        value
            .map(|json| serde_json::from_str(&json).map_err(DbError::from))
            .transpose()
    }

    /// Delete the value at `key`. Deleting a missing key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the delete fails.
    pub async fn delete(&self, key: &str) -> Result<(), DbError> {
        let _: u64 = self.client.del(key).await?;
        Ok(())
    }

    // =========================================================================
    // Balance Projection -- player:{id}:hot
    // =========================================================================

    /// Store the balance projection at `player:{id}:hot`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if serialization or write fails.
    pub async fn set_player_projection(
        &self,
        player_id: &PlayerId,
        projection: &PlayerProjection,
    ) -> Result<(), DbError> {
        let key = Self::projection_key(player_id);
        self.set_json(&key, projection, Some(PROJECTION_TTL_SECS))
            .await
    }

    /// Read the balance projection from `player:{id}:hot`.
    ///
    /// Returns `None` if the projection is not cached.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if deserialization or read fails.
    pub async fn get_player_projection(
        &self,
        player_id: &PlayerId,
    ) -> Result<Option<PlayerProjection>, DbError> {
        let key = Self::projection_key(player_id);
        self.get_json(&key).await
    }

    /// Evict the balance projection for a player.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the delete fails.
    pub async fn delete_player_projection(&self, player_id: &PlayerId) -> Result<(), DbError> {
        let key = Self::projection_key(player_id);
        self.delete(&key).await
    }

    fn projection_key(player_id: &PlayerId) -> String {
        format!("player:{player_id}:hot")
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Flush all keys from the `Dragonfly` instance.
    ///
    /// **WARNING:** This deletes all data. Only use for testing.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the flush fails.
    pub async fn flush_all(&self) -> Result<(), DbError> {
        let _: () = self.client.flushall(false).await?;
        Ok(())
    }

    /// Return a reference to the underlying [`Client`].
    pub const fn client(&self) -> &Client {
        &self.client
    }
}
