//! Balance projection cache seam.
//!
//! The cache is advisory: it is rewritten only after a successful durable
//! write and served on the hot read path. A miss or a cache outage never
//! fails an operation; the reconciler falls back to the store and logs.
//!
//! [`DragonflyPool`] is the production cache; [`MemoryProjections`] backs
//! tests, with failure injection to prove outages stay non-fatal.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use stonetap_db::{DbError, DragonflyPool};
use stonetap_types::{PlayerId, PlayerProjection};
use tokio::sync::RwLock;

/// Keyed storage for per-player balance projections.
pub trait ProjectionCache {
    /// Write (or overwrite) the projection for a player.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the cache write fails.
    fn put(
        &self,
        id: &PlayerId,
        projection: &PlayerProjection,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Read the projection for a player. `None` is a normal miss.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the cache read fails.
    fn get(
        &self,
        id: &PlayerId,
    ) -> impl Future<Output = Result<Option<PlayerProjection>, DbError>> + Send;

    /// Drop the projection for a player. Evicting a miss is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the cache delete fails.
    fn evict(&self, id: &PlayerId) -> impl Future<Output = Result<(), DbError>> + Send;
}

impl ProjectionCache for DragonflyPool {
    async fn put(&self, id: &PlayerId, projection: &PlayerProjection) -> Result<(), DbError> {
        self.set_player_projection(id, projection).await
    }

    async fn get(&self, id: &PlayerId) -> Result<Option<PlayerProjection>, DbError> {
        self.get_player_projection(id).await
    }

    async fn evict(&self, id: &PlayerId) -> Result<(), DbError> {
        self.delete_player_projection(id).await
    }
}

/// In-memory [`ProjectionCache`] for tests and local runs.
///
/// Clones share the same map. [`fail_ops`] turns every cache call into an
/// error so tests can prove cache outages never fail a reconciliation.
///
/// [`fail_ops`]: MemoryProjections::fail_ops
#[derive(Clone, Default)]
pub struct MemoryProjections {
    entries: Arc<RwLock<HashMap<PlayerId, PlayerProjection>>>,
    fail_ops: Arc<AtomicBool>,
}

impl MemoryProjections {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent cache call fail.
    pub fn fail_ops(&self, fail: bool) {
        self.fail_ops.store(fail, Ordering::SeqCst);
    }

    /// Read an entry directly, bypassing failure injection.
    pub async fn snapshot(&self, id: &PlayerId) -> Option<PlayerProjection> {
        self.entries.read().await.get(id).cloned()
    }

    fn cache_error() -> DbError {
        DbError::Config("simulated cache outage".to_owned())
    }
}

impl ProjectionCache for MemoryProjections {
    async fn put(&self, id: &PlayerId, projection: &PlayerProjection) -> Result<(), DbError> {
        if self.fail_ops.load(Ordering::SeqCst) {
            return Err(Self::cache_error());
        }
        self.entries
            .write()
            .await
            .insert(id.clone(), projection.clone());
        Ok(())
    }

    async fn get(&self, id: &PlayerId) -> Result<Option<PlayerProjection>, DbError> {
        if self.fail_ops.load(Ordering::SeqCst) {
            return Err(Self::cache_error());
        }
        Ok(self.entries.read().await.get(id).cloned())
    }

    async fn evict(&self, id: &PlayerId) -> Result<(), DbError> {
        if self.fail_ops.load(Ordering::SeqCst) {
            return Err(Self::cache_error());
        }
        self.entries.write().await.remove(id);
        Ok(())
    }
}
