//! Durable record storage seam.
//!
//! The reconciler reads and writes player records through [`RecordStore`]
//! so the pipeline can run against `PostgreSQL` in production and an
//! in-memory map in tests. [`PgRecords`] adapts the pooled store handles
//! from `stonetap-db`; [`MemoryRecords`] is the test double, with write
//! failure injection for exercising outage paths.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use stonetap_db::{DbError, PlayerStore, PostgresPool};
use stonetap_types::{PlayerId, PlayerPatch, PlayerRecord, ReferralCode};
use tokio::sync::RwLock;

/// Durable player record storage.
///
/// `load`/`create`/`persist` are the reconciliation pipeline's contact
/// points with the system of record; the referral lookups serve the
/// cascade and registration; `page_ids` drives full-table sweeps.
pub trait RecordStore {
    /// Load a record by id. `None` means the player is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot be read.
    fn load(
        &self,
        id: &PlayerId,
    ) -> impl Future<Output = Result<Option<PlayerRecord>, DbError>> + Send;

    /// Insert a brand-new record. Returns `false` when the id is already
    /// taken (the existing row is left untouched).
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the write fails.
    fn create(&self, record: &PlayerRecord)
    -> impl Future<Output = Result<bool, DbError>> + Send;

    /// Apply a field-level partial update. Returns `false` when no row
    /// matched the id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the write fails.
    fn persist(
        &self,
        id: &PlayerId,
        patch: &PlayerPatch,
    ) -> impl Future<Output = Result<bool, DbError>> + Send;

    /// Resolve a referral code to its owner.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot be read.
    fn find_by_referral_code(
        &self,
        code: &ReferralCode,
    ) -> impl Future<Output = Result<Option<PlayerRecord>, DbError>> + Send;

    /// Check whether a referral code is already assigned.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot be read.
    fn referral_code_taken(
        &self,
        code: &ReferralCode,
    ) -> impl Future<Output = Result<bool, DbError>> + Send;

    /// Page player ids after `after` in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot be read.
    fn page_ids(
        &self,
        after: Option<&PlayerId>,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<PlayerId>, DbError>> + Send;
}

/// Production [`RecordStore`] backed by the `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgRecords {
    pool: PostgresPool,
}

impl PgRecords {
    /// Wrap a connected pool.
    pub const fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }
}

impl RecordStore for PgRecords {
    async fn load(&self, id: &PlayerId) -> Result<Option<PlayerRecord>, DbError> {
        PlayerStore::new(self.pool.pool()).get_player(id).await
    }

    async fn create(&self, record: &PlayerRecord) -> Result<bool, DbError> {
        PlayerStore::new(self.pool.pool())
            .insert_player(record)
            .await
    }

    async fn persist(&self, id: &PlayerId, patch: &PlayerPatch) -> Result<bool, DbError> {
        PlayerStore::new(self.pool.pool())
            .update_player(id, patch)
            .await
    }

    async fn find_by_referral_code(
        &self,
        code: &ReferralCode,
    ) -> Result<Option<PlayerRecord>, DbError> {
        PlayerStore::new(self.pool.pool())
            .get_player_by_referral_code(code)
            .await
    }

    async fn referral_code_taken(&self, code: &ReferralCode) -> Result<bool, DbError> {
        PlayerStore::new(self.pool.pool())
            .referral_code_taken(code)
            .await
    }

    async fn page_ids(
        &self,
        after: Option<&PlayerId>,
        limit: i64,
    ) -> Result<Vec<PlayerId>, DbError> {
        PlayerStore::new(self.pool.pool())
            .list_player_ids(after, limit)
            .await
    }
}

/// In-memory [`RecordStore`] for tests and local runs.
///
/// Clones share the same map, so a handle kept by a test observes every
/// write the engine makes. [`fail_writes`] flips subsequent writes into
/// store errors so outage handling can be exercised without a database.
///
/// [`fail_writes`]: MemoryRecords::fail_writes
#[derive(Clone, Default)]
pub struct MemoryRecords {
    records: Arc<RwLock<HashMap<PlayerId, PlayerRecord>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryRecords {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record directly, bypassing failure injection.
    pub async fn seed(&self, record: PlayerRecord) {
        self.records
            .write()
            .await
            .insert(record.id.clone(), record);
    }

    /// Make every subsequent `create`/`persist` fail with a store error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Read a record directly, bypassing the trait.
    pub async fn snapshot(&self, id: &PlayerId) -> Option<PlayerRecord> {
        self.records.read().await.get(id).cloned()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn write_error() -> DbError {
        DbError::Config("simulated store outage".to_owned())
    }
}

impl RecordStore for MemoryRecords {
    async fn load(&self, id: &PlayerId) -> Result<Option<PlayerRecord>, DbError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn create(&self, record: &PlayerRecord) -> Result<bool, DbError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::write_error());
        }
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Ok(false);
        }
        records.insert(record.id.clone(), record.clone());
        Ok(true)
    }

    async fn persist(&self, id: &PlayerId, patch: &PlayerPatch) -> Result<bool, DbError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::write_error());
        }
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(id) else {
            return Ok(false);
        };
        patch.apply_to(record);
        Ok(true)
    }

    async fn find_by_referral_code(
        &self,
        code: &ReferralCode,
    ) -> Result<Option<PlayerRecord>, DbError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .find(|record| record.referral_code == *code)
            .cloned())
    }

    async fn referral_code_taken(&self, code: &ReferralCode) -> Result<bool, DbError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .any(|record| record.referral_code == *code))
    }

    async fn page_ids(
        &self,
        after: Option<&PlayerId>,
        limit: i64,
    ) -> Result<Vec<PlayerId>, DbError> {
        let records = self.records.read().await;
        let mut ids: Vec<PlayerId> = records
            .keys()
            .filter(|id| after.is_none_or(|anchor| id.as_str() > anchor.as_str()))
            .cloned()
            .collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(ids)
    }
}
