//! The balance reconciler.
//!
//! Every player-facing operation runs the same pipeline under that
//! player's lock: load the record, refresh derived stats, regenerate
//! energy, apply idle accrual, apply the action, reclassify the league,
//! persist only the fields that changed, then fan out (cache projection,
//! change notification, referral cascade). Validation failures abort
//! before any write, so pending time-based gains stay claimable by the
//! next call.
//!
//! The store is the only party whose failure fails an operation. Cache
//! and notification failures are logged and swallowed; referral payouts
//! run after the earner's write lands and never affect the earner's
//! result.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use stonetap_core::config::GameConfig;
use stonetap_core::{accrual, boost, energy, league, settle};
use stonetap_types::{
    BoostKind, CreditSource, OwnedBoost, PlayerId, PlayerPatch, PlayerProjection, PlayerRecord,
    PlayerUpdateEvent, PlayerView,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::cache::ProjectionCache;
use crate::error::{CooldownAction, EngineError};
use crate::notify::UpdateNotifier;
use crate::store::RecordStore;

/// Per-player async lock registry.
///
/// Reconciliations for one player serialize on a shared mutex; distinct
/// players proceed independently. Entries are a pointer each and are
/// never reaped, so the registry grows with the set of players this
/// process has touched.
#[derive(Default)]
struct PlayerLocks {
    locks: Mutex<HashMap<PlayerId, Arc<Mutex<()>>>>,
}

impl PlayerLocks {
    async fn acquire(&self, player_id: &PlayerId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(player_id.clone()).or_default())
        };
        lock.lock_owned().await
    }
}

/// The action a reconciliation applies between accrual and persistence.
#[derive(Debug, Clone, Copy)]
enum Action {
    Settle { requested: i64, source: CreditSource },
    SyncEnergy { reported: i64 },
    PurchaseBoost { kind: BoostKind },
    UseRefill,
    ActivateBoost,
    Refresh,
}

/// Server-authoritative balance engine.
///
/// Generic over its storage, cache, and notification seams so the same
/// pipeline runs against `PostgreSQL`/`Dragonfly`/NATS in production and
/// against the in-memory stubs in tests.
pub struct Reconciler<S, C, N> {
    pub(crate) config: GameConfig,
    pub(crate) store: S,
    pub(crate) cache: C,
    pub(crate) notifier: N,
    locks: PlayerLocks,
}

impl<S, C, N> Reconciler<S, C, N>
where
    S: RecordStore,
    C: ProjectionCache,
    N: UpdateNotifier,
{
    /// Assemble an engine from its parts.
    pub fn new(config: GameConfig, store: S, cache: C, notifier: N) -> Self {
        Self {
            config,
            store,
            cache,
            notifier,
            locks: PlayerLocks::default(),
        }
    }

    /// The game configuration this engine runs with.
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Take the reconciliation lock for one player.
    pub(crate) async fn lock_player(&self, player_id: &PlayerId) -> OwnedMutexGuard<()> {
        self.locks.acquire(player_id).await
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Settle a batch of client-reported earnings.
    ///
    /// Manual taps are honoured in whole clicks up to what the battery
    /// affords and never hard-fail on energy; `AutoBot` credits spend no
    /// energy and stay out of the referral cascade.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidInput`] for a non-positive amount,
    /// [`EngineError::TapRateLimited`] when the optional spacing policy
    /// rejects the batch, [`EngineError::PlayerNotFound`] for an unknown
    /// id, and [`EngineError::Store`] when the durable write fails.
    pub async fn settle_balance(
        &self,
        player_id: &PlayerId,
        requested: i64,
        source: CreditSource,
    ) -> Result<PlayerView, EngineError> {
        if requested <= 0 {
            return Err(EngineError::InvalidInput {
                reason: format!("settlement amount must be positive, got {requested}"),
            });
        }
        self.reconcile(player_id, Action::Settle { requested, source })
            .await
    }

    /// Reconcile the client's reported energy reading.
    ///
    /// The report is clamped into `[0, max_energy]`; out-of-range values
    /// are corrected, never rejected.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PlayerNotFound`] for an unknown id and
    /// [`EngineError::Store`] when the durable write fails.
    pub async fn sync_energy(
        &self,
        player_id: &PlayerId,
        reported: i64,
    ) -> Result<PlayerView, EngineError> {
        self.reconcile(player_id, Action::SyncEnergy { reported })
            .await
    }

    /// Buy the next level of a boost line.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MaxLevelReached`] at the top of the ladder
    /// (checked before affordability), [`EngineError::InsufficientStones`]
    /// when the balance cannot cover the ladder cost,
    /// [`EngineError::PlayerNotFound`] for an unknown id, and
    /// [`EngineError::Store`] when the durable write fails.
    pub async fn purchase_boost(
        &self,
        player_id: &PlayerId,
        kind: BoostKind,
    ) -> Result<PlayerView, EngineError> {
        self.reconcile(player_id, Action::PurchaseBoost { kind })
            .await
    }

    /// Refill energy to the ceiling. Once per day.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CooldownActive`] inside the cooldown
    /// window, [`EngineError::PlayerNotFound`] for an unknown id, and
    /// [`EngineError::Store`] when the durable write fails.
    pub async fn use_refill(&self, player_id: &PlayerId) -> Result<PlayerView, EngineError> {
        self.reconcile(player_id, Action::UseRefill).await
    }

    /// Start the temporary earnings multiplier window. Once per day.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CooldownActive`] inside the cooldown
    /// window, [`EngineError::PlayerNotFound`] for an unknown id, and
    /// [`EngineError::Store`] when the durable write fails.
    pub async fn activate_boost(&self, player_id: &PlayerId) -> Result<PlayerView, EngineError> {
        self.reconcile(player_id, Action::ActivateBoost).await
    }

    /// Run the pipeline with no action: settle pending time-based gains
    /// and return the fresh view. Used at session attach and by the
    /// background sweep.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PlayerNotFound`] for an unknown id and
    /// [`EngineError::Store`] when the durable write fails.
    pub async fn refresh(&self, player_id: &PlayerId) -> Result<PlayerView, EngineError> {
        self.reconcile(player_id, Action::Refresh).await
    }

    /// Fast-path balance read.
    ///
    /// Serves the cache projection when present; on a miss (or cache
    /// outage) falls back to the record and re-primes the cache. The
    /// projection is advisory and may lag the last reconciliation.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PlayerNotFound`] for an unknown id and
    /// [`EngineError::Store`] when the fallback read fails.
    pub async fn hot_balance(
        &self,
        player_id: &PlayerId,
    ) -> Result<PlayerProjection, EngineError> {
        match self.cache.get(player_id).await {
            Ok(Some(projection)) => return Ok(projection),
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(
                    player_id = %player_id,
                    %error,
                    "projection read failed; falling back to store"
                );
            }
        }

        let record = self.store.load(player_id).await?.ok_or_else(|| {
            EngineError::PlayerNotFound {
                player_id: player_id.clone(),
            }
        })?;
        let projection = PlayerProjection::of(&record);
        if let Err(error) = self.cache.put(player_id, &projection).await {
            tracing::warn!(player_id = %player_id, %error, "projection prime failed");
        }
        Ok(projection)
    }

    /// Drop the player's cache projection at session end.
    ///
    /// Eviction failures are logged and swallowed; the projection expires
    /// on its own either way.
    pub async fn end_session(&self, player_id: &PlayerId) {
        let _guard = self.locks.acquire(player_id).await;
        if let Err(error) = self.cache.evict(player_id).await {
            tracing::warn!(player_id = %player_id, %error, "session-end eviction failed");
        }
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    async fn reconcile(
        &self,
        player_id: &PlayerId,
        action: Action,
    ) -> Result<PlayerView, EngineError> {
        let _guard = self.locks.acquire(player_id).await;
        let now = Utc::now();

        let mut record = self.store.load(player_id).await?.ok_or_else(|| {
            EngineError::PlayerNotFound {
                player_id: player_id.clone(),
            }
        })?;
        let before = record.clone();

        // Stored derived stats are a cache of the boost list; recomputing
        // here converges any drift from config or code changes.
        apply_derived_stats(&mut record);

        energy::recalculate(&mut record, now);

        let multiplier = boost::earning_multiplier(&record, &self.config.timers, now);
        let idle_earned = accrual::apply(&mut record, multiplier, now);

        let manual_earned = self.apply_action(&mut record, action, now)?;

        record.league = league::classify(record.stones, &self.config.leagues.thresholds);

        let patch = PlayerPatch::diff(&before, &record);
        if !patch.is_empty() && !self.store.persist(player_id, &patch).await? {
            tracing::warn!(
                player_id = %record.id,
                "reconciliation write matched no row; skipping fanout"
            );
            return Ok(PlayerView::from_record(&record, now));
        }

        self.refresh_cache_and_notify(&record, now).await;

        // Referral payouts only after the earner's write landed, so a
        // referrer is never credited for earnings that did not stick.
        self.cascade_earnings(&record, idle_earned, now).await;
        self.cascade_earnings(&record, manual_earned, now).await;

        Ok(PlayerView::from_record(&record, now))
    }

    fn apply_action(
        &self,
        record: &mut PlayerRecord,
        action: Action,
        now: DateTime<Utc>,
    ) -> Result<i64, EngineError> {
        match action {
            Action::Settle { requested, source } => {
                self.apply_settlement(record, requested, source, now)
            }
            Action::SyncEnergy { reported } => {
                record.energy = reported.clamp(0, record.max_energy);
                Ok(0)
            }
            Action::PurchaseBoost { kind } => self.apply_purchase(record, kind),
            Action::UseRefill => self.apply_refill(record, now),
            Action::ActivateBoost => self.apply_boost_activation(record, now),
            Action::Refresh => Ok(0),
        }
    }

    fn apply_settlement(
        &self,
        record: &mut PlayerRecord,
        requested: i64,
        source: CreditSource,
        now: DateTime<Utc>,
    ) -> Result<i64, EngineError> {
        // The spacing guard only exists (and last_tap_at is only
        // maintained) while the policy is configured on.
        if source == CreditSource::ManualTap
            && let Some(min_interval_ms) = self.config.anti_abuse.min_tap_interval_ms
        {
            if let Some(last) = record.last_tap_at {
                let elapsed_ms = now.signed_duration_since(last).num_milliseconds();
                if elapsed_ms < min_interval_ms {
                    return Err(EngineError::TapRateLimited { min_interval_ms });
                }
            }
            record.last_tap_at = Some(now);
        }

        let multiplier = boost::earning_multiplier(record, &self.config.timers, now);
        let settlement = settle::settle(record, requested, source, multiplier);
        if !settlement.fully_settled {
            tracing::debug!(
                player_id = %record.id,
                requested,
                granted = settlement.stones_granted,
                clicks_settled = settlement.clicks_settled,
                "settlement honoured partially"
            );
        }

        // Only manual earnings feed the cascade; idle income is cascaded
        // from the server-side accrual, not from client AutoBot credits.
        match source {
            CreditSource::ManualTap => Ok(settlement.stones_granted),
            CreditSource::AutoBot => Ok(0),
        }
    }

    fn apply_purchase(
        &self,
        record: &mut PlayerRecord,
        kind: BoostKind,
    ) -> Result<i64, EngineError> {
        let level = record.boost_level(kind);
        if level >= self.config.boosts.max_level {
            return Err(EngineError::MaxLevelReached { kind, level });
        }
        let cost = boost::next_cost(kind, level, &self.config.boosts);
        if record.stones < cost {
            return Err(EngineError::InsufficientStones {
                required: cost,
                available: record.stones,
            });
        }

        record.stones = record.stones.saturating_sub(cost);
        upsert_boost_level(&mut record.boosts, kind, level.saturating_add(1));

        apply_derived_stats(record);
        // Energy never exceeds the ceiling, even right after it moves.
        record.energy = record.energy.min(record.max_energy);
        Ok(0)
    }

    fn apply_refill(
        &self,
        record: &mut PlayerRecord,
        now: DateTime<Utc>,
    ) -> Result<i64, EngineError> {
        if let Some(last) = record.refill_last_used {
            let retry_at = cooldown_retry_at(last, self.config.timers.refill_cooldown_secs);
            if now < retry_at {
                return Err(EngineError::CooldownActive {
                    action: CooldownAction::Refill,
                    retry_at,
                });
            }
        }
        record.energy = record.max_energy;
        record.refill_last_used = Some(now);
        Ok(0)
    }

    fn apply_boost_activation(
        &self,
        record: &mut PlayerRecord,
        now: DateTime<Utc>,
    ) -> Result<i64, EngineError> {
        if let Some(last) = record.boost_last_used {
            let retry_at = cooldown_retry_at(last, self.config.timers.boost_cooldown_secs);
            if now < retry_at {
                return Err(EngineError::CooldownActive {
                    action: CooldownAction::TemporaryBoost,
                    retry_at,
                });
            }
        }
        record.boost_last_used = Some(now);
        record.boost_active_until = now.checked_add_signed(
            TimeDelta::try_seconds(self.config.timers.boost_duration_secs).unwrap_or_default(),
        );
        Ok(0)
    }

    /// Rewrite the cache projection and publish the change notification.
    ///
    /// Both branches are fire-and-forget: failures are logged at warn and
    /// never bubble into the operation result.
    pub(crate) async fn refresh_cache_and_notify(
        &self,
        record: &PlayerRecord,
        now: DateTime<Utc>,
    ) {
        let projection = PlayerProjection::of(record);
        if let Err(error) = self.cache.put(&record.id, &projection).await {
            tracing::warn!(player_id = %record.id, %error, "projection refresh failed");
        }

        let event =
            PlayerUpdateEvent::new(record.id.clone(), PlayerView::from_record(record, now), now);
        if let Err(error) = self.notifier.publish_update(&event).await {
            tracing::warn!(player_id = %record.id, %error, "update publish failed");
        }
    }
}

/// Set a boost line to `level`, adding the entry on the first purchase.
fn upsert_boost_level(boosts: &mut Vec<OwnedBoost>, kind: BoostKind, level: u8) {
    if let Some(owned) = boosts.iter_mut().find(|owned| owned.kind == kind) {
        owned.level = level;
        return;
    }
    boosts.push(OwnedBoost { kind, level });
}

/// Overwrite the stored derived stats from the boost list.
fn apply_derived_stats(record: &mut PlayerRecord) {
    let stats = boost::derive(&record.boosts);
    record.max_energy = stats.max_energy;
    record.energy_regen_rate = stats.energy_regen_rate;
    record.stones_per_click = stats.stones_per_click;
    record.auto_stones_per_second = stats.auto_stones_per_second;
}

/// When a cooldown started at `last` opens again.
fn cooldown_retry_at(last: DateTime<Utc>, cooldown_secs: i64) -> DateTime<Utc> {
    TimeDelta::try_seconds(cooldown_secs)
        .and_then(|cooldown| last.checked_add_signed(cooldown))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
