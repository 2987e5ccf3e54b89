//! The sweep cycle: settle idle progress for every player.
//!
//! Walks the player table in keyset-paged batches and runs a no-action
//! reconciliation for each id, so energy, idle accrual, leagues, and
//! referral payouts stay fresh for players who have not attached a
//! session in a while. One player's failure never stops the cycle; it is
//! logged and counted.

use std::time::{Duration, Instant};

use futures::future::join_all;
use stonetap_engine::{ProjectionCache, Reconciler, RecordStore, UpdateNotifier};
use stonetap_types::PlayerId;
use tracing::{error, info, warn};

/// Outcome counters for one sweep cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Players reconciled successfully.
    pub players_swept: u64,
    /// Players whose reconciliation failed.
    pub players_failed: u64,
    /// Id pages processed.
    pub batches: u64,
}

/// Periodic idle-progress sweeper over the whole player table.
pub struct Sweeper<S, C, N> {
    engine: Reconciler<S, C, N>,
    store: S,
    batch_size: i64,
}

impl<S, C, N> Sweeper<S, C, N>
where
    S: RecordStore,
    C: ProjectionCache,
    N: UpdateNotifier,
{
    /// Assemble a sweeper around an engine and a paging store handle.
    pub const fn new(engine: Reconciler<S, C, N>, store: S, batch_size: i64) -> Self {
        Self {
            engine,
            store,
            batch_size,
        }
    }

    /// Run sweep cycles forever, pausing `interval` between them.
    pub async fn run(&self, interval: Duration) {
        loop {
            let started = Instant::now();
            let report = self.sweep_once().await;
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            info!(
                players_swept = report.players_swept,
                players_failed = report.players_failed,
                batches = report.batches,
                elapsed_ms,
                "sweep cycle complete"
            );
            tokio::time::sleep(interval).await;
        }
    }

    /// Sweep the whole player table once.
    ///
    /// Pages ids in keyset order and refreshes each page concurrently.
    /// A failed page read aborts the cycle (the next cycle starts over);
    /// a failed player is logged and skipped.
    pub async fn sweep_once(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let mut cursor: Option<PlayerId> = None;

        loop {
            let ids = match self.store.page_ids(cursor.as_ref(), self.batch_size).await {
                Ok(ids) => ids,
                Err(err) => {
                    error!(error = %err, "player id page failed; aborting cycle");
                    break;
                }
            };
            let Some(last) = ids.last().cloned() else {
                break;
            };
            report.batches = report.batches.saturating_add(1);

            let results = join_all(ids.iter().map(|id| self.engine.refresh(id))).await;
            for (id, result) in ids.iter().zip(results) {
                match result {
                    Ok(_) => report.players_swept = report.players_swept.saturating_add(1),
                    Err(err) => {
                        report.players_failed = report.players_failed.saturating_add(1);
                        warn!(player_id = %id, error = %err, "sweep refresh failed; skipping player");
                    }
                }
            }

            let fetched = i64::try_from(ids.len()).unwrap_or(i64::MAX);
            if fetched < self.batch_size {
                break;
            }
            cursor = Some(last);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, Utc};
    use stonetap_core::GameConfig;
    use stonetap_engine::{MemoryProjections, MemoryRecords, NoOpNotifier};
    use stonetap_types::{League, PlayerRecord, ReferralCode};

    fn sweeper(
        store: MemoryRecords,
        batch_size: i64,
    ) -> Sweeper<MemoryRecords, MemoryProjections, NoOpNotifier> {
        let engine = Reconciler::new(
            GameConfig::default(),
            store.clone(),
            MemoryProjections::new(),
            NoOpNotifier,
        );
        Sweeper::new(engine, store, batch_size)
    }

    /// A player idle for `idle_secs` at one stone per second.
    fn idle_player(id: &str, idle_secs: i64) -> PlayerRecord {
        let now = Utc::now();
        let idle_since = now
            .checked_sub_signed(TimeDelta::seconds(idle_secs))
            .unwrap_or(now);
        PlayerRecord {
            id: PlayerId::from(id),
            username: format!("{id}-name"),
            stones: 0,
            energy: 1_000,
            max_energy: 1_000,
            energy_regen_rate: 1,
            stones_per_click: 2,
            auto_stones_per_second: 1,
            boosts: Vec::new(),
            league: League::Pebble,
            referral_code: ReferralCode::new(format!("{id}-code")),
            referred_by: None,
            referral_bonus_total: 0,
            invited_friends: Vec::new(),
            last_energy_update: Some(now),
            last_autobot_update: Some(idle_since),
            boost_active_until: None,
            boost_last_used: None,
            refill_last_used: None,
            last_tap_at: None,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn sweep_settles_every_player_across_pages() {
        let store = MemoryRecords::new();
        for n in 0..3 {
            store.seed(idle_player(&format!("sweep-{n}"), 100)).await;
        }
        let sweeper = sweeper(store.clone(), 2);

        let report = sweeper.sweep_once().await;

        assert_eq!(report.players_swept, 3);
        assert_eq!(report.players_failed, 0);
        assert_eq!(report.batches, 2);
        for n in 0..3 {
            let stones = store
                .snapshot(&PlayerId::from(format!("sweep-{n}").as_str()))
                .await
                .map(|record| record.stones);
            assert_eq!(stones, Some(100));
        }
    }

    #[tokio::test]
    async fn sweep_counts_failures_and_continues() {
        let store = MemoryRecords::new();
        for n in 0..3 {
            store.seed(idle_player(&format!("fail-{n}"), 100)).await;
        }
        store.fail_writes(true);
        let sweeper = sweeper(store.clone(), 10);

        let report = sweeper.sweep_once().await;

        assert_eq!(report.players_swept, 0);
        assert_eq!(report.players_failed, 3);
        // Nothing landed while writes were down.
        let stones = store
            .snapshot(&PlayerId::from("fail-0"))
            .await
            .map(|record| record.stones);
        assert_eq!(stones, Some(0));
    }

    #[tokio::test]
    async fn empty_table_sweeps_nothing() {
        let sweeper = sweeper(MemoryRecords::new(), 100);
        let report = sweeper.sweep_once().await;
        assert_eq!(report, SweepReport::default());
    }

    #[tokio::test]
    async fn already_settled_players_still_count_as_swept() {
        let store = MemoryRecords::new();
        store.seed(idle_player("fresh-0", 0)).await;
        let sweeper = sweeper(store.clone(), 10);

        let report = sweeper.sweep_once().await;

        assert_eq!(report.players_swept, 1);
        assert_eq!(report.players_failed, 0);
    }
}
