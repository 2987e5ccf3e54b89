//! One-hop referral payouts.
//!
//! Whenever a referred player's reconciliation lands new earnings, their
//! referrer receives a configured cut of that amount. The cascade stops
//! after one hop: the referrer's bonus income never triggers a payout to
//! the referrer's own referrer.
//!
//! Payouts run after the earner's durable write and are best-effort. A
//! missing referrer, a dangling code, or a failed write on the referrer's
//! side is logged and dropped without disturbing the earner's result.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use stonetap_core::league;
use stonetap_types::{InvitedFriend, PlayerId, PlayerPatch, PlayerRecord};

use crate::cache::ProjectionCache;
use crate::notify::UpdateNotifier;
use crate::reconciler::Reconciler;
use crate::store::RecordStore;

impl<S, C, N> Reconciler<S, C, N>
where
    S: RecordStore,
    C: ProjectionCache,
    N: UpdateNotifier,
{
    /// Pay the earner's referrer their cut of `earned` stones.
    ///
    /// Skips silently when the earner has no referrer, when the cut
    /// floors to zero, and on self-referral. Runs with the earner's lock
    /// still held and takes the referrer's lock inside it; `referred_by`
    /// always points at an earlier registration, so the two locks are
    /// ordered and never cycle.
    pub(crate) async fn cascade_earnings(
        &self,
        earner: &PlayerRecord,
        earned: i64,
        now: DateTime<Utc>,
    ) {
        if earned <= 0 {
            return;
        }
        let Some(code) = earner.referred_by.as_ref() else {
            return;
        };
        let bonus = referral_cut(earned, self.config.referral.earning_bonus_percent);
        if bonus <= 0 {
            return;
        }

        match self.store.find_by_referral_code(code).await {
            Ok(Some(referrer)) if referrer.id != earner.id => {
                self.credit_referrer(&referrer, &earner.id, bonus, now).await;
            }
            Ok(Some(_)) => {
                tracing::debug!(player_id = %earner.id, "self-referral; skipping payout");
            }
            Ok(None) => {
                tracing::debug!(
                    player_id = %earner.id,
                    code = code.as_str(),
                    "referral code has no owner; skipping payout"
                );
            }
            Err(error) => {
                tracing::warn!(player_id = %earner.id, %error, "referrer lookup failed; payout dropped");
            }
        }
    }

    /// Credit `bonus` stones to the referrer on behalf of `friend`.
    ///
    /// Shared by the earnings cascade and the signup bonus. Reloads the
    /// referrer under their own lock, bumps the balance, the lifetime
    /// referral total, and the per-friend entry, reclassifies the league,
    /// persists the diff, then refreshes the referrer's projection and
    /// notification. Failures are logged and dropped.
    pub(crate) async fn credit_referrer(
        &self,
        referrer: &PlayerRecord,
        friend: &PlayerId,
        bonus: i64,
        now: DateTime<Utc>,
    ) {
        let _guard = self.lock_player(&referrer.id).await;

        // The caller's copy may predate another credit; the stored row is
        // the baseline.
        let before = match self.store.load(&referrer.id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::warn!(referrer = %referrer.id, "referrer vanished before credit; payout dropped");
                return;
            }
            Err(error) => {
                tracing::warn!(referrer = %referrer.id, %error, "referrer reload failed; payout dropped");
                return;
            }
        };

        let mut updated = before.clone();
        updated.stones = updated.stones.saturating_add(bonus);
        updated.referral_bonus_total = updated.referral_bonus_total.saturating_add(bonus);
        upsert_friend_bonus(&mut updated.invited_friends, friend, bonus);
        updated.league = league::classify(updated.stones, &self.config.leagues.thresholds);

        let patch = PlayerPatch::diff(&before, &updated);
        match self.store.persist(&updated.id, &patch).await {
            Ok(true) => {
                tracing::debug!(
                    referrer = %updated.id,
                    friend = %friend,
                    bonus,
                    "referral bonus credited"
                );
                self.refresh_cache_and_notify(&updated, now).await;
            }
            Ok(false) => {
                tracing::warn!(referrer = %updated.id, "referral credit matched no row; payout dropped");
            }
            Err(error) => {
                tracing::warn!(referrer = %updated.id, %error, "referral credit write failed; payout dropped");
            }
        }
    }
}

/// Accumulate `bonus` on the friend's entry, creating it on the first
/// cascade.
fn upsert_friend_bonus(friends: &mut Vec<InvitedFriend>, friend: &PlayerId, bonus: i64) {
    if let Some(entry) = friends.iter_mut().find(|entry| entry.player_id == *friend) {
        entry.bonus_total = entry.bonus_total.saturating_add(bonus);
        return;
    }
    friends.push(InvitedFriend {
        player_id: friend.clone(),
        bonus_total: bonus,
    });
}

/// The referrer's share of an earning, floored to whole stones.
fn referral_cut(earned: i64, percent: Decimal) -> i64 {
    Decimal::from(earned)
        .checked_mul(percent)
        .map(|cut| cut.floor())
        .and_then(|cut| cut.to_i64())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cut_is_five_percent_floored() {
        let percent = Decimal::new(5, 2);
        assert_eq!(referral_cut(1_000, percent), 50);
        assert_eq!(referral_cut(20, percent), 1);
        // 19 * 0.05 = 0.95 floors to nothing.
        assert_eq!(referral_cut(19, percent), 0);
        assert_eq!(referral_cut(0, percent), 0);
    }

    #[test]
    fn cut_survives_extreme_balances() {
        let percent = Decimal::new(5, 2);
        assert_eq!(referral_cut(i64::MAX, percent), 461_168_601_842_738_790);
    }

    #[test]
    fn cut_respects_configured_share() {
        assert_eq!(referral_cut(1_000, Decimal::new(10, 2)), 100);
        assert_eq!(referral_cut(1_000, Decimal::ZERO), 0);
        assert_eq!(referral_cut(1_000, Decimal::ONE), 1_000);
    }

    #[test]
    fn friend_entries_accumulate_per_friend() {
        let mut friends = Vec::new();
        let ann = PlayerId::from("ann");
        upsert_friend_bonus(&mut friends, &ann, 50);
        upsert_friend_bonus(&mut friends, &ann, 25);
        upsert_friend_bonus(&mut friends, &PlayerId::from("bob"), 10);

        assert_eq!(friends.len(), 2);
        assert_eq!(friends.first().map(|entry| entry.bonus_total), Some(75));
        assert_eq!(friends.last().map(|entry| entry.bonus_total), Some(10));
    }
}
