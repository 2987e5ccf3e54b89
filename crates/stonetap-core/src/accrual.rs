//! Idle auto-bot accrual.
//!
//! The auto-bot earns stones while the player is away. Like energy, accrual
//! is lazy: [`calculate`] is a pure read of what is owed at `now`, and
//! [`apply`] actually credits it and advances the checkpoint. Keeping the
//! two separate lets callers preview pending income (the hot path does) and
//! makes the no-double-accrual property testable in isolation.

use chrono::{DateTime, Utc};

use stonetap_types::PlayerRecord;

/// What the auto-bot is owed at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accrual {
    /// Stones owed, multiplier already applied.
    pub stones_earned: i64,
    /// The earning multiplier that was in force.
    pub multiplier: i64,
    /// Whole seconds of idle time covered.
    pub elapsed_secs: i64,
}

impl Accrual {
    /// An accrual of nothing under the given multiplier.
    pub const fn none(multiplier: i64) -> Self {
        Self {
            stones_earned: 0,
            multiplier,
            elapsed_secs: 0,
        }
    }
}

/// Compute what the auto-bot is owed at `now` without touching the record.
///
/// Yields zero when the idle rate is non-positive, the checkpoint is unset
/// (it is treated as `now`), or no whole second has elapsed. Negative
/// elapsed time from clock skew clamps to zero.
pub fn calculate(record: &PlayerRecord, multiplier: i64, now: DateTime<Utc>) -> Accrual {
    let rate = record.auto_stones_per_second;
    if rate <= 0 {
        return Accrual::none(multiplier);
    }
    let Some(last) = record.last_autobot_update else {
        return Accrual::none(multiplier);
    };

    let elapsed = now.signed_duration_since(last).num_seconds();
    if elapsed <= 0 {
        return Accrual::none(multiplier);
    }

    Accrual {
        stones_earned: rate.saturating_mul(elapsed).saturating_mul(multiplier),
        multiplier,
        elapsed_secs: elapsed,
    }
}

/// Credit pending accrual and advance the checkpoint.
///
/// Returns the stones credited. The checkpoint moves to `now` when anything
/// was earned; an unset checkpoint is initialized to `now` so the idle clock
/// starts on first observation. When nothing was earned and the checkpoint
/// is already set, nothing moves, so repeated sub-second calls cannot eat
/// idle time.
pub fn apply(record: &mut PlayerRecord, multiplier: i64, now: DateTime<Utc>) -> i64 {
    let accrual = calculate(record, multiplier, now);
    if accrual.stones_earned > 0 {
        record.stones = record.stones.saturating_add(accrual.stones_earned);
        record.last_autobot_update = Some(now);
    } else if record.last_autobot_update.is_none() {
        record.last_autobot_update = Some(now);
    }
    accrual.stones_earned
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use stonetap_types::{League, PlayerId, ReferralCode};

    fn record(auto_rate: i64) -> PlayerRecord {
        let now = Utc::now();
        PlayerRecord {
            id: PlayerId::new("p-1"),
            username: String::from("miner"),
            stones: 500,
            energy: 1_000,
            max_energy: 1_000,
            energy_regen_rate: 1,
            stones_per_click: 2,
            auto_stones_per_second: auto_rate,
            boosts: Vec::new(),
            league: League::Pebble,
            referral_code: ReferralCode::new("abcd1234"),
            referred_by: None,
            referral_bonus_total: 0,
            invited_friends: Vec::new(),
            last_energy_update: Some(now),
            last_autobot_update: Some(now),
            boost_active_until: None,
            boost_last_used: None,
            refill_last_used: None,
            last_tap_at: None,
            created_at: now,
        }
    }

    #[test]
    fn accrues_rate_times_elapsed() {
        let mut r = record(3);
        let now = Utc::now();
        r.last_autobot_update = Some(now - Duration::seconds(120));
        let accrual = calculate(&r, 1, now);
        assert_eq!(accrual.stones_earned, 360);
        assert_eq!(accrual.elapsed_secs, 120);
    }

    #[test]
    fn active_multiplier_doubles_idle_income() {
        let mut r = record(3);
        let now = Utc::now();
        r.last_autobot_update = Some(now - Duration::seconds(120));
        let accrual = calculate(&r, 2, now);
        assert_eq!(accrual.stones_earned, 720);
        assert_eq!(accrual.multiplier, 2);
    }

    #[test]
    fn calculate_is_pure() {
        let mut r = record(3);
        let now = Utc::now();
        r.last_autobot_update = Some(now - Duration::seconds(45));
        let first = calculate(&r, 1, now);
        let second = calculate(&r, 1, now);
        assert_eq!(first, second);
        // The record itself is untouched.
        assert_eq!(r.stones, 500);
    }

    #[test]
    fn apply_credits_and_advances_checkpoint() {
        let mut r = record(2);
        let now = Utc::now();
        r.last_autobot_update = Some(now - Duration::seconds(30));
        let earned = apply(&mut r, 1, now);
        assert_eq!(earned, 60);
        assert_eq!(r.stones, 560);
        assert_eq!(r.last_autobot_update, Some(now));
    }

    #[test]
    fn no_double_accrual_after_apply() {
        let mut r = record(2);
        let now = Utc::now();
        r.last_autobot_update = Some(now - Duration::seconds(30));
        apply(&mut r, 1, now);
        let again = calculate(&r, 1, now);
        assert_eq!(again.stones_earned, 0);
        let earned = apply(&mut r, 1, now);
        assert_eq!(earned, 0);
        assert_eq!(r.stones, 560);
    }

    #[test]
    fn zero_rate_accrues_nothing() {
        let mut r = record(0);
        let now = Utc::now();
        r.last_autobot_update = Some(now - Duration::seconds(3_600));
        assert_eq!(calculate(&r, 1, now).stones_earned, 0);
    }

    #[test]
    fn unset_checkpoint_yields_zero_and_starts_clock() {
        let mut r = record(2);
        r.last_autobot_update = None;
        let now = Utc::now();
        assert_eq!(calculate(&r, 1, now).stones_earned, 0);
        let earned = apply(&mut r, 1, now);
        assert_eq!(earned, 0);
        assert_eq!(r.last_autobot_update, Some(now));
    }

    #[test]
    fn clock_skew_clamps_to_zero() {
        let mut r = record(2);
        let now = Utc::now();
        let future = now + Duration::seconds(300);
        r.last_autobot_update = Some(future);
        let earned = apply(&mut r, 1, now);
        assert_eq!(earned, 0);
        // Checkpoint never moves backward.
        assert_eq!(r.last_autobot_update, Some(future));
    }
}
