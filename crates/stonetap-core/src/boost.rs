//! Boost stat derivation and purchase pricing.
//!
//! The four derived stats are affine functions of the owned boost levels.
//! Stored copies on the record are a cache; the reconciler recomputes them
//! from the boost list at the start of every pass, so a bug or a manual row
//! edit can never leave stats permanently out of line.

use chrono::{DateTime, Utc};

use stonetap_types::{BoostKind, DerivedStats, OwnedBoost, PlayerRecord};

use crate::config::{BoostConfig, TimerConfig};

/// Stones per click with no `MultiTap` levels.
pub const BASE_STONES_PER_CLICK: i64 = 2;
/// Stones per click added by each `MultiTap` level.
pub const STONES_PER_MULTITAP_LEVEL: i64 = 2;
/// Energy ceiling with no `BatteryPack` levels.
pub const BASE_MAX_ENERGY: i64 = 1_000;
/// Energy ceiling added by each `BatteryPack` level.
pub const ENERGY_PER_BATTERY_LEVEL: i64 = 500;
/// Energy regeneration per second with no `RechargeSpeed` levels.
pub const BASE_ENERGY_REGEN: i64 = 1;
/// Regeneration added by each `RechargeSpeed` level.
pub const REGEN_PER_RECHARGE_LEVEL: i64 = 1;
/// Idle stones per second with no `AutoBot` levels.
pub const BASE_AUTO_STONES: i64 = 1;
/// Idle stones per second added by each `AutoBot` level.
pub const AUTO_STONES_PER_AUTOBOT_LEVEL: i64 = 1;

/// Current level of a boost line within a boost list.
///
/// Missing kinds count as level 0; duplicate entries resolve to the highest
/// level.
pub fn level_of(boosts: &[OwnedBoost], kind: BoostKind) -> u8 {
    boosts
        .iter()
        .filter(|b| b.kind == kind)
        .map(|b| b.level)
        .max()
        .unwrap_or(0)
}

/// Derive the four stats from a boost list.
pub fn derive(boosts: &[OwnedBoost]) -> DerivedStats {
    let level = |kind: BoostKind| i64::from(level_of(boosts, kind));
    DerivedStats {
        stones_per_click: BASE_STONES_PER_CLICK
            .saturating_add(level(BoostKind::MultiTap).saturating_mul(STONES_PER_MULTITAP_LEVEL)),
        energy_regen_rate: BASE_ENERGY_REGEN.saturating_add(
            level(BoostKind::RechargeSpeed).saturating_mul(REGEN_PER_RECHARGE_LEVEL),
        ),
        max_energy: BASE_MAX_ENERGY
            .saturating_add(level(BoostKind::BatteryPack).saturating_mul(ENERGY_PER_BATTERY_LEVEL)),
        auto_stones_per_second: BASE_AUTO_STONES.saturating_add(
            level(BoostKind::AutoBot).saturating_mul(AUTO_STONES_PER_AUTOBOT_LEVEL),
        ),
    }
}

/// Price of raising a boost line from `level` to `level + 1`.
///
/// Lookups past the end of the ladder clamp to the last rung; the value is
/// then display-only because purchase is refused at the level cap. Returns 0
/// only for an empty ladder, which validation rules out.
pub fn next_cost(kind: BoostKind, level: u8, boosts: &BoostConfig) -> i64 {
    let ladder = boosts.ladder(kind);
    ladder
        .get(usize::from(level))
        .or_else(|| ladder.last())
        .copied()
        .unwrap_or(0)
}

/// The earning multiplier in force at `now`.
///
/// The configured multiplier while the temporary boost window covers `now`,
/// otherwise 1. Applies identically to manual settlement and idle accrual.
pub fn earning_multiplier(record: &PlayerRecord, timers: &TimerConfig, now: DateTime<Utc>) -> i64 {
    if record.boost_active(now) {
        timers.boost_multiplier
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use stonetap_types::{League, PlayerId, ReferralCode};

    fn record_with_boosts(boosts: Vec<OwnedBoost>) -> PlayerRecord {
        let now = Utc::now();
        let stats = derive(&boosts);
        PlayerRecord {
            id: PlayerId::new("p-1"),
            username: String::from("miner"),
            stones: 0,
            energy: stats.max_energy,
            max_energy: stats.max_energy,
            energy_regen_rate: stats.energy_regen_rate,
            stones_per_click: stats.stones_per_click,
            auto_stones_per_second: stats.auto_stones_per_second,
            boosts,
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
    fn no_boosts_yield_registration_defaults() {
        let stats = derive(&[]);
        assert_eq!(stats.stones_per_click, 2);
        assert_eq!(stats.energy_regen_rate, 1);
        assert_eq!(stats.max_energy, 1_000);
        assert_eq!(stats.auto_stones_per_second, 1);
    }

    #[test]
    fn each_kind_moves_exactly_its_stat() {
        let base = derive(&[]);
        for kind in BoostKind::ALL {
            let stats = derive(&[OwnedBoost { kind, level: 3 }]);
            match kind {
                BoostKind::MultiTap => {
                    assert_eq!(stats.stones_per_click, 8);
                    assert_eq!(stats.max_energy, base.max_energy);
                }
                BoostKind::RechargeSpeed => {
                    assert_eq!(stats.energy_regen_rate, 4);
                    assert_eq!(stats.stones_per_click, base.stones_per_click);
                }
                BoostKind::BatteryPack => {
                    assert_eq!(stats.max_energy, 2_500);
                    assert_eq!(stats.auto_stones_per_second, base.auto_stones_per_second);
                }
                BoostKind::AutoBot => {
                    assert_eq!(stats.auto_stones_per_second, 4);
                    assert_eq!(stats.energy_regen_rate, base.energy_regen_rate);
                }
            }
        }
    }

    #[test]
    fn duplicate_entries_use_highest_level() {
        let boosts = vec![
            OwnedBoost {
                kind: BoostKind::MultiTap,
                level: 1,
            },
            OwnedBoost {
                kind: BoostKind::MultiTap,
                level: 4,
            },
        ];
        assert_eq!(level_of(&boosts, BoostKind::MultiTap), 4);
        assert_eq!(derive(&boosts).stones_per_click, 10);
    }

    #[test]
    fn cost_ladder_walks_then_clamps() {
        let config = BoostConfig::default();
        assert_eq!(next_cost(BoostKind::MultiTap, 0, &config), 500);
        assert_eq!(next_cost(BoostKind::MultiTap, 5, &config), 3_400);
        assert_eq!(next_cost(BoostKind::MultiTap, 10, &config), 18_000);
        // Past the ladder end the last rung is reported.
        assert_eq!(next_cost(BoostKind::MultiTap, 200, &config), 18_000);
    }

    #[test]
    fn multiplier_follows_boost_window() {
        let timers = TimerConfig::default();
        let now = Utc::now();
        let mut record = record_with_boosts(Vec::new());
        assert_eq!(earning_multiplier(&record, &timers, now), 1);

        record.boost_active_until = Some(now + Duration::seconds(10));
        assert_eq!(earning_multiplier(&record, &timers, now), 2);

        // An expired window earns the base rate again.
        record.boost_active_until = Some(now - Duration::seconds(10));
        assert_eq!(earning_multiplier(&record, &timers, now), 1);
    }
}
