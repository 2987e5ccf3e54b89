//! Energy regeneration over wall-clock time.
//!
//! Energy regenerates lazily: nothing ticks in the background, the value is
//! brought up to date whenever a reconciliation observes the record. Elapsed
//! time is measured in whole seconds; sub-second calls are no-ops and the
//! checkpoint never moves backward, including under clock skew.

use chrono::{DateTime, Utc};

use stonetap_types::PlayerRecord;

/// Bring a record's energy up to date at `now`.
///
/// Returns the energy actually regenerated. A record that has never been
/// observed gets its checkpoint initialized to `now` without gaining
/// anything. Stored energy outside `[0, max_energy]` is pulled back into
/// range on the way.
pub fn recalculate(record: &mut PlayerRecord, now: DateTime<Utc>) -> i64 {
    let Some(last) = record.last_energy_update else {
        record.last_energy_update = Some(now);
        return 0;
    };

    let elapsed = now.signed_duration_since(last).num_seconds();
    if elapsed <= 0 {
        return 0;
    }

    let current = record.energy.clamp(0, record.max_energy);
    let gained = elapsed.saturating_mul(record.energy_regen_rate.max(0));
    let updated = current.saturating_add(gained).min(record.max_energy);

    record.energy = updated;
    record.last_energy_update = Some(now);
    updated.saturating_sub(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use stonetap_types::{League, PlayerId, ReferralCode};

    fn record(energy: i64, max_energy: i64, regen: i64) -> PlayerRecord {
        let now = Utc::now();
        PlayerRecord {
            id: PlayerId::new("p-1"),
            username: String::from("miner"),
            stones: 0,
            energy,
            max_energy,
            energy_regen_rate: regen,
            stones_per_click: 2,
            auto_stones_per_second: 1,
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
    fn regenerates_elapsed_seconds_times_rate() {
        let mut r = record(100, 1_000, 3);
        let now = Utc::now();
        r.last_energy_update = Some(now - Duration::seconds(60));
        let gained = recalculate(&mut r, now);
        assert_eq!(gained, 180);
        assert_eq!(r.energy, 280);
        assert_eq!(r.last_energy_update, Some(now));
    }

    #[test]
    fn clamps_at_max_energy() {
        let mut r = record(990, 1_000, 5);
        let now = Utc::now();
        r.last_energy_update = Some(now - Duration::seconds(3_600));
        let gained = recalculate(&mut r, now);
        assert_eq!(gained, 10);
        assert_eq!(r.energy, 1_000);
    }

    #[test]
    fn sub_second_elapse_is_a_noop() {
        let mut r = record(100, 1_000, 3);
        let now = Utc::now();
        let last = now - Duration::milliseconds(400);
        r.last_energy_update = Some(last);
        let gained = recalculate(&mut r, now);
        assert_eq!(gained, 0);
        assert_eq!(r.energy, 100);
        // Checkpoint is untouched so the fraction is not lost.
        assert_eq!(r.last_energy_update, Some(last));
    }

    #[test]
    fn clock_skew_never_moves_checkpoint_backward() {
        let mut r = record(100, 1_000, 3);
        let now = Utc::now();
        let future = now + Duration::seconds(30);
        r.last_energy_update = Some(future);
        let gained = recalculate(&mut r, now);
        assert_eq!(gained, 0);
        assert_eq!(r.last_energy_update, Some(future));
    }

    #[test]
    fn unset_checkpoint_initializes_without_gain() {
        let mut r = record(100, 1_000, 3);
        r.last_energy_update = None;
        let now = Utc::now();
        let gained = recalculate(&mut r, now);
        assert_eq!(gained, 0);
        assert_eq!(r.energy, 100);
        assert_eq!(r.last_energy_update, Some(now));
    }

    #[test]
    fn recalculating_twice_with_same_clock_is_idempotent() {
        let mut r = record(100, 1_000, 3);
        let now = Utc::now();
        r.last_energy_update = Some(now - Duration::seconds(10));
        let first = recalculate(&mut r, now);
        assert_eq!(first, 30);
        let second = recalculate(&mut r, now);
        assert_eq!(second, 0);
        assert_eq!(r.energy, 130);
    }

    #[test]
    fn out_of_range_energy_is_pulled_back() {
        let mut r = record(5_000, 1_000, 1);
        let now = Utc::now();
        r.last_energy_update = Some(now - Duration::seconds(1));
        recalculate(&mut r, now);
        assert_eq!(r.energy, 1_000);
    }
}
