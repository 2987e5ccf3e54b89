//! Field-level partial updates for the player record.
//!
//! The reconciler stages every change it makes into a [`PlayerPatch`] and the
//! store writes only the staged fields. A full-record overwrite never happens,
//! so two interleaved reconciliations touching disjoint fields cannot clobber
//! each other's work.

use chrono::{DateTime, Utc};

use crate::enums::League;
use crate::structs::{InvitedFriend, OwnedBoost, PlayerRecord};

/// The set of record fields one reconciliation changed.
///
/// `None` means "leave the stored value alone". Identity fields (id,
/// username, referral code, `referred_by`, creation time) are immutable after
/// insert and have no slot here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerPatch {
    /// New stone balance.
    pub stones: Option<i64>,
    /// New energy value.
    pub energy: Option<i64>,
    /// New energy ceiling.
    pub max_energy: Option<i64>,
    /// New regeneration rate.
    pub energy_regen_rate: Option<i64>,
    /// New per-click credit.
    pub stones_per_click: Option<i64>,
    /// New idle income rate.
    pub auto_stones_per_second: Option<i64>,
    /// New boost list.
    pub boosts: Option<Vec<OwnedBoost>>,
    /// New league.
    pub league: Option<League>,
    /// New lifetime referral earnings.
    pub referral_bonus_total: Option<i64>,
    /// New invited-friends list.
    pub invited_friends: Option<Vec<InvitedFriend>>,
    /// New energy checkpoint.
    pub last_energy_update: Option<DateTime<Utc>>,
    /// New idle accrual checkpoint.
    pub last_autobot_update: Option<DateTime<Utc>>,
    /// New end of the temporary x2 window.
    pub boost_active_until: Option<DateTime<Utc>>,
    /// New boost activation checkpoint.
    pub boost_last_used: Option<DateTime<Utc>>,
    /// New refill checkpoint.
    pub refill_last_used: Option<DateTime<Utc>>,
    /// New last accepted manual settlement time.
    pub last_tap_at: Option<DateTime<Utc>>,
}

impl PlayerPatch {
    /// Compute the patch that turns `before` into `after`.
    ///
    /// Field-by-field comparison over the mutable fields. Timestamps stage
    /// only when they hold a value afterwards; a legal reconciliation never
    /// unsets one, so a `Some` to `None` transition is ignored.
    pub fn diff(before: &PlayerRecord, after: &PlayerRecord) -> Self {
        let changed_time = |b: Option<DateTime<Utc>>, a: Option<DateTime<Utc>>| {
            if a == b { None } else { a }
        };
        Self {
            stones: (before.stones != after.stones).then_some(after.stones),
            energy: (before.energy != after.energy).then_some(after.energy),
            max_energy: (before.max_energy != after.max_energy).then_some(after.max_energy),
            energy_regen_rate: (before.energy_regen_rate != after.energy_regen_rate)
                .then_some(after.energy_regen_rate),
            stones_per_click: (before.stones_per_click != after.stones_per_click)
                .then_some(after.stones_per_click),
            auto_stones_per_second: (before.auto_stones_per_second != after.auto_stones_per_second)
                .then_some(after.auto_stones_per_second),
            boosts: (before.boosts != after.boosts).then(|| after.boosts.clone()),
            league: (before.league != after.league).then_some(after.league),
            referral_bonus_total: (before.referral_bonus_total != after.referral_bonus_total)
                .then_some(after.referral_bonus_total),
            invited_friends: (before.invited_friends != after.invited_friends)
                .then(|| after.invited_friends.clone()),
            last_energy_update: changed_time(before.last_energy_update, after.last_energy_update),
            last_autobot_update: changed_time(
                before.last_autobot_update,
                after.last_autobot_update,
            ),
            boost_active_until: changed_time(before.boost_active_until, after.boost_active_until),
            boost_last_used: changed_time(before.boost_last_used, after.boost_last_used),
            refill_last_used: changed_time(before.refill_last_used, after.refill_last_used),
            last_tap_at: changed_time(before.last_tap_at, after.last_tap_at),
        }
    }

    /// Whether the patch stages no fields at all.
    pub const fn is_empty(&self) -> bool {
        self.stones.is_none()
            && self.energy.is_none()
            && self.max_energy.is_none()
            && self.energy_regen_rate.is_none()
            && self.stones_per_click.is_none()
            && self.auto_stones_per_second.is_none()
            && self.boosts.is_none()
            && self.league.is_none()
            && self.referral_bonus_total.is_none()
            && self.invited_friends.is_none()
            && self.last_energy_update.is_none()
            && self.last_autobot_update.is_none()
            && self.boost_active_until.is_none()
            && self.boost_last_used.is_none()
            && self.refill_last_used.is_none()
            && self.last_tap_at.is_none()
    }

    /// Overlay the staged fields onto a record, leaving the rest alone.
    ///
    /// This is the in-memory equivalent of the store's partial UPDATE and is
    /// what the in-memory store implementations use.
    pub fn apply_to(&self, record: &mut PlayerRecord) {
        if let Some(v) = self.stones {
            record.stones = v;
        }
        if let Some(v) = self.energy {
            record.energy = v;
        }
        if let Some(v) = self.max_energy {
            record.max_energy = v;
        }
        if let Some(v) = self.energy_regen_rate {
            record.energy_regen_rate = v;
        }
        if let Some(v) = self.stones_per_click {
            record.stones_per_click = v;
        }
        if let Some(v) = self.auto_stones_per_second {
            record.auto_stones_per_second = v;
        }
        if let Some(v) = &self.boosts {
            record.boosts.clone_from(v);
        }
        if let Some(v) = self.league {
            record.league = v;
        }
        if let Some(v) = self.referral_bonus_total {
            record.referral_bonus_total = v;
        }
        if let Some(v) = &self.invited_friends {
            record.invited_friends.clone_from(v);
        }
        if let Some(v) = self.last_energy_update {
            record.last_energy_update = Some(v);
        }
        if let Some(v) = self.last_autobot_update {
            record.last_autobot_update = Some(v);
        }
        if let Some(v) = self.boost_active_until {
            record.boost_active_until = Some(v);
        }
        if let Some(v) = self.boost_last_used {
            record.boost_last_used = Some(v);
        }
        if let Some(v) = self.refill_last_used {
            record.refill_last_used = Some(v);
        }
        if let Some(v) = self.last_tap_at {
            record.last_tap_at = Some(v);
        }
    }
}
