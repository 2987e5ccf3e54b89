//! Core entity structs for the Stonetap economy.
//!
//! The [`PlayerRecord`] is the durable, authoritative shape; the
//! [`PlayerProjection`] is the advisory cache entry derived from it; the
//! [`PlayerView`] is the sanitized shape clients are allowed to see. Wire
//! types serialize camelCase to match the game client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{BoostKind, League};
use crate::ids::{EventId, PlayerId, ReferralCode};

// ---------------------------------------------------------------------------
// Boosts
// ---------------------------------------------------------------------------

/// A boost line the player has bought into, with its current level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct OwnedBoost {
    /// Which upgrade line this entry tracks.
    pub kind: BoostKind,
    /// Current level, 0 through the ladder cap.
    pub level: u8,
}

/// The four stats that are pure functions of the owned boost levels.
///
/// Stored copies on the record are a cache of this derivation and are
/// recomputed at the start of every reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedStats {
    /// Stones credited per manual click.
    pub stones_per_click: i64,
    /// Energy points regenerated per second.
    pub energy_regen_rate: i64,
    /// Energy ceiling.
    pub max_energy: i64,
    /// Idle stones earned per second.
    pub auto_stones_per_second: i64,
}

// ---------------------------------------------------------------------------
// Referrals
// ---------------------------------------------------------------------------

/// A player recruited through this player's referral code, with the bonus
/// stones their activity has paid out so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct InvitedFriend {
    /// The recruited player.
    pub player_id: PlayerId,
    /// Cumulative bonus stones earned from this friend's activity.
    pub bonus_total: i64,
}

// ---------------------------------------------------------------------------
// Player record
// ---------------------------------------------------------------------------

/// The durable, authoritative state of one player.
///
/// Only the reconciler mutates this; everything else reads projections or
/// views. Timestamps are checkpoints for time-based settlement and never
/// move backward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Opaque identifier assigned by the authentication layer.
    pub id: PlayerId,
    /// Display name captured at registration.
    pub username: String,
    /// Current stone balance.
    pub stones: i64,
    /// Current energy.
    pub energy: i64,
    /// Energy ceiling, derived from `BatteryPack`.
    pub max_energy: i64,
    /// Energy regenerated per second, derived from `RechargeSpeed`.
    pub energy_regen_rate: i64,
    /// Stones credited per click, derived from `MultiTap`.
    pub stones_per_click: i64,
    /// Idle stones per second, derived from `AutoBot`.
    pub auto_stones_per_second: i64,
    /// Owned boost lines with their levels.
    pub boosts: Vec<OwnedBoost>,
    /// Wealth tier classified from the stone balance.
    pub league: League,
    /// This player's own referral code, unique across players.
    pub referral_code: ReferralCode,
    /// The code this player signed up with, if any. Immutable after
    /// creation.
    pub referred_by: Option<ReferralCode>,
    /// Lifetime bonus stones earned from recruited friends.
    pub referral_bonus_total: i64,
    /// Players recruited through this player's code.
    pub invited_friends: Vec<InvitedFriend>,
    /// Checkpoint for energy regeneration.
    pub last_energy_update: Option<DateTime<Utc>>,
    /// Checkpoint for idle auto-bot accrual.
    pub last_autobot_update: Option<DateTime<Utc>>,
    /// End of the temporary x2 earning window, if one was activated.
    pub boost_active_until: Option<DateTime<Utc>>,
    /// When the temporary boost was last activated (24h cooldown).
    pub boost_last_used: Option<DateTime<Utc>>,
    /// When the daily energy refill was last used (24h cooldown).
    pub refill_last_used: Option<DateTime<Utc>>,
    /// Last accepted manual settlement. Only maintained while the optional
    /// tap-spacing policy is enabled.
    pub last_tap_at: Option<DateTime<Utc>>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl PlayerRecord {
    /// Whether the temporary x2 earning window covers `now`.
    pub fn boost_active(&self, now: DateTime<Utc>) -> bool {
        self.boost_active_until.is_some_and(|until| now < until)
    }

    /// Current level of a boost line. Missing entries count as level 0;
    /// duplicate entries resolve to the highest level.
    pub fn boost_level(&self, kind: BoostKind) -> u8 {
        self.boosts
            .iter()
            .filter(|b| b.kind == kind)
            .map(|b| b.level)
            .max()
            .unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Cache projection
// ---------------------------------------------------------------------------

/// The advisory hot-path projection of a player record.
///
/// Rewritten wholesale after every successful durable write, never updated
/// when the durable write failed, and safe to drop at any time. Never
/// authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProjection {
    /// Stone balance at the last successful reconciliation.
    pub stones: i64,
    /// Idle income rate at the last successful reconciliation.
    pub auto_stones_per_second: i64,
    /// Idle accrual checkpoint at the last successful reconciliation.
    pub last_autobot_update: Option<DateTime<Utc>>,
    /// League at the last successful reconciliation.
    pub league: League,
}

impl PlayerProjection {
    /// Build the projection of a record.
    pub fn of(record: &PlayerRecord) -> Self {
        Self {
            stones: record.stones,
            auto_stones_per_second: record.auto_stones_per_second,
            last_autobot_update: record.last_autobot_update,
            league: record.league,
        }
    }
}

// ---------------------------------------------------------------------------
// Public view
// ---------------------------------------------------------------------------

/// The sanitized player state clients are allowed to see.
///
/// Excludes `referred_by`, tap bookkeeping, and profile internals.
/// Timestamps serialize as ISO-8601 strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PlayerView {
    /// Current stone balance.
    pub stones: i64,
    /// Current energy.
    pub energy: i64,
    /// Energy ceiling.
    pub max_energy: i64,
    /// Energy regenerated per second.
    pub energy_regen_rate: i64,
    /// Stones credited per click.
    pub stones_per_click: i64,
    /// Idle stones per second.
    pub auto_stones_per_second: i64,
    /// Owned boost lines with their levels.
    pub boosts: Vec<OwnedBoost>,
    /// Wealth tier.
    pub league: League,
    /// This player's shareable referral code.
    pub referral_code: ReferralCode,
    /// Recruited players and what they have paid out.
    pub invited_friends: Vec<InvitedFriend>,
    /// Lifetime referral earnings.
    pub referral_bonus_total: i64,
    /// Idle accrual checkpoint. An unset checkpoint reports the
    /// reconciliation time.
    pub last_autobot_update: DateTime<Utc>,
    /// End of the temporary x2 window, if active or in the past.
    pub boost_active_until: Option<DateTime<Utc>>,
    /// When the temporary boost was last activated.
    pub boost_last_used: Option<DateTime<Utc>>,
    /// When the daily refill was last used.
    pub refill_last_used: Option<DateTime<Utc>>,
}

impl PlayerView {
    /// Build the client-facing view of a record.
    ///
    /// `now` fills the idle checkpoint when the record has never accrued.
    pub fn from_record(record: &PlayerRecord, now: DateTime<Utc>) -> Self {
        Self {
            stones: record.stones,
            energy: record.energy,
            max_energy: record.max_energy,
            energy_regen_rate: record.energy_regen_rate,
            stones_per_click: record.stones_per_click,
            auto_stones_per_second: record.auto_stones_per_second,
            boosts: record.boosts.clone(),
            league: record.league,
            referral_code: record.referral_code.clone(),
            invited_friends: record.invited_friends.clone(),
            referral_bonus_total: record.referral_bonus_total,
            last_autobot_update: record.last_autobot_update.unwrap_or(now),
            boost_active_until: record.boost_active_until,
            boost_last_used: record.boost_last_used,
            refill_last_used: record.refill_last_used,
        }
    }
}

// ---------------------------------------------------------------------------
// Change notifications
// ---------------------------------------------------------------------------

/// Envelope published on `player.{id}.update` after every successful
/// reconciliation. Fire-and-forget; consumers must tolerate gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PlayerUpdateEvent {
    /// Time-ordered identifier for this notification.
    pub event_id: EventId,
    /// Whose state changed.
    pub player_id: PlayerId,
    /// The state after the change.
    pub view: PlayerView,
    /// When the engine emitted the notification.
    pub emitted_at: DateTime<Utc>,
}

impl PlayerUpdateEvent {
    /// Wrap a view in a freshly identified envelope.
    pub fn new(player_id: PlayerId, view: PlayerView, emitted_at: DateTime<Utc>) -> Self {
        Self {
            event_id: EventId::new(),
            player_id,
            view,
            emitted_at,
        }
    }
}
