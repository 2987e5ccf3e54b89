//! Error types for the reconciliation engine.
//!
//! All fallible engine operations return [`EngineError`] through the
//! standard [`Result`] type alias. Validation failures are detected before
//! any write, so an error response never leaves a half-applied record.

use std::fmt;

use chrono::{DateTime, Utc};
use stonetap_db::DbError;
use stonetap_types::{BoostKind, PlayerId};

/// The cooldown-gated action named in [`EngineError::CooldownActive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownAction {
    /// The daily full energy refill.
    Refill,
    /// The daily temporary earnings multiplier.
    TemporaryBoost,
}

impl CooldownAction {
    /// Stable lowercase name for logs and error messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Refill => "refill",
            Self::TemporaryBoost => "boost",
        }
    }
}

impl fmt::Display for CooldownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during a balance reconciliation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No record exists for the given player id.
    #[error("player not found: {player_id}")]
    PlayerNotFound {
        /// The unknown player.
        player_id: PlayerId,
    },

    /// The request failed validation before touching any state.
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// What was wrong with the request.
        reason: String,
    },

    /// The player cannot afford a boost purchase.
    #[error("insufficient stones: need {required}, have {available}")]
    InsufficientStones {
        /// The ladder cost of the next level.
        required: i64,
        /// The player's current balance.
        available: i64,
    },

    /// A once-per-day action was used again too soon.
    #[error("{action} is on cooldown until {retry_at}")]
    CooldownActive {
        /// Which action is gated.
        action: CooldownAction,
        /// When the action becomes available again.
        retry_at: DateTime<Utc>,
    },

    /// A boost purchase was attempted at the top of its ladder.
    #[error("{kind} is already at max level {level}")]
    MaxLevelReached {
        /// The boost line.
        kind: BoostKind,
        /// Its current level.
        level: u8,
    },

    /// Taps arrived faster than the configured spacing allows.
    ///
    /// Only produced while `anti_abuse.min_tap_interval_ms` is set.
    #[error("taps must be at least {min_interval_ms}ms apart")]
    TapRateLimited {
        /// The configured minimum spacing.
        min_interval_ms: i64,
    },

    /// Registration could not find an unused referral code.
    #[error("referral code allocation failed after {attempts} attempts")]
    ReferralCodeAllocation {
        /// How many candidates were tried.
        attempts: u32,
    },

    /// The durable store failed. Cache and notification failures are not
    /// errors; they are logged and swallowed.
    #[error("store error: {0}")]
    Store(#[from] DbError),
}
