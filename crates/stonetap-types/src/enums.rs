//! Enumeration types for the Stonetap economy.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Leagues
// ---------------------------------------------------------------------------

/// Wealth tier a player belongs to, classified from the stone balance.
///
/// Tiers are declared lowest to highest so the derived ordering matches the
/// economic ordering. Thresholds live in configuration; this enum only names
/// the tiers.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum League {
    /// Entry tier. Every player starts here.
    #[default]
    Pebble,
    /// Second tier.
    Gravel,
    /// Third tier.
    Cobblestone,
    /// Fourth tier.
    Boulder,
    /// Fifth tier.
    Quartz,
    /// Sixth tier.
    Granite,
    /// Seventh tier.
    Obsidian,
    /// Eighth tier.
    Marble,
    /// Highest tier.
    Bedrock,
}

impl League {
    /// All tiers, ordered lowest to highest.
    pub const ALL: [Self; 9] = [
        Self::Pebble,
        Self::Gravel,
        Self::Cobblestone,
        Self::Boulder,
        Self::Quartz,
        Self::Granite,
        Self::Obsidian,
        Self::Marble,
        Self::Bedrock,
    ];

    /// Stable string form used in storage and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pebble => "Pebble",
            Self::Gravel => "Gravel",
            Self::Cobblestone => "Cobblestone",
            Self::Boulder => "Boulder",
            Self::Quartz => "Quartz",
            Self::Granite => "Granite",
            Self::Obsidian => "Obsidian",
            Self::Marble => "Marble",
            Self::Bedrock => "Bedrock",
        }
    }

    /// Parse the stable string form. Returns `None` for unknown names.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|l| l.as_str() == name)
    }
}

impl core::fmt::Display for League {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Boosts
// ---------------------------------------------------------------------------

/// A levelable upgrade line a player can buy into.
///
/// Each kind moves exactly one derived stat. The one-shot daily refill and
/// the temporary earning multiplier are cooldown actions, not boost kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum BoostKind {
    /// Raises energy regeneration by 1 per second per level.
    RechargeSpeed,
    /// Raises maximum energy by 500 per level.
    BatteryPack,
    /// Raises stones earned per click by 2 per level.
    MultiTap,
    /// Raises idle income by 1 stone per second per level.
    AutoBot,
}

impl BoostKind {
    /// All boost kinds.
    pub const ALL: [Self; 4] = [
        Self::RechargeSpeed,
        Self::BatteryPack,
        Self::MultiTap,
        Self::AutoBot,
    ];

    /// Stable string form used in storage and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RechargeSpeed => "RechargeSpeed",
            Self::BatteryPack => "BatteryPack",
            Self::MultiTap => "MultiTap",
            Self::AutoBot => "AutoBot",
        }
    }
}

impl core::fmt::Display for BoostKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

/// Where a batch of claimed stones came from.
///
/// Manual taps spend energy and feed the referral cascade. `AutoBot` credits
/// are the client echoing idle income the server clock already tracks; they
/// spend no energy and never cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum CreditSource {
    /// The player tapped the screen.
    ManualTap,
    /// The client is reporting idle earnings from its local auto-bot timer.
    AutoBot,
}
