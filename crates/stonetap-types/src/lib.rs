//! Shared type definitions for the Stonetap economy engine.
//!
//! This crate is the single source of truth for the data model used across
//! the Stonetap workspace. Wire-facing types flow downstream to `TypeScript`
//! via `ts-rs` for the game client.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe wrappers for player, referral-code, and event ids
//! - [`enums`] -- Leagues, boost kinds, settlement credit sources
//! - [`structs`] -- Player record, cache projection, public view, events
//! - [`patch`] -- Field-level partial updates for the player record

pub mod enums;
pub mod ids;
pub mod patch;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{BoostKind, CreditSource, League};
pub use ids::{EventId, PlayerId, ReferralCode};
pub use patch::PlayerPatch;
pub use structs::{
    DerivedStats, InvitedFriend, OwnedBoost, PlayerProjection, PlayerRecord, PlayerUpdateEvent,
    PlayerView,
};

#[cfg(test)]
mod tests {
    //! Integration tests for type exports and `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs generates TypeScript bindings when types with
        // #[ts(export)] are used. Importing them here triggers generation.
        // The actual files are written to the `bindings/` directory
        // relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::PlayerId::export_all();
        let _ = crate::ids::ReferralCode::export_all();
        let _ = crate::ids::EventId::export_all();

        // Enums
        let _ = crate::enums::League::export_all();
        let _ = crate::enums::BoostKind::export_all();
        let _ = crate::enums::CreditSource::export_all();

        // Structs
        let _ = crate::structs::OwnedBoost::export_all();
        let _ = crate::structs::InvitedFriend::export_all();
        let _ = crate::structs::PlayerView::export_all();
        let _ = crate::structs::PlayerUpdateEvent::export_all();
    }
}
