//! Pure economy rules and configuration for the Stonetap engine.
//!
//! This crate contains the logic layer of the tap economy -- everything that
//! computes balances, energy, and leagues without touching I/O. It sits
//! between `stonetap-types` (which defines the data structures) and the
//! engine/sweeper crates (which handle persistence and orchestration).
//!
//! # Modules
//!
//! - [`accrual`] -- Idle auto-bot accrual: pure calculation plus apply
//! - [`boost`] -- Stat derivation, cost ladders, the earning multiplier
//! - [`config`] -- YAML-backed [`GameConfig`] with defaults and validation
//! - [`energy`] -- Lazy energy regeneration over wall-clock time
//! - [`league`] -- League classification from the stone balance
//! - [`settle`] -- Click batch settlement with partial fulfilment

pub mod accrual;
pub mod boost;
pub mod config;
pub mod energy;
pub mod league;
pub mod settle;

// Re-export primary types at crate root for convenience.
pub use accrual::Accrual;
pub use boost::{derive, earning_multiplier, level_of, next_cost};
pub use config::{
    AntiAbuseConfig, BoostConfig, ConfigError, GameConfig, InfrastructureConfig, LeagueConfig,
    LeagueTier, LoggingConfig, ReferralConfig, TimerConfig,
};
pub use energy::recalculate;
pub use league::classify;
pub use settle::{Settlement, energy_cost_per_click, settle};
