//! Server-authoritative balance engine for Stonetap.
//!
//! Clients render taps and timers optimistically; this crate decides what
//! they are actually worth. Every operation funnels through the
//! [`Reconciler`] pipeline, which replays pending time-based gains before
//! applying the requested action and persists only the fields that
//! changed.
//!
//! The engine is generic over three seams so the same pipeline runs
//! against `PostgreSQL`, `Dragonfly`, and NATS in production and against
//! in-memory stand-ins in tests:
//!
//! - [`RecordStore`] -- durable player records
//! - [`ProjectionCache`] -- the hot balance projection
//! - [`UpdateNotifier`] -- per-player change notifications

pub mod cache;
pub mod error;
pub mod notify;
pub mod reconciler;
pub mod referral;
pub mod registration;
pub mod store;

pub use cache::{MemoryProjections, ProjectionCache};
pub use error::{CooldownAction, EngineError};
pub use notify::{CapturingNotifier, NatsNotifier, NoOpNotifier, NotifyError, UpdateNotifier};
pub use reconciler::Reconciler;
pub use registration::RegisterRequest;
pub use store::{MemoryRecords, PgRecords, RecordStore};
