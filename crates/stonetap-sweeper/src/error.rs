//! Error types for the sweeper binary.
//!
//! Uses `thiserror` for typed errors covering configuration loading.
//! Connection failures surface their own crate's error types at startup,
//! and per-player sweep failures are not errors at this level; the sweep
//! logs them and moves on.

use stonetap_core::ConfigError;

/// Errors that can occur while configuring the sweeper.
#[derive(Debug, thiserror::Error)]
pub enum SweeperError {
    /// The game configuration file failed to load or validate.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An environment variable held an unusable value.
    #[error("environment error: {0}")]
    Env(String),
}
