//! Configuration for the sweeper binary.
//!
//! The game tuning comes from the shared `stonetap-config.yaml`; the
//! sweep cadence and batch sizing come from environment variables so a
//! deployment can tune them without touching the YAML.

use std::path::Path;
use std::time::Duration;

use stonetap_core::GameConfig;
use tracing::info;

use crate::error::SweeperError;

/// Complete sweeper configuration.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Game tuning and infrastructure URLs.
    pub game: GameConfig,
    /// Pause between sweep cycles.
    pub sweep_interval: Duration,
    /// Player ids fetched per page within a cycle.
    pub batch_size: i64,
}

impl SweeperConfig {
    /// Load configuration from the YAML file and environment variables.
    ///
    /// Recognized variables:
    /// - `STONETAP_CONFIG` -- path to the game config YAML (default
    ///   `stonetap-config.yaml`; defaults apply when the file is absent)
    /// - `DATABASE_URL`, `DRAGONFLY_URL`, `NATS_URL` -- infrastructure
    ///   overrides, applied on top of the YAML
    /// - `SWEEP_INTERVAL_SECS` -- pause between cycles (default 1800)
    /// - `SWEEP_BATCH_SIZE` -- ids per page (default 1000)
    ///
    /// # Errors
    ///
    /// Returns [`SweeperError::Config`] when the YAML fails to load or
    /// validate and [`SweeperError::Env`] for unusable variable values.
    pub fn from_env() -> Result<Self, SweeperError> {
        let config_path =
            std::env::var("STONETAP_CONFIG").unwrap_or_else(|_| "stonetap-config.yaml".to_owned());
        let config_path = Path::new(&config_path);
        let game = if config_path.exists() {
            GameConfig::from_file(config_path)?
        } else {
            info!("Config file not found, using defaults");
            let mut game = GameConfig::default();
            game.infrastructure.apply_env_overrides();
            game
        };

        let sweep_interval_secs: u64 = std::env::var("SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "1800".to_owned())
            .parse()
            .map_err(|e| SweeperError::Env(format!("invalid SWEEP_INTERVAL_SECS: {e}")))?;
        if sweep_interval_secs == 0 {
            return Err(SweeperError::Env(
                "SWEEP_INTERVAL_SECS must be positive".to_owned(),
            ));
        }

        let batch_size: i64 = std::env::var("SWEEP_BATCH_SIZE")
            .unwrap_or_else(|_| "1000".to_owned())
            .parse()
            .map_err(|e| SweeperError::Env(format!("invalid SWEEP_BATCH_SIZE: {e}")))?;
        if batch_size <= 0 {
            return Err(SweeperError::Env(
                "SWEEP_BATCH_SIZE must be positive".to_owned(),
            ));
        }

        Ok(Self {
            game,
            sweep_interval: Duration::from_secs(sweep_interval_secs),
            batch_size,
        })
    }
}
