//! Background sweeper binary for the Stonetap economy.
//!
//! Periodically settles idle progress for every player so balances,
//! leagues, and referral payouts stay fresh for players who have not
//! opened a session in a while. Each cycle walks the player table in
//! keyset-paged batches and runs the engine's no-action reconciliation
//! for every id.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration (YAML plus environment overrides)
//! 3. Connect to `PostgreSQL` and run migrations
//! 4. Connect to Dragonfly
//! 5. Connect to NATS
//! 6. Assemble the engine and enter the sweep loop

mod config;
mod error;
mod sweep;

use stonetap_db::{DragonflyPool, PostgresPool};
use stonetap_engine::{NatsNotifier, PgRecords, Reconciler};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::SweeperConfig;
use crate::sweep::Sweeper;

/// Application entry point for the sweeper.
///
/// # Errors
///
/// Returns an error if any startup step fails; the sweep loop itself
/// only logs and continues.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("stonetap-sweeper starting");

    // 2. Load configuration.
    let config = SweeperConfig::from_env()?;
    info!(
        sweep_interval_secs = config.sweep_interval.as_secs(),
        batch_size = config.batch_size,
        "Configuration loaded"
    );

    // 3. Connect to PostgreSQL and run migrations.
    let postgres = PostgresPool::connect_url(&config.game.infrastructure.postgres_url).await?;
    postgres.run_migrations().await?;
    info!("Migrations up to date");

    // 4. Connect to Dragonfly.
    let dragonfly = DragonflyPool::connect(&config.game.infrastructure.dragonfly_url).await?;

    // 5. Connect to NATS.
    let notifier = NatsNotifier::connect(&config.game.infrastructure.nats_url).await?;

    // 6. Assemble the engine and enter the sweep loop.
    let store = PgRecords::new(postgres);
    let engine = Reconciler::new(config.game, store.clone(), dragonfly, notifier);
    let sweeper = Sweeper::new(engine, store, config.batch_size);
    info!("Sweeper initialized, entering sweep loop");

    sweeper.run(config.sweep_interval).await;

    Ok(())
}
