//! Change notification seam (NATS).
//!
//! After every successful durable write the reconciler publishes the
//! player's fresh view on `player.{id}.update`. Delivery is
//! fire-and-forget: downstream consumers (websocket fanout, analytics)
//! re-sync from the store if they miss one, so a publish failure is
//! logged and swallowed, never surfaced to the player.

use std::sync::Arc;

use stonetap_types::PlayerUpdateEvent;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Errors raised by a notifier implementation.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// NATS connection or publish failed.
    #[error("NATS error: {0}")]
    Nats(String),
}

/// Publisher for player change notifications.
pub trait UpdateNotifier {
    /// Publish one change notification.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if serialization or the publish fails. The
    /// reconciler treats this as non-fatal.
    fn publish_update(
        &self,
        event: &PlayerUpdateEvent,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// Production [`UpdateNotifier`] over a NATS connection.
pub struct NatsNotifier {
    client: async_nats::Client,
}

impl NatsNotifier {
    /// Connect to a NATS server.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Nats`] if the connection cannot be
    /// established.
    pub async fn connect(url: &str) -> Result<Self, NotifyError> {
        info!(url = url, "connecting to NATS server");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| NotifyError::Nats(format!("failed to connect to {url}: {e}")))?;
        info!("NATS connection established");
        Ok(Self { client })
    }

    /// Wrap an already-connected client.
    pub const fn new(client: async_nats::Client) -> Self {
        Self { client }
    }
}

impl UpdateNotifier for NatsNotifier {
    async fn publish_update(&self, event: &PlayerUpdateEvent) -> Result<(), NotifyError> {
        let subject = format!("player.{}.update", event.player_id);
        let payload = serde_json::to_vec(event)
            .map_err(|e| NotifyError::Nats(format!("failed to serialize update: {e}")))?;
        debug!(
            subject = subject.as_str(),
            event_id = %event.event_id,
            "publishing player update"
        );
        self.client
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|e| NotifyError::Nats(format!("failed to publish to {subject}: {e}")))?;
        Ok(())
    }
}

/// A notifier that drops every update. For local runs without NATS.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpNotifier;

impl UpdateNotifier for NoOpNotifier {
    async fn publish_update(&self, _event: &PlayerUpdateEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// A notifier that records every update in memory. For tests.
///
/// Clones share the same buffer, so a handle kept by a test sees every
/// event the engine publishes.
#[derive(Clone, Default)]
pub struct CapturingNotifier {
    events: Arc<Mutex<Vec<PlayerUpdateEvent>>>,
}

impl CapturingNotifier {
    /// Create an empty capture buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All updates published so far, in publish order.
    pub async fn events(&self) -> Vec<PlayerUpdateEvent> {
        self.events.lock().await.clone()
    }
}

impl UpdateNotifier for CapturingNotifier {
    async fn publish_update(&self, event: &PlayerUpdateEvent) -> Result<(), NotifyError> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}
