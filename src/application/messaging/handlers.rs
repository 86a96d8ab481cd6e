//! Handlers for the non-message events

use std::sync::Arc;

use tracing::info;

use super::pacing::{chance, Pacing};
use crate::application::errors::TransportError;
use crate::domain::traits::Connection;

/// Occasionally acknowledges reactions, after a short human-like pause
pub struct ReactionHandler {
    reply_probability: f64,
    pacing: Pacing,
}

impl ReactionHandler {
    pub fn new(reply_probability: f64) -> Self {
        Self {
            reply_probability,
            pacing: Pacing::default(),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Returns whether a reply was sent
    pub async fn handle(
        &self,
        connection: &Arc<dyn Connection>,
        thread_id: &str,
        user_id: Option<&str>,
        reaction: Option<&str>,
    ) -> Result<bool, TransportError> {
        self.pacing.sleep_jitter().await;

        let reaction = reaction.unwrap_or_default();
        info!("Reaction received: {} from {}", reaction, user_id.unwrap_or("unknown"));

        if !chance(self.reply_probability) {
            return Ok(false);
        }
        connection
            .send_message(&format!("I noticed you reacted with: {}", reaction), thread_id)
            .await?;
        Ok(true)
    }
}

/// Logs presence changes; never replies
#[derive(Default)]
pub struct PresenceHandler;

impl PresenceHandler {
    pub fn handle(&self, user_id: Option<&str>, statuses: &serde_json::Value) {
        info!("User {} is now {}", user_id.unwrap_or("unknown"), statuses);
    }
}
