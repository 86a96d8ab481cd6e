//! Event dispatcher - Routes inbound platform events to their handlers

use std::sync::Arc;

use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, trace, warn};

use super::handlers::{PresenceHandler, ReactionHandler};
use super::pacing::chance;
use super::router::MessageRouter;
use crate::domain::entities::{InboundEvent, MessageEvent};
use crate::domain::traits::{Connection, CredentialStore, EventStream};

/// Best-effort credential refresh while events flow
pub struct StateSaver {
    store: Arc<dyn CredentialStore>,
    probability: f64,
}

impl StateSaver {
    pub fn new(store: Arc<dyn CredentialStore>, probability: f64) -> Self {
        Self { store, probability }
    }

    /// Returns whether a save was attempted
    pub async fn maybe_save(&self, connection: &Arc<dyn Connection>) -> bool {
        if !chance(self.probability) {
            return false;
        }
        if let Err(e) = self.store.save(&connection.app_state()).await {
            warn!("Error saving AppState: {}", e);
        }
        true
    }
}

/// Classifies events and hands them to the router or the simple handlers
pub struct EventDispatcher {
    router: MessageRouter,
    reactions: ReactionHandler,
    presence: PresenceHandler,
    state_saver: Option<StateSaver>,
}

impl EventDispatcher {
    pub fn new(router: MessageRouter, reactions: ReactionHandler) -> Self {
        Self {
            router,
            reactions,
            presence: PresenceHandler,
            state_saver: None,
        }
    }

    pub fn with_state_saver(mut self, saver: StateSaver) -> Self {
        self.state_saver = Some(saver);
        self
    }

    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    /// Handle one event, then maybe refresh the stored credentials
    pub async fn dispatch(&self, connection: &Arc<dyn Connection>, event: InboundEvent) {
        match event {
            InboundEvent::Message {
                thread_id: Some(thread_id),
                sender_id,
                body: Some(body),
            } if !thread_id.is_empty() && !body.is_empty() => {
                let message = MessageEvent::new(thread_id, sender_id.unwrap_or_default(), body);
                self.router.handle(connection, &message).await;
            }
            InboundEvent::Message { .. } => {
                debug!("Skipping message with missing properties");
            }
            InboundEvent::Reaction {
                thread_id: Some(thread_id),
                user_id,
                reaction,
            } => {
                if let Err(e) = self
                    .reactions
                    .handle(connection, &thread_id, user_id.as_deref(), reaction.as_deref())
                    .await
                {
                    error!("Error in reaction handler: {}", e);
                }
            }
            InboundEvent::Reaction { .. } => {
                debug!("Skipping reaction without thread");
            }
            InboundEvent::Presence { user_id, statuses } => {
                self.presence.handle(user_id.as_deref(), &statuses);
            }
            InboundEvent::Unknown => {
                trace!("Ignoring unsupported event");
            }
        }

        if let Some(saver) = &self.state_saver {
            saver.maybe_save(connection).await;
        }
    }

    /// Consume an event stream until it ends. Each event is handled on its
    /// own task, so a slow or panicking handler never holds up the next one.
    pub async fn run(self: Arc<Self>, connection: Arc<dyn Connection>, mut events: EventStream) {
        let mut tasks: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                item = events.recv() => match item {
                    Some(Ok(event)) => {
                        trace!("Handling {} event", event.kind());
                        let dispatcher = Arc::clone(&self);
                        let connection = Arc::clone(&connection);
                        tasks.spawn(async move { dispatcher.dispatch(&connection, event).await });
                    }
                    Some(Err(e)) => error!("Listen error: {}", e),
                    None => break,
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => log_join(joined),
            }
        }

        warn!("Event stream ended");
        while let Some(joined) = tasks.join_next().await {
            log_join(joined);
        }
    }
}

fn log_join(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        if !e.is_cancelled() {
            error!("Error handling event: {}", e);
        }
    }
}
