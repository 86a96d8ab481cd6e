use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::application::errors::{AuthError, TransportError};
use crate::domain::entities::{Credentials, InboundEvent};

/// Stream of events (or listen errors) coming off a live connection
pub type EventStream = mpsc::Receiver<Result<InboundEvent, TransportError>>;

/// Options handed to the platform library at login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOptions {
    pub log_level: String,
    pub listen_events: bool,
    pub update_presence: bool,
    pub self_listen: bool,
    pub auto_mark_read: bool,
    pub auto_reconnect: bool,
    pub online: bool,
    pub user_agent: Option<String>,
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self {
            log_level: "silent".to_string(),
            listen_events: true,
            update_presence: false,
            self_listen: false,
            auto_mark_read: false,
            auto_reconnect: true,
            online: true,
            user_agent: None,
        }
    }
}

/// Thread summary returned by `Connection::thread_list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadInfo {
    pub thread_id: String,
    pub name: Option<String>,
}

/// Logs in to the messaging platform
#[async_trait]
pub trait Connector: Send + Sync {
    async fn login(
        &self,
        credentials: Credentials,
        options: &LoginOptions,
    ) -> Result<Arc<dyn Connection>, AuthError>;
}

/// An authenticated session with the messaging platform
#[async_trait]
pub trait Connection: Send + Sync {
    /// Send a message to a thread, returning the platform message id
    async fn send_message(&self, text: &str, thread_id: &str) -> Result<String, TransportError>;

    async fn send_typing_indicator(&self, thread_id: &str) -> Result<(), TransportError>;

    /// Subscribe to inbound events
    async fn listen(&self) -> Result<EventStream, TransportError>;

    async fn logout(&self) -> Result<(), TransportError>;

    /// Current credentials snapshot, refreshed by the platform over time
    fn app_state(&self) -> Credentials;

    fn current_user_id(&self) -> String;

    async fn thread_list(
        &self,
        limit: usize,
        cursor: Option<&str>,
        tags: &[String],
    ) -> Result<Vec<ThreadInfo>, TransportError>;
}

impl std::fmt::Debug for dyn Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}
