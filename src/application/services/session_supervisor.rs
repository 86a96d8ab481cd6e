//! Session supervisor - Owns the single live connection
//!
//! Lifecycle: `Stopped -> Starting -> Running -> (Reconnecting -> Starting) | Stopped`.
//! Startup loads commands and credentials, logs in after a short random delay,
//! then spawns two tasks per session: the event listener feeding the
//! [`EventDispatcher`] and a heartbeat that checks the connection and
//! triggers a reconnect when it finds it closed.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::errors::SessionError;
use crate::application::messaging::{EventDispatcher, Pacing};
use crate::application::services::CommandRegistry;
use crate::domain::traits::{Connection, Connector, CredentialStore, LoginOptions};

/// Where the supervisor is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Stopped,
    Starting,
    Running,
    Reconnecting,
}

/// Point-in-time view for status consumers
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub running: bool,
    pub user_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub uptime_secs: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    pub login_options: LoginOptions,
    pub auto_save_state: bool,
    /// Created on start if missing
    pub data_dir: Option<PathBuf>,
    pub heartbeat_interval: Duration,
    /// Pause between stop and start on a manual restart
    pub restart_settle: Duration,
    pub pacing: Pacing,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            login_options: LoginOptions::default(),
            auto_save_state: true,
            data_dir: None,
            heartbeat_interval: Duration::from_secs(60),
            restart_settle: Duration::from_secs(2),
            pacing: Pacing::default(),
        }
    }
}

/// The one live connection plus its background tasks
struct Session {
    id: Uuid,
    connection: Arc<dyn Connection>,
    user_id: String,
    started_at: DateTime<Utc>,
    listener: JoinHandle<()>,
    heartbeat: JoinHandle<()>,
}

struct Slot {
    state: SessionState,
    session: Option<Session>,
}

pub struct SessionSupervisor {
    connector: Arc<dyn Connector>,
    store: Arc<dyn CredentialStore>,
    registry: Arc<CommandRegistry>,
    dispatcher: Arc<EventDispatcher>,
    settings: SupervisorSettings,
    slot: RwLock<Slot>,
    start_gate: Mutex<()>,
    reconnecting: AtomicBool,
    /// Set by `stop`, cleared by `start`; a pending reconnect must not undo a stop
    stop_requested: AtomicBool,
}

impl SessionSupervisor {
    pub fn new(
        connector: Arc<dyn Connector>,
        store: Arc<dyn CredentialStore>,
        dispatcher: Arc<EventDispatcher>,
        settings: SupervisorSettings,
    ) -> Arc<Self> {
        let registry = dispatcher.router().registry().clone();
        Arc::new(Self {
            connector,
            store,
            registry,
            dispatcher,
            settings,
            slot: RwLock::new(Slot {
                state: SessionState::Stopped,
                session: None,
            }),
            start_gate: Mutex::new(()),
            reconnecting: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
        })
    }

    /// Start the session, or return the one already running
    pub async fn start(self: &Arc<Self>) -> Result<Arc<dyn Connection>, SessionError> {
        self.stop_requested.store(false, Ordering::SeqCst);
        self.start_gated().await
    }

    async fn start_gated(self: &Arc<Self>) -> Result<Arc<dyn Connection>, SessionError> {
        if let Some(connection) = self.connection().await {
            info!("Bot is already running, returning existing instance");
            return Ok(connection);
        }

        let _gate = self.start_gate.lock().await;
        // Another caller may have finished starting while we waited
        if let Some(connection) = self.connection().await {
            return Ok(connection);
        }

        self.slot.write().await.state = SessionState::Starting;
        info!("Starting bot...");

        match self.establish().await {
            Ok(connection) => Ok(connection),
            Err(e) => {
                error!("Failed to start bot: {}", e);
                self.slot.write().await.state = SessionState::Stopped;
                Err(e)
            }
        }
    }

    async fn establish(self: &Arc<Self>) -> Result<Arc<dyn Connection>, SessionError> {
        if let Some(dir) = &self.settings.data_dir {
            if !dir.as_os_str().is_empty() && !tokio::fs::try_exists(dir).await.unwrap_or(false) {
                tokio::fs::create_dir_all(dir)
                    .await
                    .map_err(SessionError::Directory)?;
                info!("Created directory: {}", dir.display());
            }
        }

        let loaded = self.registry.load().map_err(SessionError::Handlers)?;
        info!("Handlers loaded successfully ({} commands)", loaded);

        let credentials = self.store.load().await.map_err(SessionError::Credentials)?;

        debug!("Waiting before login");
        self.settings.pacing.sleep_jitter().await;

        let connection = self
            .connector
            .login(credentials, &self.settings.login_options)
            .await
            .map_err(|e| {
                error!("Login error: {}", e);
                if e.needs_verification() {
                    error!("Account needs verification. Please check your account and try again.");
                    SessionError::VerificationRequired(e)
                } else {
                    SessionError::Auth(e)
                }
            })?;

        if self.settings.auto_save_state {
            if let Err(e) = self.store.save(&connection.app_state()).await {
                warn!("Error saving AppState: {}", e);
            }
        }

        let events = match connection.listen().await {
            Ok(events) => events,
            Err(e) => {
                if let Err(logout_err) = connection.logout().await {
                    warn!("Logout after failed listen also failed: {}", logout_err);
                }
                return Err(SessionError::Transport(e));
            }
        };

        let id = Uuid::new_v4();
        let user_id = connection.current_user_id();
        let listener = tokio::spawn(self.dispatcher.clone().run(connection.clone(), events));
        let heartbeat = tokio::spawn(heartbeat_loop(
            Arc::downgrade(self),
            id,
            connection.clone(),
            self.settings.heartbeat_interval,
        ));

        info!("Bot successfully connected!");
        info!("Logged in as ID: {}", user_id);

        let mut slot = self.slot.write().await;
        slot.session = Some(Session {
            id,
            connection: connection.clone(),
            user_id,
            started_at: Utc::now(),
            listener,
            heartbeat,
        });
        slot.state = SessionState::Running;
        Ok(connection)
    }

    /// Log out and drop the session. Returns false when nothing was running.
    pub async fn stop(&self) -> bool {
        self.stop_requested.store(true, Ordering::SeqCst);
        let session = {
            let mut slot = self.slot.write().await;
            slot.state = SessionState::Stopped;
            slot.session.take()
        };

        let Some(session) = session else {
            info!("No bot instance to stop");
            return false;
        };

        info!("Stopping bot...");
        session.heartbeat.abort();
        session.listener.abort();
        if let Err(e) = session.connection.logout().await {
            warn!("Logout failed: {}", e);
        }
        info!("Bot stopped");
        true
    }

    /// Stop (if running), let things settle, then start again
    pub async fn restart(self: &Arc<Self>) -> Result<Arc<dyn Connection>, SessionError> {
        if self.is_running().await {
            self.stop().await;
            tokio::time::sleep(self.settings.restart_settle).await;
        }
        self.start().await
    }

    pub async fn is_running(&self) -> bool {
        self.slot.read().await.session.is_some()
    }

    /// The active connection, if any
    pub async fn connection(&self) -> Option<Arc<dyn Connection>> {
        self.slot
            .read()
            .await
            .session
            .as_ref()
            .map(|s| s.connection.clone())
    }

    pub async fn state(&self) -> SessionState {
        self.slot.read().await.state
    }

    pub async fn status(&self) -> SessionStatus {
        let slot = self.slot.read().await;
        let session = slot.session.as_ref();
        SessionStatus {
            state: slot.state,
            running: session.is_some(),
            user_id: session.map(|s| s.user_id.clone()),
            started_at: session.map(|s| s.started_at),
            uptime_secs: session.map(|s| (Utc::now() - s.started_at).num_seconds()),
        }
    }

    /// Drop the session the heartbeat found dead, unless it was already replaced
    async fn clear_dead_session(&self, id: Uuid) -> bool {
        let session = {
            let mut slot = self.slot.write().await;
            match &slot.session {
                Some(s) if s.id == id => {
                    slot.state = SessionState::Reconnecting;
                    slot.session.take()
                }
                _ => None,
            }
        };

        match session {
            Some(session) => {
                session.listener.abort();
                true
            }
            None => false,
        }
    }

    async fn is_current(&self, id: Uuid) -> bool {
        matches!(&self.slot.read().await.session, Some(s) if s.id == id)
    }

    /// Spawn a restart unless one is already in flight
    fn spawn_reconnect(self: &Arc<Self>) -> bool {
        if self.reconnecting.swap(true, Ordering::SeqCst) {
            debug!("Reconnect already in progress");
            return false;
        }

        let this = Arc::clone(self);
        tokio::spawn(async move {
            if this.stop_requested.load(Ordering::SeqCst) {
                info!("Bot was stopped, skipping reconnect");
            } else {
                match this.start_gated().await {
                    Ok(_) if this.stop_requested.load(Ordering::SeqCst) => {
                        info!("Bot was stopped while reconnecting, shutting the new session down");
                        this.stop().await;
                    }
                    Ok(_) => info!("Reconnected"),
                    Err(e) => error!("Reconnect failed: {}", e),
                }
            }
            this.reconnecting.store(false, Ordering::SeqCst);
        });
        true
    }
}

async fn heartbeat_loop(
    supervisor: Weak<SessionSupervisor>,
    session_id: Uuid,
    connection: Arc<dyn Connection>,
    period: Duration,
) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        interval.tick().await;

        let Some(supervisor) = supervisor.upgrade() else {
            return;
        };
        if !supervisor.is_current(session_id).await {
            return;
        }

        debug!("Sending heartbeat to keep connection alive...");
        let Err(e) = connection.thread_list(1, None, &[]).await else {
            continue;
        };

        error!("Heartbeat error: {}", e);
        if e.is_connection_closed() {
            info!("Connection closed, attempting to reconnect...");
            if supervisor.clear_dead_session(session_id).await {
                supervisor.spawn_reconnect();
            }
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::errors::{AuthError, CommandError, StorageError, TransportError};
    use crate::application::messaging::{MessageRouter, ReactionHandler};
    use crate::domain::entities::{Command, CommandContext, CommandHandler, Credentials, InboundEvent};
    use crate::domain::traits::StaticCommands;
    use crate::infrastructure::adapters::memory::MemoryConnector;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    struct Echo;

    #[async_trait]
    impl CommandHandler for Echo {
        async fn execute(&self, ctx: &CommandContext, args: &[String]) -> Result<(), CommandError> {
            ctx.reply(args.join(" ")).await
        }
    }

    fn echo() -> Command {
        Command::new("echo").with_handler(Echo)
    }

    #[derive(Default)]
    struct FakeStore {
        missing: bool,
        saved: StdMutex<Vec<Credentials>>,
    }

    #[async_trait]
    impl CredentialStore for FakeStore {
        async fn load(&self) -> Result<Credentials, StorageError> {
            if self.missing {
                return Err(StorageError::NotFound("appstate.json".into()));
            }
            Ok(Credentials::new(serde_json::json!([{"key": "c_user", "value": "42"}])))
        }

        async fn save(&self, credentials: &Credentials) -> Result<(), StorageError> {
            self.saved.lock().unwrap().push(credentials.clone());
            Ok(())
        }
    }

    fn supervisor(connector: Arc<MemoryConnector>, store: Arc<FakeStore>) -> Arc<SessionSupervisor> {
        supervisor_with(connector, store, Pacing::instant())
    }

    /// `pacing` only governs the supervisor's pre-login delay
    fn supervisor_with(
        connector: Arc<MemoryConnector>,
        store: Arc<FakeStore>,
        pacing: Pacing,
    ) -> Arc<SessionSupervisor> {
        let registry = Arc::new(CommandRegistry::new(Arc::new(StaticCommands::new(vec![echo]))));
        let router = MessageRouter::new(registry, "!").with_pacing(Pacing::instant());
        let dispatcher = Arc::new(EventDispatcher::new(
            router,
            ReactionHandler::new(0.0).with_pacing(Pacing::instant()),
        ));
        SessionSupervisor::new(
            connector,
            store,
            dispatcher,
            SupervisorSettings {
                pacing,
                ..Default::default()
            },
        )
    }

    /// Let spawned tasks run; the paused clock jumps ahead once they are idle
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn start_logs_in_and_saves_state() {
        let connector = Arc::new(MemoryConnector::new("42"));
        let store = Arc::new(FakeStore::default());
        let sup = supervisor(connector.clone(), store.clone());

        sup.start().await.unwrap();

        assert!(sup.is_running().await);
        assert_eq!(sup.state().await, SessionState::Running);
        assert_eq!(connector.login_count(), 1);
        assert_eq!(store.saved.lock().unwrap().len(), 1);

        let options = connector.last_options().unwrap();
        assert!(options.listen_events && options.auto_reconnect);
        assert!(!options.update_presence && !options.self_listen);

        let status = sup.status().await;
        assert!(status.running);
        assert_eq!(status.user_id.as_deref(), Some("42"));
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_reuses_session() {
        let connector = Arc::new(MemoryConnector::new("42"));
        let sup = supervisor(connector.clone(), Arc::new(FakeStore::default()));

        let (a, b) = tokio::join!(sup.start(), sup.start());
        let c = sup.start().await.unwrap();

        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &c));
        assert_eq!(connector.login_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_credentials_fail_start() {
        let connector = Arc::new(MemoryConnector::new("42"));
        let store = Arc::new(FakeStore {
            missing: true,
            ..Default::default()
        });
        let sup = supervisor(connector.clone(), store);

        let err = sup.start().await.unwrap_err();

        assert!(matches!(err, SessionError::Credentials(_)));
        assert!(err.to_string().starts_with("Failed to load Credentials"));
        assert_eq!(connector.login_count(), 0);
        assert_eq!(sup.state().await, SessionState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn checkpoint_is_reported_as_verification() {
        let connector = Arc::new(MemoryConnector::new("42"));
        connector.fail_next_login(AuthError::new("Error retrieving userID. checkpoint detected"));
        connector.fail_next_login(AuthError::new("bad cookies"));
        let sup = supervisor(connector.clone(), Arc::new(FakeStore::default()));

        let first = sup.start().await.unwrap_err();
        let second = sup.start().await.unwrap_err();

        assert!(first.is_verification_required());
        assert!(matches!(second, SessionError::Auth(_)));
        assert!(!sup.is_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn events_flow_to_commands() {
        let connector = Arc::new(MemoryConnector::new("42"));
        let sup = supervisor(connector.clone(), Arc::new(FakeStore::default()));
        sup.start().await.unwrap();

        let conn = connector.last_connection().unwrap();
        conn.push_listen_error(TransportError::Other("hiccup".into())).await;
        assert!(conn.push_event(InboundEvent::message("t", "u", "!echo hello world")).await);
        settle().await;

        assert_eq!(conn.sent_texts(), vec!["hello world"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_logs_out_and_clears() {
        let connector = Arc::new(MemoryConnector::new("42"));
        let sup = supervisor(connector.clone(), Arc::new(FakeStore::default()));
        sup.start().await.unwrap();

        assert!(sup.stop().await);
        assert!(!sup.stop().await);

        assert!(connector.last_connection().unwrap().is_logged_out());
        assert!(sup.connection().await.is_none());
        assert_eq!(sup.state().await, SessionState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_establishes_a_new_connection() {
        let connector = Arc::new(MemoryConnector::new("42"));
        let sup = supervisor(connector.clone(), Arc::new(FakeStore::default()));
        let first = sup.start().await.unwrap();

        let second = sup.restart().await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(connector.login_count(), 2);
        assert!(connector.connections()[0].is_logged_out());
    }

    #[tokio::test(start_paused = true)]
    async fn healthy_heartbeat_keeps_session() {
        let connector = Arc::new(MemoryConnector::new("42"));
        let sup = supervisor(connector.clone(), Arc::new(FakeStore::default()));
        sup.start().await.unwrap();
        let conn = connector.last_connection().unwrap();

        tokio::time::sleep(Duration::from_secs(181)).await;
        settle().await;

        assert_eq!(conn.thread_list_calls(), 3);
        assert_eq!(connector.login_count(), 1);
        assert!(sup.is_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn other_heartbeat_errors_do_not_reconnect() {
        let connector = Arc::new(MemoryConnector::new("42"));
        let sup = supervisor(connector.clone(), Arc::new(FakeStore::default()));
        sup.start().await.unwrap();
        let conn = connector.last_connection().unwrap();
        conn.fail_thread_list(TransportError::Other("rate limited".into()));

        tokio::time::sleep(Duration::from_secs(121)).await;
        settle().await;

        assert_eq!(conn.thread_list_calls(), 2);
        assert_eq!(connector.login_count(), 1);
        assert!(sup.is_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_connection_triggers_one_reconnect() {
        let connector = Arc::new(MemoryConnector::new("42"));
        let sup = supervisor(connector.clone(), Arc::new(FakeStore::default()));
        sup.start().await.unwrap();
        let first = connector.last_connection().unwrap();
        first.fail_thread_list(TransportError::Other("Connection closed.".into()));

        tokio::time::sleep(Duration::from_secs(61)).await;
        settle().await;

        assert_eq!(connector.login_count(), 2);
        assert!(sup.is_running().await);
        let current = sup.connection().await.unwrap();
        let second: Arc<dyn Connection> = connector.last_connection().unwrap();
        assert!(Arc::ptr_eq(&current, &second));

        // The dead session's heartbeat is gone: no further checks on it
        tokio::time::sleep(Duration::from_secs(120)).await;
        settle().await;
        assert_eq!(first.thread_list_calls(), 1);
        assert_eq!(connector.login_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_reconnects_are_suppressed() {
        let connector = Arc::new(MemoryConnector::new("42"));
        let sup = supervisor(connector.clone(), Arc::new(FakeStore::default()));

        sup.reconnecting.store(true, Ordering::SeqCst);
        assert!(!sup.spawn_reconnect());
        sup.reconnecting.store(false, Ordering::SeqCst);
        assert!(sup.spawn_reconnect());
        settle().await;

        assert_eq!(connector.login_count(), 1);
        assert!(!sup.reconnecting.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_reconnect_is_not_undone() {
        let login_delay = Pacing {
            jitter_window: Duration::from_secs(5)..Duration::from_secs(5),
            ..Pacing::instant()
        };
        let connector = Arc::new(MemoryConnector::new("42"));
        let sup = supervisor_with(connector.clone(), Arc::new(FakeStore::default()), login_delay);
        sup.start().await.unwrap();
        connector
            .last_connection()
            .unwrap()
            .fail_thread_list(TransportError::Other("Connection closed.".into()));

        // Heartbeat fails at 60s; the reconnect then waits 5s before logging in
        tokio::time::sleep(Duration::from_secs(62)).await;
        assert_eq!(sup.state().await, SessionState::Starting);
        assert!(!sup.stop().await);

        tokio::time::sleep(Duration::from_secs(10)).await;
        settle().await;

        assert_eq!(connector.login_count(), 2);
        assert!(connector.last_connection().unwrap().is_logged_out());
        assert!(!sup.is_running().await);
        assert_eq!(sup.state().await, SessionState::Stopped);
        assert!(!sup.reconnecting.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_after_stop_is_skipped() {
        let connector = Arc::new(MemoryConnector::new("42"));
        let sup = supervisor(connector.clone(), Arc::new(FakeStore::default()));
        sup.start().await.unwrap();
        sup.stop().await;

        assert!(sup.spawn_reconnect());
        settle().await;
        assert_eq!(connector.login_count(), 1);
        assert!(!sup.is_running().await);

        // An explicit start clears the stop request
        sup.start().await.unwrap();
        assert!(sup.spawn_reconnect());
        settle().await;
        assert_eq!(connector.login_count(), 2);
        assert!(sup.is_running().await);
    }
}
