//! In-memory connector for tests and local experiments
//!
//! Records everything the bot sends, lets callers inject events and script
//! login / heartbeat failures.
//!
//! Public on purpose: the integration tests under `tests/` only see the
//! crate's public API, and crates that add their own commands can drive them
//! through a full `SessionSupervisor` the same way.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::application::errors::{AuthError, TransportError};
use crate::domain::entities::{Credentials, InboundEvent};
use crate::domain::traits::{Connection, Connector, EventStream, LoginOptions, ThreadInfo};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A message the bot sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub thread_id: String,
    pub text: String,
}

/// Connection that lives entirely in memory
pub struct MemoryConnection {
    user_id: String,
    credentials: Mutex<Credentials>,
    sent: Mutex<Vec<SentMessage>>,
    typing: Mutex<Vec<String>>,
    events: Mutex<Option<mpsc::Sender<Result<InboundEvent, TransportError>>>>,
    thread_list_error: Mutex<Option<TransportError>>,
    thread_list_calls: AtomicUsize,
    typing_fails: AtomicBool,
    sends_fail: AtomicBool,
    logged_out: AtomicBool,
}

impl MemoryConnection {
    pub fn new(user_id: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            user_id: user_id.into(),
            credentials: Mutex::new(credentials),
            sent: Mutex::new(Vec::new()),
            typing: Mutex::new(Vec::new()),
            events: Mutex::new(None),
            thread_list_error: Mutex::new(None),
            thread_list_calls: AtomicUsize::new(0),
            typing_fails: AtomicBool::new(false),
            sends_fail: AtomicBool::new(false),
            logged_out: AtomicBool::new(false),
        }
    }

    /// Feed an event to whoever is listening. Returns false if nobody is.
    pub async fn push_event(&self, event: InboundEvent) -> bool {
        self.push(Ok(event)).await
    }

    pub async fn push_listen_error(&self, error: TransportError) -> bool {
        self.push(Err(error)).await
    }

    async fn push(&self, item: Result<InboundEvent, TransportError>) -> bool {
        let sender = lock(&self.events).clone();
        match sender {
            Some(tx) => tx.send(item).await.is_ok(),
            None => false,
        }
    }

    /// Drop the event sender, ending the listener's stream
    pub fn close_stream(&self) {
        lock(&self.events).take();
    }

    pub fn sent_messages(&self) -> Vec<SentMessage> {
        lock(&self.sent).clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        lock(&self.sent).iter().map(|m| m.text.clone()).collect()
    }

    pub fn typing_indicators(&self) -> Vec<String> {
        lock(&self.typing).clone()
    }

    pub fn thread_list_calls(&self) -> usize {
        self.thread_list_calls.load(Ordering::SeqCst)
    }

    /// Make every following `thread_list` call fail with this error
    pub fn fail_thread_list(&self, error: TransportError) {
        *lock(&self.thread_list_error) = Some(error);
    }

    pub fn fail_typing(&self, fail: bool) {
        self.typing_fails.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sends(&self, fail: bool) {
        self.sends_fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_app_state(&self, credentials: Credentials) {
        *lock(&self.credentials) = credentials;
    }

    pub fn is_logged_out(&self) -> bool {
        self.logged_out.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn send_message(&self, text: &str, thread_id: &str) -> Result<String, TransportError> {
        if self.sends_fail.load(Ordering::SeqCst) {
            return Err(TransportError::Other("send rejected".to_string()));
        }
        let mut sent = lock(&self.sent);
        sent.push(SentMessage {
            thread_id: thread_id.to_string(),
            text: text.to_string(),
        });
        Ok(format!("mid.{}", sent.len()))
    }

    async fn send_typing_indicator(&self, thread_id: &str) -> Result<(), TransportError> {
        if self.typing_fails.load(Ordering::SeqCst) {
            return Err(TransportError::Other("typing indicator rejected".to_string()));
        }
        lock(&self.typing).push(thread_id.to_string());
        Ok(())
    }

    async fn listen(&self) -> Result<EventStream, TransportError> {
        let (tx, rx) = mpsc::channel(256);
        *lock(&self.events) = Some(tx);
        Ok(rx)
    }

    async fn logout(&self) -> Result<(), TransportError> {
        self.logged_out.store(true, Ordering::SeqCst);
        self.close_stream();
        Ok(())
    }

    fn app_state(&self) -> Credentials {
        lock(&self.credentials).clone()
    }

    fn current_user_id(&self) -> String {
        self.user_id.clone()
    }

    async fn thread_list(
        &self,
        limit: usize,
        _cursor: Option<&str>,
        _tags: &[String],
    ) -> Result<Vec<ThreadInfo>, TransportError> {
        self.thread_list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = lock(&self.thread_list_error).clone() {
            return Err(error);
        }
        Ok((0..limit.min(1))
            .map(|_| ThreadInfo {
                thread_id: self.user_id.clone(),
                name: None,
            })
            .collect())
    }
}

/// Connector handing out `MemoryConnection`s
#[derive(Default)]
pub struct MemoryConnector {
    user_id: String,
    login_failures: Mutex<VecDeque<AuthError>>,
    logins: AtomicUsize,
    connections: Mutex<Vec<Arc<MemoryConnection>>>,
    options: Mutex<Vec<LoginOptions>>,
}

impl MemoryConnector {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    /// Queue a failure for the next login attempt
    pub fn fail_next_login(&self, error: AuthError) {
        lock(&self.login_failures).push_back(error);
    }

    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn connections(&self) -> Vec<Arc<MemoryConnection>> {
        lock(&self.connections).clone()
    }

    pub fn last_connection(&self) -> Option<Arc<MemoryConnection>> {
        lock(&self.connections).last().cloned()
    }

    pub fn last_options(&self) -> Option<LoginOptions> {
        lock(&self.options).last().cloned()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn login(
        &self,
        credentials: Credentials,
        options: &LoginOptions,
    ) -> Result<Arc<dyn Connection>, AuthError> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        lock(&self.options).push(options.clone());

        if let Some(error) = lock(&self.login_failures).pop_front() {
            return Err(error);
        }

        let connection = Arc::new(MemoryConnection::new(self.user_id.clone(), credentials));
        lock(&self.connections).push(connection.clone());
        Ok(connection)
    }
}
