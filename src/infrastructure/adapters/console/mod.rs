//! Console adapter for development/testing
//!
//! Each stdin line becomes a message event in a direct thread with the bot.
//! Lines starting with `{` are parsed as raw platform events instead, so
//! reactions and presence updates can be simulated too.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::application::errors::{AuthError, TransportError};
use crate::domain::entities::{Credentials, InboundEvent};
use crate::domain::traits::{Connection, Connector, EventStream, LoginOptions, ThreadInfo};

const CONSOLE_USER: &str = "console";

/// Connector that "logs in" to the local terminal
#[derive(Default)]
pub struct ConsoleConnector;

impl ConsoleConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for ConsoleConnector {
    async fn login(
        &self,
        credentials: Credentials,
        options: &LoginOptions,
    ) -> Result<Arc<dyn Connection>, AuthError> {
        if credentials.is_empty() {
            return Err(AuthError::new("empty AppState"));
        }
        tracing::info!("Starting console bot (dev mode, log level {})", options.log_level);
        Ok(Arc::new(ConsoleConnection {
            credentials: Mutex::new(credentials),
            reader: Mutex::new(None),
        }))
    }
}

pub struct ConsoleConnection {
    credentials: Mutex<Credentials>,
    reader: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

fn parse_line(line: &str) -> Result<InboundEvent, TransportError> {
    if line.starts_with('{') {
        return serde_json::from_str(line)
            .map_err(|e| TransportError::Other(format!("bad event JSON: {}", e)));
    }
    Ok(InboundEvent::message(CONSOLE_USER, CONSOLE_USER, line))
}

#[async_trait]
impl Connection for ConsoleConnection {
    async fn send_message(&self, text: &str, _thread_id: &str) -> Result<String, TransportError> {
        println!("[BOT] {}", text);
        Ok("console_msg".to_string())
    }

    async fn send_typing_indicator(&self, _thread_id: &str) -> Result<(), TransportError> {
        println!("[BOT] ...");
        Ok(())
    }

    async fn listen(&self) -> Result<EventStream, TransportError> {
        let (tx, rx) = mpsc::channel(64);
        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        let _ = tx.send(Err(TransportError::Other(e.to_string()))).await;
                        break;
                    }
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if tx.send(parse_line(line)).await.is_err() {
                    break;
                }
            }
        });

        let previous = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(reader);
        if let Some(previous) = previous {
            previous.abort();
        }
        Ok(rx)
    }

    async fn logout(&self) -> Result<(), TransportError> {
        if let Some(reader) = self.reader.lock().unwrap_or_else(PoisonError::into_inner).take() {
            reader.abort();
        }
        Ok(())
    }

    fn app_state(&self) -> Credentials {
        self.credentials
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn current_user_id(&self) -> String {
        CONSOLE_USER.to_string()
    }

    async fn thread_list(
        &self,
        limit: usize,
        _cursor: Option<&str>,
        _tags: &[String],
    ) -> Result<Vec<ThreadInfo>, TransportError> {
        Ok(std::iter::once(ThreadInfo {
            thread_id: CONSOLE_USER.to_string(),
            name: Some("console".to_string()),
        })
        .take(limit)
        .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_are_direct_messages() {
        assert_eq!(
            parse_line("!echo hi").unwrap(),
            InboundEvent::message("console", "console", "!echo hi")
        );
    }

    #[test]
    fn json_lines_are_raw_events() {
        let event = parse_line(r#"{"type":"message_reaction","threadID":"console","reaction":"👍"}"#).unwrap();
        assert!(matches!(event, InboundEvent::Reaction { .. }));
        assert!(parse_line("{oops").is_err());
    }

    #[tokio::test]
    async fn empty_credentials_are_rejected() {
        let result = ConsoleConnector::new()
            .login(Credentials::default(), &LoginOptions::default())
            .await;
        assert!(result.is_err());
    }
}
