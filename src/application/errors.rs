//! Application layer errors

use std::sync::OnceLock;

use regex_lite::Regex;
use thiserror::Error;

/// Session lifecycle errors, surfaced by `SessionSupervisor::start`
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to prepare data directory: {0}")]
    Directory(#[source] std::io::Error),

    #[error("Failed to load required handlers: {0}")]
    Handlers(#[source] CommandError),

    #[error("Failed to load Credentials: {0}")]
    Credentials(#[source] StorageError),

    #[error("Login failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Account needs verification: {0}")]
    VerificationRequired(AuthError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl SessionError {
    /// Retrying will not help until someone clears the checkpoint by hand
    pub fn is_verification_required(&self) -> bool {
        matches!(self, SessionError::VerificationRequired(_))
    }
}

/// Login rejected by the platform
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct AuthError {
    pub message: String,
}

impl AuthError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Whether the rejection is a checkpoint / login approval gate
    pub fn needs_verification(&self) -> bool {
        static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
        PATTERN
            .get_or_init(|| Regex::new(r"(?i)checkpoint|login approval").ok())
            .as_ref()
            .is_some_and(|re| re.is_match(&self.message))
    }
}

/// Errors raised by a live connection
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Only this class of failure triggers a supervised reconnect
    pub fn is_connection_closed(&self) -> bool {
        match self {
            TransportError::ConnectionClosed(_) => true,
            TransportError::Other(msg) => msg.contains("Connection closed"),
        }
    }
}

/// Command loading and execution errors
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid command definition: {0}")]
    InvalidDefinition(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
