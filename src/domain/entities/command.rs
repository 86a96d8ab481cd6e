use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::application::errors::CommandError;
use crate::application::services::CommandRegistry;
use crate::domain::entities::MessageEvent;
use crate::domain::traits::Connection;

/// Everything a command can touch while it runs
#[derive(Clone)]
pub struct CommandContext {
    pub connection: Arc<dyn Connection>,
    pub event: MessageEvent,
    pub registry: Arc<CommandRegistry>,
    pub prefix: String,
}

impl CommandContext {
    /// Reply in the thread the command came from
    pub async fn reply(&self, text: impl AsRef<str>) -> Result<(), CommandError> {
        self.connection
            .send_message(text.as_ref(), &self.event.thread_id)
            .await?;
        Ok(())
    }
}

/// Behaviour behind a command
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(&self, ctx: &CommandContext, args: &[String]) -> Result<(), CommandError>;
}

/// Represents a bot command
pub struct Command {
    pub name: String,
    pub description: Option<String>,
    pub usage: Option<String>,
    pub handler: Option<Arc<dyn CommandHandler>>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            usage: None,
            handler: None,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    pub fn with_handler<H>(mut self, handler: H) -> Self
    where
        H: CommandHandler + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Registry key: names are matched case-insensitively
    pub fn key(&self) -> String {
        self.name.trim().to_lowercase()
    }

    pub fn validate(&self) -> Result<(), CommandError> {
        if self.name.trim().is_empty() {
            return Err(CommandError::InvalidDefinition(
                "command has no name".to_string(),
            ));
        }
        if self.handler.is_none() {
            return Err(CommandError::InvalidDefinition(format!(
                "command \"{}\" has no handler",
                self.name
            )));
        }
        Ok(())
    }

    pub async fn execute(&self, ctx: &CommandContext, args: &[String]) -> Result<(), CommandError> {
        match &self.handler {
            Some(handler) => handler.execute(ctx, args).await,
            None => Err(CommandError::InvalidDefinition(format!(
                "command \"{}\" has no handler",
                self.name
            ))),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("usage", &self.usage)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}
