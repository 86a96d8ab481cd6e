//! Message router - Turns one inbound text message into at most one command run

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use super::pacing::Pacing;
use super::parser::{MessageParser, ParsedCommand};
use crate::application::services::CommandRegistry;
use crate::domain::entities::{CommandContext, MessageEvent};
use crate::domain::traits::Connection;

pub const COMMANDS_UNAVAILABLE: &str =
    "Bot is experiencing issues loading commands. Please try again later.";
pub const COMMAND_FAILED: &str = "There was an error executing that command.";

/// What the router did with a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// No commands could be loaded; the user was told so
    Unavailable,
    /// Not addressed to the bot
    Ignored,
    /// No such command; `replied` tells whether a notice was sent
    Unknown { name: String, replied: bool },
    Executed { name: String },
    Failed { name: String },
}

pub struct MessageRouter {
    registry: Arc<CommandRegistry>,
    parser: MessageParser,
    typing_indicator: bool,
    pacing: Pacing,
}

impl MessageRouter {
    pub fn new(registry: Arc<CommandRegistry>, prefix: impl Into<String>) -> Self {
        Self {
            registry,
            parser: MessageParser::new(prefix),
            typing_indicator: false,
            pacing: Pacing::default(),
        }
    }

    pub fn with_typing_indicator(mut self, enabled: bool) -> Self {
        self.typing_indicator = enabled;
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn prefix(&self) -> &str {
        self.parser.policy().as_str()
    }

    /// Route one message. Never fails: command errors end up as a chat reply.
    pub async fn handle(&self, connection: &Arc<dyn Connection>, event: &MessageEvent) -> RouteOutcome {
        debug!("Received message from {}: {}", event.sender_id, event.body);

        if self.registry.is_empty() {
            info!("No commands loaded, attempting to load commands again...");
            if let Err(e) = self.registry.load() {
                warn!("Reloading commands failed: {}", e);
            }
            if self.registry.is_empty() {
                self.reply(connection, event, COMMANDS_UNAVAILABLE).await;
                return RouteOutcome::Unavailable;
            }
        }

        if self.typing_indicator {
            self.emulate_typing(connection, event).await;
        }

        let Some(ParsedCommand { name, args }) = self.parser.parse(&event.body) else {
            debug!("Message does not start with prefix \"{}\"", self.prefix());
            return RouteOutcome::Ignored;
        };

        debug!("Command detected: \"{}\" with args: {:?}", name, args);

        let Some(command) = self.registry.resolve(&name) else {
            debug!("Command not found: {}", name);
            let replied = !self.parser.policy().is_bare() || event.is_self_thread();
            if replied {
                let notice = format!(
                    "Unknown command: {}. Type {}help for a list of commands.",
                    name,
                    self.prefix()
                );
                self.reply(connection, event, &notice).await;
            }
            return RouteOutcome::Unknown { name, replied };
        };

        let ctx = CommandContext {
            connection: connection.clone(),
            event: event.clone(),
            registry: self.registry.clone(),
            prefix: self.prefix().to_string(),
        };

        info!("Executing command: {}", command.name);
        let result = AssertUnwindSafe(command.execute(&ctx, &args))
            .catch_unwind()
            .await;
        match result {
            Ok(Ok(())) => {
                debug!("Command {} executed successfully", command.name);
                RouteOutcome::Executed { name }
            }
            Ok(Err(e)) => {
                error!("Error executing command '{}': {}", command.name, e);
                self.reply(connection, event, COMMAND_FAILED).await;
                RouteOutcome::Failed { name }
            }
            Err(panic) => {
                error!("Command '{}' panicked: {}", command.name, panic_message(&*panic));
                self.reply(connection, event, COMMAND_FAILED).await;
                RouteOutcome::Failed { name }
            }
        }
    }

    async fn emulate_typing(&self, connection: &Arc<dyn Connection>, event: &MessageEvent) {
        if let Err(e) = connection.send_typing_indicator(&event.thread_id).await {
            warn!("Error sending typing indicator: {}", e);
        }
        self.pacing.sleep_typing(event.body.chars().count()).await;
    }

    async fn reply(&self, connection: &Arc<dyn Connection>, event: &MessageEvent, text: &str) {
        if let Err(e) = connection.send_message(text, &event.thread_id).await {
            warn!("[{}] Failed to send reply: {}", event.thread_id, e);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
