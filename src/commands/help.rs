use async_trait::async_trait;
use std::fmt::Write as _;
use tracing::warn;

use crate::application::errors::CommandError;
use crate::domain::entities::{Command, CommandContext, CommandHandler};

pub fn command() -> Command {
    Command::new("help")
        .with_description("List all available commands")
        .with_usage("help [command]")
        .with_handler(Help)
}

pub struct Help;

impl Help {
    fn describe(ctx: &CommandContext, command: &Command) -> String {
        let prefix = &ctx.prefix;
        let mut text = format!("📌 Command: {}{}\n", prefix, command.name);
        if let Some(description) = &command.description {
            let _ = writeln!(text, "📝 Description: {}", description);
        }
        if let Some(usage) = &command.usage {
            let _ = writeln!(text, "📋 Usage: {}{}", prefix, usage);
        }
        text
    }

    fn list(ctx: &CommandContext, mut text: String) -> String {
        let prefix = &ctx.prefix;
        for command in ctx.registry.commands() {
            let _ = writeln!(
                text,
                "{}{} - {}",
                prefix,
                command.name,
                command.description.as_deref().unwrap_or("No description")
            );
        }
        let _ = write!(
            text,
            "\nType {}help [command] for more info about a specific command.",
            prefix
        );
        if prefix.is_empty() {
            text.push_str("\nNo prefix needed: send the command name on its own.");
        }
        text
    }
}

#[async_trait]
impl CommandHandler for Help {
    async fn execute(&self, ctx: &CommandContext, args: &[String]) -> Result<(), CommandError> {
        // Pick up commands added since the last load
        if let Err(e) = ctx.registry.load() {
            warn!("Could not refresh commands for help: {}", e);
        }

        let header = match args.first() {
            Some(requested) => match ctx.registry.resolve(requested) {
                Some(command) => return ctx.reply(Self::describe(ctx, &command)).await,
                None => format!(
                    "Command \"{}\" not found. Here are the available commands:\n\n",
                    requested.to_lowercase()
                ),
            },
            None => "📋 Available Commands:\n\n".to_string(),
        };

        ctx.reply(Self::list(ctx, header)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::context;

    #[tokio::test]
    async fn lists_every_command() {
        let (conn, ctx) = context("!", "!help");

        Help.execute(&ctx, &[]).await.unwrap();

        let text = &conn.sent_texts()[0];
        assert!(text.starts_with("📋 Available Commands:"));
        for name in ["echo", "help", "ip", "nm", "weather"] {
            assert!(text.contains(&format!("!{} - ", name)), "missing {} in\n{}", name, text);
        }
        assert!(text.ends_with("Type !help [command] for more info about a specific command."));
        assert!(!text.contains("No prefix needed"));
    }

    #[tokio::test]
    async fn describes_one_command() {
        let (conn, ctx) = context("!", "!help ECHO");

        Help.execute(&ctx, &["ECHO".to_string()]).await.unwrap();

        assert_eq!(
            conn.sent_texts(),
            vec!["📌 Command: !echo\n📝 Description: Repeats what you say\n📋 Usage: !echo [text to echo]\n"]
        );
    }

    #[tokio::test]
    async fn unknown_topic_falls_back_to_list() {
        let (conn, ctx) = context("", "help dance");

        Help.execute(&ctx, &["dance".to_string()]).await.unwrap();

        let text = &conn.sent_texts()[0];
        assert!(text.starts_with("Command \"dance\" not found."));
        assert!(text.contains("\necho - Repeats what you say\n"));
        assert!(text.ends_with(
            "Type help [command] for more info about a specific command.\nNo prefix needed: send the command name on its own."
        ));
    }
}
