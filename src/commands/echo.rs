use async_trait::async_trait;

use crate::application::errors::CommandError;
use crate::domain::entities::{Command, CommandContext, CommandHandler};

pub fn command() -> Command {
    Command::new("echo")
        .with_description("Repeats what you say")
        .with_usage("echo [text to echo]")
        .with_handler(Echo)
}

pub struct Echo;

#[async_trait]
impl CommandHandler for Echo {
    async fn execute(&self, ctx: &CommandContext, args: &[String]) -> Result<(), CommandError> {
        let text = args.join(" ");
        if text.is_empty() {
            return ctx.reply("You need to provide some text for me to echo!").await;
        }
        ctx.reply(text).await
    }
}
