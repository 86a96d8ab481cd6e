use async_trait::async_trait;

use super::http_client;
use crate::application::errors::CommandError;
use crate::domain::entities::{Command, CommandContext, CommandHandler};

const NM_URL: &str = "https://api-nm.vercel.app/decrypt-latest";

pub fn command() -> Command {
    Command::new("nm")
        .with_description("Decrypt content using the NM API")
        .with_usage("nm [encrypted content]")
        .with_handler(NmDecrypt::new(NM_URL))
}

pub struct NmDecrypt {
    endpoint: String,
}

impl NmDecrypt {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    async fn decrypt(&self, content: &str) -> Result<String, reqwest::Error> {
        http_client()?
            .get(&self.endpoint)
            .query(&[("content", content)])
            .send()
            .await?
            .text()
            .await
    }
}

/// JSON bodies are pretty-printed, anything else is passed through
fn format_response(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
            let pretty = serde_json::to_string_pretty(&value).unwrap_or_else(|_| trimmed.to_string());
            return format!("API Response:\n{}", pretty);
        }
    }
    format!("Result: {}", body)
}

#[async_trait]
impl CommandHandler for NmDecrypt {
    async fn execute(&self, ctx: &CommandContext, args: &[String]) -> Result<(), CommandError> {
        let content = args.join(" ");
        if content.is_empty() {
            return ctx.reply("Please provide encrypted content to decrypt.").await;
        }

        match self.decrypt(&content).await {
            Ok(body) => ctx.reply(format_response(&body)).await,
            Err(e) => {
                tracing::error!("Error in nm command: {}", e);
                ctx.reply(format!("Error: {}", e)).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::context;

    #[test]
    fn json_is_pretty_printed() {
        assert_eq!(format_response(" {\"a\":1} "), "API Response:\n{\n  \"a\": 1\n}");
    }

    #[test]
    fn text_and_broken_json_pass_through() {
        assert_eq!(format_response("hello"), "Result: hello");
        assert_eq!(format_response("{half"), "Result: {half");
    }

    #[tokio::test]
    async fn empty_input_prompts_without_network() {
        let (conn, ctx) = context("!", "!nm");

        NmDecrypt::new("http://127.0.0.1:9").execute(&ctx, &[]).await.unwrap();

        assert_eq!(conn.sent_texts(), vec!["Please provide encrypted content to decrypt."]);
    }

    #[tokio::test]
    async fn unreachable_service_reports_error() {
        let (conn, ctx) = context("!", "!nm abc");

        NmDecrypt::new("http://127.0.0.1:9")
            .execute(&ctx, &["abc".to_string()])
            .await
            .unwrap();

        let sent = conn.sent_texts();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with("Error: "), "unexpected reply {:?}", sent[0]);
    }
}
