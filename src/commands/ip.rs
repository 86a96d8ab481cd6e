use async_trait::async_trait;
use serde::Deserialize;

use super::http_client;
use crate::application::errors::CommandError;
use crate::domain::entities::{Command, CommandContext, CommandHandler};

const JSONIP_URL: &str = "https://jsonip.com";

pub fn command() -> Command {
    Command::new("ip")
        .with_description("Get IP address information using jsonip.com")
        .with_usage("ip")
        .with_handler(IpLookup::new(JSONIP_URL))
}

#[derive(Debug, Deserialize)]
struct IpInfo {
    ip: String,
}

pub struct IpLookup {
    endpoint: String,
}

impl IpLookup {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    async fn fetch(&self) -> Result<IpInfo, reqwest::Error> {
        http_client()?
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?
            .json::<IpInfo>()
            .await
    }
}

#[async_trait]
impl CommandHandler for IpLookup {
    async fn execute(&self, ctx: &CommandContext, _args: &[String]) -> Result<(), CommandError> {
        match self.fetch().await {
            Ok(info) => {
                ctx.reply(format!("📡 IP Information 📡\n\nIP Address: {}", info.ip))
                    .await
            }
            Err(e) => {
                tracing::error!("Error fetching IP information: {}", e);
                ctx.reply("An error occurred while fetching IP information. Please try again later.")
                    .await
            }
        }
    }
}
