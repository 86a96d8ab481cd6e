use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use crate::application::errors::CommandError;
use crate::domain::entities::{Command, CommandContext, CommandHandler};

pub fn command() -> Command {
    Command::new("weather")
        .with_description("Checks the weather for a location")
        .with_usage("weather [location]")
        .with_handler(Weather::new(Arc::new(StaticWeather)))
}

/// Source of weather reports
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, location: &str) -> Result<String, CommandError>;
}

/// Placeholder provider until a real weather API is wired in. Answers after
/// a 2-3s delay, like a remote lookup would.
pub struct StaticWeather;

#[async_trait]
impl WeatherProvider for StaticWeather {
    async fn current(&self, _location: &str) -> Result<String, CommandError> {
        let delay = rand::thread_rng().gen_range(2000..3000);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok("Sunny, 25°C".to_string())
    }
}

pub struct Weather {
    provider: Arc<dyn WeatherProvider>,
}

impl Weather {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl CommandHandler for Weather {
    async fn execute(&self, ctx: &CommandContext, args: &[String]) -> Result<(), CommandError> {
        let location = args.join(" ");
        if location.is_empty() {
            return ctx
                .reply("Please specify a location to check the weather for!")
                .await;
        }

        ctx.reply(format!("Getting weather for {}...", location)).await?;

        match self.provider.current(&location).await {
            Ok(report) => ctx.reply(format!("Weather in {}: {}", location, report)).await,
            Err(e) => {
                tracing::error!("Weather command error: {}", e);
                ctx.reply(format!("Sorry, couldn't get weather for {}", location))
                    .await
            }
        }
    }
}
