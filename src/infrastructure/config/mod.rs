//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::application::errors::ConfigError;
use crate::application::messaging::Pacing;
use crate::application::services::{RetryPolicy, SupervisorSettings};
use crate::domain::traits::LoginOptions;

/// Bot configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub bot: BotConfig,
    pub session: SessionConfig,
    pub behavior: BehaviorConfig,
    pub startup: StartupConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotConfig {
    /// Display name only
    pub name: String,
    /// Command prefix; empty means every message is a command
    pub prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SessionConfig {
    pub credentials_path: PathBuf,
    pub log_level: String,
    pub user_agent: Option<String>,
    pub auto_mark_read: bool,
    pub auto_save_state: bool,
    pub heartbeat_interval_secs: u64,
    pub restart_settle_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BehaviorConfig {
    pub typing_indicator: bool,
    /// Chance of re-saving credentials after each event
    pub save_state_probability: f64,
    /// Chance of acknowledging a reaction
    pub reaction_reply_probability: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct StartupConfig {
    pub max_retries: u32,
    pub retry_base_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "messenger-bot".to_string(),
            prefix: "!".to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from("appstate.json"),
            log_level: "info".to_string(),
            user_agent: None,
            auto_mark_read: false,
            auto_save_state: true,
            heartbeat_interval_secs: 60,
            restart_settle_secs: 2,
        }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            typing_indicator: true,
            save_state_probability: 0.05,
            reaction_reply_probability: 0.3,
        }
    }
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_secs: 60,
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn load_env() -> Self {
        let mut config = Config::default();
        config.apply_env();
        config
    }

    /// Environment overrides: `BOT_PREFIX`, `BOT_CREDENTIALS`
    pub fn apply_env(&mut self) {
        if let Ok(prefix) = std::env::var("BOT_PREFIX") {
            self.bot.prefix = prefix;
        }
        if let Ok(path) = std::env::var("BOT_CREDENTIALS") {
            self.session.credentials_path = PathBuf::from(path);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, p) in [
            ("behavior.save-state-probability", self.behavior.save_state_probability),
            ("behavior.reaction-reply-probability", self.behavior.reaction_reply_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::InvalidValue(format!(
                    "{} must be between 0 and 1, got {}",
                    name, p
                )));
            }
        }
        if self.session.heartbeat_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "session.heartbeat-interval-secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn login_options(&self) -> LoginOptions {
        LoginOptions {
            log_level: self.session.log_level.clone(),
            auto_mark_read: self.session.auto_mark_read,
            user_agent: self.session.user_agent.clone(),
            ..LoginOptions::default()
        }
    }

    pub fn supervisor_settings(&self) -> SupervisorSettings {
        SupervisorSettings {
            login_options: self.login_options(),
            auto_save_state: self.session.auto_save_state,
            data_dir: self
                .session
                .credentials_path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from),
            heartbeat_interval: Duration::from_secs(self.session.heartbeat_interval_secs),
            restart_settle: Duration::from_secs(self.session.restart_settle_secs),
            pacing: Pacing::default(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.startup.max_retries,
            base_delay: Duration::from_secs(self.startup.retry_base_secs),
        }
    }
}
