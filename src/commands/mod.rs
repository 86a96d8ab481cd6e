//! Built-in commands
//!
//! Each module exposes a `command()` constructor. The registry calls them
//! again on every reload, so a reload always yields fresh definitions.

pub mod echo;
pub mod help;
pub mod ip;
pub mod nm;
pub mod weather;

use std::time::Duration;

use crate::domain::traits::StaticCommands;

/// Upper bound on any outbound HTTP call a command makes
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP client for command handlers; requests give up after [`HTTP_TIMEOUT`]
pub fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()
}

/// The command set shipped with the bot
pub fn builtin() -> StaticCommands {
    StaticCommands::new(vec![
        help::command,
        echo::command,
        weather::command,
        ip::command,
        nm::command,
    ])
}
