//! Process-level startup supervision: bounded retries with linear backoff

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use super::session_supervisor::SessionSupervisor;
use crate::application::errors::SessionError;
use crate::domain::traits::Connection;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Wait after the n-th failure is `base_delay * n`
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Try to start the bot up to `max_retries` times. After the last failure the
/// bot stays idle for the rest of the process; the error is returned.
pub async fn run_with_retries(
    supervisor: &Arc<SessionSupervisor>,
    policy: &RetryPolicy,
) -> Result<Arc<dyn Connection>, SessionError> {
    let max = policy.max_retries.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let err = match supervisor.start().await {
            Ok(connection) => return Ok(connection),
            Err(e) => e,
        };

        error!("Bot crashed (attempt {}/{}): {}", attempt, max, err);
        if err.is_verification_required() {
            error!("Login is blocked by an account checkpoint; retrying is unlikely to help");
        }

        if attempt >= max {
            error!("Maximum retries reached. Please check your account.");
            return Err(err);
        }

        let wait = policy.delay_after(attempt);
        info!("Waiting {} seconds before retry...", wait.as_secs());
        tokio::time::sleep(wait).await;
    }
}
