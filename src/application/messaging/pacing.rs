//! Human-like pacing: typing delays, reply jitter and coin flips

use std::ops::Range;
use std::time::Duration;

use rand::Rng;

/// Timing knobs for the delays the bot inserts to look less automated
#[derive(Debug, Clone)]
pub struct Pacing {
    /// Typing time per character of the incoming message
    pub per_char: Duration,
    /// Upper bound on the length-proportional part of the typing delay
    pub typing_cap: Duration,
    /// Random extra added on top of the typing delay
    pub typing_jitter: Duration,
    /// Window for pre-login and reaction delays
    pub jitter_window: Range<Duration>,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            per_char: Duration::from_millis(30),
            typing_cap: Duration::from_millis(2000),
            typing_jitter: Duration::from_millis(1000),
            jitter_window: Duration::from_millis(500)..Duration::from_millis(1500),
        }
    }
}

impl Pacing {
    /// No delays at all
    pub fn instant() -> Self {
        Self {
            per_char: Duration::ZERO,
            typing_cap: Duration::ZERO,
            typing_jitter: Duration::ZERO,
            jitter_window: Duration::ZERO..Duration::ZERO,
        }
    }

    /// `min(len * per_char, cap) + rand[0, typing_jitter)`
    pub fn typing_delay(&self, message_len: usize) -> Duration {
        let proportional = self
            .per_char
            .saturating_mul(message_len.min(u32::MAX as usize) as u32)
            .min(self.typing_cap);
        proportional + random_below(self.typing_jitter)
    }

    /// Random duration inside `jitter_window`
    pub fn jitter(&self) -> Duration {
        let Range { start, end } = self.jitter_window.clone();
        if end <= start {
            return start;
        }
        start + random_below(end - start)
    }

    pub async fn sleep_typing(&self, message_len: usize) {
        sleep_nonzero(self.typing_delay(message_len)).await;
    }

    pub async fn sleep_jitter(&self) {
        sleep_nonzero(self.jitter()).await;
    }
}

/// True with the given probability; 0 and 1 are exact
pub fn chance(probability: f64) -> bool {
    if probability <= 0.0 {
        false
    } else if probability >= 1.0 {
        true
    } else {
        rand::thread_rng().gen_bool(probability)
    }
}

fn random_below(limit: Duration) -> Duration {
    let millis = limit.as_millis() as u64;
    if millis == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..millis))
}

async fn sleep_nonzero(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
