//! Reconnect backoff policy for the duplex stream.
//!
//! One logical stream gets a fixed budget of connection attempts. After the
//! `n`th failed attempt the engine waits `n * step` before trying again; after
//! the last allowed attempt it gives up without waiting.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default connection attempts per stream.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default linear backoff step in milliseconds.
pub const DEFAULT_STEP_MS: u64 = 1000;

/// Linear reconnect backoff.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backoff {
    /// Total connection attempts allowed (default: 5).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay unit in ms; the wait after attempt `n` is `n * step_ms` (default: 1000).
    #[serde(default = "default_step_ms")]
    pub step_ms: u64,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}
fn default_step_ms() -> u64 {
    DEFAULT_STEP_MS
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            step_ms: DEFAULT_STEP_MS,
        }
    }
}

impl Backoff {
    /// A policy allowing `max_attempts` attempts with the default step.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Wait before the attempt that follows failed attempt `attempt` (1-based).
    ///
    /// `None` once the budget is spent.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        (attempt < self.max_attempts)
            .then(|| Duration::from_millis(self.step_ms.saturating_mul(u64::from(attempt))))
    }

    /// Every wait a fully failing stream goes through, in order.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.max_attempts)
            .filter_map(|attempt| self.delay_after(attempt))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_is_one_to_four_seconds() {
        let secs: Vec<u64> = Backoff::default().schedule().iter().map(Duration::as_secs).collect();
        assert_eq!(secs, vec![1, 2, 3, 4]);
    }

    #[test]
    fn no_wait_after_last_attempt() {
        let backoff = Backoff::default();
        assert_eq!(backoff.delay_after(4), Some(Duration::from_secs(4)));
        assert_eq!(backoff.delay_after(5), None);
        assert_eq!(backoff.delay_after(6), None);
    }

    #[test]
    fn single_attempt_never_waits() {
        assert!(Backoff::with_max_attempts(1).schedule().is_empty());
    }

    #[test]
    fn deserializes_with_defaults() {
        let backoff: Backoff = serde_json::from_str(r#"{"max_attempts": 3}"#).unwrap();
        assert_eq!(backoff.max_attempts, 3);
        assert_eq!(backoff.step_ms, DEFAULT_STEP_MS);
    }
}
