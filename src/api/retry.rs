//! Retry policy with exponential backoff and jitter
//!
//! Applied by [`super::client::HttpDnsApi`] around every request. Only
//! errors for which [`ApiError::is_retryable`] holds are retried, or
//! [`ApiError::is_safe_to_resend`] for requests that must not be repeated
//! once the service has seen them. Every other failure is returned on the
//! first attempt.

use std::time::Duration;

use crate::api::{ApiError, ApiResult};
use crate::config::ConfigError;

pub const ENV_RETRY_DISABLED: &str = "ZONECTL_RETRY_DISABLED";
pub const ENV_RETRY_MAX: &str = "ZONECTL_RETRY_MAX";
pub const ENV_RETRY_WAIT_MIN: &str = "ZONECTL_RETRY_WAIT_MIN";
pub const ENV_RETRY_WAIT_MAX: &str = "ZONECTL_RETRY_WAIT_MAX";

/// Configuration for retry policy
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries are skipped entirely when false
    pub enabled: bool,
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial backoff duration
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
    /// Backoff multiplier (e.g., 2.0 for exponential)
    pub backoff_multiplier: f32,
    /// Jitter factor (0.0 to 1.0) to randomize backoff
    pub jitter_factor: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 10,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    /// A policy that makes exactly one attempt.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Overrides fields from `ZONECTL_RETRY_*` variables found through
    /// `lookup`. Wait bounds are whole seconds.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_RETRY_DISABLED) {
            let disabled = raw.trim().parse::<bool>().map_err(|_| {
                ConfigError::invalid(ENV_RETRY_DISABLED, &raw, "expected true or false")
            })?;
            if disabled {
                self.enabled = false;
            }
        }

        if let Some(raw) = lookup(ENV_RETRY_MAX) {
            self.max_retries = parse_u32(ENV_RETRY_MAX, &raw)?;
        }

        if let Some(raw) = lookup(ENV_RETRY_WAIT_MIN) {
            self.initial_backoff = Duration::from_secs(u64::from(parse_u32(ENV_RETRY_WAIT_MIN, &raw)?));
        }

        if let Some(raw) = lookup(ENV_RETRY_WAIT_MAX) {
            self.max_backoff = Duration::from_secs(u64::from(parse_u32(ENV_RETRY_WAIT_MAX, &raw)?));
        }

        if self.max_backoff < self.initial_backoff {
            return Err(ConfigError {
                parameter: ENV_RETRY_WAIT_MAX.to_string(),
                value: format!("{}", self.max_backoff.as_secs()),
                reason: format!(
                    "shorter than the minimum wait of {}s",
                    self.initial_backoff.as_secs()
                ),
                suggestion: format!("Set {} to at least {}", ENV_RETRY_WAIT_MAX, self.initial_backoff.as_secs()),
            });
        }

        Ok(self)
    }

    /// Backoff before retry number `attempt` (1-based), without jitter.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let mut backoff = self.initial_backoff;
        for _ in 1..attempt {
            backoff = Duration::from_millis(
                (backoff.as_millis() as f32 * self.backoff_multiplier) as u64,
            );
            if backoff >= self.max_backoff {
                return self.max_backoff;
            }
        }
        backoff.min(self.max_backoff)
    }

    fn jitter(&self, backoff: Duration) -> Duration {
        if self.jitter_factor > 0.0 {
            let jitter_range = backoff.as_millis() as f32 * self.jitter_factor;
            Duration::from_millis((rand::random::<f32>() * jitter_range) as u64)
        } else {
            Duration::from_millis(0)
        }
    }

    /// Runs `op`, retrying retryable failures with backoff.
    pub fn run<T, F>(&self, what: &str, op: F) -> ApiResult<T>
    where
        F: FnMut() -> ApiResult<T>,
    {
        self.run_if(what, ApiError::is_retryable, op)
    }

    /// Runs `op`, retrying only failures accepted by `retryable`.
    pub fn run_if<T, F, P>(&self, what: &str, retryable: P, mut op: F) -> ApiResult<T>
    where
        F: FnMut() -> ApiResult<T>,
        P: Fn(&ApiError) -> bool,
    {
        self.run_with_sleep(what, &retryable, &mut op, std::thread::sleep)
    }

    pub(crate) fn run_with_sleep<T, F, P, S>(
        &self,
        what: &str,
        retryable: &P,
        op: &mut F,
        sleep: S,
    ) -> ApiResult<T>
    where
        F: FnMut() -> ApiResult<T>,
        P: Fn(&ApiError) -> bool,
        S: Fn(Duration),
    {
        let max_retries = if self.enabled { self.max_retries } else { 0 };
        let mut attempt = 0;

        loop {
            match op() {
                Ok(value) => {
                    if attempt > 0 {
                        log::debug!("{} succeeded on attempt {}", what, attempt + 1);
                    }
                    return Ok(value);
                }
                Err(e) if attempt < max_retries && retryable(&e) => {
                    attempt += 1;
                    let backoff = self.backoff_for(attempt);
                    let sleep_duration = backoff + self.jitter(backoff);
                    log::debug!(
                        "Retry attempt {} for {} after {:?} backoff: {}",
                        attempt,
                        what,
                        sleep_duration,
                        e
                    );
                    sleep(sleep_duration);
                }
                Err(e) => {
                    if attempt > 0 {
                        log::warn!("{} failed after {} attempts: {}", what, attempt + 1, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}

fn parse_u32(parameter: &str, raw: &str) -> Result<u32, ConfigError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| ConfigError::invalid(parameter, raw, "expected a non-negative integer"))
}
