//! Runtime configuration knobs
//!
//! Every knob has a sensible default and an environment override so the
//! binaries can tune the pipeline without code changes.

use std::env;
use std::time::Duration;

/// Configuration for the query pipeline and its collaborators.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum symbols kept for a comparison; extras are dropped.
    pub max_compare_symbols: usize,
    /// Concurrent provider fetches in flight during a comparison.
    pub fetch_concurrency: usize,
    /// Per-symbol quote+history fetch deadline inside a comparison.
    pub fetch_timeout: Duration,
    /// Trailing window requested for history series, in calendar days.
    pub history_days: u32,
    /// Retry attempt ceiling for transient provider failures.
    pub max_fetch_attempts: u32,
    /// First backoff delay; doubles per attempt.
    pub backoff_base: Duration,
    /// Cache lifetime for quotes.
    pub quote_ttl: Duration,
    /// Cache lifetime for history series.
    pub history_ttl: Duration,
    /// Cache lifetime for negative (not-found) lookups.
    pub not_found_ttl: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_compare_symbols: 10,
            fetch_concurrency: 5,
            fetch_timeout: Duration::from_secs(15),
            history_days: 30,
            max_fetch_attempts: 3,
            backoff_base: Duration::from_millis(250),
            quote_ttl: Duration::from_secs(60),
            history_ttl: Duration::from_secs(300),
            not_found_ttl: Duration::from_secs(30),
        }
    }
}

impl AgentConfig {
    /// Build a config from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_compare_symbols: env_usize("AGENT_MAX_COMPARE_SYMBOLS")
                .unwrap_or(defaults.max_compare_symbols),
            fetch_concurrency: env_usize("AGENT_FETCH_CONCURRENCY")
                .unwrap_or(defaults.fetch_concurrency),
            fetch_timeout: env_secs("AGENT_FETCH_TIMEOUT_SECS")
                .unwrap_or(defaults.fetch_timeout),
            history_days: env_u32("AGENT_HISTORY_DAYS").unwrap_or(defaults.history_days),
            max_fetch_attempts: env_u32("AGENT_MAX_FETCH_ATTEMPTS")
                .unwrap_or(defaults.max_fetch_attempts),
            backoff_base: env_millis("AGENT_BACKOFF_BASE_MS").unwrap_or(defaults.backoff_base),
            quote_ttl: env_secs("AGENT_QUOTE_TTL_SECS").unwrap_or(defaults.quote_ttl),
            history_ttl: env_secs("AGENT_HISTORY_TTL_SECS").unwrap_or(defaults.history_ttl),
            not_found_ttl: env_secs("AGENT_NOT_FOUND_TTL_SECS")
                .unwrap_or(defaults.not_found_ttl),
        }
    }
}

fn env_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_secs(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
}

fn env_millis(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_millis)
}
