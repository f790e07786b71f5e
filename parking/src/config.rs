//! Configuration management for the parking booking engine.
//!
//! Loads configuration from environment variables with sensible defaults.

use parkbook_runtime::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Booking flow settings
    pub booking: BookingConfig,
    /// Backoff for catalog reads after a conflict or on refresh
    pub refresh: RefreshConfig,
    /// Seed for the demo catalog
    pub seed: u64,
    /// Log filter (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Booking flow configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Longest booking the flow accepts, in hours
    pub max_duration_hours: u32,
}

/// Catalog refresh retry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Retries after the first attempt
    pub max_retries: usize,
    /// Delay before the first retry, in milliseconds
    pub initial_delay_ms: u64,
    /// Backoff cap, in milliseconds
    pub max_delay_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            booking: BookingConfig {
                max_duration_hours: parsed::<u32>(lookup("PARKING_MAX_DURATION_HOURS"))
                    .filter(|hours| *hours > 0)
                    .unwrap_or(defaults.booking.max_duration_hours),
            },
            refresh: RefreshConfig {
                max_retries: parsed(lookup("PARKING_REFRESH_MAX_RETRIES"))
                    .unwrap_or(defaults.refresh.max_retries),
                initial_delay_ms: parsed(lookup("PARKING_REFRESH_INITIAL_DELAY_MS"))
                    .unwrap_or(defaults.refresh.initial_delay_ms),
                max_delay_ms: parsed(lookup("PARKING_REFRESH_MAX_DELAY_MS"))
                    .unwrap_or(defaults.refresh.max_delay_ms),
            },
            seed: parsed(lookup("PARKING_SEED")).unwrap_or(defaults.seed),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }

    /// Backoff policy for catalog reads.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(self.refresh.max_retries)
            .initial_delay(Duration::from_millis(self.refresh.initial_delay_ms))
            .max_delay(Duration::from_millis(self.refresh.max_delay_ms))
            .build()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            booking: BookingConfig {
                max_duration_hours: 24,
            },
            refresh: RefreshConfig {
                max_retries: 3,
                initial_delay_ms: 100,
                max_delay_ms: 2000,
            },
            seed: 42,
            log_level: "info,parking=debug".to_string(),
        }
    }
}

fn parsed<T: FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|s| s.trim().parse().ok())
}
