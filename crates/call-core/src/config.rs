//! Configuration for call-core

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CallError, CallResult};
use crate::state_table::FAILED_TO_CONNECT_TIMEOUT;

/// Environment variable overriding the recovery delay of `failed_to_connect`
pub const ENV_FAILED_TO_CONNECT_TIMEOUT_MS: &str = "CALLSYNC_FAILED_TO_CONNECT_TIMEOUT_MS";
/// Environment variable overriding the actor's event queue capacity
pub const ENV_EVENT_QUEUE_CAPACITY: &str = "CALLSYNC_EVENT_QUEUE_CAPACITY";
/// Environment variable overriding the transition history length
pub const ENV_HISTORY_CAPACITY: &str = "CALLSYNC_HISTORY_CAPACITY";

/// Configuration of a call machine and its actor
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Delay before `failed_to_connect` falls back to `idle`
    pub failed_to_connect_timeout_ms: u64,
    /// Capacity of the actor's event channel
    pub event_queue_capacity: usize,
    /// Number of transitions kept for inspection
    pub history_capacity: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            failed_to_connect_timeout_ms: FAILED_TO_CONNECT_TIMEOUT.as_millis() as u64,
            event_queue_capacity: 1000,
            history_capacity: 64,
        }
    }
}

impl MachineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failed_to_connect_timeout(mut self, timeout: Duration) -> Self {
        self.failed_to_connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_event_queue_capacity(mut self, capacity: usize) -> Self {
        self.event_queue_capacity = capacity;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn failed_to_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.failed_to_connect_timeout_ms)
    }

    pub fn validate(&self) -> CallResult<()> {
        if self.failed_to_connect_timeout_ms == 0 {
            return Err(CallError::invalid_configuration(
                "failed_to_connect_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.event_queue_capacity == 0 {
            return Err(CallError::invalid_configuration(
                "event_queue_capacity",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Load configuration from environment, falling back to defaults
    pub fn from_env() -> CallResult<Self> {
        let mut config = Self::default();

        if let Some(ms) = env_var(ENV_FAILED_TO_CONNECT_TIMEOUT_MS)? {
            config.failed_to_connect_timeout_ms = ms;
        }
        if let Some(capacity) = env_var(ENV_EVENT_QUEUE_CAPACITY)? {
            config.event_queue_capacity = capacity;
        }
        if let Some(capacity) = env_var(ENV_HISTORY_CAPACITY)? {
            config.history_capacity = capacity;
        }

        config.validate()?;
        Ok(config)
    }
}

fn env_var<T: FromStr>(name: &str) -> CallResult<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| CallError::invalid_configuration(name, e.to_string())),
        Err(_) => Ok(None),
    }
}
