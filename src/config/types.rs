use super::defaults::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Agent
// ============================================================================

/// How to reach the agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    #[serde(default = "default_agent_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_restart_timeout_ms")]
    pub restart_timeout_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: default_agent_url(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            restart_timeout_ms: DEFAULT_RESTART_TIMEOUT_MS,
        }
    }
}

fn default_agent_url() -> String {
    DEFAULT_AGENT_URL.to_string()
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_restart_timeout_ms() -> u64 {
    DEFAULT_RESTART_TIMEOUT_MS
}

// ============================================================================
// Polling
// ============================================================================

/// Refresh cadence of the status and catalog sources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PollingConfig {
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
    #[serde(default = "default_catalog_interval_ms")]
    pub catalog_interval_ms: u64,
    #[serde(default = "default_stale_after_intervals")]
    pub stale_after_intervals: u32,
}

impl PollingConfig {
    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }

    pub fn catalog_interval(&self) -> Duration {
        Duration::from_millis(self.catalog_interval_ms)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            status_interval_ms: DEFAULT_STATUS_INTERVAL_MS,
            catalog_interval_ms: DEFAULT_CATALOG_INTERVAL_MS,
            stale_after_intervals: DEFAULT_STALE_AFTER_INTERVALS,
        }
    }
}

fn default_status_interval_ms() -> u64 {
    DEFAULT_STATUS_INTERVAL_MS
}

fn default_catalog_interval_ms() -> u64 {
    DEFAULT_CATALOG_INTERVAL_MS
}

fn default_stale_after_intervals() -> u32 {
    DEFAULT_STALE_AFTER_INTERVALS
}

// ============================================================================
// Logging
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of the human-readable format.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
