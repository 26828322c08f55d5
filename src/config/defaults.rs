//! Default configuration constants used across the console.

/// Default agent address (the agent's web port on loopback).
pub const DEFAULT_AGENT_URL: &str = "http://127.0.0.1:8080";

/// Default timeout for ordinary agent requests.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Default timeout for the restart request. The agent normally replies
/// before re-executing itself, so this stays short.
pub const DEFAULT_RESTART_TIMEOUT_MS: u64 = 5_000;

/// Default status poll interval. Status changes continuously.
pub const DEFAULT_STATUS_INTERVAL_MS: u64 = 5_000;

/// Default config catalog poll interval. The catalog rarely changes.
pub const DEFAULT_CATALOG_INTERVAL_MS: u64 = 30_000;

/// A source value older than this many poll intervals is reported stale.
pub const DEFAULT_STALE_AFTER_INTERVALS: u32 = 3;

/// Default log level for the console's own target.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Maximum size for a console config file (1 MB).
pub const MAX_CONFIG_FILE_BYTES: u64 = 1024 * 1024;
