mod defaults;
mod io;
mod types;
mod validation;

pub use defaults::*;
pub use io::*;
pub use types::*;
pub use validation::*;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level console configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleConfig {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ConsoleConfig {
    /// Load configuration from file, environment, and defaults.
    ///
    /// An explicit `path` must exist. Without one, the standard locations are
    /// searched and defaults apply when none has a file.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let p = Path::new(p);
                if !p.exists() {
                    bail!("Config file {} not found", p.display());
                }
                load_config_file(p)?
            }
            None => match find_config_file() {
                Some(p) => load_config_file(&p)?,
                None => ConsoleConfig::default(),
            },
        };

        config.apply_overrides(|name| std::env::var(name).ok());

        Ok(config)
    }

    /// Defaults plus environment overrides, for commands that create the file.
    pub fn from_env() -> Self {
        let mut config = ConsoleConfig::default();
        config.apply_overrides(|name| std::env::var(name).ok());
        config
    }

    /// Write default configuration to a file.
    pub fn write_default(path: &str) -> Result<()> {
        write_config_file(Path::new(path), &ConsoleConfig::default())
    }

    /// Apply `NOTESLY_*` overrides. Unparseable numbers are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("NOTESLY_AGENT_URL") {
            self.agent.base_url = url;
        }

        if let Some(ms) = lookup("NOTESLY_STATUS_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.polling.status_interval_ms = ms;
        }

        if let Some(ms) = lookup("NOTESLY_CATALOG_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.polling.catalog_interval_ms = ms;
        }

        if let Some(ms) = lookup("NOTESLY_REQUEST_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.agent.request_timeout_ms = ms;
        }

        if let Some(json) = lookup("NOTESLY_LOG_JSON") {
            self.logging.json = matches!(json.as_str(), "1" | "true" | "yes");
        }
    }
}

/// Find the configuration file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    let candidates = [
        PathBuf::from("notesly-console.json"),
        PathBuf::from("notesly-console.yaml"),
        PathBuf::from("notesly-console.yml"),
        PathBuf::from("notesly-console.toml"),
    ];

    for path in &candidates {
        if path.exists() {
            return Some(path.clone());
        }
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".notesly-console").join("config.json");
        if home_config.exists() {
            return Some(home_config);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = ConsoleConfig::default();
        config.apply_overrides(lookup_from(&[
            ("NOTESLY_AGENT_URL", "http://agent:8080"),
            ("NOTESLY_STATUS_INTERVAL_MS", "1500"),
            ("NOTESLY_LOG_JSON", "true"),
        ]));
        assert_eq!(config.agent.base_url, "http://agent:8080");
        assert_eq!(config.polling.status_interval_ms, 1500);
        assert!(config.logging.json);
        assert_eq!(config.polling.catalog_interval_ms, DEFAULT_CATALOG_INTERVAL_MS);
    }

    #[test]
    fn unparseable_override_is_ignored() {
        let mut config = ConsoleConfig::default();
        config.apply_overrides(lookup_from(&[("NOTESLY_CATALOG_INTERVAL_MS", "soon")]));
        assert_eq!(config.polling.catalog_interval_ms, DEFAULT_CATALOG_INTERVAL_MS);
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let err = ConsoleConfig::load(Some("/definitely/not/here/console.json")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn explicit_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("console.json");
        std::fs::write(&path, r#"{ polling: { staleAfterIntervals: 5 } }"#).unwrap();

        let config = ConsoleConfig::load(path.to_str()).unwrap();
        assert_eq!(config.polling.stale_after_intervals, 5);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config: ConsoleConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ConsoleConfig::default());
    }
}
