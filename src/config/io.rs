use super::defaults::MAX_CONFIG_FILE_BYTES;
use super::ConsoleConfig;

use anyhow::{bail, Context, Result};
use std::path::Path;

/// Parse a JSON5 configuration string.
pub fn parse_config_json5(content: &str) -> Result<serde_json::Value> {
    let value: serde_json::Value = json5::from_str(content)?;
    Ok(value)
}

/// Read a console config file into a JSON value.
///
/// Symlinks at the final path component are refused and files larger than
/// `MAX_CONFIG_FILE_BYTES` are rejected before reading.
pub fn read_config_value(path: &Path) -> Result<serde_json::Value> {
    let metadata = std::fs::symlink_metadata(path)
        .with_context(|| format!("Cannot stat config file '{}'", path.display()))?;

    #[cfg(unix)]
    if metadata.file_type().is_symlink() {
        bail!(
            "Config file '{}' is a symlink, refusing to follow",
            path.display()
        );
    }

    if metadata.len() > MAX_CONFIG_FILE_BYTES {
        bail!(
            "Config file '{}' is {} bytes, exceeds limit of {} bytes",
            path.display(),
            metadata.len(),
            MAX_CONFIG_FILE_BYTES,
        );
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match ext {
        "yaml" | "yml" => {
            let value: serde_json::Value = serde_yaml::from_str(&content)?;
            Ok(value)
        }
        "toml" => {
            let value: serde_json::Value = toml::from_str(&content)?;
            Ok(value)
        }
        _ => parse_config_json5(&content),
    }
}

/// Load a [`ConsoleConfig`] from a file path.
pub fn load_config_file(path: &Path) -> Result<ConsoleConfig> {
    let value = read_config_value(path)?;
    let config = serde_json::from_value(value)
        .with_context(|| format!("Invalid console config in '{}'", path.display()))?;
    Ok(config)
}

/// Write configuration to a pretty-printed JSON file.
pub fn write_config_file(path: &Path, config: &ConsoleConfig) -> Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file '{}'", path.display()))?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(ext: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_json5_with_comments() {
        let file = write_temp(
            "json",
            r#"{
                // local agent
                agent: { baseUrl: "http://10.0.0.5:8080" },
                polling: { statusIntervalMs: 2000, },
            }"#,
        );
        let config = load_config_file(file.path()).unwrap();
        assert_eq!(config.agent.base_url, "http://10.0.0.5:8080");
        assert_eq!(config.polling.status_interval_ms, 2000);
        assert_eq!(config.polling.catalog_interval_ms, 30_000);
    }

    #[test]
    fn loads_yaml() {
        let file = write_temp("yaml", "logging:\n  level: debug\n  json: true\n");
        let config = load_config_file(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn loads_toml() {
        let file = write_temp("toml", "[agent]\nrequestTimeoutMs = 2500\n");
        let config = load_config_file(file.path()).unwrap();
        assert_eq!(config.agent.request_timeout_ms, 2500);
    }

    #[test]
    fn rejects_oversized_file() {
        let padding = " ".repeat((MAX_CONFIG_FILE_BYTES + 1) as usize);
        let file = write_temp("json", &format!("{{}}{padding}"));
        let err = load_config_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("exceeds limit"));
    }

    #[test]
    fn write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("console.json");
        let mut config = ConsoleConfig::default();
        config.agent.base_url = "http://agent.local:9000".into();
        write_config_file(&path, &config).unwrap();
        assert_eq!(load_config_file(&path).unwrap(), config);
    }
}
