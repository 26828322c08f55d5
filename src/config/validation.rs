use super::ConsoleConfig;
use tracing::warn;

/// Validation errors for configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Validate a console configuration.
pub fn validate_config(config: &ConsoleConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();

    match url::Url::parse(&config.agent.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ConfigValidationError {
            path: "agent.baseUrl".to_string(),
            message: format!("Unsupported scheme '{}', expected http or https", url.scheme()),
        }),
        Err(e) => errors.push(ConfigValidationError {
            path: "agent.baseUrl".to_string(),
            message: format!("Not a valid URL: {e}"),
        }),
    }

    let positive = [
        ("agent.requestTimeoutMs", config.agent.request_timeout_ms),
        ("agent.restartTimeoutMs", config.agent.restart_timeout_ms),
        ("polling.statusIntervalMs", config.polling.status_interval_ms),
        ("polling.catalogIntervalMs", config.polling.catalog_interval_ms),
    ];
    for (path, value) in positive {
        if value == 0 {
            errors.push(ConfigValidationError {
                path: path.to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }
    }

    if config.polling.stale_after_intervals == 0 {
        errors.push(ConfigValidationError {
            path: "polling.staleAfterIntervals".to_string(),
            message: "Must be at least 1".to_string(),
        });
    }

    if config.polling.status_interval_ms >= config.polling.catalog_interval_ms {
        warn!(
            "Status polls every {}ms but the catalog every {}ms; \
             status is usually polled more often",
            config.polling.status_interval_ms,
            config.polling.catalog_interval_ms
        );
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ConsoleConfig::default()).is_empty());
    }

    #[test]
    fn rejects_bad_url_and_zero_intervals() {
        let mut config = ConsoleConfig::default();
        config.agent.base_url = "ws://127.0.0.1:8080".into();
        config.polling.status_interval_ms = 0;
        config.polling.stale_after_intervals = 0;

        let paths: Vec<String> = validate_config(&config)
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(
            paths,
            vec![
                "agent.baseUrl",
                "polling.statusIntervalMs",
                "polling.staleAfterIntervals"
            ]
        );
    }

    #[test]
    fn error_display_includes_path() {
        let err = ConfigValidationError {
            path: "agent.baseUrl".into(),
            message: "Not a valid URL".into(),
        };
        assert_eq!(err.to_string(), "agent.baseUrl: Not a valid URL");
    }
}
