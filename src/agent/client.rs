use super::protocol::*;
use crate::config::AgentConfig;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Longest slice of an error body kept in an [`AgentError::Status`].
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Failure talking to the agent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("invalid agent url '{0}'")]
    InvalidUrl(String),
    #[error("cannot reach agent: {0}")]
    Connect(String),
    #[error("agent did not answer in time")]
    Timeout,
    #[error("agent closed the connection without a response")]
    ConnectionDropped,
    #[error("agent returned HTTP {code}: {body}")]
    Status { code: u16, body: String },
    #[error("unexpected response from agent: {0}")]
    Decode(String),
}

impl AgentError {
    /// A restart request that ends this way most likely reached the agent,
    /// which then exited before it could reply.
    pub fn is_ambiguous_restart(&self) -> bool {
        matches!(self, AgentError::ConnectionDropped | AgentError::Timeout)
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AgentError::Timeout
        } else if err.is_connect() {
            AgentError::Connect(err.to_string())
        } else if err.is_decode() {
            AgentError::Decode(err.to_string())
        } else if err.is_builder() {
            AgentError::InvalidUrl(err.to_string())
        } else {
            // Request was written but no complete response came back.
            AgentError::ConnectionDropped
        }
    }
}

// ============================================================================
// Agent API
// ============================================================================

/// The agent's HTTP surface as seen by the console.
#[async_trait]
pub trait AgentApi: Send + Sync {
    async fn health(&self) -> Result<HealthResponse, AgentError>;

    async fn status(&self) -> Result<StatusSnapshot, AgentError>;

    async fn config(&self) -> Result<ConfigCatalog, AgentError>;

    /// Apply all `changes` in a single request.
    async fn save_config(
        &self,
        changes: &BTreeMap<String, String>,
    ) -> Result<SaveConfigResponse, AgentError>;

    async fn restart(&self) -> Result<RestartResponse, AgentError>;
}

/// reqwest-backed client for the agent's `/api` endpoints.
#[derive(Debug, Clone)]
pub struct AgentClient {
    base_url: String,
    restart_timeout: Duration,
    client: Client,
}

impl AgentClient {
    pub fn new(config: &AgentConfig) -> Result<Self, AgentError> {
        let parsed = url::Url::parse(&config.base_url)
            .map_err(|_| AgentError::InvalidUrl(config.base_url.clone()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AgentError::InvalidUrl(config.base_url.clone()));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| AgentError::Connect(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            restart_timeout: Duration::from_millis(config.restart_timeout_ms),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, AgentError> {
        let url = self.endpoint(path);
        debug!("GET {}", url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(AgentError::from_reqwest)?;
        let resp = ensure_success(resp).await?;
        resp.json::<T>()
            .await
            .map_err(|e| AgentError::Decode(e.to_string()))
    }
}

/// Turn a non-2xx response into [`AgentError::Status`].
async fn ensure_success(resp: Response) -> Result<Response, AgentError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(AgentError::Status {
        code: status.as_u16(),
        body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
    })
}

/// Decode an informational body, falling back to the default when the
/// agent answers with something unexpected.
async fn lenient_json<T: DeserializeOwned + Default>(resp: Response, what: &str) -> T {
    match resp.json::<T>().await {
        Ok(body) => body,
        Err(e) => {
            warn!("Ignoring unreadable {} response body: {}", what, e);
            T::default()
        }
    }
}

#[async_trait]
impl AgentApi for AgentClient {
    async fn health(&self) -> Result<HealthResponse, AgentError> {
        self.get_json("health").await
    }

    async fn status(&self) -> Result<StatusSnapshot, AgentError> {
        let snapshot: StatusSnapshot = self.get_json("status").await?;
        Ok(snapshot.normalize())
    }

    async fn config(&self) -> Result<ConfigCatalog, AgentError> {
        self.get_json("config").await
    }

    async fn save_config(
        &self,
        changes: &BTreeMap<String, String>,
    ) -> Result<SaveConfigResponse, AgentError> {
        let url = self.endpoint("config");
        debug!("POST {} ({} change(s))", url, changes.len());
        let body = SaveConfigRequest {
            changes: changes.clone(),
        };
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(AgentError::from_reqwest)?;
        let resp = ensure_success(resp).await?;
        Ok(lenient_json(resp, "save").await)
    }

    async fn restart(&self) -> Result<RestartResponse, AgentError> {
        let url = self.endpoint("restart");
        debug!("POST {}", url);
        let resp = self
            .client
            .post(&url)
            .timeout(self.restart_timeout)
            .send()
            .await
            .map_err(AgentError::from_reqwest)?;
        let resp = ensure_success(resp).await?;
        Ok(lenient_json(resp, "restart").await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_url(url: &str) -> AgentConfig {
        AgentConfig {
            base_url: url.to_string(),
            ..AgentConfig::default()
        }
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let client = AgentClient::new(&config_with_url("http://127.0.0.1:8080/")).unwrap();
        assert_eq!(client.endpoint("status"), "http://127.0.0.1:8080/api/status");
    }

    #[test]
    fn rejects_non_http_scheme() {
        let err = AgentClient::new(&config_with_url("ftp://agent")).unwrap_err();
        assert_eq!(err, AgentError::InvalidUrl("ftp://agent".into()));
    }

    #[test]
    fn rejects_garbage_url() {
        assert!(matches!(
            AgentClient::new(&config_with_url("not a url")),
            Err(AgentError::InvalidUrl(_))
        ));
    }

    #[test]
    fn ambiguous_restart_classification() {
        assert!(AgentError::ConnectionDropped.is_ambiguous_restart());
        assert!(AgentError::Timeout.is_ambiguous_restart());
        assert!(!AgentError::Status {
            code: 500,
            body: String::new()
        }
        .is_ambiguous_restart());
        assert!(!AgentError::Connect("refused".into()).is_ambiguous_restart());
    }
}
