//! In-memory agent used by unit tests.

use super::*;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

pub(crate) struct FakeAgent {
    pub status: Mutex<Result<StatusSnapshot, AgentError>>,
    pub catalog: Mutex<ConfigCatalog>,
    pub save_error: Mutex<Option<AgentError>>,
    pub restart_result: Mutex<Result<RestartResponse, AgentError>>,
    pub saves: Mutex<Vec<BTreeMap<String, String>>>,
    pub restarts: AtomicU32,
    pub config_fetches: AtomicU32,
    /// When set, every save waits for one notification before answering.
    pub save_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeAgent {
    pub fn new(catalog: Vec<ConfigItem>) -> Arc<Self> {
        Arc::new(Self {
            status: Mutex::new(Ok(StatusSnapshot::default())),
            catalog: Mutex::new(ConfigCatalog {
                config: catalog,
                env_file: "/srv/agent/.env".to_string(),
            }),
            save_error: Mutex::new(None),
            restart_result: Mutex::new(Ok(RestartResponse {
                status: "restarting".to_string(),
            })),
            saves: Mutex::new(Vec::new()),
            restarts: AtomicU32::new(0),
            config_fetches: AtomicU32::new(0),
            save_gate: Mutex::new(None),
        })
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().len()
    }

    pub fn restart_count(&self) -> u32 {
        self.restarts.load(Ordering::SeqCst)
    }

    pub fn fail_saves_with(&self, err: AgentError) {
        *self.save_error.lock() = Some(err);
    }

    pub fn hold_saves(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.save_gate.lock() = Some(gate.clone());
        gate
    }
}

pub(crate) fn item(key: &str, group: &str) -> ConfigItem {
    ConfigItem {
        key: key.to_string(),
        group: group.to_string(),
        label: key.to_string(),
        value: String::new(),
        is_set: false,
        required: false,
        secret: false,
        default: None,
    }
}

#[async_trait]
impl AgentApi for FakeAgent {
    async fn health(&self) -> Result<HealthResponse, AgentError> {
        Ok(HealthResponse {
            status: "ok".to_string(),
        })
    }

    async fn status(&self) -> Result<StatusSnapshot, AgentError> {
        self.status.lock().clone()
    }

    async fn config(&self) -> Result<ConfigCatalog, AgentError> {
        self.config_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.catalog.lock().clone())
    }

    async fn save_config(
        &self,
        changes: &BTreeMap<String, String>,
    ) -> Result<SaveConfigResponse, AgentError> {
        let gate = self.save_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.saves.lock().push(changes.clone());
        if let Some(err) = self.save_error.lock().clone() {
            return Err(err);
        }

        let mut catalog = self.catalog.lock();
        let mut keys = Vec::new();
        for (key, value) in changes {
            if let Some(item) = catalog.config.iter_mut().find(|i| &i.key == key) {
                item.value = value.clone();
                item.is_set = !value.is_empty();
                keys.push(key.clone());
            }
        }
        Ok(SaveConfigResponse {
            status: "saved".to_string(),
            keys,
        })
    }

    async fn restart(&self) -> Result<RestartResponse, AgentError> {
        self.restarts.fetch_add(1, Ordering::SeqCst);
        self.restart_result.lock().clone()
    }
}
