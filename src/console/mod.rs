//! Ties the sources, topology and edit session together.
//!
//! The surrounding UI feeds [`ConsoleEvent`]s in and reads node views and
//! form fields back out. All mutation happens through `&mut Console` on the
//! caller's event loop; the pollers run in their own tasks.

use crate::agent::{AgentApi, AgentClient, AgentError, ConfigCatalog, StatusSnapshot};
use crate::config::{ConsoleConfig, PollingConfig};
use crate::editing::{CommitError, CommitReport, CommitSequencer, EditSession, FieldView};
use crate::infra::shutdown::ShutdownSignal;
use crate::sources::{catalog_source, status_source, PolledSource};
use crate::topology::{node_views, reference_topology, NodeView, Topology};

use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Events raised by the surrounding UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    NodeClicked(String),
    FieldChanged { key: String, value: String },
    DialogClosed,
}

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("no node with id '{0}'")]
    UnknownNode(String),
    #[error("no node is open for editing")]
    NoOpenSession,
    #[error("'{key}' is not a field of node '{node}'")]
    ForeignField { key: String, node: String },
    #[error(transparent)]
    Commit(#[from] CommitError),
}

/// A node whose projected state differs between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeChange {
    pub id: String,
    pub display_name: String,
    pub was_enabled: bool,
    pub enabled: bool,
    pub subtitle: String,
}

pub struct Console {
    topology: Topology,
    status: PolledSource<StatusSnapshot>,
    catalog: PolledSource<ConfigCatalog>,
    sequencer: CommitSequencer,
    session: Option<EditSession>,
}

impl Console {
    pub fn new(api: Arc<dyn AgentApi>, polling: &PollingConfig, topology: Topology) -> Self {
        let status = status_source(api.clone(), polling);
        let catalog = catalog_source(api.clone(), polling);
        let sequencer = CommitSequencer::new(api, catalog.clone(), status.clone());
        Self {
            topology,
            status,
            catalog,
            sequencer,
            session: None,
        }
    }

    /// Console over the reference pipeline talking HTTP to the configured agent.
    pub fn from_config(config: &ConsoleConfig) -> Result<Self, AgentError> {
        let client = AgentClient::new(&config.agent)?;
        info!("Console attached to agent at {}", client.base_url());
        Ok(Self::new(
            Arc::new(client),
            &config.polling,
            reference_topology(),
        ))
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn status(&self) -> &PolledSource<StatusSnapshot> {
        &self.status
    }

    pub fn catalog(&self) -> &PolledSource<ConfigCatalog> {
        &self.catalog
    }

    pub fn sequencer(&self) -> &CommitSequencer {
        &self.sequencer
    }

    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    /// Start both pollers; each refreshes on its own interval.
    pub fn start(&self, shutdown: &ShutdownSignal) -> Vec<JoinHandle<()>> {
        vec![
            self.status.spawn_poller(shutdown.clone()),
            self.catalog.spawn_poller(shutdown.clone()),
        ]
    }

    /// Every node projected against the latest status snapshot.
    pub fn node_views(&self) -> Vec<NodeView> {
        let snapshot = self.status.latest();
        node_views(&self.topology, snapshot.as_deref())
    }

    pub fn handle(&mut self, event: ConsoleEvent) -> Result<(), ConsoleError> {
        match event {
            ConsoleEvent::NodeClicked(id) => {
                let node = self
                    .topology
                    .node(&id)
                    .ok_or_else(|| ConsoleError::UnknownNode(id.clone()))?;
                if let Some(previous) = self.session.take() {
                    previous.close();
                }
                self.session = Some(EditSession::open(node));
                self.sequencer.reset();
            }
            ConsoleEvent::FieldChanged { key, value } => {
                let session = self.session.as_mut().ok_or(ConsoleError::NoOpenSession)?;
                if let Some(catalog) = self.catalog.latest() {
                    if !session.owns_key(&catalog, &key) {
                        return Err(ConsoleError::ForeignField {
                            key,
                            node: session.node_id().to_string(),
                        });
                    }
                }
                session.set_field(&key, &value);
            }
            ConsoleEvent::DialogClosed => {
                if let Some(session) = self.session.take() {
                    let dropped = session.close();
                    debug!("Edit dialog closed, {} edit(s) discarded", dropped);
                }
            }
        }
        Ok(())
    }

    /// Form fields of the open node. Empty until the catalog has loaded.
    pub fn fields(&self) -> Option<Vec<FieldView>> {
        let session = self.session.as_ref()?;
        Some(
            self.catalog
                .latest()
                .map(|catalog| session.fields(&catalog))
                .unwrap_or_default(),
        )
    }

    pub fn has_pending_edits(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.ledger().has_pending())
    }

    /// Commit the open session's edits, optionally restarting the agent.
    pub async fn commit(&mut self, restart: bool) -> Result<CommitReport, ConsoleError> {
        let session = self.session.as_mut().ok_or(ConsoleError::NoOpenSession)?;
        let ledger = session.ledger_mut();
        let report = if restart {
            self.sequencer.save_and_restart(ledger).await?
        } else {
            CommitReport {
                save: self.sequencer.save(ledger).await?,
                restart: None,
            }
        };
        Ok(report)
    }
}

/// Nodes whose enabled flag or subtitle changed from `previous` to `current`.
pub fn node_changes(previous: &[NodeView], current: &[NodeView]) -> Vec<NodeChange> {
    current
        .iter()
        .filter_map(|now| {
            let before = previous.iter().find(|p| p.id == now.id);
            let changed = match before {
                Some(b) => b.enabled != now.enabled || b.subtitle != now.subtitle,
                None => true,
            };
            changed.then(|| NodeChange {
                id: now.id.clone(),
                display_name: now.display_name.clone(),
                was_enabled: before.map(|b| b.enabled).unwrap_or(false),
                enabled: now.enabled,
                subtitle: now.subtitle.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::{item, FakeAgent};
    use crate::agent::ModuleStatus;
    use crate::editing::{CommitPhase, SaveOutcome};

    fn console_with(agent: &Arc<FakeAgent>) -> Console {
        let api: Arc<dyn AgentApi> = agent.clone();
        Console::new(api, &PollingConfig::default(), reference_topology())
    }

    fn telegram_catalog() -> Vec<crate::agent::ConfigItem> {
        let mut token = item("TELEGRAM_BOT_TOKEN", "Telegram");
        token.required = true;
        vec![token, item("OPENAI_MODEL", "Conversation")]
    }

    #[tokio::test]
    async fn edit_and_commit_through_events() {
        let agent = FakeAgent::new(telegram_catalog());
        let mut console = console_with(&agent);
        console.catalog().refresh().await.unwrap();

        console
            .handle(ConsoleEvent::NodeClicked("telegram".into()))
            .unwrap();
        console
            .handle(ConsoleEvent::FieldChanged {
                key: "TELEGRAM_BOT_TOKEN".into(),
                value: "abc123".into(),
            })
            .unwrap();
        assert!(console.has_pending_edits());

        let report = console.commit(false).await.unwrap();
        assert!(report.save.is_saved());
        assert!(!console.has_pending_edits());

        let fields = console.fields().unwrap();
        assert_eq!(fields[0].value, "abc123");
        assert!(fields[0].is_set);
    }

    #[tokio::test]
    async fn field_of_another_node_is_rejected() {
        let agent = FakeAgent::new(telegram_catalog());
        let mut console = console_with(&agent);
        console.catalog().refresh().await.unwrap();

        console
            .handle(ConsoleEvent::NodeClicked("telegram".into()))
            .unwrap();
        let err = console
            .handle(ConsoleEvent::FieldChanged {
                key: "OPENAI_MODEL".into(),
                value: "gpt-4o".into(),
            })
            .unwrap_err();
        assert!(matches!(err, ConsoleError::ForeignField { .. }));
    }

    #[tokio::test]
    async fn closing_dialog_discards_edits() {
        let agent = FakeAgent::new(telegram_catalog());
        let mut console = console_with(&agent);

        console
            .handle(ConsoleEvent::NodeClicked("telegram".into()))
            .unwrap();
        console
            .handle(ConsoleEvent::FieldChanged {
                key: "TELEGRAM_BOT_TOKEN".into(),
                value: "abc123".into(),
            })
            .unwrap();
        console.handle(ConsoleEvent::DialogClosed).unwrap();

        assert!(console.session().is_none());
        assert!(matches!(
            console.commit(false).await,
            Err(ConsoleError::NoOpenSession)
        ));
        assert_eq!(agent.save_count(), 0);
    }

    #[tokio::test]
    async fn commit_with_no_edits_reports_nothing_to_save() {
        let agent = FakeAgent::new(telegram_catalog());
        let mut console = console_with(&agent);
        console
            .handle(ConsoleEvent::NodeClicked("chat".into()))
            .unwrap();
        let report = console.commit(true).await.unwrap();
        assert_eq!(report.save, SaveOutcome::NothingToSave);
        assert_eq!(agent.save_count(), 0);
        assert_eq!(agent.restart_count(), 0);
        assert_eq!(console.sequencer().phase(), CommitPhase::Idle);
    }

    #[test]
    fn unknown_node_is_an_error() {
        let agent = FakeAgent::new(vec![]);
        let mut console = console_with(&agent);
        assert!(matches!(
            console.handle(ConsoleEvent::NodeClicked("nope".into())),
            Err(ConsoleError::UnknownNode(_))
        ));
    }

    #[tokio::test]
    async fn node_views_follow_status_source() {
        let agent = FakeAgent::new(vec![]);
        let console = console_with(&agent);

        let before = console.node_views();
        assert!(!before.iter().find(|v| v.id == "chat").unwrap().enabled);

        let mut snapshot = StatusSnapshot::default();
        snapshot.modules.insert(
            "chat".into(),
            ModuleStatus {
                enabled: true,
                provider: Some("OpenAI-compatible".into()),
                model: Some("gpt-4o-mini".into()),
                ..ModuleStatus::default()
            },
        );
        *agent.status.lock() = Ok(snapshot);
        console.status().refresh().await.unwrap();

        let after = console.node_views();
        let changes = node_changes(&before, &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].id, "chat");
        assert!(!changes[0].was_enabled);
        assert!(changes[0].enabled);
        assert_eq!(changes[0].subtitle, "OpenAI-compatible · gpt-4o-mini");
    }

    #[tokio::test]
    async fn failed_status_poll_keeps_projection() {
        let agent = FakeAgent::new(vec![]);
        let console = console_with(&agent);

        let mut snapshot = StatusSnapshot::default();
        snapshot.modules.insert(
            "transcription".into(),
            ModuleStatus {
                enabled: true,
                ..ModuleStatus::default()
            },
        );
        *agent.status.lock() = Ok(snapshot);
        console.status().refresh().await.unwrap();

        *agent.status.lock() = Err(AgentError::Timeout);
        assert!(console.status().refresh().await.is_err());

        let views = console.node_views();
        assert!(views.iter().find(|v| v.id == "transcription").unwrap().enabled);
        assert!(console.status().view().stale);
    }
}
