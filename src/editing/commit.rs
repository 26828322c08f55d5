//! Save-then-restart sequencing.
//!
//! ```text
//! Idle -> Saving -> Saved | SaveFailed
//! Saving -> Restarting -> Restarted | RestartFailed   (save and restart)
//! ```
//!
//! Settled states accept a new `Saving` (or a standalone `Restarting`); the
//! busy states reject every new request. Network work runs in a spawned task
//! so a commit whose caller went away still settles and refreshes the
//! catalog.

use super::ledger::EditLedger;
use crate::agent::{
    AgentApi, AgentError, ConfigCatalog, RestartResponse, SaveConfigResponse, StatusSnapshot,
};
use crate::sources::PolledSource;

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CommitPhase {
    Idle,
    Saving,
    Saved,
    SaveFailed,
    Restarting,
    Restarted,
    RestartFailed,
}

impl CommitPhase {
    /// A request is in flight.
    pub fn is_busy(self) -> bool {
        matches!(self, CommitPhase::Saving | CommitPhase::Restarting)
    }

    pub fn can_transition_to(self, next: CommitPhase) -> bool {
        use CommitPhase::*;
        match (self, next) {
            (from, Saving | Restarting | Idle) => !from.is_busy(),
            (Saving, Saved | SaveFailed) => true,
            (Restarting, Restarted | RestartFailed) => true,
            _ => false,
        }
    }
}

/// Result of a save that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The ledger was empty; nothing was sent.
    NothingToSave,
    Saved {
        /// Keys the agent reported as written.
        accepted: Vec<String>,
        /// Keys that were submitted but not written (unknown to the agent).
        ignored: Vec<String>,
    },
}

impl SaveOutcome {
    fn from_response(changes: &BTreeMap<String, String>, response: &SaveConfigResponse) -> Self {
        let submitted: Vec<String> = changes.keys().cloned().collect();
        if response.status.is_empty() && response.keys.is_empty() {
            // Unreadable body; the 2xx is all we know.
            return SaveOutcome::Saved {
                accepted: submitted,
                ignored: Vec::new(),
            };
        }
        let ignored = submitted
            .iter()
            .filter(|key| !response.keys.contains(key))
            .cloned()
            .collect();
        SaveOutcome::Saved {
            accepted: response.keys.clone(),
            ignored,
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved { .. })
    }
}

/// How a restart request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartOutcome {
    /// The agent acknowledged the restart.
    Restarted,
    /// The connection dropped or timed out, which is what a restarting
    /// agent looks like from here.
    Initiated,
    /// The agent answered with an error status, or could not be reached.
    Failed(AgentError),
}

impl RestartOutcome {
    fn classify(result: &Result<RestartResponse, AgentError>) -> Self {
        match result {
            Ok(_) => RestartOutcome::Restarted,
            Err(e) if e.is_ambiguous_restart() => RestartOutcome::Initiated,
            Err(e) => RestartOutcome::Failed(e.clone()),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RestartOutcome::Failed(_))
    }
}

/// Everything one commit did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport {
    pub save: SaveOutcome,
    /// `None` unless a restart was requested and the save went through.
    pub restart: Option<RestartOutcome>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommitError {
    #[error("a commit is already in flight ({0:?})")]
    Busy(CommitPhase),
    #[error("save failed: {0}")]
    Save(#[source] AgentError),
    #[error("commit task ended unexpectedly: {0}")]
    Interrupted(String),
}

/// Sequences config saves and restarts against the agent.
///
/// Clones share one phase, so at most one request is in flight across all
/// of them.
#[derive(Clone)]
pub struct CommitSequencer {
    api: Arc<dyn AgentApi>,
    catalog: PolledSource<ConfigCatalog>,
    status: PolledSource<StatusSnapshot>,
    phase: Arc<Mutex<CommitPhase>>,
}

impl CommitSequencer {
    pub fn new(
        api: Arc<dyn AgentApi>,
        catalog: PolledSource<ConfigCatalog>,
        status: PolledSource<StatusSnapshot>,
    ) -> Self {
        Self {
            api,
            catalog,
            status,
            phase: Arc::new(Mutex::new(CommitPhase::Idle)),
        }
    }

    pub fn phase(&self) -> CommitPhase {
        *self.phase.lock()
    }

    /// Return a settled sequencer to `Idle`. Does nothing while busy.
    pub fn reset(&self) {
        let mut phase = self.phase.lock();
        if phase.can_transition_to(CommitPhase::Idle) {
            *phase = CommitPhase::Idle;
        }
    }

    fn begin(&self, next: CommitPhase) -> Result<(), CommitError> {
        let mut phase = self.phase.lock();
        if !phase.can_transition_to(next) {
            return Err(CommitError::Busy(*phase));
        }
        *phase = next;
        Ok(())
    }

    /// Push the ledger's edits to the agent in one request.
    ///
    /// The ledger is cleared only after the agent accepted the write; on
    /// failure it is left exactly as it was.
    pub async fn save(&self, ledger: &mut EditLedger) -> Result<SaveOutcome, CommitError> {
        let (save, _) = self.commit(ledger, false).await?;
        Ok(save)
    }

    /// Save, then restart the agent only if the save went through.
    ///
    /// A failed restart does not undo the save; it is reported in
    /// [`CommitReport::restart`].
    pub async fn save_and_restart(
        &self,
        ledger: &mut EditLedger,
    ) -> Result<CommitReport, CommitError> {
        let (save, restart) = self.commit(ledger, true).await?;
        Ok(CommitReport { save, restart })
    }

    /// Save and, with `then_restart`, restart within the same task. The phase
    /// goes from `Saving` straight to `Restarting`, so no other request can
    /// claim the sequencer between the two steps.
    async fn commit(
        &self,
        ledger: &mut EditLedger,
        then_restart: bool,
    ) -> Result<(SaveOutcome, Option<RestartOutcome>), CommitError> {
        if !ledger.has_pending() {
            info!("No pending edits, nothing to save");
            return Ok((SaveOutcome::NothingToSave, None));
        }

        let changes = ledger.snapshot();
        self.begin(CommitPhase::Saving)?;
        info!("Saving {} config change(s)", changes.len());

        let api = self.api.clone();
        let catalog = self.catalog.clone();
        let status = self.status.clone();
        let phase = self.phase.clone();
        let payload = changes.clone();
        let task = tokio::spawn(async move {
            let result = api.save_config(&payload).await;
            if let Err(e) = &result {
                warn!("Config save failed: {}", e);
                settle(&phase, CommitPhase::SaveFailed);
                return (result, None);
            }

            if let Err(e) = catalog.refresh().await {
                warn!("Catalog refresh after save failed: {}", e);
            }
            if !then_restart {
                settle(&phase, CommitPhase::Saved);
                return (result, None);
            }

            hand_off_to_restart(&phase);
            let restart = restart_agent(api, catalog, status, phase).await;
            (result, Some(restart))
        });

        let (result, restart) = match task.await {
            Ok(done) => done,
            Err(e) => {
                let failed = if self.phase() == CommitPhase::Restarting {
                    CommitPhase::RestartFailed
                } else {
                    CommitPhase::SaveFailed
                };
                settle(&self.phase, failed);
                return Err(CommitError::Interrupted(e.to_string()));
            }
        };
        let response = result.map_err(CommitError::Save)?;

        ledger.clear();
        let outcome = SaveOutcome::from_response(&changes, &response);
        if let SaveOutcome::Saved { ignored, .. } = &outcome {
            if !ignored.is_empty() {
                warn!("Agent ignored unknown config keys: {}", ignored.join(", "));
            }
        }
        Ok((outcome, restart))
    }

    /// Ask the agent to restart, then invalidate both sources.
    pub async fn restart(&self) -> Result<RestartOutcome, CommitError> {
        self.begin(CommitPhase::Restarting)?;

        let task = tokio::spawn(restart_agent(
            self.api.clone(),
            self.catalog.clone(),
            self.status.clone(),
            self.phase.clone(),
        ));

        match task.await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                settle(&self.phase, CommitPhase::RestartFailed);
                Err(CommitError::Interrupted(e.to_string()))
            }
        }
    }
}

/// Issue the restart and settle. The phase must already be `Restarting`.
async fn restart_agent(
    api: Arc<dyn AgentApi>,
    catalog: PolledSource<ConfigCatalog>,
    status: PolledSource<StatusSnapshot>,
    phase: Arc<Mutex<CommitPhase>>,
) -> RestartOutcome {
    info!("Requesting agent restart");
    let outcome = RestartOutcome::classify(&api.restart().await);
    match &outcome {
        RestartOutcome::Restarted => info!("Agent acknowledged restart"),
        RestartOutcome::Initiated => {
            info!("Agent dropped the connection during restart, assuming it is restarting")
        }
        RestartOutcome::Failed(e) => warn!("Agent restart failed: {}", e),
    }
    settle(
        &phase,
        if outcome.is_failure() {
            CommitPhase::RestartFailed
        } else {
            CommitPhase::Restarted
        },
    );
    status.invalidate();
    catalog.invalidate();
    outcome
}

fn hand_off_to_restart(phase: &Mutex<CommitPhase>) {
    let mut phase = phase.lock();
    if *phase == CommitPhase::Saving {
        *phase = CommitPhase::Restarting;
    } else {
        warn!("Ignoring restart hand-off from {:?}", *phase);
    }
}

fn settle(phase: &Mutex<CommitPhase>, next: CommitPhase) {
    let mut phase = phase.lock();
    if phase.can_transition_to(next) {
        *phase = next;
    } else {
        warn!("Ignoring commit transition {:?} -> {:?}", *phase, next);
    }
}
