//! Periodically refreshed read caches over the agent's read endpoints.
//!
//! Each source owns one immutable value per version. A failed fetch keeps the
//! last good value visible and records the error; readers never observe a
//! partially updated value.

use crate::agent::{AgentApi, AgentError, ConfigCatalog, StatusSnapshot};
use crate::config::PollingConfig;
use crate::infra::shutdown::ShutdownSignal;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, AgentError>> + Send + Sync>;

/// What a reader sees of a source at one instant.
#[derive(Debug, Clone)]
pub struct SourceView<T> {
    /// Last successfully fetched value, kept across failed polls.
    pub value: Option<Arc<T>>,
    /// Bumped on every successful fetch.
    pub version: u64,
    pub fetched_at: Option<DateTime<Utc>>,
    /// Error of the most recent fetch, cleared by the next success.
    pub error: Option<AgentError>,
    pub stale: bool,
    pub refreshing: bool,
}

struct SourceState<T> {
    value: Option<Arc<T>>,
    version: u64,
    fetched_at: Option<DateTime<Utc>>,
    error: Option<AgentError>,
    refreshing: bool,
}

struct SourceInner<T> {
    name: &'static str,
    interval: Duration,
    stale_after: Duration,
    fetch: FetchFn<T>,
    state: RwLock<SourceState<T>>,
    /// Held for the duration of a fetch so refreshes never overlap.
    refresh_gate: Mutex<()>,
    invalidated: Notify,
    versions: watch::Sender<u64>,
}

/// Holds `refreshing` up for one fetch. Clears it on drop, including when the
/// refresh future is dropped mid-fetch.
struct InFlight<'a, T> {
    state: &'a RwLock<SourceState<T>>,
}

impl<'a, T> InFlight<'a, T> {
    fn start(state: &'a RwLock<SourceState<T>>) -> Self {
        state.write().refreshing = true;
        Self { state }
    }
}

impl<T> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        self.state.write().refreshing = false;
    }
}

/// A read-through cache refreshed on an interval or on invalidation.
pub struct PolledSource<T> {
    inner: Arc<SourceInner<T>>,
}

impl<T> Clone for PolledSource<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> PolledSource<T> {
    pub fn new<F>(
        name: &'static str,
        interval: Duration,
        stale_after_intervals: u32,
        fetch: F,
    ) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<T, AgentError>> + Send + Sync + 'static,
    {
        let (versions, _) = watch::channel(0);
        Self {
            inner: Arc::new(SourceInner {
                name,
                interval,
                stale_after: interval * stale_after_intervals.max(1),
                fetch: Arc::new(fetch),
                state: RwLock::new(SourceState {
                    value: None,
                    version: 0,
                    fetched_at: None,
                    error: None,
                    refreshing: false,
                }),
                refresh_gate: Mutex::new(()),
                invalidated: Notify::new(),
                versions,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// The last good value, if any fetch has succeeded yet.
    pub fn latest(&self) -> Option<Arc<T>> {
        self.inner.state.read().value.clone()
    }

    pub fn view(&self) -> SourceView<T> {
        let state = self.inner.state.read();
        let stale = state.error.is_some()
            || match state.fetched_at {
                Some(at) => chrono::Duration::from_std(self.inner.stale_after)
                    .map(|limit| Utc::now() - at > limit)
                    .unwrap_or(false),
                None => true,
            };
        SourceView {
            value: state.value.clone(),
            version: state.version,
            fetched_at: state.fetched_at,
            error: state.error.clone(),
            stale,
            refreshing: state.refreshing,
        }
    }

    /// Receiver that observes the version number after each successful fetch.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.versions.subscribe()
    }

    /// Fetch now. Concurrent callers queue behind the fetch in flight.
    ///
    /// On failure the previous value stays in place and the error is recorded.
    pub async fn refresh(&self) -> Result<Arc<T>, AgentError> {
        let _gate = self.inner.refresh_gate.lock().await;
        let in_flight = InFlight::start(&self.inner.state);

        let result = (self.inner.fetch)().await;

        drop(in_flight);
        let mut state = self.inner.state.write();
        match result {
            Ok(value) => {
                let value = Arc::new(value);
                state.value = Some(value.clone());
                state.version += 1;
                state.fetched_at = Some(Utc::now());
                if state.error.take().is_some() {
                    info!("{} source recovered", self.inner.name);
                }
                let version = state.version;
                drop(state);
                self.inner.versions.send_replace(version);
                debug!("{} source at version {}", self.inner.name, version);
                Ok(value)
            }
            Err(e) => {
                warn!("{} fetch failed, keeping last value: {}", self.inner.name, e);
                state.error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Ask the running poller to refetch without waiting for its interval.
    pub fn invalidate(&self) {
        self.inner.invalidated.notify_one();
    }

    /// Poll until `shutdown` fires: fetch, then sleep for the interval or
    /// until invalidated.
    pub fn spawn_poller(&self, shutdown: ShutdownSignal) -> JoinHandle<()> {
        let source = self.clone();
        tokio::spawn(async move {
            info!(
                "Polling {} every {}ms",
                source.name(),
                source.interval().as_millis()
            );
            loop {
                if shutdown.run_until_triggered(source.refresh()).await.is_none() {
                    break;
                }
                tokio::select! {
                    _ = tokio::time::sleep(source.inner.interval) => {}
                    _ = source.inner.invalidated.notified() => {
                        debug!("{} invalidated", source.name());
                    }
                    _ = shutdown.wait() => break,
                }
            }
            debug!("{} poller stopped", source.name());
        })
    }
}

/// Status source backed by `GET /api/status`.
pub fn status_source(
    api: Arc<dyn AgentApi>,
    polling: &PollingConfig,
) -> PolledSource<StatusSnapshot> {
    PolledSource::new(
        "status",
        polling.status_interval(),
        polling.stale_after_intervals,
        move || {
            let api = api.clone();
            async move { api.status().await }.boxed()
        },
    )
}

/// Config catalog source backed by `GET /api/config`.
pub fn catalog_source(
    api: Arc<dyn AgentApi>,
    polling: &PollingConfig,
) -> PolledSource<ConfigCatalog> {
    PolledSource::new(
        "catalog",
        polling.catalog_interval(),
        polling.stale_after_intervals,
        move || {
            let api = api.clone();
            async move { api.config().await }.boxed()
        },
    )
}
