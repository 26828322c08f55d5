//! Stop signal shared by the console's background pollers.
//!
//! Backed by a `watch` channel holding a single "stopping" flag, so a poller
//! that starts waiting after the signal fired still sees it.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    stopping: Arc<watch::Sender<bool>>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        let (stopping, _) = watch::channel(false);
        Self {
            stopping: Arc::new(stopping),
        }
    }
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.stopping.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.stopping.borrow()
    }

    /// Resolves once the signal has fired.
    pub async fn wait(&self) {
        let mut rx = self.stopping.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|stopping| *stopping).await;
    }

    /// `None` when shutdown fired before `task` finished; `task` is dropped.
    pub async fn run_until_triggered<T, F>(&self, task: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            result = task => Some(result),
            _ = self.wait() => None,
        }
    }

    /// Fire on the first Ctrl-C.
    pub fn trigger_on_ctrl_c(&self) -> JoinHandle<()> {
        let signal = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                received = tokio::signal::ctrl_c() => {
                    if received.is_ok() {
                        info!("Received Ctrl+C, stopping pollers");
                        signal.trigger();
                    }
                }
                _ = signal.wait() => {}
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn trigger_wakes_waiters() {
        let signal = ShutdownSignal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.wait().await })
        };

        tokio::task::yield_now().await;
        signal.trigger();
        waiter.await.unwrap();
        assert!(signal.is_triggered());
    }

    #[test]
    fn wait_stays_pending_until_triggered() {
        let signal = ShutdownSignal::new();
        let mut wait = tokio_test::task::spawn(signal.wait());

        tokio_test::assert_pending!(wait.poll());
        signal.trigger();
        assert!(wait.is_woken());
        tokio_test::assert_ready!(wait.poll());
    }

    #[tokio::test]
    async fn late_waiter_sees_earlier_trigger() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        signal.clone().wait().await;
    }

    #[tokio::test]
    async fn run_until_triggered_returns_result() {
        let signal = ShutdownSignal::new();
        assert_eq!(signal.run_until_triggered(async { 7 }).await, Some(7));
    }

    #[tokio::test]
    async fn run_until_triggered_drops_pending_task() {
        let signal = ShutdownSignal::new();
        signal.trigger();

        let result = signal
            .run_until_triggered(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                7
            })
            .await;

        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn ctrl_c_watcher_exits_when_triggered_elsewhere() {
        let signal = ShutdownSignal::new();
        let watcher = signal.trigger_on_ctrl_c();
        signal.trigger();
        watcher.await.unwrap();
    }
}
