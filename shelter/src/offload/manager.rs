use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use smol_str::SmolStr;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{Instrument, info_span, warn};

use super::policy::{OffloadConfig, TimeoutPolicy};
use crate::metrics;

/// Identifies one spawned task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OffloadKey {
    /// Task kind, e.g. `push_notification`.
    pub kind: SmolStr,
    /// Sequence number, unique per manager.
    pub id: u64,
}

/// Handle to a spawned offload task.
#[derive(Debug)]
pub struct OffloadHandle {
    handle: JoinHandle<()>,
}

impl OffloadHandle {
    /// Check if the task is finished.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Abort the task.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

#[derive(Debug)]
struct OffloadManagerInner {
    config: OffloadConfig,
    tasks: DashMap<OffloadKey, OffloadHandle>,
    key_counter: AtomicU64,
}

/// Spawns and tracks background tasks.
///
/// Clones share the same task table.
#[derive(Clone, Debug)]
pub struct OffloadManager {
    inner: Arc<OffloadManagerInner>,
}

impl OffloadManager {
    /// Create a new OffloadManager with the given configuration.
    pub fn new(config: OffloadConfig) -> Self {
        Self {
            inner: Arc::new(OffloadManagerInner {
                config,
                tasks: DashMap::new(),
                key_counter: AtomicU64::new(0),
            }),
        }
    }

    /// Spawns `task` under a fresh key of the given kind.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<F>(&self, kind: impl Into<SmolStr>, task: F) -> OffloadKey
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let key = OffloadKey {
            kind: kind.into(),
            id: self.inner.key_counter.fetch_add(1, Ordering::Relaxed),
        };
        metrics::record_offload_spawned(&key.kind);
        let (tracked, registered) = oneshot::channel();
        let handle = self.spawn_inner(task, key.clone(), registered);
        self.inner.tasks.insert(key.clone(), handle);
        // The task removes its own entry, so it must not start before the insert.
        let _ = tracked.send(());
        key
    }

    /// Number of tasks still running.
    pub fn active_task_count(&self) -> usize {
        self.inner.tasks.iter().filter(|e| !e.is_finished()).count()
    }

    /// Drops handles of finished tasks.
    pub fn cleanup_finished(&self) {
        self.inner.tasks.retain(|_, handle| !handle.is_finished());
    }

    /// Aborts every tracked task.
    pub fn cancel_all(&self) {
        for entry in self.inner.tasks.iter() {
            entry.abort();
        }
    }

    /// Waits until every tracked task has finished.
    pub async fn wait_all(&self) {
        loop {
            self.cleanup_finished();
            if self.inner.tasks.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
    }

    /// Like [`wait_all`](Self::wait_all), giving up after `timeout`.
    ///
    /// Returns `false` if tasks were still running.
    pub async fn wait_all_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_all()).await.is_ok()
    }

    fn spawn_inner<F>(
        &self,
        task: F,
        key: OffloadKey,
        registered: oneshot::Receiver<()>,
    ) -> OffloadHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let policy = self.inner.config.timeout_policy;
        let inner = self.inner.clone();
        let span = info_span!("offload_task", kind = %key.kind, id = key.id);

        let handle = tokio::spawn(
            async move {
                let _ = registered.await;
                let start = Instant::now();
                let timed_out = match policy {
                    TimeoutPolicy::None => {
                        task.await;
                        false
                    }
                    TimeoutPolicy::Cancel(limit) => {
                        let expired = tokio::time::timeout(limit, task).await.is_err();
                        if expired {
                            warn!(?key, "offload task cancelled due to timeout");
                        }
                        expired
                    }
                    TimeoutPolicy::Warn(limit) => {
                        task.await;
                        let elapsed = start.elapsed();
                        if elapsed > limit {
                            warn!(
                                ?key,
                                elapsed_ms = elapsed.as_millis(),
                                threshold_ms = limit.as_millis(),
                                "offload task exceeded timeout threshold"
                            );
                        }
                        false
                    }
                };
                inner.tasks.remove(&key);
                metrics::record_offload_finished(&key.kind, start.elapsed(), timed_out);
            }
            .instrument(span),
        );

        OffloadHandle { handle }
    }
}

impl Default for OffloadManager {
    fn default() -> Self {
        Self::new(OffloadConfig::default())
    }
}

impl shelter_core::Offload for OffloadManager {
    fn spawn<F>(&self, kind: impl Into<SmolStr>, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        OffloadManager::spawn(self, kind, future);
    }
}
