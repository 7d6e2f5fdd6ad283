//! Reconciles the offline queue with the remote sink.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use questflow_types::Answers;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{QueueError, SyncError};
use crate::queue::OfflineQueue;
use crate::record::{OfflineSurveyRecord, Submission};
use crate::sink::SubmissionSink;
use crate::status::{ConnectivitySignal, ObserverId, Observers, OfflineStats, SyncStatus};
use crate::store::KeyValueStore;

/// Result of one pass over the pending records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub synced_count: usize,
    pub failed_count: usize,
}

/// What happened to a survey handed to [`SyncCoordinator::save_survey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Stored and delivered.
    SyncedImmediately { record_id: String, remote_id: String },
    /// Stored; delivery will happen on a later drain.
    SavedOffline { record_id: String, reason: String },
    /// Not stored. The answers are lost unless the caller retries.
    Failed { reason: String },
}

impl SaveOutcome {
    /// The survey is safe on disk.
    pub fn success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    pub fn saved_offline(&self) -> bool {
        matches!(self, Self::SavedOffline { .. })
    }

    pub fn record_id(&self) -> Option<&str> {
        match self {
            Self::SyncedImmediately { record_id, .. } | Self::SavedOffline { record_id, .. } => {
                Some(record_id)
            }
            Self::Failed { .. } => None,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::SyncedImmediately { .. } => "Survey saved and synchronized",
            Self::SavedOffline { .. } => "Survey saved locally, synchronization pending",
            Self::Failed { .. } => "Could not save the survey",
        }
    }
}

/// Clears the drain flag when the pass ends, even if it unwinds.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the offline queue and pushes its records to a sink.
///
/// Construct one per process and share it behind an `Arc`.
pub struct SyncCoordinator<S, K> {
    queue: OfflineQueue<S>,
    sink: K,
    online: AtomicBool,
    draining: AtomicBool,
    last_pending: AtomicUsize,
    observers: Observers,
}

impl<S, K> SyncCoordinator<S, K>
where
    S: KeyValueStore,
    K: SubmissionSink,
{
    pub fn new(store: S, sink: K, initially_online: bool) -> Self {
        Self {
            queue: OfflineQueue::new(store),
            sink,
            online: AtomicBool::new(initially_online),
            draining: AtomicBool::new(false),
            last_pending: AtomicUsize::new(0),
            observers: Observers::default(),
        }
    }

    pub fn queue(&self) -> &OfflineQueue<S> {
        &self.queue
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Apply a connectivity report. Coming back online drains the queue.
    pub async fn on_connectivity_change(&self, signal: impl Into<ConnectivitySignal>) {
        let online = signal.into().is_online();
        let was_online = self.online.swap(online, Ordering::SeqCst);
        if online != was_online {
            info!(online, "connectivity changed");
        }
        if online && !was_online {
            self.drain_pending().await;
        } else {
            self.publish().await;
        }
    }

    /// Deliver one record and mark it synced.
    ///
    /// On failure the record stays queued for the next drain.
    pub async fn submit_now(&self, record: &OfflineSurveyRecord) -> Result<String, SyncError> {
        let submission = Submission::from(record);
        let remote_id = self
            .sink
            .submit(&submission)
            .await
            .map_err(|e| SyncError::Submission(e.into()))?;
        if !self.queue.mark_synced(&record.id).await? {
            warn!(id = %record.id, "delivered a record that is no longer queued");
        }
        debug!(id = %record.id, remote_id, "record delivered");
        Ok(remote_id)
    }

    /// Submit every pending record, oldest first.
    ///
    /// A drain already in progress makes this return an empty report at once.
    pub async fn drain_pending(&self) -> DrainReport {
        self.try_drain().await.unwrap_or_default()
    }

    /// `None` when another drain holds the gate.
    async fn try_drain(&self) -> Option<DrainReport> {
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("drain already running");
            return None;
        }
        let report = {
            let _guard = DrainGuard(&self.draining);
            self.drain_once().await
        };
        self.publish().await;
        Some(report)
    }

    async fn drain_once(&self) -> DrainReport {
        let mut report = DrainReport::default();
        let pending = match self.queue.list_unsynced().await {
            Ok(pending) => pending,
            Err(e) => {
                error!("cannot read offline queue: {e}");
                return report;
            }
        };
        if !pending.is_empty() {
            info!(count = pending.len(), "draining offline queue");
        }

        for record in &pending {
            match self.submit_now(record).await {
                Ok(_) => report.synced_count += 1,
                Err(e) => {
                    report.failed_count += 1;
                    warn!(id = %record.id, "sync failed: {e}");
                }
            }
        }

        if let Err(e) = self.queue.prune_synced().await {
            warn!("prune failed: {e}");
        }
        if let Err(e) = self.queue.record_sync_attempt(Utc::now()).await {
            warn!("cannot record sync attempt: {e}");
        }
        info!(
            synced = report.synced_count,
            failed = report.failed_count,
            "drain finished"
        );
        report
    }

    /// User-requested sync. `false` when offline, when another drain was
    /// already running or when nothing could be sent.
    pub async fn force_sync(&self) -> bool {
        if !self.is_online() {
            info!("offline, sync skipped");
            return false;
        }
        match self.try_drain().await {
            Some(report) => report.synced_count > 0 || report.failed_count == 0,
            None => false,
        }
    }

    pub async fn status(&self) -> SyncStatus {
        let (pending_count, storage_error) = match self.queue.pending_count().await {
            Ok(count) => {
                self.last_pending.store(count, Ordering::Relaxed);
                (count, None)
            }
            Err(e) => {
                warn!("cannot count pending surveys: {e}");
                (self.last_pending.load(Ordering::Relaxed), Some(e.to_string()))
            }
        };
        let last_sync_attempt = self.queue.last_sync_attempt().await.unwrap_or_else(|e| {
            warn!("cannot read sync status: {e}");
            None
        });
        SyncStatus {
            is_online: self.is_online(),
            pending_count,
            last_sync_attempt,
            storage_error,
        }
    }

    /// Register a status callback. It is called right away with the current
    /// status, then on every change.
    pub async fn subscribe(
        &self,
        callback: impl Fn(&SyncStatus) + Send + Sync + 'static,
    ) -> ObserverId {
        let current = self.status().await;
        self.observers.add(callback, &current)
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    async fn publish(&self) {
        let status = self.status().await;
        self.observers.publish(&status);
    }

    /// Persist a completed survey, then try to deliver it once if online.
    pub async fn save_survey(
        &self,
        answers: Answers,
        surveyor_name: impl Into<String>,
        started_at: Option<DateTime<Utc>>,
    ) -> SaveOutcome {
        let record = OfflineSurveyRecord::new(answers, surveyor_name, started_at);
        let record_id = record.id.clone();

        let outcome = if let Err(e) = self.queue.enqueue(record.clone()).await {
            error!(id = %record_id, "cannot save survey: {e}");
            SaveOutcome::Failed {
                reason: e.to_string(),
            }
        } else if !self.is_online() {
            info!(id = %record_id, "offline, survey kept for later");
            SaveOutcome::SavedOffline {
                record_id,
                reason: "offline".into(),
            }
        } else {
            match self.submit_now(&record).await {
                Ok(remote_id) => SaveOutcome::SyncedImmediately {
                    record_id,
                    remote_id,
                },
                Err(e) => {
                    warn!(id = %record_id, "immediate sync failed: {e}");
                    SaveOutcome::SavedOffline {
                        record_id,
                        reason: e.to_string(),
                    }
                }
            }
        };

        self.publish().await;
        outcome
    }

    pub async fn stats(&self) -> Result<OfflineStats, QueueError> {
        self.queue.stats().await
    }

    /// Drop every stored record and the sync status.
    pub async fn clear_offline_data(&self) -> Result<(), QueueError> {
        self.queue.clear().await?;
        info!("offline data cleared");
        self.publish().await;
        Ok(())
    }
}

impl<S, K> SyncCoordinator<S, K>
where
    S: KeyValueStore + 'static,
    K: SubmissionSink + 'static,
{
    /// Follow a connectivity channel on a background task.
    ///
    /// The current value is applied first. The task ends when the sender is dropped.
    pub fn watch_connectivity(
        self: &Arc<Self>,
        mut signals: watch::Receiver<ConnectivitySignal>,
    ) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            let initial = *signals.borrow_and_update();
            coordinator.on_connectivity_change(initial).await;
            while signals.changed().await.is_ok() {
                let signal = *signals.borrow_and_update();
                coordinator.on_connectivity_change(signal).await;
            }
            debug!("connectivity source closed");
        })
    }
}
