//! Sync status snapshots and the observers that follow them.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// What the UI shows about synchronization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub is_online: bool,
    pub pending_count: usize,
    pub last_sync_attempt: Option<DateTime<Utc>>,
    /// Set when the queue could not be read; `pending_count` is then the
    /// last count that could.
    pub storage_error: Option<String>,
}

/// Queue totals for admin screens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OfflineStats {
    pub total_records: usize,
    pub synced_records: usize,
    pub last_sync_attempt: Option<DateTime<Utc>>,
}

/// A connectivity report from the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectivitySignal {
    pub is_connected: bool,
    pub is_internet_reachable: bool,
}

impl ConnectivitySignal {
    pub fn new(is_connected: bool, is_internet_reachable: bool) -> Self {
        Self {
            is_connected,
            is_internet_reachable,
        }
    }

    pub fn is_online(&self) -> bool {
        self.is_connected && self.is_internet_reachable
    }
}

impl From<bool> for ConnectivitySignal {
    fn from(online: bool) -> Self {
        Self::new(online, online)
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Callback = Arc<dyn Fn(&SyncStatus) + Send + Sync>;

/// Registered status callbacks plus the last snapshot they saw.
#[derive(Default)]
pub(crate) struct Observers {
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(ObserverId, Callback)>>,
    last: Mutex<Option<SyncStatus>>,
}

impl Observers {
    /// Register `callback` and call it once with `current`.
    pub(crate) fn add(
        &self,
        callback: impl Fn(&SyncStatus) + Send + Sync + 'static,
        current: &SyncStatus,
    ) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let callback: Callback = Arc::new(callback);
        self.callbacks.lock().push((id, callback.clone()));
        self.last.lock().get_or_insert_with(|| current.clone());
        callback(current);
        id
    }

    pub(crate) fn remove(&self, id: ObserverId) -> bool {
        let mut callbacks = self.callbacks.lock();
        let before = callbacks.len();
        callbacks.retain(|(observer, _)| *observer != id);
        callbacks.len() != before
    }

    /// Call every observer if `status` differs from the last published one.
    pub(crate) fn publish(&self, status: &SyncStatus) {
        {
            let mut last = self.last.lock();
            if last.as_ref() == Some(status) {
                return;
            }
            *last = Some(status.clone());
        }
        // Callbacks run without the registry lock so they may unsubscribe.
        let callbacks: Vec<Callback> = self
            .callbacks
            .lock()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            callback(status);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.callbacks.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(pending: usize) -> SyncStatus {
        SyncStatus {
            is_online: true,
            pending_count: pending,
            last_sync_attempt: None,
            storage_error: None,
        }
    }

    #[test]
    fn online_needs_both_flags() {
        assert!(ConnectivitySignal::new(true, true).is_online());
        assert!(!ConnectivitySignal::new(true, false).is_online());
        assert!(!ConnectivitySignal::new(false, true).is_online());
        assert!(ConnectivitySignal::from(true).is_online());
    }

    #[test]
    fn observers_see_changes_only() {
        let observers = Observers::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        observers.add(move |s| sink.lock().push(s.pending_count), &status(0));

        observers.publish(&status(0));
        observers.publish(&status(1));
        observers.publish(&status(1));
        observers.publish(&status(0));

        assert_eq!(*seen.lock(), vec![0, 1, 0]);
    }

    #[test]
    fn unsubscribed_observers_are_not_called() {
        let observers = Observers::default();
        let calls = Arc::new(AtomicU64::new(0));
        let counter = calls.clone();
        let id = observers.add(
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            &status(0),
        );

        assert!(observers.remove(id));
        assert!(!observers.remove(id));
        observers.publish(&status(3));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(observers.len(), 0);
    }
}
