//! The durable offline queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::QueueError;
use crate::record::OfflineSurveyRecord;
use crate::status::OfflineStats;
use crate::store::KeyValueStore;

/// Storage key holding the JSON array of records.
pub const QUEUE_KEY: &str = "@offline_surveys";
/// Storage key holding the last sync attempt.
pub const SYNC_STATUS_KEY: &str = "@sync_status";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSyncStatus {
    last_sync_attempt: Option<DateTime<Utc>>,
}

/// Completed surveys persisted locally until delivered.
///
/// Every mutation is a read-modify-write of the whole array under one async
/// mutex, so concurrent callers never lose each other's writes.
pub struct OfflineQueue<S> {
    store: S,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> OfflineQueue<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn load(&self) -> Result<Vec<OfflineSurveyRecord>, QueueError> {
        match self.store.get(QUEUE_KEY).await? {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|source| QueueError::Corrupt {
                key: QUEUE_KEY,
                source,
            }),
        }
    }

    async fn save(&self, records: &[OfflineSurveyRecord]) -> Result<(), QueueError> {
        let raw = serde_json::to_string(records).map_err(QueueError::Encode)?;
        self.store.set(QUEUE_KEY, &raw).await?;
        Ok(())
    }

    /// Append a record. Durable once this returns `Ok`.
    ///
    /// Fails without touching storage when the existing queue cannot be read.
    pub async fn enqueue(&self, record: OfflineSurveyRecord) -> Result<(), QueueError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        if records.iter().any(|r| r.id == record.id) {
            return Err(QueueError::Duplicate(record.id));
        }
        debug!(id = %record.id, queued = records.len() + 1, "enqueue survey");
        records.push(record);
        self.save(&records).await
    }

    /// Records not yet delivered, oldest first.
    pub async fn list_unsynced(&self) -> Result<Vec<OfflineSurveyRecord>, QueueError> {
        let mut records = self.load().await?;
        records.retain(|r| !r.synced);
        Ok(records)
    }

    pub async fn list_all(&self) -> Result<Vec<OfflineSurveyRecord>, QueueError> {
        self.load().await
    }

    pub async fn pending_count(&self) -> Result<usize, QueueError> {
        Ok(self.load().await?.iter().filter(|r| !r.synced).count())
    }

    /// Flag a record as delivered. Returns `false` if no record has that id.
    pub async fn mark_synced(&self, id: &str) -> Result<bool, QueueError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            warn!(id, "mark_synced: no such record");
            return Ok(false);
        };
        if record.synced {
            return Ok(true);
        }
        record.synced = true;
        self.save(&records).await?;
        Ok(true)
    }

    /// Drop delivered records, returning how many were removed.
    pub async fn prune_synced(&self) -> Result<usize, QueueError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        let before = records.len();
        records.retain(|r| !r.synced);
        let removed = before - records.len();
        if removed > 0 {
            self.save(&records).await?;
            debug!(removed, "pruned synced surveys");
        }
        Ok(removed)
    }

    pub async fn stats(&self) -> Result<OfflineStats, QueueError> {
        let records = self.load().await?;
        Ok(OfflineStats {
            total_records: records.len(),
            synced_records: records.iter().filter(|r| r.synced).count(),
            last_sync_attempt: self.last_sync_attempt().await?,
        })
    }

    /// Remove every record and the sync status.
    pub async fn clear(&self) -> Result<(), QueueError> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(QUEUE_KEY).await?;
        self.store.remove(SYNC_STATUS_KEY).await?;
        Ok(())
    }

    pub async fn last_sync_attempt(&self) -> Result<Option<DateTime<Utc>>, QueueError> {
        match self.store.get(SYNC_STATUS_KEY).await? {
            None => Ok(None),
            Some(raw) => serde_json::from_str::<StoredSyncStatus>(&raw)
                .map(|status| status.last_sync_attempt)
                .map_err(|source| QueueError::Corrupt {
                    key: SYNC_STATUS_KEY,
                    source,
                }),
        }
    }

    pub async fn record_sync_attempt(&self, at: DateTime<Utc>) -> Result<(), QueueError> {
        let _guard = self.write_lock.lock().await;
        let status = StoredSyncStatus {
            last_sync_attempt: Some(at),
        };
        let raw = serde_json::to_string(&status).map_err(QueueError::Encode)?;
        self.store.set(SYNC_STATUS_KEY, &raw).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use questflow_types::Answers;

    fn record(surveyor: &str) -> OfflineSurveyRecord {
        OfflineSurveyRecord::new(Answers::new(), surveyor, None)
    }

    fn ids(records: &[OfflineSurveyRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[tokio::test]
    async fn unsynced_records_keep_insertion_order() {
        let queue = OfflineQueue::new(MemoryStore::new());
        let (a, b, c) = (record("a"), record("b"), record("c"));
        for r in [&a, &b, &c] {
            queue.enqueue(r.clone()).await.unwrap();
        }

        assert!(queue.mark_synced(&b.id).await.unwrap());
        let unsynced = queue.list_unsynced().await.unwrap();
        assert_eq!(ids(&unsynced), vec![a.id.as_str(), c.id.as_str()]);
        assert_eq!(queue.pending_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn prune_removes_only_synced() {
        let queue = OfflineQueue::new(MemoryStore::new());
        let (a, b) = (record("a"), record("b"));
        queue.enqueue(a.clone()).await.unwrap();
        queue.enqueue(b.clone()).await.unwrap();
        queue.mark_synced(&a.id).await.unwrap();

        assert_eq!(queue.prune_synced().await.unwrap(), 1);
        assert_eq!(ids(&queue.list_all().await.unwrap()), vec![b.id.as_str()]);
        assert_eq!(queue.prune_synced().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn marking_an_unknown_record_is_reported() {
        let queue = OfflineQueue::new(MemoryStore::new());
        assert!(!queue.mark_synced("survey_0_missing").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_ids_are_refused() {
        let queue = OfflineQueue::new(MemoryStore::new());
        let a = record("a");
        queue.enqueue(a.clone()).await.unwrap();
        assert!(matches!(
            queue.enqueue(a).await,
            Err(QueueError::Duplicate(_))
        ));
        assert_eq!(queue.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn corrupt_queue_is_never_overwritten() {
        let store = MemoryStore::new();
        store.set(QUEUE_KEY, "{not json").await.unwrap();
        let queue = OfflineQueue::new(store.clone());

        let err = queue.enqueue(record("a")).await.unwrap_err();
        assert!(matches!(err, QueueError::Corrupt { key: QUEUE_KEY, .. }));
        assert_eq!(store.raw(QUEUE_KEY).as_deref(), Some("{not json"));
    }

    #[tokio::test]
    async fn failed_write_leaves_queue_untouched() {
        let store = MemoryStore::new();
        let queue = OfflineQueue::new(store.clone());
        queue.enqueue(record("a")).await.unwrap();

        store.fail_writes(true);
        assert!(matches!(
            queue.enqueue(record("b")).await,
            Err(QueueError::Store(_))
        ));
        assert_eq!(queue.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stats_and_sync_attempt() {
        let queue = OfflineQueue::new(MemoryStore::new());
        let a = record("a");
        queue.enqueue(a.clone()).await.unwrap();
        queue.enqueue(record("b")).await.unwrap();
        queue.mark_synced(&a.id).await.unwrap();
        let at = Utc::now();
        queue.record_sync_attempt(at).await.unwrap();

        let stats = queue.stats().await.unwrap();
        assert_eq!(
            stats,
            OfflineStats {
                total_records: 2,
                synced_records: 1,
                last_sync_attempt: Some(at),
            }
        );

        queue.clear().await.unwrap();
        assert_eq!(queue.stats().await.unwrap(), OfflineStats::default());
    }

    #[tokio::test]
    async fn concurrent_enqueues_are_all_kept() {
        let queue = std::sync::Arc::new(OfflineQueue::new(MemoryStore::new()));
        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let queue = queue.clone();
                tokio::spawn(async move { queue.enqueue(record(&format!("s{i}"))).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(queue.pending_count().await.unwrap(), 16);
    }
}
