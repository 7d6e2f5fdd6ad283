//! Queue and reconciliation scenarios against in-process stores and sinks.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use questflow_offline::queue::QUEUE_KEY;
use questflow_offline::{
    ConnectivitySignal, DrainReport, FileStore, KeyValueStore, MemoryStore, OfflineSurveyRecord,
    SaveOutcome, Submission, SubmissionSink, SyncCoordinator, TestSink,
};
use questflow_types::Answers;
use tempfile::TempDir;
use tokio::sync::{Notify, watch};

fn answers(age_group: u32) -> Answers {
    let mut answers = Answers::new();
    answers.insert("AGE_GROUP", age_group);
    answers
}

#[tokio::test]
async fn queued_surveys_survive_a_restart() {
    let dir = TempDir::new().unwrap();
    let sink = TestSink::new();

    {
        let store = FileStore::open(dir.path()).await.unwrap();
        let coordinator = SyncCoordinator::new(store, sink.clone(), false);
        for age_group in [1, 2] {
            let outcome = coordinator.save_survey(answers(age_group), "Maël", None).await;
            assert!(outcome.saved_offline());
        }
    }

    let store = FileStore::open(dir.path()).await.unwrap();
    let coordinator = SyncCoordinator::new(store, sink.clone(), false);
    assert_eq!(coordinator.status().await.pending_count, 2);

    coordinator.on_connectivity_change(true).await;

    let delivered: Vec<_> = sink
        .received()
        .iter()
        .map(|s| s.responses.get_number("AGE_GROUP").unwrap())
        .collect();
    assert_eq!(delivered, vec![1.0, 2.0]);
    assert_eq!(coordinator.status().await.pending_count, 0);
    assert_eq!(coordinator.stats().await.unwrap().total_records, 0);
}

#[tokio::test]
async fn drain_counts_successes_and_failures() {
    let sink = TestSink::new();
    let coordinator = SyncCoordinator::new(MemoryStore::new(), sink.clone(), false);

    let mut ids = Vec::new();
    for age_group in 1..=5 {
        let outcome = coordinator.save_survey(answers(age_group), "Maël", None).await;
        ids.push(outcome.record_id().unwrap().to_string());
    }
    sink.fail_record(&ids[1]);
    sink.fail_record(&ids[3]);

    let report = coordinator.drain_pending().await;

    assert_eq!(
        report,
        DrainReport {
            synced_count: 3,
            failed_count: 2,
        }
    );
    let left: Vec<_> = coordinator
        .queue()
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(left, vec![ids[1].clone(), ids[3].clone()]);

    let sent: Vec<_> = sink.received().into_iter().map(|s| s.record_id).collect();
    assert_eq!(sent, vec![ids[0].clone(), ids[2].clone(), ids[4].clone()]);
}

#[tokio::test]
async fn reconnecting_drains_and_notifies_observers() {
    let sink = TestSink::new();
    let coordinator = SyncCoordinator::new(MemoryStore::new(), sink.clone(), false);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    coordinator
        .subscribe(move |status| log.lock().push((status.is_online, status.pending_count)))
        .await;

    let outcome = coordinator.save_survey(answers(3), "Maël", None).await;
    assert_eq!(outcome.message(), "Survey saved locally, synchronization pending");
    assert_eq!(sink.attempts(), 0);

    coordinator
        .on_connectivity_change(ConnectivitySignal::new(true, true))
        .await;

    assert_eq!(*seen.lock(), vec![(false, 0), (false, 1), (true, 0)]);
    assert_eq!(sink.received().len(), 1);
    assert!(coordinator.status().await.last_sync_attempt.is_some());
}

#[tokio::test]
async fn connected_without_internet_stays_offline() {
    let sink = TestSink::new();
    let coordinator = SyncCoordinator::new(MemoryStore::new(), sink.clone(), false);
    coordinator.save_survey(answers(1), "Maël", None).await;

    coordinator
        .on_connectivity_change(ConnectivitySignal::new(true, false))
        .await;

    assert!(!coordinator.is_online());
    assert_eq!(sink.attempts(), 0);
}

#[tokio::test]
async fn force_sync_offline_sends_nothing() {
    let sink = TestSink::new();
    let coordinator = SyncCoordinator::new(MemoryStore::new(), sink.clone(), false);
    coordinator.save_survey(answers(1), "Maël", None).await;

    assert!(!coordinator.force_sync().await);
    assert_eq!(sink.attempts(), 0);
    assert_eq!(coordinator.status().await.last_sync_attempt, None);
}

#[tokio::test]
async fn force_sync_reports_total_failure() {
    let sink = TestSink::new();
    sink.set_failing(true);
    let coordinator = SyncCoordinator::new(MemoryStore::new(), sink.clone(), true);
    coordinator.save_survey(answers(1), "Maël", None).await;

    assert!(!coordinator.force_sync().await);

    sink.set_failing(false);
    assert!(coordinator.force_sync().await);
    assert_eq!(coordinator.status().await.pending_count, 0);
}

#[tokio::test]
async fn corrupt_queue_fails_the_save_without_overwriting() {
    let store = MemoryStore::new();
    store.set(QUEUE_KEY, "[{\"id\":").await.unwrap();
    let sink = TestSink::new();
    let coordinator = SyncCoordinator::new(store.clone(), sink.clone(), true);

    let outcome = coordinator.save_survey(answers(1), "Maël", None).await;

    assert!(matches!(outcome, SaveOutcome::Failed { .. }));
    assert_eq!(store.raw(QUEUE_KEY).as_deref(), Some("[{\"id\":"));
    assert_eq!(sink.attempts(), 0);
}

#[tokio::test]
async fn delivered_but_unrecorded_is_sent_again() {
    let store = MemoryStore::new();
    let sink = TestSink::new();
    let coordinator = SyncCoordinator::new(store.clone(), sink.clone(), false);
    let outcome = coordinator.save_survey(answers(4), "Maël", None).await;
    let id = outcome.record_id().unwrap().to_string();

    store.fail_writes(true);
    let first = coordinator.drain_pending().await;
    assert_eq!(first.failed_count, 1);

    store.fail_writes(false);
    let second = coordinator.drain_pending().await;
    assert_eq!(second.synced_count, 1);

    let sent: Vec<_> = sink.received().into_iter().map(|s| s.record_id).collect();
    assert_eq!(sent, vec![id.clone(), id]);
}

#[tokio::test]
async fn delivered_record_appears_once_until_pruned() {
    let coordinator = SyncCoordinator::new(MemoryStore::new(), TestSink::new(), false);
    let record = OfflineSurveyRecord::new(answers(2), "Maël", None);
    coordinator.queue().enqueue(record.clone()).await.unwrap();

    coordinator.submit_now(&record).await.unwrap();

    let all = coordinator.queue().list_all().await.unwrap();
    assert_eq!(all.iter().filter(|r| r.id == record.id).count(), 1);
    assert!(all[0].synced);
    assert!(coordinator.queue().list_unsynced().await.unwrap().is_empty());

    assert_eq!(coordinator.queue().prune_synced().await.unwrap(), 1);
    assert!(coordinator.queue().list_all().await.unwrap().is_empty());
}

/// Blocks inside `submit` until released.
#[derive(Default)]
struct Gate {
    entered: Notify,
    release: Notify,
    calls: AtomicUsize,
}

#[derive(Clone, Default)]
struct GatedSink(Arc<Gate>);

#[async_trait]
impl SubmissionSink for GatedSink {
    type Error = std::io::Error;

    async fn submit(&self, submission: &Submission) -> Result<String, Self::Error> {
        self.0.calls.fetch_add(1, Ordering::SeqCst);
        self.0.entered.notify_one();
        self.0.release.notified().await;
        Ok(submission.record_id.clone())
    }
}

#[tokio::test]
async fn concurrent_drains_are_coalesced() {
    let sink = GatedSink::default();
    let coordinator = Arc::new(SyncCoordinator::new(
        MemoryStore::new(),
        sink.clone(),
        false,
    ));
    coordinator.save_survey(answers(1), "Maël", None).await;

    let running = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.on_connectivity_change(true).await }
    });
    sink.0.entered.notified().await;

    assert_eq!(coordinator.drain_pending().await, DrainReport::default());
    assert!(coordinator.is_online());
    assert!(!coordinator.force_sync().await);

    sink.0.release.notify_one();
    running.await.unwrap();
    assert_eq!(coordinator.status().await.pending_count, 0);
    assert_eq!(sink.0.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn connectivity_channel_drives_the_coordinator() {
    let sink = TestSink::new();
    let coordinator = Arc::new(SyncCoordinator::new(MemoryStore::new(), sink.clone(), true));
    let (tx, rx) = watch::channel(ConnectivitySignal::from(false));
    let task = coordinator.watch_connectivity(rx);

    tokio::time::timeout(Duration::from_secs(5), async {
        while coordinator.is_online() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    coordinator.save_survey(answers(5), "Maël", None).await;
    assert_eq!(sink.attempts(), 0);

    tx.send(ConnectivitySignal::new(true, true)).unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while sink.received().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    drop(tx);
    task.await.unwrap();
    assert_eq!(coordinator.status().await.pending_count, 0);
}
