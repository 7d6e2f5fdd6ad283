//! Offline persistence and background sync for completed surveys.
//!
//! A completed survey is written to an [`OfflineQueue`] before anything is sent
//! over the network. The [`SyncCoordinator`] then delivers queued records to a
//! [`SubmissionSink`] whenever connectivity allows, at least once per record.
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! use questflow_offline::{FileStore, HttpSink, SyncConfig, SyncCoordinator};
//!
//! let config = SyncConfig::load_or_default(None)?;
//! let store = FileStore::open(&config.data_dir).await?;
//! let sink = HttpSink::new("https://example.org/surveys", config.request_timeout())?;
//! let coordinator = SyncCoordinator::new(store, sink, config.assume_online);
//!
//! coordinator.subscribe(|status| println!("{} pending", status.pending_count)).await;
//! coordinator.force_sync().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod coordinator;
mod error;
pub mod queue;
mod record;
mod sink;
mod status;
mod store;

pub use config::{SyncConfig, default_data_dir};
pub use coordinator::{DrainReport, SaveOutcome, SyncCoordinator};
pub use error::{ConfigError, QueueError, StoreError, SyncError};
pub use queue::OfflineQueue;
pub use record::{OfflineSurveyRecord, Submission, new_record_id};
pub use sink::{HttpSink, HttpSinkError, SubmissionSink, TestSink, TestSinkError};
pub use status::{ConnectivitySignal, ObserverId, OfflineStats, SyncStatus};
pub use store::{FileStore, KeyValueStore, MemoryStore};
