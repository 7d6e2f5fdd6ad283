//! Remote destinations for completed surveys.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::record::Submission;

/// Delivers a submission and returns the id the remote side assigned to it.
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    type Error: Into<anyhow::Error> + Send;

    async fn submit(&self, submission: &Submission) -> Result<String, Self::Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum HttpSinkError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Submission rejected with status {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Deserialize)]
struct Created {
    id: String,
}

/// POSTs submissions as JSON to a fixed URL.
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: Client,
    endpoint: String,
}

impl HttpSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, HttpSinkError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SubmissionSink for HttpSink {
    type Error = HttpSinkError;

    async fn submit(&self, submission: &Submission) -> Result<String, Self::Error> {
        debug!(endpoint = %self.endpoint, record = %submission.record_id, "POST submission");
        let response = self
            .client
            .post(&self.endpoint)
            .json(submission)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpSinkError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let created: Created = response.json().await?;
        Ok(created.id)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Simulated submission failure for {0}")]
pub struct TestSinkError(pub String);

#[derive(Debug, Default)]
struct TestSinkState {
    received: Vec<Submission>,
    attempts: usize,
    offline: bool,
    failing: HashSet<String>,
}

/// In-process sink that records what it receives.
///
/// Clones share state. Failures are switched on globally with
/// [`TestSink::set_failing`] or per record with [`TestSink::fail_record`].
#[derive(Debug, Clone, Default)]
pub struct TestSink {
    state: Arc<Mutex<TestSinkState>>,
}

impl TestSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.lock().offline = failing;
    }

    pub fn fail_record(&self, record_id: impl Into<String>) {
        self.state.lock().failing.insert(record_id.into());
    }

    /// Successfully delivered submissions, in arrival order.
    pub fn received(&self) -> Vec<Submission> {
        self.state.lock().received.clone()
    }

    /// Every call to `submit`, successful or not.
    pub fn attempts(&self) -> usize {
        self.state.lock().attempts
    }
}

#[async_trait]
impl SubmissionSink for TestSink {
    type Error = TestSinkError;

    async fn submit(&self, submission: &Submission) -> Result<String, Self::Error> {
        let mut state = self.state.lock();
        state.attempts += 1;
        if state.offline || state.failing.contains(&submission.record_id) {
            return Err(TestSinkError(submission.record_id.clone()));
        }
        state.received.push(submission.clone());
        Ok(format!("remote-{}", state.received.len()))
    }
}
