//! Deterministic collaborators for unit and behavioural tests.
//!
//! The stubs count remote calls so tests can assert how often the cache was
//! bypassed, and can be told to fail for specific pull requests or runs.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::PullmanError;
use crate::github::{CiJob, PullRequestGateway, WorkflowGateway};
use crate::local::{CommitSha, EmbeddedReference, LocalRepository, LocalRepositoryError};
use crate::persistence::{CachedPullRequest, PersistenceError, PullRequestStore};
use crate::pulls::{PullRequest, PullRequestSummary, StackMetadata};
use crate::telemetry::{TelemetryEvent, TelemetrySink};

/// Telemetry sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl RecordingSink {
    /// Drains and returns the recorded events.
    #[must_use]
    pub fn take(&self) -> Vec<TelemetryEvent> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }
}

impl TelemetrySink for RecordingSink {
    fn record(&self, event: TelemetryEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Builds a hydrated pull request with a single commit and no CI runs.
#[must_use]
pub fn pull_request(id: u64, title: &str, commit: &str) -> PullRequest {
    PullRequest {
        id,
        title: title.to_owned(),
        commit_hashes: vec![commit.to_owned()],
        git_ref: format!("upstream/gh/alice/{id}/orig"),
        ci_run_ids: Vec::new(),
    }
}

/// Pull request gateway serving a fixed set of open pull requests.
#[derive(Debug, Default)]
pub struct StubPullRequestGateway {
    pull_requests: BTreeMap<u64, PullRequest>,
    failing: BTreeSet<u64>,
    listing_error: Option<PullmanError>,
    list_calls: AtomicUsize,
    metadata_calls: AtomicUsize,
}

impl StubPullRequestGateway {
    /// Creates a gateway listing `pull_requests` as open.
    #[must_use]
    pub fn new(pull_requests: impl IntoIterator<Item = PullRequest>) -> Self {
        Self {
            pull_requests: pull_requests
                .into_iter()
                .map(|pull_request| (pull_request.id, pull_request))
                .collect(),
            ..Self::default()
        }
    }

    /// Makes metadata fetches for `id` fail with `RemoteUnavailable`.
    #[must_use]
    pub fn failing_for(mut self, id: u64) -> Self {
        self.failing.insert(id);
        self
    }

    /// Makes the listing call fail with `error`.
    #[must_use]
    pub fn failing_listing(mut self, error: PullmanError) -> Self {
        self.listing_error = Some(error);
        self
    }

    /// Replaces or adds an open pull request.
    pub fn upsert(&mut self, pull_request: PullRequest) {
        self.pull_requests.insert(pull_request.id, pull_request);
    }

    /// Number of listing requests served.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of per-PR metadata fetches served.
    #[must_use]
    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PullRequestGateway for StubPullRequestGateway {
    async fn list_open_pull_requests(
        &self,
        _author: &str,
    ) -> Result<Vec<PullRequestSummary>, PullmanError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.listing_error {
            return Err(error.clone());
        }
        Ok(self
            .pull_requests
            .values()
            .map(|pull_request| PullRequestSummary {
                id: pull_request.id,
                title: pull_request.title.clone(),
            })
            .collect())
    }

    async fn get_stack_metadata(&self, pull_request: u64) -> Result<StackMetadata, PullmanError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&pull_request) {
            return Err(PullmanError::RemoteUnavailable {
                operation: format!("stack metadata for #{pull_request}"),
                message: "connection reset".to_owned(),
            });
        }
        self.pull_requests
            .get(&pull_request)
            .map(|found| StackMetadata {
                commit_hashes: found.commit_hashes.clone(),
                ci_run_ids: found.ci_run_ids.clone(),
                git_ref: found.git_ref.clone(),
            })
            .ok_or_else(|| PullmanError::RemoteUnavailable {
                operation: format!("stack metadata for #{pull_request}"),
                message: "404 Not Found".to_owned(),
            })
    }
}

/// In-memory [`PullRequestStore`] that can be switched into a failing mode.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<u64, CachedPullRequest>>,
    broken: bool,
}

impl MemoryStore {
    /// Creates a store whose every operation fails.
    #[must_use]
    pub fn broken() -> Self {
        Self {
            records: Mutex::default(),
            broken: true,
        }
    }

    /// Ids currently stored, ascending.
    #[must_use]
    pub fn ids(&self) -> Vec<u64> {
        self.records
            .lock()
            .map(|records| records.keys().copied().collect())
            .unwrap_or_default()
    }

    fn records(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<u64, CachedPullRequest>>, PersistenceError> {
        if self.broken {
            return Err(PersistenceError::ConnectionFailed {
                message: "unable to open database file".to_owned(),
            });
        }
        self.records
            .lock()
            .map_err(|error| PersistenceError::QueryFailed {
                message: error.to_string(),
            })
    }
}

impl PullRequestStore for MemoryStore {
    fn get(&self, pr_number: u64) -> Result<Option<CachedPullRequest>, PersistenceError> {
        Ok(self.records()?.get(&pr_number).cloned())
    }

    fn put(&self, pull_request: &PullRequest) -> Result<(), PersistenceError> {
        self.records()?.insert(
            pull_request.id,
            CachedPullRequest {
                pull_request: pull_request.clone(),
                fetched_at_unix: 0,
            },
        );
        Ok(())
    }

    fn invalidate(&self, pr_number: u64) -> Result<(), PersistenceError> {
        self.records()?.remove(&pr_number);
        Ok(())
    }

    fn invalidate_all(&self) -> Result<(), PersistenceError> {
        self.records()?.clear();
        Ok(())
    }
}

/// Local checkout stand-in with a fixed `HEAD`, revisions, and trailers.
#[derive(Debug, Default)]
pub struct StubLocalRepository {
    head: Option<CommitSha>,
    revisions: BTreeMap<String, CommitSha>,
    references: BTreeMap<String, EmbeddedReference>,
}

impl StubLocalRepository {
    /// Sets the commit `HEAD` resolves to.
    #[must_use]
    pub fn with_head(mut self, commit: &str) -> Self {
        self.head = Some(CommitSha::from(commit));
        self
    }

    /// Makes `revision` resolve to `commit`.
    #[must_use]
    pub fn with_revision(mut self, revision: &str, commit: &str) -> Self {
        self.revisions
            .insert(revision.to_owned(), CommitSha::from(commit));
        self
    }

    /// Attaches an embedded reference to `commit`'s message.
    #[must_use]
    pub fn with_reference(mut self, commit: &str, reference: EmbeddedReference) -> Self {
        self.references.insert(commit.to_owned(), reference);
        self
    }
}

impl LocalRepository for StubLocalRepository {
    fn resolve_revision(&self, token: &str) -> Result<Option<CommitSha>, LocalRepositoryError> {
        Ok(self.revisions.get(token).cloned())
    }

    fn current_head_commit(&self) -> Result<CommitSha, LocalRepositoryError> {
        self.head.clone().ok_or_else(|| LocalRepositoryError::Git {
            message: "reference 'refs/heads/main' not found".to_owned(),
        })
    }

    fn extract_embedded_pr_reference(
        &self,
        commit: &CommitSha,
    ) -> Result<Option<EmbeddedReference>, LocalRepositoryError> {
        Ok(self.references.get(commit.as_str()).cloned())
    }
}

/// Workflow gateway serving canned job listings and logs.
#[derive(Debug, Default)]
pub struct StubWorkflowGateway {
    jobs: BTreeMap<u64, Vec<CiJob>>,
    logs: BTreeMap<String, String>,
    list_calls: AtomicUsize,
}

impl StubWorkflowGateway {
    /// Registers the jobs listed for `run_id`.
    #[must_use]
    pub fn with_run(mut self, run_id: u64, jobs: Vec<CiJob>) -> Self {
        self.jobs.insert(run_id, jobs);
        self
    }

    /// Registers the log served for `log_reference`.
    #[must_use]
    pub fn with_log(mut self, log_reference: &str, log: &str) -> Self {
        self.logs.insert(log_reference.to_owned(), log.to_owned());
        self
    }

    /// Number of job listings served.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkflowGateway for StubWorkflowGateway {
    async fn list_jobs(&self, run_id: u64) -> Result<Vec<CiJob>, PullmanError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.jobs
            .get(&run_id)
            .cloned()
            .ok_or_else(|| PullmanError::RemoteUnavailable {
                operation: format!("job listing for run {run_id}"),
                message: "404 Not Found".to_owned(),
            })
    }

    async fn job_log(&self, log_reference: &str) -> Result<String, PullmanError> {
        self.logs
            .get(log_reference)
            .cloned()
            .ok_or_else(|| PullmanError::RemoteUnavailable {
                operation: format!("log download from {log_reference}"),
                message: "404 Not Found".to_owned(),
            })
    }
}

/// Builds a completed CI job record.
#[must_use]
pub fn ci_job(id: u64, name: &str, conclusion: Option<&str>) -> CiJob {
    CiJob {
        id: Some(id),
        name: Some(name.to_owned()),
        status: Some(if conclusion.is_some() { "completed" } else { "in_progress" }.to_owned()),
        conclusion: conclusion.map(str::to_owned),
        log_reference: Some(format!("logs/{id}")),
    }
}
