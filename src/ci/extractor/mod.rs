//! Failed CI job extraction for a resolved pull request.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::PullmanError;
use crate::github::{CiJob, WorkflowGateway};
use crate::pulls::PullRequest;

use super::job_name::{environment_markers, parse_job_name};
use super::log_scrape::{apply_markers, scrape_commands};

const FAILURE: &str = "failure";

/// How a failed job can be reproduced locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reproduction {
    /// Shell commands scraped from the job log, markers applied.
    Commands(Vec<String>),
    /// The job could not be turned into a command.
    NotAutoReproducible {
        /// Why no command was produced.
        reason: String,
    },
}

/// A CI job whose conclusion was `failure`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedJob {
    /// Job display name.
    pub job_name: String,
    /// Run the job belongs to.
    pub run_id: u64,
    /// Job identifier.
    pub job_id: u64,
    /// Reference used to download the job log, when the provider gave one.
    pub raw_log_reference: Option<String>,
    /// Best-effort reproduction.
    pub reproduction: Reproduction,
}

/// A job that has not concluded yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingJob {
    /// Job display name.
    pub job_name: String,
    /// Run the job belongs to.
    pub run_id: u64,
    /// Job identifier.
    pub job_id: u64,
}

/// Everything learnt from one extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Failed jobs, newest run first, in provider order within a run.
    pub failed: Vec<FailedJob>,
    /// Jobs still running when their run was last listed.
    pub pending: Vec<PendingJob>,
    /// Job records skipped for lacking an id or name.
    pub skipped: usize,
    /// Runs whose job listing could not be fetched.
    pub unreachable_runs: Vec<u64>,
}

/// Lists a pull request's CI runs and classifies their jobs.
pub struct FailureExtractor<'a, W: ?Sized> {
    workflows: &'a W,
    poll_interval: Option<Duration>,
}

struct ValidJob<'j> {
    id: u64,
    name: &'j str,
    job: &'j CiJob,
}

impl<'a, W> FailureExtractor<'a, W>
where
    W: WorkflowGateway + ?Sized,
{
    /// Creates an extractor that lists each run once.
    #[must_use]
    pub const fn new(workflows: &'a W) -> Self {
        Self {
            workflows,
            poll_interval: None,
        }
    }

    /// Re-lists a run every `interval` until none of its jobs are pending.
    ///
    /// A zero interval disables polling.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = (!interval.is_zero()).then_some(interval);
        self
    }

    /// Returns the failed jobs of `pull_request`'s runs, newest run first.
    ///
    /// # Errors
    ///
    /// See [`Self::extract`].
    pub async fn extract_failures(
        &self,
        pull_request: &PullRequest,
    ) -> Result<Vec<FailedJob>, PullmanError> {
        Ok(self.extract(pull_request).await?.failed)
    }

    /// Classifies every job of every run of `pull_request`.
    ///
    /// Bad job records are skipped and logged. A run whose listing fails is
    /// recorded in [`ExtractionReport::unreachable_runs`].
    ///
    /// # Errors
    ///
    /// - [`PullmanError::NoRuns`] when the pull request has no CI runs.
    /// - [`PullmanError::RemoteUnavailable`] when no run could be listed.
    /// - [`PullmanError::Authentication`] when the token is rejected.
    pub async fn extract(
        &self,
        pull_request: &PullRequest,
    ) -> Result<ExtractionReport, PullmanError> {
        if pull_request.ci_run_ids.is_empty() {
            return Err(PullmanError::NoRuns {
                pull_request: pull_request.id,
            });
        }

        let mut report = ExtractionReport::default();
        let mut last_error = None;
        for run_id in pull_request.runs_newest_first() {
            let jobs = match self.list_settled_jobs(run_id).await {
                Ok(jobs) => jobs,
                Err(error @ PullmanError::Authentication { .. }) => return Err(error),
                Err(error) => {
                    warn!(run_id, %error, "could not list CI jobs");
                    report.unreachable_runs.push(run_id);
                    last_error = Some(error);
                    continue;
                }
            };
            self.classify_run(run_id, &jobs, &mut report).await;
        }

        if report.unreachable_runs.len() == pull_request.ci_run_ids.len() {
            return Err(unreachable(pull_request.id, last_error));
        }
        Ok(report)
    }

    async fn list_settled_jobs(&self, run_id: u64) -> Result<Vec<CiJob>, PullmanError> {
        loop {
            let jobs = self.workflows.list_jobs(run_id).await?;
            let pending = jobs.iter().filter(|job| job.conclusion.is_none()).count();
            let Some(interval) = self.poll_interval.filter(|_| pending > 0) else {
                return Ok(jobs);
            };
            debug!(run_id, pending, ?interval, "waiting for CI jobs to finish");
            tokio::time::sleep(interval).await;
        }
    }

    async fn classify_run(&self, run_id: u64, jobs: &[CiJob], report: &mut ExtractionReport) {
        debug!(run_id, jobs = jobs.len(), "classifying CI jobs");
        for job in jobs {
            let Some(valid) = validate(job) else {
                warn!(run_id, ?job, "skipping CI job record without id or name");
                report.skipped = report.skipped.saturating_add(1);
                continue;
            };
            match job.conclusion.as_deref() {
                None => report.pending.push(PendingJob {
                    job_name: valid.name.to_owned(),
                    run_id,
                    job_id: valid.id,
                }),
                Some(FAILURE) => {
                    let reproduction = self.reproduce(&valid).await;
                    report.failed.push(FailedJob {
                        job_name: valid.name.to_owned(),
                        run_id,
                        job_id: valid.id,
                        raw_log_reference: job.log_reference.clone(),
                        reproduction,
                    });
                }
                Some(_) => {}
            }
        }
    }

    async fn reproduce(&self, valid: &ValidJob<'_>) -> Reproduction {
        let shard = match parse_job_name(valid.name).and_then(|name| name.test_shard()) {
            Ok(Some(shard)) => shard,
            Ok(None) => return not_reproducible("not a test job"),
            Err(error) => return not_reproducible(&error.to_string()),
        };
        let Some(reference) = valid.job.log_reference.as_deref() else {
            return not_reproducible("no log available");
        };
        let log = match self.workflows.job_log(reference).await {
            Ok(log) => log,
            Err(error) => {
                warn!(job_id = valid.id, %error, "could not download CI log");
                return not_reproducible(&format!("log download failed: {error}"));
            }
        };

        let markers = environment_markers(&shard.config);
        let commands: Vec<String> = scrape_commands(&log)
            .iter()
            .map(|command| apply_markers(command, &markers))
            .collect();
        if commands.is_empty() {
            return not_reproducible("no reproduction command in log");
        }
        Reproduction::Commands(commands)
    }
}

fn validate(job: &CiJob) -> Option<ValidJob<'_>> {
    let id = job.id?;
    let name = job.name.as_deref().filter(|name| !name.trim().is_empty())?;
    Some(ValidJob { id, name, job })
}

fn not_reproducible(reason: &str) -> Reproduction {
    Reproduction::NotAutoReproducible {
        reason: reason.to_owned(),
    }
}

fn unreachable(pull_request: u64, last_error: Option<PullmanError>) -> PullmanError {
    match last_error {
        Some(error @ PullmanError::RemoteUnavailable { .. }) => error,
        Some(error) => PullmanError::RemoteUnavailable {
            operation: format!("CI job listing for #{pull_request}"),
            message: error.to_string(),
        },
        None => PullmanError::NoRuns { pull_request },
    }
}
