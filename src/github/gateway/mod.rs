//! Gateways for loading pull request and CI data through Octocrab.
//!
//! The traits are the seams the index, resolver, and failure extractor depend
//! on; the Octocrab implementations handle the real HTTP requests and are
//! exercised against `wiremock` servers in tests.

mod client;
mod error_mapping;
mod http_utils;
mod pull_requests;
mod workflows;

pub use pull_requests::{DEFAULT_WORKFLOWS, OctocrabPullRequestGateway};
pub use workflows::OctocrabWorkflowGateway;

use async_trait::async_trait;

use crate::error::PullmanError;
use crate::github::models::CiJob;
use crate::pulls::{PullRequestSummary, StackMetadata};

/// Remote source of pull request listings and per-PR stack metadata.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PullRequestGateway: Send + Sync {
    /// List the open pull requests authored by `author`.
    async fn list_open_pull_requests(
        &self,
        author: &str,
    ) -> Result<Vec<PullRequestSummary>, PullmanError>;

    /// Fetch commit hashes and CI run identifiers for one pull request.
    async fn get_stack_metadata(&self, pull_request: u64) -> Result<StackMetadata, PullmanError>;
}

/// CI provider access for job listings and logs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkflowGateway: Send + Sync {
    /// List every job recorded for `run_id`.
    async fn list_jobs(&self, run_id: u64) -> Result<Vec<CiJob>, PullmanError>;

    /// Download the plain-text log behind `log_reference`.
    async fn job_log(&self, log_reference: &str) -> Result<String, PullmanError>;
}
