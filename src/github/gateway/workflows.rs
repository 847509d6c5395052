//! Octocrab implementation of the CI workflow gateway.

use async_trait::async_trait;
use http::Uri;
use octocrab::{Octocrab, Page};

use crate::error::PullmanError;
use crate::github::locator::{PersonalAccessToken, RepositoryLocator};
use crate::github::models::{ApiJob, CiJob};

use super::WorkflowGateway;
use super::client::build_octocrab_client;
use super::error_mapping::{map_http_error, map_octocrab_error};
use super::http_utils::{extract_github_message, redirect_target};

/// Octocrab-backed access to GitHub Actions jobs and logs.
pub struct OctocrabWorkflowGateway {
    client: Octocrab,
    locator: RepositoryLocator,
    downloads: reqwest::Client,
}

impl OctocrabWorkflowGateway {
    /// Creates a new gateway from an Octocrab client.
    #[must_use]
    pub fn new(client: Octocrab, locator: RepositoryLocator) -> Self {
        Self {
            client,
            locator,
            downloads: reqwest::Client::new(),
        }
    }

    /// Builds an Octocrab client for the repository, anonymous when `token`
    /// is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`PullmanError`] when the client cannot be constructed.
    pub fn for_token(
        token: Option<&PersonalAccessToken>,
        locator: RepositoryLocator,
    ) -> Result<Self, PullmanError> {
        let octocrab = build_octocrab_client(token, locator.api_base().as_str())?;
        Ok(Self::new(octocrab, locator))
    }

    /// Log archives are served from pre-signed storage URLs that must be
    /// fetched without GitHub credentials.
    async fn download(&self, target: &str, operation: &str) -> Result<String, PullmanError> {
        let remote_unavailable = |error: reqwest::Error| PullmanError::RemoteUnavailable {
            operation: operation.to_owned(),
            message: error.to_string(),
        };

        self.downloads
            .get(target)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(remote_unavailable)?
            .text()
            .await
            .map_err(remote_unavailable)
    }
}

#[async_trait]
impl WorkflowGateway for OctocrabWorkflowGateway {
    async fn list_jobs(&self, run_id: u64) -> Result<Vec<CiJob>, PullmanError> {
        let operation = format!("list jobs for run {run_id}");
        let query = [("per_page", "100")];
        let page = self
            .client
            .get::<Page<ApiJob>, _, _>(self.locator.run_jobs_path(run_id), Some(&query))
            .await
            .map_err(|error| map_octocrab_error(&operation, &error))?;
        let jobs = self
            .client
            .all_pages(page)
            .await
            .map_err(|error| map_octocrab_error(&operation, &error))?;

        Ok(jobs
            .into_iter()
            .map(|job| CiJob {
                log_reference: job.id.map(|id| self.locator.job_logs_path(id)),
                id: job.id,
                name: job.name,
                status: job.status,
                conclusion: job.conclusion,
            })
            .collect())
    }

    async fn job_log(&self, log_reference: &str) -> Result<String, PullmanError> {
        let operation = format!("download log {log_reference}");
        let uri: Uri = log_reference
            .parse::<Uri>()
            .map_err(|error| PullmanError::RemoteUnavailable {
                operation: operation.clone(),
                message: error.to_string(),
            })?;

        let response = self
            .client
            ._get_with_headers(uri, None)
            .await
            .map_err(|error| map_octocrab_error(&operation, &error))?;

        let status = response.status();
        if let Some(target) = redirect_target(status, response.headers()) {
            return self.download(&target, &operation).await;
        }

        if status.is_success() {
            return self
                .client
                .body_to_string(response)
                .await
                .map_err(|error| map_octocrab_error(&operation, &error));
        }

        let body = self
            .client
            .body_to_string(response)
            .await
            .unwrap_or_else(|_| String::new());
        Err(map_http_error(
            &operation,
            status,
            extract_github_message(&body),
        ))
    }
}
