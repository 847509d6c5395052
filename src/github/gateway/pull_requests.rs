//! Octocrab implementation of the pull request gateway.

use async_trait::async_trait;
use octocrab::{Octocrab, Page};

use crate::error::PullmanError;
use crate::github::locator::{PersonalAccessToken, RepositoryLocator};
use crate::github::models::{ApiGitRef, ApiIssue, ApiPullRequest, ApiWorkflowRun};
use crate::pulls::{PullRequestSummary, StackMetadata};

use super::PullRequestGateway;
use super::client::build_octocrab_client;
use super::error_mapping::map_octocrab_error;

/// Issue search endpoint, relative to the API base.
const ISSUE_SEARCH_PATH: &str = "/search/issues";

/// Workflows whose runs are attributed to a pull request by default.
pub const DEFAULT_WORKFLOWS: [&str; 3] = ["pull", "trunk", "inductor"];

/// Octocrab-backed pull request gateway for one repository.
pub struct OctocrabPullRequestGateway {
    client: Octocrab,
    locator: RepositoryLocator,
    remote: String,
    workflows: Vec<String>,
}

impl OctocrabPullRequestGateway {
    /// Creates a new gateway from an Octocrab client.
    ///
    /// `remote` names the local git remote tracking refs are reported under;
    /// `workflows` filters CI runs by workflow name (empty keeps every run).
    #[must_use]
    pub fn new(
        client: Octocrab,
        locator: RepositoryLocator,
        remote: impl Into<String>,
        workflows: Vec<String>,
    ) -> Self {
        Self {
            client,
            locator,
            remote: remote.into(),
            workflows,
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
        remote: impl Into<String>,
        workflows: Vec<String>,
    ) -> Result<Self, PullmanError> {
        let octocrab = build_octocrab_client(token, locator.api_base().as_str())?;
        Ok(Self::new(octocrab, locator, remote, workflows))
    }

    async fn branch_head(&self, branch: &str, operation: &str) -> Result<String, PullmanError> {
        self.client
            .get::<ApiGitRef, _, _>(self.locator.branch_ref_path(branch), None::<&()>)
            .await
            .map(|git_ref| git_ref.object.sha)
            .map_err(|error| map_octocrab_error(operation, &error))
    }

    async fn run_ids_for(&self, head_sha: &str, operation: &str) -> Result<Vec<u64>, PullmanError> {
        let query = [("head_sha", head_sha), ("per_page", "100")];
        let page = self
            .client
            .get::<Page<ApiWorkflowRun>, _, _>(self.locator.workflow_runs_path(), Some(&query))
            .await
            .map_err(|error| map_octocrab_error(operation, &error))?;
        let runs = self
            .client
            .all_pages(page)
            .await
            .map_err(|error| map_octocrab_error(operation, &error))?;

        let mut run_ids: Vec<u64> = runs
            .into_iter()
            .filter(|run| self.is_tracked_workflow(run.name.as_deref()))
            .map(|run| run.id)
            .collect();
        run_ids.sort_unstable();
        run_ids.dedup();
        Ok(run_ids)
    }

    fn is_tracked_workflow(&self, name: Option<&str>) -> bool {
        if self.workflows.is_empty() {
            return true;
        }
        name.is_some_and(|workflow| self.workflows.iter().any(|tracked| tracked == workflow))
    }
}

#[async_trait]
impl PullRequestGateway for OctocrabPullRequestGateway {
    /// One author-scoped search rather than paging every open pull request.
    async fn list_open_pull_requests(
        &self,
        author: &str,
    ) -> Result<Vec<PullRequestSummary>, PullmanError> {
        let operation = format!("list open pull requests for {author}");
        let search = self.locator.open_pulls_query(author);
        let query = [("q", search.as_str()), ("per_page", "100")];
        let page = self
            .client
            .get::<Page<ApiIssue>, _, _>(ISSUE_SEARCH_PATH, Some(&query))
            .await
            .map_err(|error| map_octocrab_error(&operation, &error))?;
        let issues = self
            .client
            .all_pages(page)
            .await
            .map_err(|error| map_octocrab_error(&operation, &error))?;

        Ok(issues
            .into_iter()
            .filter(|issue| issue.author_is(author))
            .map(|issue| PullRequestSummary {
                id: issue.number,
                title: issue.title.unwrap_or_default(),
            })
            .collect())
    }

    async fn get_stack_metadata(&self, pull_request: u64) -> Result<StackMetadata, PullmanError> {
        let operation = format!("stack metadata for #{pull_request}");
        let pull = self
            .client
            .get::<ApiPullRequest, _, _>(self.locator.pull_request_path(pull_request), None::<&()>)
            .await
            .map_err(|error| map_octocrab_error(&operation, &error))?;

        let head_sha = pull.head.sha;
        let mut commit_hashes = Vec::with_capacity(2);
        if let Some(orig_branch) = ghstack_orig_branch(&pull.head.branch) {
            let orig_sha = self.branch_head(&orig_branch, &operation).await?;
            if orig_sha != head_sha {
                commit_hashes.push(orig_sha);
            }
        }
        commit_hashes.push(head_sha.clone());

        let ci_run_ids = self.run_ids_for(&head_sha, &operation).await?;

        Ok(StackMetadata {
            commit_hashes,
            ci_run_ids,
            git_ref: tracking_ref(&self.remote, &pull.head.branch),
        })
    }
}

/// Maps a ghstack head branch `gh/<user>/<n>/head` to its `orig` sibling.
fn ghstack_orig_branch(branch: &str) -> Option<String> {
    let stem = branch.strip_prefix("gh/")?.strip_suffix("/head")?;
    Some(format!("gh/{stem}/orig"))
}

/// Returns the local tracking ref for a pull request head branch.
fn tracking_ref(remote: &str, branch: &str) -> String {
    let tracked = ghstack_orig_branch(branch).unwrap_or_else(|| branch.to_owned());
    format!("{remote}/{tracked}")
}
