//! GitHub API response shapes and CI job records.
//!
//! Types prefixed with `Api` are internal deserialisation targets; they are
//! converted into domain types before leaving the gateway layer.

use serde::Deserialize;

/// A CI job as reported by the CI provider.
///
/// Every field is optional: records are validated by the failure extractor,
/// which skips entries missing an id or name rather than failing the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CiJob {
    /// Job identifier.
    pub id: Option<u64>,
    /// Job display name, e.g. `linux-jammy-py3.10-gcc11 / test (default, 1, 3, linux.2xlarge)`.
    pub name: Option<String>,
    /// Provider status (`queued`, `in_progress`, `completed`).
    pub status: Option<String>,
    /// Provider conclusion (`success`, `failure`, ...); absent while running.
    pub conclusion: Option<String>,
    /// Reference used to download the job log.
    pub log_reference: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiPullRequest {
    pub(crate) head: ApiBranch,
}

/// Issue search hit; pull requests are issues to the search API.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiIssue {
    pub(crate) number: u64,
    pub(crate) title: Option<String>,
    pub(crate) user: Option<ApiUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiUser {
    pub(crate) login: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiBranch {
    #[serde(rename = "ref")]
    pub(crate) branch: String,
    pub(crate) sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiGitRef {
    pub(crate) object: ApiGitObject,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiGitObject {
    pub(crate) sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiWorkflowRun {
    pub(crate) id: u64,
    pub(crate) name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiJob {
    pub(crate) id: Option<u64>,
    pub(crate) name: Option<String>,
    pub(crate) status: Option<String>,
    pub(crate) conclusion: Option<String>,
}

impl ApiIssue {
    pub(crate) fn author_is(&self, login: &str) -> bool {
        self.user
            .as_ref()
            .and_then(|user| user.login.as_deref())
            .is_some_and(|author| author.eq_ignore_ascii_case(login))
    }
}
