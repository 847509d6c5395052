//! Pull request records and the per-session index over them.
//!
//! A [`PullRequest`] is the fully hydrated view of one open pull request in a
//! stack: its title, the commits that belong to it, the remote tracking ref,
//! and the CI runs recorded against it. Records are produced by the GitHub
//! gateway, persisted by the cache store, and served through
//! [`PullRequestIndex`].

mod index;

pub use index::{IndexPopulation, PullRequestIndex};

use serde::{Deserialize, Serialize};

/// Minimum length of a commit prefix accepted for abbreviated lookups.
pub const MIN_COMMIT_PREFIX_LEN: usize = 7;

/// A fully hydrated open pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// Pull request number, unique within the repository.
    pub id: u64,
    /// Pull request title as shown on GitHub.
    pub title: String,
    /// Commit SHAs associated with this pull request. The first entry is the
    /// commit the tracking ref points at.
    pub commit_hashes: Vec<String>,
    /// Remote tracking ref, e.g. `upstream/gh/alice/12/orig`.
    pub git_ref: String,
    /// CI run identifiers, oldest first.
    pub ci_run_ids: Vec<u64>,
}

impl PullRequest {
    /// Returns the commit the tracking ref points at.
    #[must_use]
    pub fn tracking_commit(&self) -> Option<&str> {
        self.commit_hashes.first().map(String::as_str)
    }

    /// Returns true when `sha` is one of this pull request's commits.
    #[must_use]
    pub fn contains_commit(&self, sha: &str) -> bool {
        self.commit_hashes.iter().any(|hash| hash == sha)
    }

    /// Returns true when `prefix` abbreviates one of this pull request's
    /// commits. Prefixes shorter than [`MIN_COMMIT_PREFIX_LEN`] never match.
    #[must_use]
    pub fn matches_commit_prefix(&self, prefix: &str) -> bool {
        prefix.len() >= MIN_COMMIT_PREFIX_LEN
            && self
                .commit_hashes
                .iter()
                .any(|hash| hash.starts_with(prefix))
    }

    /// Returns the CI runs newest first.
    pub fn runs_newest_first(&self) -> impl Iterator<Item = u64> + '_ {
        self.ci_run_ids.iter().rev().copied()
    }
}

/// Lightweight listing entry for an open pull request.
///
/// Listing entries carry enough to search titles and to request the full
/// record without hydrating every pull request up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestSummary {
    /// Pull request number.
    pub id: u64,
    /// Pull request title.
    pub title: String,
}

/// Commit and CI metadata fetched for one pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackMetadata {
    /// Commit SHAs, tracking commit first.
    pub commit_hashes: Vec<String>,
    /// CI run identifiers, oldest first.
    pub ci_run_ids: Vec<u64>,
    /// Remote tracking ref derived from the head branch.
    pub git_ref: String,
}

impl StackMetadata {
    /// Combines listing data with fetched metadata into a full record.
    #[must_use]
    pub fn into_pull_request(self, summary: &PullRequestSummary) -> PullRequest {
        PullRequest {
            id: summary.id,
            title: summary.title.clone(),
            commit_hashes: self.commit_hashes,
            git_ref: self.git_ref,
            ci_run_ids: self.ci_run_ids,
        }
    }
}
