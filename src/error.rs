//! Error types surfaced by pull request resolution and CI extraction.
//!
//! Every variant renders as a single actionable line so the CLI can print it
//! verbatim without a backtrace.

use thiserror::Error;

/// A pull request that matched a search, kept for ambiguity reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSummary {
    /// Pull request number.
    pub id: u64,
    /// Pull request title.
    pub title: String,
}

impl std::fmt::Display for MatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}: {}", self.id, self.title)
    }
}

/// Errors surfaced while resolving pull requests or talking to GitHub.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PullmanError {
    /// Resolution produced zero matches.
    #[error("no pull request matches '{token}' (tried: {})", .strategies.join(", "))]
    NotFound {
        /// The token as supplied by the user.
        token: String,
        /// Human-readable names of the strategies that were attempted.
        strategies: Vec<String>,
    },

    /// Resolution produced more than one match.
    #[error(
        "'{token}' matches {} pull requests, be more specific: {}",
        .matches.len(),
        format_matches(.matches)
    )]
    Ambiguous {
        /// The token as supplied by the user.
        token: String,
        /// Every matching pull request.
        matches: Vec<MatchSummary>,
    },

    /// GitHub or the CI provider could not be reached or answered with an
    /// unrecoverable error.
    #[error("{operation} failed: {message}")]
    RemoteUnavailable {
        /// What was being attempted, including the pull request where known.
        operation: String,
        /// Transport or API error detail.
        message: String,
    },

    /// The resolved pull request has no CI runs yet.
    #[error("pull request #{pull_request} has no CI runs")]
    NoRuns {
        /// Pull request number.
        pull_request: u64,
    },

    /// The resolved pull request has no known commits to link to.
    #[error("pull request #{pull_request} has no known commits")]
    NoCommits {
        /// Pull request number.
        pull_request: u64,
    },

    /// Some pull requests could not be loaded while building the index.
    #[error("could not load pull requests {}", format_ids(.failed))]
    Degraded {
        /// Pull request numbers whose metadata could not be fetched.
        failed: Vec<u64>,
    },

    /// The authentication token was rejected by GitHub.
    #[error("GitHub rejected the token: {message}")]
    Authentication {
        /// Error detail returned with the 401/403 response.
        message: String,
    },

    /// The GitHub token was missing or blank.
    #[error(
        "a GitHub token is required (set PULLMAN_TOKEN, PULL_MANAGER_GIT_TOKEN, GIT_TOKEN or \
         GITHUB_TOKEN)"
    )]
    MissingToken,

    /// Configuration could not be loaded or is incomplete.
    #[error("configuration error: {message}")]
    Configuration {
        /// Details about the configuration failure.
        message: String,
    },

    /// The local git repository could not be inspected.
    #[error("local repository: {message}")]
    LocalRepository {
        /// Error detail from git.
        message: String,
    },

    /// Local I/O operation failed.
    #[error("I/O error: {message}")]
    Io {
        /// Error detail from the underlying I/O operation.
        message: String,
    },
}

fn format_matches(matches: &[MatchSummary]) -> String {
    matches
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn format_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(|id| format!("#{id}"))
        .collect::<Vec<_>>()
        .join(", ")
}
